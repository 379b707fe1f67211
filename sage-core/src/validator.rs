//! Inbound validation pipeline
//!
//! Runs every check on an inbound message in fixed order: dedup, ordering,
//! signature (which consumes the nonce), then session decryption when the
//! message carries a session envelope. The caller gets either the decrypted
//! payload or a coarse rejection: a wire code plus an opaque correlation
//! id. The specific sub-reason is only logged.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{CorrelationId, Result, SageError, WireCode};
use crate::message::CanonicalMessage;
use crate::replay::{DedupeDetector, OrderManager};
use crate::session::{SessionFrame, SessionRegistry};
use crate::signing::{MessageVerifier, SignedHeaders};
use sage_did::Did;

/// An inbound message plus its transport-level artifacts.
pub struct InboundMessage {
    pub message: CanonicalMessage,
    pub headers: SignedHeaders,
    /// Explicit application sequence number, if the sender assigns them.
    pub sequence: Option<u64>,
    /// Session envelope, when the payload is session-encrypted.
    pub session_frame: Option<SessionFrame>,
}

/// A fully validated message ready for delivery.
#[derive(Debug)]
pub struct ValidatedMessage {
    pub sender: Did,
    /// Decrypted session payload, or the plain body for non-session
    /// messages.
    pub payload: Vec<u8>,
}

/// Wire-safe rejection: coarse code plus correlation id, nothing else.
#[derive(Debug, Clone, Copy)]
pub struct Rejection {
    pub code: WireCode,
    pub correlation_id: CorrelationId,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} (ref {})", self.code, self.correlation_id)
    }
}

/// Orchestrates all inbound checks.
pub struct MessageValidator {
    dedupe: Arc<DedupeDetector>,
    order: Arc<OrderManager>,
    verifier: MessageVerifier,
    sessions: Arc<SessionRegistry>,
}

impl MessageValidator {
    pub fn new(
        dedupe: Arc<DedupeDetector>,
        order: Arc<OrderManager>,
        verifier: MessageVerifier,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        Self { dedupe, order, verifier, sessions }
    }

    /// Validate one inbound message.
    ///
    /// On rejection the full reason is logged under the returned
    /// correlation id; the peer sees only the coarse code.
    pub async fn validate(
        &self,
        inbound: &InboundMessage,
    ) -> std::result::Result<ValidatedMessage, Rejection> {
        match self.run_checks(inbound).await {
            Ok(validated) => Ok(validated),
            Err(err) => {
                let correlation_id = CorrelationId::generate();
                warn!(
                    correlation = %correlation_id,
                    sender = %inbound.message.agent_did,
                    error = %err,
                    "inbound message rejected"
                );
                Err(Rejection { code: err.wire_code(), correlation_id })
            }
        }
    }

    async fn run_checks(&self, inbound: &InboundMessage) -> Result<ValidatedMessage> {
        let message = &inbound.message;
        let sender = message.agent_did.clone();

        // (1) Dedup on the message fingerprint
        self.dedupe.mark_message(message)?;

        // (2) Ordering: timestamp skew, then the explicit sequence window
        self.order.check_timestamp(&sender, message.timestamp)?;
        if let Some(seq) = inbound.sequence {
            self.order.observe_sequence(&sender, seq)?;
        }

        // (3) Signature verification, which also consumes the nonce
        self.verifier.verify(message, &inbound.headers).await?;

        // (4) Session-layer decryption, if present
        let payload = match &inbound.session_frame {
            Some(frame) => {
                let session = self
                    .sessions
                    .get(&frame.session_id)
                    .ok_or(SageError::SessionClosed)?;
                session.decrypt(frame)?
            }
            None => message.body.clone(),
        };

        debug!(sender = %sender, "inbound message accepted");
        Ok(ValidatedMessage { sender, payload })
    }
}
