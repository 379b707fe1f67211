//! Initiator state machine
//!
//! ```text
//! Init --start()--> InvitationSent --on_accept()--> Established
//!                 \--on_cookie()--/            \--any failure--> Failed
//! ```
//!
//! Each step enforces the per-step deadline. Any failure is terminal:
//! the ephemeral KEM key is dropped (zeroized) and no session is exposed.

use sage_crypto::{ct_eq_bytes, kem_decap, EncappedKey, KeyPair, KeyType};
use sage_did::{Did, DidResolver};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::messages::{
    CookieChallenge, HandshakeFrame, HandshakePayload, Invitation, SolvedInvitation,
};
use super::transcript::{ack_confirmation, ack_tag, exporter_secret, info_hash};
use super::{to_handshake_failure, AckConfirm};
use crate::config::SageConfig;
use crate::error::{HandshakeFailure, Result, SageError};
use crate::replay::NonceManager;
use crate::session::{Session, SessionRole};
use crate::signing::{MessageSigner, MessageVerifier};

/// Initiator-side handshake states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitiatorState {
    Init,
    InvitationSent,
    Established,
    Failed,
}

/// Drives one handshake from the initiating side.
pub struct HandshakeInitiator {
    local_did: Did,
    peer_did: Did,
    signer: MessageSigner,
    verifier: MessageVerifier,
    config: SageConfig,
    state: InitiatorState,
    ephemeral: Option<KeyPair>,
    info_hash: [u8; 32],
    step_deadline: Option<Instant>,
    ack_confirmation: Option<[u8; 32]>,
}

impl HandshakeInitiator {
    /// Prepare a handshake toward `peer_did`, signing with the local
    /// long-term key.
    pub fn new(
        local_did: Did,
        peer_did: Did,
        long_term: KeyPair,
        resolver: Arc<dyn DidResolver>,
        nonces: Arc<NonceManager>,
        config: SageConfig,
    ) -> Result<Self> {
        let signer = MessageSigner::new(long_term, local_did.to_string())?;
        let verifier = MessageVerifier::new(resolver, nonces, &config);
        Ok(Self {
            local_did,
            peer_did,
            signer,
            verifier,
            config,
            state: InitiatorState::Init,
            ephemeral: None,
            info_hash: [0u8; 32],
            step_deadline: None,
            ack_confirmation: None,
        })
    }

    pub fn state(&self) -> InitiatorState {
        self.state
    }

    /// Generate the ephemeral KEM share and emit the signed Invitation.
    pub fn start(&mut self) -> Result<HandshakeFrame> {
        if self.state != InitiatorState::Init {
            return Err(self.fail(HandshakeFailure::UnexpectedMessage));
        }

        let ephemeral = KeyPair::generate(KeyType::X25519)?;
        let kem_pk = ephemeral.public_key().to_bytes();
        self.info_hash = info_hash(&self.local_did, &self.peer_did, &kem_pk);

        let payload = HandshakePayload::Invitation(Invitation {
            i_did: self.local_did.clone(),
            i_ephemeral_kem_pk: kem_pk,
            info_hash: self.info_hash,
        });
        let frame = HandshakeFrame::seal(payload, &self.local_did, &self.signer)?;

        self.ephemeral = Some(ephemeral);
        self.state = InitiatorState::InvitationSent;
        self.arm_deadline();
        debug!(peer = %self.peer_did, "invitation sent");
        Ok(frame)
    }

    /// Solve the responder's admission puzzle and resend the invitation
    /// with cookie and solution attached.
    pub fn on_cookie(&mut self, challenge: &CookieChallenge) -> Result<HandshakeFrame> {
        if self.state != InitiatorState::InvitationSent {
            return Err(self.fail(HandshakeFailure::UnexpectedMessage));
        }
        self.check_deadline()?;

        let ephemeral = self
            .ephemeral
            .as_ref()
            .ok_or_else(|| SageError::HandshakeFailed(HandshakeFailure::UnexpectedMessage))?;

        // Bounded search; a solution at difficulty d is expected within 2^d
        // attempts, so give it a healthy margin
        let budget = 1u64
            .checked_shl(u32::from(challenge.puzzle.difficulty) + 4)
            .unwrap_or(u64::MAX);
        let solution = match challenge.puzzle.solve(budget) {
            Some(solution) => solution,
            None => return Err(self.fail(HandshakeFailure::Pow)),
        };

        let payload = HandshakePayload::SolvedInvitation(SolvedInvitation {
            invitation: Invitation {
                i_did: self.local_did.clone(),
                i_ephemeral_kem_pk: ephemeral.public_key().to_bytes(),
                info_hash: self.info_hash,
            },
            cookie: challenge.cookie.clone(),
            pow_solution: solution,
        });
        let frame = HandshakeFrame::seal(payload, &self.local_did, &self.signer)?;
        self.arm_deadline();
        debug!(peer = %self.peer_did, difficulty = challenge.puzzle.difficulty, "puzzle solved");
        Ok(frame)
    }

    /// Consume the responder's Accept, verify the transcript, and derive
    /// the session.
    pub async fn on_accept(&mut self, frame: &HandshakeFrame) -> Result<Session> {
        if self.state != InitiatorState::InvitationSent {
            return Err(self.fail(HandshakeFailure::UnexpectedMessage));
        }
        self.check_deadline()?;

        if let Err(e) = frame.verify(&self.verifier).await {
            let mapped = to_handshake_failure(e);
            if let SageError::HandshakeFailed(reason) = mapped {
                return Err(self.fail(reason));
            }
            self.abort();
            return Err(mapped);
        }

        let accept = match &frame.payload {
            HandshakePayload::Accept(accept) => accept,
            _ => return Err(self.fail(HandshakeFailure::UnexpectedMessage)),
        };
        if frame.sender() != Some(&self.peer_did) || accept.r_did != self.peer_did {
            return Err(self.fail(HandshakeFailure::Sig));
        }

        // Transcript echo must match what we sent
        if !ct_eq_bytes(&accept.info_hash_echo, &self.info_hash) {
            return Err(self.fail(HandshakeFailure::InfoHash));
        }

        let ephemeral = match self.ephemeral.take() {
            Some(ephemeral) => ephemeral,
            None => return Err(self.fail(HandshakeFailure::UnexpectedMessage)),
        };

        let enc = match EncappedKey::from_bytes(&accept.enc) {
            Ok(enc) => enc,
            Err(_) => return Err(self.fail(HandshakeFailure::KemDecap)),
        };
        let exporter = match kem_decap(&enc, ephemeral.private_key(), &self.info_hash) {
            Ok(exporter) => exporter,
            Err(_) => return Err(self.fail(HandshakeFailure::KemDecap)),
        };
        // ES = Export("sage/v1/exporter", 32); everything below keys off it
        let es = match exporter_secret(&exporter) {
            Ok(es) => es,
            Err(_) => return Err(self.fail(HandshakeFailure::KemDecap)),
        };

        // The ack tag proves the responder derived the same exporter output
        let expected = ack_tag(&es, &self.info_hash, &accept.enc);
        if !ct_eq_bytes(&expected, &accept.ack_tag) {
            return Err(self.fail(HandshakeFailure::AckTag));
        }

        self.ack_confirmation = Some(ack_confirmation(&es, &accept.ack_tag));
        let session = Session::from_exporter(
            &es,
            SessionRole::Initiator,
            self.local_did.clone(),
            self.peer_did.clone(),
            &self.config,
        )?;

        self.state = InitiatorState::Established;
        self.step_deadline = None;
        info!(peer = %self.peer_did, "handshake established (initiator)");
        Ok(session)
    }

    /// Emit the optional final AckConfirm flight.
    pub fn ack_confirm(&self) -> Result<HandshakeFrame> {
        if self.state != InitiatorState::Established {
            return Err(SageError::HandshakeFailed(HandshakeFailure::UnexpectedMessage));
        }
        let confirmation = self
            .ack_confirmation
            .ok_or_else(|| SageError::HandshakeFailed(HandshakeFailure::UnexpectedMessage))?;
        let payload = HandshakePayload::AckConfirm(AckConfirm {
            ack_tag_confirmation: confirmation,
        });
        HandshakeFrame::seal(payload, &self.local_did, &self.signer)
    }

    /// Cancel the handshake: terminal, zeroizes ephemeral material.
    pub fn cancel(&mut self) {
        self.abort();
    }

    fn arm_deadline(&mut self) {
        self.step_deadline = Some(Instant::now() + self.config.handshake_step_timeout);
    }

    fn check_deadline(&mut self) -> Result<()> {
        if let Some(deadline) = self.step_deadline {
            if Instant::now() > deadline {
                return Err(self.fail(HandshakeFailure::Timeout));
            }
        }
        Ok(())
    }

    fn fail(&mut self, reason: HandshakeFailure) -> SageError {
        self.abort();
        debug!(peer = %self.peer_did, reason = %reason, "handshake failed (initiator)");
        SageError::HandshakeFailed(reason)
    }

    fn abort(&mut self) {
        // Dropping the ephemeral key zeroizes its secret scalar
        self.ephemeral = None;
        self.state = InitiatorState::Failed;
        self.step_deadline = None;
    }
}

impl HandshakeInitiator {
    /// Step timeout currently configured (visible for tests).
    pub fn step_timeout(&self) -> Duration {
        self.config.handshake_step_timeout
    }
}
