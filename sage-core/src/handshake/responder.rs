//! Responder state machine
//!
//! The responder holds no per-source state until a cookie returns:
//!
//! ```text
//! LISTEN --recv Invitation--> (cookie issued, nothing stored)
//!        --recv SolvedInvitation--> verify cookie + PoW + signature
//!        --encap & sign--> Accept sent, session derived
//!        --recv AckConfirm (optional)--> confirmed
//! ```
//!
//! Admission order is cheapest-first: rate limit, then cookie MAC, then
//! PoW, and only then signature verification and KEM work.

use sage_crypto::{ct_eq_bytes, kem_encap, KeyPair, KeyType, PublicKey};
use sage_did::{Did, DidResolver};
use std::sync::Arc;
use tracing::{debug, info};

use super::cookie::CookieJar;
use super::messages::{Accept, CookieChallenge, HandshakeFrame, HandshakePayload};
use super::observer::{noop_observer, HandshakeEvent, HandshakeObserver};
use super::pow::{DifficultyController, PowPuzzle};
use super::rate_limiter::HandshakeRateLimiter;
use super::to_handshake_failure;
use super::transcript::{ack_confirmation, ack_tag, exporter_secret, info_hash};
use crate::config::SageConfig;
use crate::error::{HandshakeFailure, Result, SageError};
use crate::replay::NonceManager;
use crate::session::{Session, SessionRole};
use crate::signing::{MessageSigner, MessageVerifier};

/// Everything produced by a successful responder-side handshake.
pub struct AcceptOutcome {
    /// The signed Accept frame to return to the initiator.
    pub accept: HandshakeFrame,
    /// The derived session, responder role.
    pub session: Session,
    /// Tag expected in an optional AckConfirm flight.
    pub expected_ack_confirmation: [u8; 32],
}

/// Serves handshakes from the responding side. Stateless per peer; safe to
/// share behind an `Arc`.
pub struct HandshakeResponder {
    local_did: Did,
    signer: MessageSigner,
    verifier: MessageVerifier,
    cookies: CookieJar,
    difficulty: DifficultyController,
    rate_limiter: Option<HandshakeRateLimiter>,
    observer: Arc<dyn HandshakeObserver>,
    config: SageConfig,
}

impl HandshakeResponder {
    pub fn new(
        local_did: Did,
        long_term: KeyPair,
        resolver: Arc<dyn DidResolver>,
        nonces: Arc<NonceManager>,
        config: SageConfig,
    ) -> Result<Self> {
        let signer = MessageSigner::new(long_term, local_did.to_string())?;
        let verifier = MessageVerifier::new(resolver, nonces, &config);
        Ok(Self {
            local_did,
            signer,
            verifier,
            cookies: CookieJar::new(config.cookie_ttl),
            difficulty: DifficultyController::new(
                config.pow_difficulty_bits,
                config.pow_difficulty_autoadjust,
            ),
            rate_limiter: config.rate_limit.clone().map(HandshakeRateLimiter::new),
            observer: noop_observer(),
            config,
        })
    }

    /// Attach an observer for handshake events.
    pub fn with_observer(mut self, observer: Arc<dyn HandshakeObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// First flight: answer an unproven Invitation with a cookie
    /// challenge. No signature verification, no state stored.
    pub fn on_invitation(&self, frame: &HandshakeFrame, source: &str) -> Result<HandshakeFrame> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.check(source)?;
        }
        if !matches!(frame.payload, HandshakePayload::Invitation(_)) {
            return Err(SageError::HandshakeFailed(HandshakeFailure::UnexpectedMessage));
        }

        let difficulty = self.difficulty.current();
        let cookie = self.cookies.issue(source, difficulty);
        let puzzle = PowPuzzle::from_cookie(&cookie, difficulty);

        self.difficulty.handshake_started();
        self.observer
            .on_event(HandshakeEvent::CookieIssued { source: source.to_string() });
        debug!(source = %source, difficulty, "cookie challenge issued");

        Ok(HandshakeFrame::unsigned(CookieChallenge { cookie, puzzle }))
    }

    /// Second flight: admit a solved invitation, verify the transcript,
    /// encapsulate, and emit the signed Accept plus the derived session.
    pub async fn on_solved(&self, frame: &HandshakeFrame, source: &str) -> Result<AcceptOutcome> {
        let result = self.admit_solved(frame, source).await;
        self.difficulty.handshake_finished();
        match &result {
            Ok(outcome) => self.observer.on_event(HandshakeEvent::Established {
                peer: outcome.session.peer_did().to_string(),
            }),
            Err(SageError::HandshakeFailed(reason)) => {
                self.observer.on_event(HandshakeEvent::Failed {
                    peer: frame.sender().map(|d| d.to_string()),
                    reason: *reason,
                });
            }
            Err(_) => {}
        }
        result
    }

    async fn admit_solved(&self, frame: &HandshakeFrame, source: &str) -> Result<AcceptOutcome> {
        let solved = match &frame.payload {
            HandshakePayload::SolvedInvitation(solved) => solved,
            _ => return Err(SageError::HandshakeFailed(HandshakeFailure::UnexpectedMessage)),
        };

        // (1) Cookie MAC and freshness; yields the difficulty it demanded
        let difficulty = self.cookies.verify(source, &solved.cookie)?;

        // (2) Proof of work at the demanded difficulty
        let puzzle = PowPuzzle::from_cookie(&solved.cookie, difficulty);
        puzzle.verify(solved.pow_solution)?;

        // (3) Signature over the frame (resolves and checks the initiator's
        // registered key, active flag, and consumes the frame nonce)
        frame.verify(&self.verifier).await.map_err(to_handshake_failure)?;

        let invitation = &solved.invitation;
        if frame.sender() != Some(&invitation.i_did) {
            return Err(SageError::HandshakeFailed(HandshakeFailure::Sig));
        }

        // (4) Transcript binding: the invitation must target us
        let expected_info = info_hash(
            &invitation.i_did,
            &self.local_did,
            &invitation.i_ephemeral_kem_pk,
        );
        if !ct_eq_bytes(&expected_info, &invitation.info_hash) {
            return Err(SageError::HandshakeFailed(HandshakeFailure::InfoHash));
        }

        // (5) Encapsulate to the initiator's ephemeral share
        let initiator_kem_pk =
            PublicKey::from_bytes(KeyType::X25519, &invitation.i_ephemeral_kem_pk)
                .map_err(|_| SageError::HandshakeFailed(HandshakeFailure::KemDecap))?;
        let (enc, exporter) = kem_encap(&initiator_kem_pk, &expected_info)
            .map_err(|_| SageError::HandshakeFailed(HandshakeFailure::KemDecap))?;
        // ES = Export("sage/v1/exporter", 32); everything below keys off it
        let es = exporter_secret(&exporter)
            .map_err(|_| SageError::HandshakeFailed(HandshakeFailure::KemDecap))?;

        let tag = ack_tag(&es, &expected_info, enc.as_bytes());
        let expected_ack_confirmation = ack_confirmation(&es, &tag);

        let session = Session::from_exporter(
            &es,
            SessionRole::Responder,
            self.local_did.clone(),
            invitation.i_did.clone(),
            &self.config,
        )?;

        let payload = HandshakePayload::Accept(Accept {
            r_did: self.local_did.clone(),
            enc: enc.as_bytes().to_vec(),
            info_hash_echo: invitation.info_hash,
            ack_tag: tag,
        });
        let accept = HandshakeFrame::seal(payload, &self.local_did, &self.signer)?;

        info!(peer = %invitation.i_did, "handshake established (responder)");
        Ok(AcceptOutcome { accept, session, expected_ack_confirmation })
    }

    /// Verify an optional AckConfirm flight against the outcome of
    /// [`HandshakeResponder::on_solved`].
    pub async fn verify_ack_confirm(
        &self,
        expected: &[u8; 32],
        frame: &HandshakeFrame,
    ) -> Result<()> {
        frame.verify(&self.verifier).await.map_err(to_handshake_failure)?;
        let confirm = match &frame.payload {
            HandshakePayload::AckConfirm(confirm) => confirm,
            _ => return Err(SageError::HandshakeFailed(HandshakeFailure::UnexpectedMessage)),
        };
        if !ct_eq_bytes(&confirm.ack_tag_confirmation, expected) {
            return Err(SageError::HandshakeFailed(HandshakeFailure::AckTag));
        }
        Ok(())
    }
}
