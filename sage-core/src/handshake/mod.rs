//! HPKE handshake engine
//!
//! Establishes a mutually authenticated exporter secret between an
//! Initiator and a Responder whose identities live in the DID registry.
//!
//! # Protocol
//!
//! ```text
//! Initiator                                 Responder
//!   |                                          |
//!   |--- Invitation (signed) ---------------->|  no state stored
//!   |<-- CookieChallenge (cookie + PoW) ------|  unauthenticated
//!   |--- SolvedInvitation (signed) ---------->|  cookie, PoW, sig verify
//!   |<-- Accept (signed, enc + ack_tag) ------|  KEM encap, exporter
//!   |--- AckConfirm (signed, optional) ------>|
//!   |                                          |
//!   |== both derive ES = HPKE.Export(...) ====|
//! ```
//!
//! # Security Properties
//!
//! - **Mutual authentication**: every substantive frame carries an RFC
//!   9421 signature under a registry-anchored long-term key
//! - **Forward secrecy**: the exporter comes from an ephemeral KEM share
//! - **Transcript binding**: `info_hash` ties both DIDs, the protocol
//!   label and the ephemeral share; the ack tag ties the exporter to the
//!   KEM ciphertext
//! - **DoS resistance**: stateless cookies plus proof-of-work in front of
//!   all expensive work, with optional per-source rate limiting
//! - **Replay protection**: frame nonces are single-use per sender
//!
//! Any failure is terminal for that handshake; ephemeral material is
//! zeroized and no partial session is ever exposed.

mod cookie;
mod initiator;
mod messages;
mod observer;
mod pow;
mod rate_limiter;
mod responder;
mod transcript;

pub use cookie::{CookieJar, COOKIE_LEN};
pub use initiator::{HandshakeInitiator, InitiatorState};
pub use messages::{
    Accept, AckConfirm, CookieChallenge, FrameEnvelope, HandshakeFrame, HandshakePayload,
    Invitation, SolvedInvitation,
};
pub use observer::{
    noop_observer, HandshakeEvent, HandshakeObserver, LoggingObserver, NoOpObserver,
};
pub use pow::{DifficultyController, PowPuzzle};
pub use rate_limiter::HandshakeRateLimiter;
pub use responder::{AcceptOutcome, HandshakeResponder};
pub use transcript::{
    ack_confirmation, ack_tag, exporter_secret, info_hash, ACK_CONFIRM_LABEL, ACK_LABEL,
    EXPORTER_CONTEXT, PROTOCOL_LABEL,
};

use crate::error::{HandshakeFailure, SageError, SignatureFailure};

/// Map verification-layer errors onto terminal handshake failures.
///
/// Resolver outages, capacity refusals and malformed frames pass through
/// unchanged; they are not authentication verdicts.
pub(crate) fn to_handshake_failure(err: SageError) -> SageError {
    match err {
        SageError::InactiveAgent(_) => {
            SageError::HandshakeFailed(HandshakeFailure::InactiveAgent)
        }
        SageError::SignatureVerificationFailed(SignatureFailure::NonceReplay) => {
            SageError::HandshakeFailed(HandshakeFailure::NonceReplay)
        }
        SageError::SignatureVerificationFailed(_) | SageError::Crypto(_) => {
            SageError::HandshakeFailed(HandshakeFailure::Sig)
        }
        other => other,
    }
}
