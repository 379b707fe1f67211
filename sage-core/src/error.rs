//! Unified error taxonomy
//!
//! One compact typed enum covers the whole core. Internally every failure
//! keeps its specific sub-reason (and is logged with it); outward, errors
//! collapse to a coarse [`WireCode`] plus an opaque [`CorrelationId`] so an
//! unauthenticated peer learns nothing about which check failed.

use sage_crypto::CryptoError;
use sage_did::{DidError, ResolverError};
use uuid::Uuid;

/// Sub-reason for a signature verification failure.
///
/// Logged distinctly; merged into one wire-visible code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureFailure {
    /// Declared algorithm does not match the resolved key.
    Algo,
    /// Reconstructed signature base does not match what was signed.
    Base,
    /// Raw signature bytes failed to verify.
    Raw,
    /// Covered content-digest does not match the body.
    Digest,
    /// The covered nonce was already seen.
    NonceReplay,
}

impl std::fmt::Display for SignatureFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SignatureFailure::Algo => "algorithm mismatch",
            SignatureFailure::Base => "signature base mismatch",
            SignatureFailure::Raw => "raw signature invalid",
            SignatureFailure::Digest => "content digest mismatch",
            SignatureFailure::NonceReplay => "nonce replay",
        };
        f.write_str(s)
    }
}

/// Sub-reason for a terminal handshake failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeFailure {
    /// Frame signature did not verify.
    Sig,
    /// Echoed info hash does not match the transcript.
    InfoHash,
    /// Acknowledgement MAC mismatch.
    AckTag,
    /// KEM decapsulation failed.
    KemDecap,
    /// DoS cookie invalid or expired.
    Cookie,
    /// Proof-of-work solution below required difficulty.
    Pow,
    /// Handshake nonce already seen.
    NonceReplay,
    /// Per-step deadline exceeded.
    Timeout,
    /// Peer's registry record is deactivated.
    InactiveAgent,
    /// Frame arrived in a state that cannot consume it.
    UnexpectedMessage,
}

impl std::fmt::Display for HandshakeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HandshakeFailure::Sig => "signature verification failed",
            HandshakeFailure::InfoHash => "info hash mismatch",
            HandshakeFailure::AckTag => "ack tag mismatch",
            HandshakeFailure::KemDecap => "KEM decapsulation failed",
            HandshakeFailure::Cookie => "cookie invalid or expired",
            HandshakeFailure::Pow => "insufficient proof of work",
            HandshakeFailure::NonceReplay => "nonce replay",
            HandshakeFailure::Timeout => "step timeout",
            HandshakeFailure::InactiveAgent => "inactive agent",
            HandshakeFailure::UnexpectedMessage => "unexpected message for state",
        };
        f.write_str(s)
    }
}

/// The SAGE core error taxonomy.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SageError {
    // --- Parse ---
    #[error("malformed Signature-Input: {0}")]
    MalformedSignatureInput(String),

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("unknown component: {0}")]
    UnknownComponent(String),

    // --- Auth ---
    #[error("signature verification failed: {0}")]
    SignatureVerificationFailed(SignatureFailure),

    #[error("agent {0} is inactive")]
    InactiveAgent(String),

    #[error("DID not found: {0}")]
    DidNotFound(String),

    #[error("handshake failed: {0}")]
    HandshakeFailed(HandshakeFailure),

    #[error("key type mismatch: expected {expected}, got {got}")]
    KeyTypeMismatch { expected: String, got: String },

    // --- Replay / Order ---
    #[error("nonce replay")]
    NonceReplay,

    #[error("sequence {seq} out of order")]
    OutOfOrder { seq: u64 },

    #[error("duplicate message")]
    Duplicate,

    #[error("clock skew: timestamp {timestamp} outside tolerance")]
    ClockSkew { timestamp: u64 },

    // --- Session ---
    #[error("session closed")]
    SessionClosed,

    #[error("send counter exhausted")]
    CounterExhausted,

    #[error("frame counter replayed")]
    CounterReplay,

    #[error("frame counter outside receive window")]
    CounterOutOfWindow,

    #[error("AEAD authentication failed")]
    AeadFailed,

    // --- Resource ---
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(&'static str),

    #[error("operation timed out")]
    Timeout,

    #[error("operation cancelled")]
    Cancelled,

    // --- Transport / Resolver ---
    #[error("resolver unavailable: {0}")]
    ResolverUnavailable(String),

    // --- Primitive passthrough (bubbles up unchanged) ---
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Did(#[from] DidError),
}

impl From<ResolverError> for SageError {
    fn from(err: ResolverError) -> Self {
        match err {
            ResolverError::NotFound(did) => SageError::DidNotFound(did),
            ResolverError::Transport(msg) => SageError::ResolverUnavailable(msg),
            ResolverError::KeyNotFound { did, key_type } => SageError::KeyTypeMismatch {
                expected: key_type.to_string(),
                got: format!("no verified key for {did}"),
            },
        }
    }
}

/// Coarse wire-visible outcome codes, mapped to transport status by hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireCode {
    Ok,
    /// Any cryptographic or identity failure (HTTP 401).
    AuthRequired,
    /// Malformed input (HTTP 400).
    BadRequest,
    /// Admission or capacity refusal (HTTP 403).
    Forbidden,
    /// Replay, ordering or duplication conflict (HTTP 409).
    Conflict,
    /// The referenced session no longer exists (HTTP 410).
    Gone,
}

impl SageError {
    /// Collapse to the coarse wire-visible code.
    ///
    /// All cryptographic sub-reasons map to the same code; the distinction
    /// lives only in logs.
    pub fn wire_code(&self) -> WireCode {
        match self {
            SageError::MalformedSignatureInput(_)
            | SageError::MalformedFrame(_)
            | SageError::UnknownComponent(_)
            | SageError::ClockSkew { .. }
            | SageError::Did(_) => WireCode::BadRequest,

            SageError::SignatureVerificationFailed(_)
            | SageError::InactiveAgent(_)
            | SageError::DidNotFound(_)
            | SageError::HandshakeFailed(_)
            | SageError::KeyTypeMismatch { .. }
            | SageError::AeadFailed
            | SageError::Crypto(_) => WireCode::AuthRequired,

            SageError::NonceReplay
            | SageError::OutOfOrder { .. }
            | SageError::Duplicate
            | SageError::CounterReplay
            | SageError::CounterOutOfWindow => WireCode::Conflict,

            SageError::SessionClosed | SageError::CounterExhausted => WireCode::Gone,

            SageError::CapacityExceeded(_)
            | SageError::Timeout
            | SageError::Cancelled
            | SageError::ResolverUnavailable(_) => WireCode::Forbidden,
        }
    }
}

/// Opaque id correlating a wire-visible rejection with operator logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Result alias used throughout the core.
pub type Result<T> = std::result::Result<T, SageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_failures_collapse_to_auth() {
        for reason in [
            SignatureFailure::Algo,
            SignatureFailure::Base,
            SignatureFailure::Raw,
            SignatureFailure::Digest,
            SignatureFailure::NonceReplay,
        ] {
            assert_eq!(
                SageError::SignatureVerificationFailed(reason).wire_code(),
                WireCode::AuthRequired
            );
        }
    }

    #[test]
    fn test_replay_maps_to_conflict() {
        assert_eq!(SageError::NonceReplay.wire_code(), WireCode::Conflict);
        assert_eq!(SageError::Duplicate.wire_code(), WireCode::Conflict);
        assert_eq!(SageError::OutOfOrder { seq: 3 }.wire_code(), WireCode::Conflict);
    }

    #[test]
    fn test_session_teardown_maps_to_gone() {
        assert_eq!(SageError::SessionClosed.wire_code(), WireCode::Gone);
        assert_eq!(SageError::CounterExhausted.wire_code(), WireCode::Gone);
    }

    #[test]
    fn test_correlation_ids_unique() {
        assert_ne!(
            CorrelationId::generate().to_string(),
            CorrelationId::generate().to_string()
        );
    }
}
