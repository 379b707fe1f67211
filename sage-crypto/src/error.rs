//! Crypto error types
//!
//! Primitive failures are reported as-is to callers; the core maps them to
//! wire-visible codes at the outermost layer.

/// Errors produced by the cryptographic adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    /// Key bytes could not be parsed or have the wrong length.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A signature failed to parse or verify.
    #[error("invalid signature")]
    InvalidSignature,

    /// The requested operation is not defined for this algorithm family.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// HKDF extraction or expansion failed (bad PRK or output length).
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// AEAD seal/open failed (wrong key, nonce or tampered ciphertext).
    #[error("AEAD operation failed")]
    Aead,

    /// KEM encapsulation or decapsulation failed.
    #[error("KEM operation failed: {0}")]
    Kem(String),
}
