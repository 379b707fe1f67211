//! SAGE Cryptography Foundation Module
//!
//! Uniform key-pair, signature, KEM and AEAD interface consumed by the SAGE
//! core. Supports four algorithm families behind one exhaustive sum type:
//!
//! - **Ed25519** - 64-byte signatures, 32-byte raw public keys
//! - **ECDSA P-256** - fixed 64-byte signatures, SEC1 public keys
//! - **ECDSA secp256k1** - Ethereum-compatible 65-byte `r || s || v` signatures
//! - **X25519** - key encapsulation only (DHKEM per RFC 9180)
//!
//! # Security Properties
//!
//! - **Zeroization**: private keys, shared secrets and exporter secrets are
//!   wiped on drop
//! - **Constant-time comparison**: all tag/secret comparisons go through
//!   [`ct::ct_eq_bytes`]
//! - **Entropy**: all randomness comes from the operating system CSPRNG

pub mod aead;
pub mod ct;
pub mod ecdsa;
pub mod ed25519;
pub mod error;
pub mod hpke;
pub mod kdf;
pub mod keys;
pub mod random;
pub mod x25519;

// Re-export commonly used types and functions
pub use aead::{aead_open, aead_seal, AeadAlgorithm};
pub use ct::{ct_eq_bytes, ct_verify_eq};
pub use error::CryptoError;
pub use hpke::{kem_decap, kem_encap, EncappedKey, ExportedSecret, ExporterSecret};
pub use kdf::{hkdf_expand, hkdf_extract_expand, hmac_sha256, verify_hmac_sha256};
pub use keys::{KeyPair, KeyType, PrivateKey, PublicKey, SignatureAlgorithm};
pub use random::{generate_nonce_string, random_array, random_bytes};

/// Result alias used throughout the crypto layer.
pub type Result<T> = std::result::Result<T, CryptoError>;
