//! Ed25519 signing family
//!
//! Raw-byte signing (no prehash), 64-byte signatures, 32-byte public keys.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::error::CryptoError;
use crate::Result;

/// Generate a fresh signing key from the OS CSPRNG.
pub fn generate() -> SigningKey {
    SigningKey::generate(&mut OsRng)
}

/// Sign raw message bytes. Always 64 bytes.
pub fn sign(sk: &SigningKey, message: &[u8]) -> Vec<u8> {
    sk.sign(message).to_bytes().to_vec()
}

/// Verify a 64-byte raw signature.
pub fn verify(vk: &VerifyingKey, message: &[u8], signature: &[u8]) -> Result<()> {
    let sig = ed25519_dalek::Signature::from_slice(signature)
        .map_err(|_| CryptoError::InvalidSignature)?;
    vk.verify(message, &sig)
        .map_err(|_| CryptoError::InvalidSignature)
}

/// Parse a 32-byte raw public key.
pub fn public_from_bytes(bytes: &[u8]) -> Result<VerifyingKey> {
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidKey(format!("Ed25519 key must be 32 bytes, got {}", bytes.len())))?;
    VerifyingKey::from_bytes(&arr)
        .map_err(|e| CryptoError::InvalidKey(format!("Ed25519 point decode failed: {e}")))
}

/// Restore a signing key from its 32-byte seed.
pub fn private_from_bytes(bytes: &[u8]) -> Result<SigningKey> {
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidKey(format!("Ed25519 seed must be 32 bytes, got {}", bytes.len())))?;
    Ok(SigningKey::from_bytes(&arr))
}
