//! ECDSA signing families: NIST P-256 and secp256k1
//!
//! Both families hash the message with SHA-256 before signing.
//!
//! - P-256 uses the fixed 64-byte `r || s` signature encoding (not ASN.1
//!   DER) and SEC1 public keys.
//! - secp256k1 uses the Ethereum-compatible 65-byte `r || s || v` encoding
//!   with `v` in {27, 28}. When a signer is explicitly configured
//!   Ethereum-facing, the 32-byte SHA-256 digest is wrapped with the
//!   `"\x19Ethereum Signed Message:\n32"` prefix and re-hashed with
//!   Keccak-256 before signing, matching `personal_sign` semantics.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::RecoveryId;
use p256::ecdsa::signature::{Signer, Verifier};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use sha3::Keccak256;

use crate::error::CryptoError;
use crate::Result;

/// Ethereum `personal_sign` prefix for a 32-byte payload.
const ETHEREUM_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

// ============================================================================
// P-256
// ============================================================================

/// Generate a fresh P-256 signing key.
pub fn generate_p256() -> p256::ecdsa::SigningKey {
    p256::ecdsa::SigningKey::random(&mut OsRng)
}

/// Sign with P-256; SHA-256 digesting is applied internally.
/// Always the fixed 64-byte encoding.
pub fn sign_p256(sk: &p256::ecdsa::SigningKey, message: &[u8]) -> Vec<u8> {
    let sig: p256::ecdsa::Signature = sk.sign(message);
    sig.to_bytes().to_vec()
}

/// Verify a fixed 64-byte P-256 signature.
pub fn verify_p256(vk: &p256::ecdsa::VerifyingKey, message: &[u8], signature: &[u8]) -> Result<()> {
    let sig = p256::ecdsa::Signature::from_slice(signature)
        .map_err(|_| CryptoError::InvalidSignature)?;
    vk.verify(message, &sig)
        .map_err(|_| CryptoError::InvalidSignature)
}

/// SEC1 uncompressed encoding (`0x04 || X || Y`, 65 bytes).
pub fn marshal_p256(vk: &p256::ecdsa::VerifyingKey) -> Vec<u8> {
    vk.to_encoded_point(false).as_bytes().to_vec()
}

/// Parse a SEC1 public key (compressed or uncompressed).
pub fn p256_from_bytes(bytes: &[u8]) -> Result<p256::ecdsa::VerifyingKey> {
    p256::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
        .map_err(|e| CryptoError::InvalidKey(format!("P-256 SEC1 decode failed: {e}")))
}

// ============================================================================
// secp256k1
// ============================================================================

/// Generate a fresh secp256k1 signing key.
pub fn generate_secp256k1() -> k256::ecdsa::SigningKey {
    k256::ecdsa::SigningKey::random(&mut OsRng)
}

/// Compute the 32-byte digest a secp256k1 signature commits to.
///
/// Plain mode: `SHA-256(message)`. Ethereum mode: the SHA-256 digest is
/// wrapped with the personal-message prefix and hashed with Keccak-256.
fn secp256k1_digest(message: &[u8], ethereum_prefixed: bool) -> [u8; 32] {
    let sha: [u8; 32] = Sha256::digest(message).into();
    if !ethereum_prefixed {
        return sha;
    }
    let mut keccak = Keccak256::new();
    keccak.update(ETHEREUM_MESSAGE_PREFIX);
    keccak.update(sha);
    keccak.finalize().into()
}

/// Sign with secp256k1, returning the 65-byte `r || s || v` encoding.
pub fn sign_secp256k1(
    sk: &k256::ecdsa::SigningKey,
    message: &[u8],
    ethereum_prefixed: bool,
) -> Result<Vec<u8>> {
    let digest = secp256k1_digest(message, ethereum_prefixed);
    let (sig, recid) = sk
        .sign_prehash_recoverable(&digest)
        .map_err(|_| CryptoError::InvalidSignature)?;

    let mut out = Vec::with_capacity(65);
    out.extend_from_slice(&sig.to_bytes());
    // Ethereum convention: v = 27 + recovery id
    out.push(27 + recid.to_byte());
    Ok(out)
}

/// Verify a 65-byte `r || s || v` secp256k1 signature.
pub fn verify_secp256k1(
    vk: &k256::ecdsa::VerifyingKey,
    message: &[u8],
    signature: &[u8],
    ethereum_prefixed: bool,
) -> Result<()> {
    if signature.len() != 65 {
        return Err(CryptoError::InvalidSignature);
    }
    let v = signature[64];
    if v != 27 && v != 28 {
        return Err(CryptoError::InvalidSignature);
    }
    // Recovery id must exist; constructing it validates the range
    RecoveryId::from_byte(v - 27).ok_or(CryptoError::InvalidSignature)?;

    let sig = k256::ecdsa::Signature::from_slice(&signature[..64])
        .map_err(|_| CryptoError::InvalidSignature)?;
    let digest = secp256k1_digest(message, ethereum_prefixed);
    vk.verify_prehash(&digest, &sig)
        .map_err(|_| CryptoError::InvalidSignature)
}

/// 64-byte `X || Y` encoding (no SEC1 prefix).
pub fn marshal_secp256k1(vk: &k256::ecdsa::VerifyingKey) -> Vec<u8> {
    vk.to_encoded_point(false).as_bytes()[1..].to_vec()
}

/// 65-byte `0x04 || X || Y` encoding for on-chain registry use.
pub fn marshal_secp256k1_prefixed(vk: &k256::ecdsa::VerifyingKey) -> Vec<u8> {
    vk.to_encoded_point(false).as_bytes().to_vec()
}

/// Parse a secp256k1 public key.
///
/// Accepts the bare 64-byte `X || Y` form, SEC1 uncompressed (65 B) and
/// SEC1 compressed (33 B).
pub fn secp256k1_from_bytes(bytes: &[u8]) -> Result<k256::ecdsa::VerifyingKey> {
    let sec1: Vec<u8> = match bytes.len() {
        64 => {
            let mut v = Vec::with_capacity(65);
            v.push(0x04);
            v.extend_from_slice(bytes);
            v
        }
        33 | 65 => bytes.to_vec(),
        other => {
            return Err(CryptoError::InvalidKey(format!(
                "secp256k1 key must be 33, 64 or 65 bytes, got {other}"
            )))
        }
    };
    k256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
        .map_err(|e| CryptoError::InvalidKey(format!("secp256k1 SEC1 decode failed: {e}")))
}
