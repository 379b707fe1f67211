//! CSPRNG helpers
//!
//! All randomness in SAGE flows through the operating system RNG.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;

/// Entropy carried by a generated nonce string, in bytes.
const NONCE_ENTROPY_BYTES: usize = 16;

/// Generate a URL-safe replay nonce: 16 random bytes (128 bits) encoded as
/// a 22-character unpadded base64url string.
pub fn generate_nonce_string() -> String {
    let mut bytes = [0u8; NONCE_ENTROPY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Fill a fresh vector with `len` random bytes.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Fill a fixed-size array with random bytes.
pub fn random_array<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}
