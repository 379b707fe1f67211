//! HKDF key derivation and HMAC tagging
//!
//! All derivation in SAGE uses HKDF-SHA256; transcript tags (handshake ack,
//! DoS cookies) use HMAC-SHA256.

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::CryptoError;
use crate::Result;

type HmacSha256 = Hmac<Sha256>;

/// HKDF-Extract then HKDF-Expand in one step.
pub fn hkdf_extract_expand(
    salt: Option<&[u8]>,
    ikm: &[u8],
    info: &[u8],
    output_len: usize,
) -> Result<Vec<u8>> {
    let hk = Hkdf::<Sha256>::new(salt, ikm);
    let mut output = vec![0u8; output_len];
    hk.expand(info, &mut output)
        .map_err(|_| CryptoError::KeyDerivation(format!("output length {output_len} too long")))?;
    Ok(output)
}

/// HKDF-Expand from an existing 32-byte PRK.
pub fn hkdf_expand(prk: &[u8], info: &[u8], output_len: usize) -> Result<Vec<u8>> {
    let hk = Hkdf::<Sha256>::from_prk(prk)
        .map_err(|_| CryptoError::KeyDerivation("PRK must be at least 32 bytes".to_string()))?;
    let mut output = vec![0u8; output_len];
    hk.expand(info, &mut output)
        .map_err(|_| CryptoError::KeyDerivation(format!("output length {output_len} too long")))?;
    Ok(output)
}

/// HMAC-SHA256 over the concatenation of `parts`.
pub fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    for part in parts {
        mac.update(part);
    }
    mac.finalize().into_bytes().into()
}

/// Constant-time HMAC-SHA256 verification.
pub fn verify_hmac_sha256(key: &[u8], parts: &[&[u8]], tag: &[u8]) -> Result<()> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    for part in parts {
        mac.update(part);
    }
    mac.verify_slice(tag).map_err(|_| CryptoError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hkdf_deterministic() {
        let a = hkdf_extract_expand(None, b"ikm", b"info", 32).unwrap();
        let b = hkdf_extract_expand(None, b"ikm", b"info", 32).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_hkdf_info_separation() {
        let a = hkdf_extract_expand(None, b"ikm", b"info-a", 32).unwrap();
        let b = hkdf_extract_expand(None, b"ikm", b"info-b", 32).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_hkdf_expand_requires_prk_length() {
        assert!(hkdf_expand(b"short", b"info", 32).is_err());
        assert!(hkdf_expand(&[7u8; 32], b"info", 32).is_ok());
    }

    #[test]
    fn test_hmac_roundtrip() {
        let tag = hmac_sha256(b"key", &[b"part1", b"part2"]);
        verify_hmac_sha256(b"key", &[b"part1", b"part2"], &tag).unwrap();
        assert!(verify_hmac_sha256(b"key", &[b"part1", b"part3"], &tag).is_err());
        assert!(verify_hmac_sha256(b"other", &[b"part1", b"part2"], &tag).is_err());
    }

    #[test]
    fn test_hmac_multipart_equals_concat() {
        let split = hmac_sha256(b"k", &[b"ab", b"cd"]);
        let joined = hmac_sha256(b"k", &[b"abcd"]);
        assert_eq!(split, joined);
    }
}
