//! AEAD payload protection
//!
//! ChaCha20-Poly1305 is the default cipher; AES-256-GCM is selectable per
//! configuration. Both take a 32-byte key and a 12-byte nonce and produce
//! ciphertext with a 16-byte appended tag.

use aes_gcm::Aes256Gcm;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::ChaCha20Poly1305;
use serde::{Deserialize, Serialize};

use crate::error::CryptoError;
use crate::Result;

/// AEAD key length in bytes.
pub const AEAD_KEY_LEN: usize = 32;

/// AEAD nonce length in bytes.
pub const AEAD_NONCE_LEN: usize = 12;

/// Selectable AEAD cipher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AeadAlgorithm {
    /// ChaCha20-Poly1305 (default)
    ChaCha20Poly1305,
    /// AES-256-GCM
    Aes256Gcm,
}

impl Default for AeadAlgorithm {
    fn default() -> Self {
        AeadAlgorithm::ChaCha20Poly1305
    }
}

/// Seal `plaintext` under `key`/`nonce` binding `aad`.
pub fn aead_seal(
    algorithm: AeadAlgorithm,
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    check_lengths(key, nonce)?;
    let payload = Payload { msg: plaintext, aad };
    match algorithm {
        AeadAlgorithm::ChaCha20Poly1305 => {
            let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(|_| CryptoError::Aead)?;
            cipher
                .encrypt(chacha20poly1305::Nonce::from_slice(nonce), payload)
                .map_err(|_| CryptoError::Aead)
        }
        AeadAlgorithm::Aes256Gcm => {
            let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::Aead)?;
            cipher
                .encrypt(aes_gcm::Nonce::from_slice(nonce), payload)
                .map_err(|_| CryptoError::Aead)
        }
    }
}

/// Open `ciphertext`; fails on any key, nonce, aad or ciphertext mismatch.
pub fn aead_open(
    algorithm: AeadAlgorithm,
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    check_lengths(key, nonce)?;
    let payload = Payload { msg: ciphertext, aad };
    match algorithm {
        AeadAlgorithm::ChaCha20Poly1305 => {
            let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(|_| CryptoError::Aead)?;
            cipher
                .decrypt(chacha20poly1305::Nonce::from_slice(nonce), payload)
                .map_err(|_| CryptoError::Aead)
        }
        AeadAlgorithm::Aes256Gcm => {
            let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::Aead)?;
            cipher
                .decrypt(aes_gcm::Nonce::from_slice(nonce), payload)
                .map_err(|_| CryptoError::Aead)
        }
    }
}

fn check_lengths(key: &[u8], nonce: &[u8]) -> Result<()> {
    if key.len() != AEAD_KEY_LEN {
        return Err(CryptoError::InvalidKey(format!(
            "AEAD key must be {AEAD_KEY_LEN} bytes, got {}",
            key.len()
        )));
    }
    if nonce.len() != AEAD_NONCE_LEN {
        return Err(CryptoError::Aead);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip_both_ciphers() {
        for alg in [AeadAlgorithm::ChaCha20Poly1305, AeadAlgorithm::Aes256Gcm] {
            let key = [42u8; 32];
            let nonce = [7u8; 12];
            let ct = aead_seal(alg, &key, &nonce, b"aad", b"plaintext").unwrap();
            let pt = aead_open(alg, &key, &nonce, b"aad", &ct).unwrap();
            assert_eq!(pt, b"plaintext");
        }
    }

    #[test]
    fn test_aad_binding() {
        let key = [42u8; 32];
        let nonce = [7u8; 12];
        let ct = aead_seal(AeadAlgorithm::ChaCha20Poly1305, &key, &nonce, b"aad", b"pt").unwrap();
        assert!(aead_open(AeadAlgorithm::ChaCha20Poly1305, &key, &nonce, b"other", &ct).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let key = [42u8; 32];
        let nonce = [7u8; 12];
        let mut ct =
            aead_seal(AeadAlgorithm::ChaCha20Poly1305, &key, &nonce, b"aad", b"pt").unwrap();
        ct[0] ^= 0x01;
        assert!(aead_open(AeadAlgorithm::ChaCha20Poly1305, &key, &nonce, b"aad", &ct).is_err());
    }

    #[test]
    fn test_key_length_enforced() {
        let nonce = [7u8; 12];
        assert!(aead_seal(AeadAlgorithm::Aes256Gcm, &[0u8; 16], &nonce, b"", b"pt").is_err());
    }

    #[test]
    fn test_ciphers_are_incompatible() {
        let key = [42u8; 32];
        let nonce = [7u8; 12];
        let ct = aead_seal(AeadAlgorithm::ChaCha20Poly1305, &key, &nonce, b"", b"pt").unwrap();
        assert!(aead_open(AeadAlgorithm::Aes256Gcm, &key, &nonce, b"", &ct).is_err());
    }
}
