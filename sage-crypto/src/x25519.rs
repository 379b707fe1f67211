//! X25519 Diffie-Hellman key family
//!
//! KEM-only: these keys never sign. The DHKEM construction on top of this
//! module lives in [`crate::hpke`].

use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::error::CryptoError;
use crate::Result;

/// Generate a fresh X25519 secret from the OS CSPRNG.
pub fn generate() -> StaticSecret {
    StaticSecret::random_from_rng(OsRng)
}

/// Parse a 32-byte raw public key.
pub fn public_from_bytes(bytes: &[u8]) -> Result<PublicKey> {
    let arr: [u8; 32] = bytes.try_into().map_err(|_| {
        CryptoError::InvalidKey(format!("X25519 key must be 32 bytes, got {}", bytes.len()))
    })?;
    Ok(PublicKey::from(arr))
}

/// Restore a secret from its 32-byte scalar.
pub fn private_from_bytes(bytes: &[u8]) -> Result<StaticSecret> {
    let arr: [u8; 32] = bytes.try_into().map_err(|_| {
        CryptoError::InvalidKey(format!("X25519 secret must be 32 bytes, got {}", bytes.len()))
    })?;
    Ok(StaticSecret::from(arr))
}

/// Raw Diffie-Hellman. Rejects non-contributory (all-zero) shared secrets.
pub fn diffie_hellman(sk: &StaticSecret, pk: &PublicKey) -> Result<[u8; 32]> {
    let shared = sk.diffie_hellman(pk);
    if !shared.was_contributory() {
        return Err(CryptoError::Kem("non-contributory X25519 exchange".to_string()));
    }
    Ok(*shared.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dh_agreement() {
        let a = generate();
        let b = generate();
        let pk_a = PublicKey::from(&a);
        let pk_b = PublicKey::from(&b);

        let s1 = diffie_hellman(&a, &pk_b).unwrap();
        let s2 = diffie_hellman(&b, &pk_a).unwrap();
        assert_eq!(s1, s2);
    }

    #[test]
    fn test_low_order_point_rejected() {
        let a = generate();
        // The identity point forces an all-zero shared secret
        let identity = PublicKey::from([0u8; 32]);
        assert!(diffie_hellman(&a, &identity).is_err());
    }

    #[test]
    fn test_key_parse_length() {
        assert!(public_from_bytes(&[0u8; 16]).is_err());
        assert!(private_from_bytes(&[0u8; 33]).is_err());
    }
}
