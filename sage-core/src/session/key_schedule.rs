//! Session key schedule
//!
//! Expands the handshake's exporter output `ES` (the 32-byte result of
//! `HPKE.Export("sage/v1/exporter", 32)`) into directional AEAD keys, base
//! nonces and the session id. Every label is role-directional, so initiator
//! and responder derive mirrored send/recv pairs and a reflected frame can
//! never authenticate.

use sage_crypto::{hkdf_expand, ExportedSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::Result;

/// Initiator-to-responder AEAD key.
pub const LABEL_KEY_I2R: &str = "sage/v1/i→r/key";
/// Responder-to-initiator AEAD key.
pub const LABEL_KEY_R2I: &str = "sage/v1/r→i/key";
/// Initiator-to-responder base nonce.
pub const LABEL_NONCE_I2R: &str = "sage/v1/i→r/nonce";
/// Responder-to-initiator base nonce.
pub const LABEL_NONCE_R2I: &str = "sage/v1/r→i/nonce";
/// Session identifier.
pub const LABEL_SESSION_ID: &str = "sage/v1/sid";

/// The full material derived from one exporter output.
///
/// Zeroized on drop; consumed by [`crate::session::Session`] construction.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionKeySchedule {
    pub session_id: [u8; 16],
    pub key_i2r: [u8; 32],
    pub key_r2i: [u8; 32],
    pub nonce_i2r: [u8; 12],
    pub nonce_r2i: [u8; 12],
}

/// Derive the session key schedule from the exporter output `ES`.
pub fn derive_session_keys(es: &ExportedSecret) -> Result<SessionKeySchedule> {
    let prk = es.as_bytes();

    let mut schedule = SessionKeySchedule {
        session_id: [0u8; 16],
        key_i2r: [0u8; 32],
        key_r2i: [0u8; 32],
        nonce_i2r: [0u8; 12],
        nonce_r2i: [0u8; 12],
    };
    schedule
        .key_i2r
        .copy_from_slice(&hkdf_expand(prk, LABEL_KEY_I2R.as_bytes(), 32)?);
    schedule
        .key_r2i
        .copy_from_slice(&hkdf_expand(prk, LABEL_KEY_R2I.as_bytes(), 32)?);
    schedule
        .nonce_i2r
        .copy_from_slice(&hkdf_expand(prk, LABEL_NONCE_I2R.as_bytes(), 12)?);
    schedule
        .nonce_r2i
        .copy_from_slice(&hkdf_expand(prk, LABEL_NONCE_R2I.as_bytes(), 12)?);
    schedule
        .session_id
        .copy_from_slice(&hkdf_expand(prk, LABEL_SESSION_ID.as_bytes(), 16)?);
    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handshake::exporter_secret;
    use sage_crypto::{kem_decap, kem_encap, KeyPair, KeyType};

    fn exporter_pair() -> (ExportedSecret, ExportedSecret) {
        let recipient = KeyPair::generate(KeyType::X25519).unwrap();
        let (enc, sender) = kem_encap(recipient.public_key(), b"info").unwrap();
        let receiver = kem_decap(&enc, recipient.private_key(), b"info").unwrap();
        (
            exporter_secret(&sender).unwrap(),
            exporter_secret(&receiver).unwrap(),
        )
    }

    #[test]
    fn test_both_sides_derive_identical_schedule() {
        let (a, b) = exporter_pair();
        let sa = derive_session_keys(&a).unwrap();
        let sb = derive_session_keys(&b).unwrap();

        assert_eq!(sa.session_id, sb.session_id);
        assert_eq!(sa.key_i2r, sb.key_i2r);
        assert_eq!(sa.key_r2i, sb.key_r2i);
        assert_eq!(sa.nonce_i2r, sb.nonce_i2r);
        assert_eq!(sa.nonce_r2i, sb.nonce_r2i);
    }

    #[test]
    fn test_directional_keys_distinct() {
        let (a, _) = exporter_pair();
        let s = derive_session_keys(&a).unwrap();
        assert_ne!(s.key_i2r, s.key_r2i);
        assert_ne!(s.nonce_i2r, s.nonce_r2i);
    }

    #[test]
    fn test_different_exporters_different_sessions() {
        let (a, _) = exporter_pair();
        let (b, _) = exporter_pair();
        assert_ne!(
            derive_session_keys(&a).unwrap().session_id,
            derive_session_keys(&b).unwrap().session_id
        );
    }

    #[test]
    fn test_schedule_wipe_overwrites_key_material() {
        let (a, _) = exporter_pair();
        let mut schedule = derive_session_keys(&a).unwrap();
        assert!(schedule.key_i2r.iter().any(|b| *b != 0));

        // The owned buffers must actually read as zero after the wipe
        schedule.zeroize();
        assert_eq!(schedule.key_i2r, [0u8; 32]);
        assert_eq!(schedule.key_r2i, [0u8; 32]);
        assert_eq!(schedule.nonce_i2r, [0u8; 12]);
        assert_eq!(schedule.nonce_r2i, [0u8; 12]);
        assert_eq!(schedule.session_id, [0u8; 16]);
    }
}
