//! Transcript binding
//!
//! The info hash binds both DIDs, the protocol label and the initiator's
//! ephemeral KEM share; it doubles as the HPKE key-schedule info string so
//! tampering any bound component diverges the exporter. The exporter
//! secret `ES` is pulled out of the HPKE `Export` interface under the
//! `"sage/v1/exporter"` context and keys both the ack MAC and the session
//! key schedule; the ack tag proves the responder derived the same `ES`.

use sage_crypto::{hmac_sha256, ExportedSecret, ExporterSecret};
use sage_did::Did;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Domain label bound into every handshake transcript.
pub const PROTOCOL_LABEL: &[u8] = b"sage/v1/handshake";

/// HPKE exporter context for session keying material.
pub const EXPORTER_CONTEXT: &[u8] = b"sage/v1/exporter";

/// HMAC label for the responder's acknowledgement tag.
pub const ACK_LABEL: &[u8] = b"sage/v1/ack";

/// HMAC label for the initiator's optional ack confirmation.
pub const ACK_CONFIRM_LABEL: &[u8] = b"sage/v1/ack-confirm";

/// Exporter output length used for the ack MAC key.
pub const EXPORTER_LEN: usize = 32;

/// `SHA-256(i_did || r_did || protocol_label || i_ephemeral_kem_pk)`.
pub fn info_hash(initiator: &Did, responder: &Did, initiator_kem_pk: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(initiator.to_string().as_bytes());
    hasher.update(responder.to_string().as_bytes());
    hasher.update(PROTOCOL_LABEL);
    hasher.update(initiator_kem_pk);
    hasher.finalize().into()
}

/// `ES = HPKE.Export("sage/v1/exporter", 32)`: the handshake's keying
/// secret, derived once per handshake from the HPKE context.
pub fn exporter_secret(exporter: &ExporterSecret) -> Result<ExportedSecret> {
    Ok(exporter.export_secret(EXPORTER_CONTEXT)?)
}

/// `HMAC(ES, "sage/v1/ack" || info_hash || enc)`: proves possession of the
/// exporter secret bound to this transcript and KEM ciphertext.
pub fn ack_tag(es: &ExportedSecret, info_hash: &[u8; 32], enc: &[u8]) -> [u8; 32] {
    hmac_sha256(es.as_bytes(), &[ACK_LABEL, info_hash, enc])
}

/// Initiator's confirmation over the responder's ack tag.
pub fn ack_confirmation(es: &ExportedSecret, ack_tag: &[u8; 32]) -> [u8; 32] {
    hmac_sha256(es.as_bytes(), &[ACK_CONFIRM_LABEL, ack_tag])
}
