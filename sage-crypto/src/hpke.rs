//! HPKE (RFC 9180) with DHKEM(X25519, HKDF-SHA256)
//!
//! SAGE only consumes the exporter interface of HPKE: the handshake
//! encapsulates to the initiator's ephemeral KEM key, both sides run the
//! base-mode key schedule, and every session secret is pulled out of
//! `Export`. The AEAD half of the HPKE context is intentionally not
//! exposed; payload protection uses the session layer's own key schedule.
//!
//! Suite: KEM 0x0020, KDF 0x0001 (HKDF-SHA256), AEAD 0x0003
//! (ChaCha20-Poly1305), giving the labeled-extract/expand suite ids
//! `"KEM" || 0x0020` and `"HPKE" || 0x0020 || 0x0001 || 0x0003`.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;
use crate::keys::{PrivateKey, PublicKey};
use crate::x25519;
use crate::Result;

/// RFC 9180 version label.
const HPKE_VERSION_LABEL: &[u8] = b"HPKE-v1";

/// Suite id for KEM-level labeled operations: "KEM" || I2OSP(0x0020, 2).
const KEM_SUITE_ID: &[u8] = &[b'K', b'E', b'M', 0x00, 0x20];

/// Suite id for scheme-level labeled operations:
/// "HPKE" || kem_id || kdf_id || aead_id.
const HPKE_SUITE_ID: &[u8] = &[b'H', b'P', b'K', b'E', 0x00, 0x20, 0x00, 0x01, 0x00, 0x03];

/// Base mode identifier.
const MODE_BASE: u8 = 0x00;

/// Exporter secret length (Nh of HKDF-SHA256).
pub const EXPORTER_SECRET_LEN: usize = 32;

/// Serialized KEM ciphertext: the sender's ephemeral X25519 public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncappedKey(pub [u8; 32]);

impl EncappedKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            CryptoError::Kem(format!("encapped key must be 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }
}

/// HPKE exporter secret. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ExporterSecret([u8; EXPORTER_SECRET_LEN]);

impl ExporterSecret {
    /// `Export(exporter_context, L)` per RFC 9180 §5.3.
    pub fn export(&self, exporter_context: &[u8], output_len: usize) -> Result<Vec<u8>> {
        labeled_expand(HPKE_SUITE_ID, &self.0, b"sec", exporter_context, output_len)
    }

    /// `Export(exporter_context, 32)` into a fixed-size zeroizing secret.
    ///
    /// All keying material consumers pull from this interface; the internal
    /// exporter secret itself never leaves this module.
    pub fn export_secret(&self, exporter_context: &[u8]) -> Result<ExportedSecret> {
        let mut okm = self.export(exporter_context, EXPORTER_SECRET_LEN)?;
        let mut out = [0u8; EXPORTER_SECRET_LEN];
        out.copy_from_slice(&okm);
        okm.zeroize();
        Ok(ExportedSecret(out))
    }
}

impl std::fmt::Debug for ExporterSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print secret material
        f.write_str("ExporterSecret(..)")
    }
}

/// A 32-byte secret produced through the exporter interface. Zeroized on
/// drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ExportedSecret([u8; EXPORTER_SECRET_LEN]);

impl ExportedSecret {
    pub fn as_bytes(&self) -> &[u8; EXPORTER_SECRET_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for ExportedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print secret material
        f.write_str("ExportedSecret(..)")
    }
}

/// Encapsulate to `recipient_pk` (must be X25519) and run the base-mode key
/// schedule over `info`, returning the KEM ciphertext and exporter secret.
pub fn kem_encap(recipient_pk: &PublicKey, info: &[u8]) -> Result<(EncappedKey, ExporterSecret)> {
    let pk_r = match recipient_pk {
        PublicKey::X25519(pk) => pk,
        other => {
            return Err(CryptoError::Kem(format!(
                "KEM requires an X25519 key, got {}",
                other.key_type()
            )))
        }
    };

    let ephemeral = x25519::generate();
    let pk_e = x25519_dalek::PublicKey::from(&ephemeral);

    let dh = x25519::diffie_hellman(&ephemeral, pk_r)?;
    let enc = EncappedKey(*pk_e.as_bytes());
    let shared_secret = extract_and_expand(&dh, enc.as_bytes(), pk_r.as_bytes())?;
    let exporter = key_schedule_base(&shared_secret, info)?;
    Ok((enc, exporter))
}

/// Decapsulate `enc` with the recipient's X25519 private key and run the
/// same key schedule, yielding the sender's exporter secret.
pub fn kem_decap(
    enc: &EncappedKey,
    recipient_sk: &PrivateKey,
    info: &[u8],
) -> Result<ExporterSecret> {
    let sk_r = match recipient_sk {
        PrivateKey::X25519(sk) => sk,
        other => {
            return Err(CryptoError::Kem(format!(
                "KEM requires an X25519 key, got {}",
                other.key_type()
            )))
        }
    };

    let pk_e = x25519_dalek::PublicKey::from(enc.0);
    let pk_r = x25519_dalek::PublicKey::from(sk_r);

    let dh = x25519::diffie_hellman(sk_r, &pk_e)?;
    let shared_secret = extract_and_expand(&dh, enc.as_bytes(), pk_r.as_bytes())?;
    key_schedule_base(&shared_secret, info)
}

/// DHKEM ExtractAndExpand (RFC 9180 §4.1).
fn extract_and_expand(dh: &[u8; 32], enc: &[u8], pk_r: &[u8]) -> Result<[u8; 32]> {
    let eae_prk = labeled_extract(KEM_SUITE_ID, b"", b"eae_prk", dh);

    let mut kem_context = Vec::with_capacity(64);
    kem_context.extend_from_slice(enc);
    kem_context.extend_from_slice(pk_r);

    let okm = labeled_expand(KEM_SUITE_ID, &eae_prk, b"shared_secret", &kem_context, 32)?;
    let mut shared = [0u8; 32];
    shared.copy_from_slice(&okm);
    Ok(shared)
}

/// Base-mode KeySchedule (RFC 9180 §5.1), reduced to the exporter secret.
fn key_schedule_base(shared_secret: &[u8; 32], info: &[u8]) -> Result<ExporterSecret> {
    let psk_id_hash = labeled_extract(HPKE_SUITE_ID, b"", b"psk_id_hash", b"");
    let info_hash = labeled_extract(HPKE_SUITE_ID, b"", b"info_hash", info);

    let mut context = Vec::with_capacity(1 + psk_id_hash.len() + info_hash.len());
    context.push(MODE_BASE);
    context.extend_from_slice(&psk_id_hash);
    context.extend_from_slice(&info_hash);

    let secret = labeled_extract(HPKE_SUITE_ID, shared_secret, b"secret", b"");
    let okm = labeled_expand(HPKE_SUITE_ID, &secret, b"exp", &context, EXPORTER_SECRET_LEN)?;

    let mut exporter = [0u8; EXPORTER_SECRET_LEN];
    exporter.copy_from_slice(&okm);
    Ok(ExporterSecret(exporter))
}

/// LabeledExtract (RFC 9180 §4).
fn labeled_extract(suite_id: &[u8], salt: &[u8], label: &[u8], ikm: &[u8]) -> [u8; 32] {
    let mut labeled_ikm =
        Vec::with_capacity(HPKE_VERSION_LABEL.len() + suite_id.len() + label.len() + ikm.len());
    labeled_ikm.extend_from_slice(HPKE_VERSION_LABEL);
    labeled_ikm.extend_from_slice(suite_id);
    labeled_ikm.extend_from_slice(label);
    labeled_ikm.extend_from_slice(ikm);

    let salt = if salt.is_empty() { None } else { Some(salt) };
    let (prk, _) = Hkdf::<Sha256>::extract(salt, &labeled_ikm);
    prk.into()
}

/// LabeledExpand (RFC 9180 §4).
fn labeled_expand(
    suite_id: &[u8],
    prk: &[u8],
    label: &[u8],
    info: &[u8],
    output_len: usize,
) -> Result<Vec<u8>> {
    let mut labeled_info = Vec::with_capacity(
        2 + HPKE_VERSION_LABEL.len() + suite_id.len() + label.len() + info.len(),
    );
    labeled_info.extend_from_slice(&(output_len as u16).to_be_bytes());
    labeled_info.extend_from_slice(HPKE_VERSION_LABEL);
    labeled_info.extend_from_slice(suite_id);
    labeled_info.extend_from_slice(label);
    labeled_info.extend_from_slice(info);

    let hk = Hkdf::<Sha256>::from_prk(prk)
        .map_err(|_| CryptoError::KeyDerivation("invalid PRK length".to_string()))?;
    let mut output = vec![0u8; output_len];
    hk.expand(&labeled_info, &mut output)
        .map_err(|_| CryptoError::KeyDerivation(format!("output length {output_len} too long")))?;
    Ok(output)
}
