//! Key type definitions and algorithm dispatch
//!
//! Models the adapter's polymorphism over key types as exhaustive sum types
//! instead of trait objects. Every operation dispatches with an explicit
//! `match`, so adding an algorithm family is a compile-time checklist.

use serde::{Deserialize, Serialize};

use crate::ecdsa;
use crate::ed25519;
use crate::error::CryptoError;
use crate::x25519;
use crate::Result;

/// Supported key algorithm families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// EdDSA over edwards25519 (signing)
    Ed25519,
    /// ECDSA over NIST P-256 (signing)
    EcdsaP256,
    /// ECDSA over secp256k1, Ethereum-compatible encoding (signing)
    EcdsaSecp256k1,
    /// X25519 Diffie-Hellman (key encapsulation only)
    X25519,
}

impl KeyType {
    /// Whether this family can produce signatures.
    pub fn supports_signing(&self) -> bool {
        !matches!(self, KeyType::X25519)
    }

    /// Stable lowercase name used in logs and registry records.
    pub fn name(&self) -> &'static str {
        match self {
            KeyType::Ed25519 => "ed25519",
            KeyType::EcdsaP256 => "ecdsa-p256",
            KeyType::EcdsaSecp256k1 => "ecdsa-secp256k1",
            KeyType::X25519 => "x25519",
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Signature algorithm identifiers as they appear in `Signature-Input`
/// headers (`alg="..."` parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// EdDSA over edwards25519 (`ed25519`)
    Ed25519,
    /// ECDSA over P-256 with SHA-256 (`es256`)
    Es256,
    /// ECDSA over secp256k1 with SHA-256 (`es256k`)
    Es256K,
}

impl SignatureAlgorithm {
    /// Wire identifier carried in the `alg` signature parameter.
    pub fn wire_name(&self) -> &'static str {
        match self {
            SignatureAlgorithm::Ed25519 => "ed25519",
            SignatureAlgorithm::Es256 => "es256",
            SignatureAlgorithm::Es256K => "es256k",
        }
    }

    /// Parse a wire identifier.
    pub fn from_wire_name(name: &str) -> Result<Self> {
        match name {
            "ed25519" => Ok(SignatureAlgorithm::Ed25519),
            "es256" => Ok(SignatureAlgorithm::Es256),
            "es256k" => Ok(SignatureAlgorithm::Es256K),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    /// Key family that produces this signature algorithm.
    pub fn key_type(&self) -> KeyType {
        match self {
            SignatureAlgorithm::Ed25519 => KeyType::Ed25519,
            SignatureAlgorithm::Es256 => KeyType::EcdsaP256,
            SignatureAlgorithm::Es256K => KeyType::EcdsaSecp256k1,
        }
    }

    /// Raw signature length in bytes.
    ///
    /// Ed25519 and fixed-encoding P-256 are 64 bytes; secp256k1 carries a
    /// trailing recovery byte (`v` in {27, 28}) for 65 bytes total.
    pub fn signature_len(&self) -> usize {
        match self {
            SignatureAlgorithm::Ed25519 => 64,
            SignatureAlgorithm::Es256 => 64,
            SignatureAlgorithm::Es256K => 65,
        }
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

// ============================================================================
// Public Keys
// ============================================================================

/// Public key, tagged by algorithm family.
#[derive(Debug, Clone)]
pub enum PublicKey {
    Ed25519(ed25519_dalek::VerifyingKey),
    EcdsaP256(p256::ecdsa::VerifyingKey),
    EcdsaSecp256k1(k256::ecdsa::VerifyingKey),
    X25519(x25519_dalek::PublicKey),
}

impl PublicKey {
    /// Algorithm family of this key.
    pub fn key_type(&self) -> KeyType {
        match self {
            PublicKey::Ed25519(_) => KeyType::Ed25519,
            PublicKey::EcdsaP256(_) => KeyType::EcdsaP256,
            PublicKey::EcdsaSecp256k1(_) => KeyType::EcdsaSecp256k1,
            PublicKey::X25519(_) => KeyType::X25519,
        }
    }

    /// Marshal to the family's raw encoding.
    ///
    /// - Ed25519: 32 bytes raw
    /// - P-256: 65-byte SEC1 uncompressed (`0x04 || X || Y`)
    /// - secp256k1: 64-byte `X || Y` (no prefix); see
    ///   [`PublicKey::to_onchain_bytes`] for the `0x04`-prefixed form
    /// - X25519: 32 bytes raw
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            PublicKey::Ed25519(vk) => vk.to_bytes().to_vec(),
            PublicKey::EcdsaP256(vk) => ecdsa::marshal_p256(vk),
            PublicKey::EcdsaSecp256k1(vk) => ecdsa::marshal_secp256k1(vk),
            PublicKey::X25519(pk) => pk.as_bytes().to_vec(),
        }
    }

    /// 65-byte `0x04 || X || Y` encoding for on-chain registry use.
    ///
    /// Only defined for secp256k1 keys.
    pub fn to_onchain_bytes(&self) -> Result<Vec<u8>> {
        match self {
            PublicKey::EcdsaSecp256k1(vk) => Ok(ecdsa::marshal_secp256k1_prefixed(vk)),
            other => Err(CryptoError::UnsupportedAlgorithm(format!(
                "on-chain encoding is secp256k1-only, got {}",
                other.key_type()
            ))),
        }
    }

    /// Unmarshal from the family's raw encoding.
    ///
    /// secp256k1 and P-256 accept SEC1 compressed (33 B), uncompressed
    /// (65 B) and, for secp256k1, the bare 64-byte `X || Y` form.
    pub fn from_bytes(key_type: KeyType, bytes: &[u8]) -> Result<Self> {
        match key_type {
            KeyType::Ed25519 => ed25519::public_from_bytes(bytes).map(PublicKey::Ed25519),
            KeyType::EcdsaP256 => ecdsa::p256_from_bytes(bytes).map(PublicKey::EcdsaP256),
            KeyType::EcdsaSecp256k1 => {
                ecdsa::secp256k1_from_bytes(bytes).map(PublicKey::EcdsaSecp256k1)
            }
            KeyType::X25519 => x25519::public_from_bytes(bytes).map(PublicKey::X25519),
        }
    }

    /// Verify a raw signature over `message`.
    ///
    /// ECDSA families hash the message with SHA-256 first; Ed25519 consumes
    /// the raw bytes. For Ethereum-facing secp256k1 signers use
    /// [`PublicKey::verify_ethereum_prefixed`].
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        match self {
            PublicKey::Ed25519(vk) => ed25519::verify(vk, message, signature),
            PublicKey::EcdsaP256(vk) => ecdsa::verify_p256(vk, message, signature),
            PublicKey::EcdsaSecp256k1(vk) => {
                ecdsa::verify_secp256k1(vk, message, signature, false)
            }
            PublicKey::X25519(_) => Err(CryptoError::UnsupportedAlgorithm(
                "X25519 keys cannot verify signatures".to_string(),
            )),
        }
    }

    /// Verify a secp256k1 signature produced with the Ethereum
    /// `"\x19Ethereum Signed Message:\n32"` prefix.
    pub fn verify_ethereum_prefixed(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        match self {
            PublicKey::EcdsaSecp256k1(vk) => ecdsa::verify_secp256k1(vk, message, signature, true),
            other => Err(CryptoError::UnsupportedAlgorithm(format!(
                "Ethereum-prefixed verification is secp256k1-only, got {}",
                other.key_type()
            ))),
        }
    }
}

// ============================================================================
// Private Keys
// ============================================================================

/// Private key, tagged by algorithm family.
///
/// All wrapped key types zeroize their secret material on drop (dalek and
/// RustCrypto secret scalars both carry drop-time wiping).
#[derive(Clone)]
pub enum PrivateKey {
    Ed25519(ed25519_dalek::SigningKey),
    EcdsaP256(p256::ecdsa::SigningKey),
    EcdsaSecp256k1(k256::ecdsa::SigningKey),
    X25519(x25519_dalek::StaticSecret),
}

impl PrivateKey {
    /// Algorithm family of this key.
    pub fn key_type(&self) -> KeyType {
        match self {
            PrivateKey::Ed25519(_) => KeyType::Ed25519,
            PrivateKey::EcdsaP256(_) => KeyType::EcdsaP256,
            PrivateKey::EcdsaSecp256k1(_) => KeyType::EcdsaSecp256k1,
            PrivateKey::X25519(_) => KeyType::X25519,
        }
    }

    /// Derive the matching public key.
    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::Ed25519(sk) => PublicKey::Ed25519(sk.verifying_key()),
            PrivateKey::EcdsaP256(sk) => PublicKey::EcdsaP256(*sk.verifying_key()),
            PrivateKey::EcdsaSecp256k1(sk) => PublicKey::EcdsaSecp256k1(*sk.verifying_key()),
            PrivateKey::X25519(sk) => PublicKey::X25519(x25519_dalek::PublicKey::from(sk)),
        }
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print secret material
        f.debug_struct("PrivateKey")
            .field("key_type", &self.key_type())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Key Pairs
// ============================================================================

/// A public/private key pair of one algorithm family.
#[derive(Debug, Clone)]
pub struct KeyPair {
    public: PublicKey,
    private: PrivateKey,
}

impl KeyPair {
    /// Generate a fresh key pair from the OS CSPRNG.
    pub fn generate(key_type: KeyType) -> Result<Self> {
        let private = match key_type {
            KeyType::Ed25519 => PrivateKey::Ed25519(ed25519::generate()),
            KeyType::EcdsaP256 => PrivateKey::EcdsaP256(ecdsa::generate_p256()),
            KeyType::EcdsaSecp256k1 => PrivateKey::EcdsaSecp256k1(ecdsa::generate_secp256k1()),
            KeyType::X25519 => PrivateKey::X25519(x25519::generate()),
        };
        Ok(Self::from_private(private))
    }

    /// Wrap an existing private key.
    pub fn from_private(private: PrivateKey) -> Self {
        let public = private.public_key();
        Self { public, private }
    }

    /// Algorithm family of this pair.
    pub fn key_type(&self) -> KeyType {
        self.private.key_type()
    }

    /// Public half.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Private half.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }

    /// Signature algorithm this pair produces, if it can sign.
    pub fn signature_algorithm(&self) -> Result<SignatureAlgorithm> {
        match self.key_type() {
            KeyType::Ed25519 => Ok(SignatureAlgorithm::Ed25519),
            KeyType::EcdsaP256 => Ok(SignatureAlgorithm::Es256),
            KeyType::EcdsaSecp256k1 => Ok(SignatureAlgorithm::Es256K),
            KeyType::X25519 => Err(CryptoError::UnsupportedAlgorithm(
                "X25519 keys cannot sign".to_string(),
            )),
        }
    }

    /// Produce a raw signature over `message`.
    ///
    /// Output sizes: Ed25519 = 64 B, P-256 = 64 B fixed encoding,
    /// secp256k1 = 65 B `r || s || v` with `v` in {27, 28}.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        match &self.private {
            PrivateKey::Ed25519(sk) => Ok(ed25519::sign(sk, message)),
            PrivateKey::EcdsaP256(sk) => Ok(ecdsa::sign_p256(sk, message)),
            PrivateKey::EcdsaSecp256k1(sk) => ecdsa::sign_secp256k1(sk, message, false),
            PrivateKey::X25519(_) => Err(CryptoError::UnsupportedAlgorithm(
                "X25519 keys cannot sign".to_string(),
            )),
        }
    }

    /// Sign with the Ethereum `"\x19Ethereum Signed Message:\n32"` prefix.
    ///
    /// Only meaningful for secp256k1 signers that are explicitly configured
    /// Ethereum-facing.
    pub fn sign_ethereum_prefixed(&self, message: &[u8]) -> Result<Vec<u8>> {
        match &self.private {
            PrivateKey::EcdsaSecp256k1(sk) => ecdsa::sign_secp256k1(sk, message, true),
            other => Err(CryptoError::UnsupportedAlgorithm(format!(
                "Ethereum-prefixed signing is secp256k1-only, got {}",
                other.key_type()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_all_signing_families() {
        for key_type in [KeyType::Ed25519, KeyType::EcdsaP256, KeyType::EcdsaSecp256k1] {
            let pair = KeyPair::generate(key_type).unwrap();
            let sig = pair.sign(b"sage test message").unwrap();
            pair.public_key().verify(b"sage test message", &sig).unwrap();
        }
    }

    #[test]
    fn test_signature_sizes() {
        let ed = KeyPair::generate(KeyType::Ed25519).unwrap();
        assert_eq!(ed.sign(b"m").unwrap().len(), 64);

        let p = KeyPair::generate(KeyType::EcdsaP256).unwrap();
        assert_eq!(p.sign(b"m").unwrap().len(), 64);

        let k = KeyPair::generate(KeyType::EcdsaSecp256k1).unwrap();
        let sig = k.sign(b"m").unwrap();
        assert_eq!(sig.len(), 65);
        assert!(sig[64] == 27 || sig[64] == 28);
    }

    #[test]
    fn test_x25519_cannot_sign() {
        let pair = KeyPair::generate(KeyType::X25519).unwrap();
        assert!(matches!(
            pair.sign(b"m"),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_tampered_message_rejected() {
        let pair = KeyPair::generate(KeyType::Ed25519).unwrap();
        let sig = pair.sign(b"original").unwrap();
        assert!(pair.public_key().verify(b"tampered", &sig).is_err());
    }

    #[test]
    fn test_public_key_marshal_roundtrip() {
        for key_type in [
            KeyType::Ed25519,
            KeyType::EcdsaP256,
            KeyType::EcdsaSecp256k1,
            KeyType::X25519,
        ] {
            let pair = KeyPair::generate(key_type).unwrap();
            let bytes = pair.public_key().to_bytes();
            let restored = PublicKey::from_bytes(key_type, &bytes).unwrap();
            assert_eq!(restored.to_bytes(), bytes);
        }
    }

    #[test]
    fn test_secp256k1_encoding_lengths() {
        let pair = KeyPair::generate(KeyType::EcdsaSecp256k1).unwrap();
        assert_eq!(pair.public_key().to_bytes().len(), 64);
        let onchain = pair.public_key().to_onchain_bytes().unwrap();
        assert_eq!(onchain.len(), 65);
        assert_eq!(onchain[0], 0x04);
    }

    #[test]
    fn test_ethereum_prefixed_roundtrip() {
        let pair = KeyPair::generate(KeyType::EcdsaSecp256k1).unwrap();
        let sig = pair.sign_ethereum_prefixed(b"eth message").unwrap();
        pair.public_key()
            .verify_ethereum_prefixed(b"eth message", &sig)
            .unwrap();
        // A plain verify over the same bytes must fail: different digest
        assert!(pair.public_key().verify(b"eth message", &sig).is_err());
    }

    #[test]
    fn test_algorithm_wire_names() {
        assert_eq!(SignatureAlgorithm::Ed25519.wire_name(), "ed25519");
        assert_eq!(SignatureAlgorithm::Es256.wire_name(), "es256");
        assert_eq!(SignatureAlgorithm::Es256K.wire_name(), "es256k");
        assert!(SignatureAlgorithm::from_wire_name("rsa-pss").is_err());
    }
}
