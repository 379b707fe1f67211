//! Message signing
//!
//! Builds the canonical base over the message's covered components and
//! emits the detached `Signature` / `Signature-Input` header pair.

use sage_crypto::{KeyPair, SignatureAlgorithm};

use super::base::{build_signature_base, SignatureParams};
use super::headers::{
    format_signature_header, format_signature_input_header, SignedHeaders,
    DEFAULT_SIGNATURE_LABEL,
};
use crate::error::{Result, SageError};
use crate::message::{CanonicalMessage, Component};

/// Signs canonical messages with one long-term key pair.
pub struct MessageSigner {
    keypair: KeyPair,
    keyid: String,
    algorithm: SignatureAlgorithm,
    ethereum_prefixed: bool,
}

impl MessageSigner {
    /// Create a signer. Fails for non-signing (X25519) key pairs.
    pub fn new(keypair: KeyPair, keyid: impl Into<String>) -> Result<Self> {
        let algorithm = keypair.signature_algorithm()?;
        Ok(Self {
            keypair,
            keyid: keyid.into(),
            algorithm,
            ethereum_prefixed: false,
        })
    }

    /// Configure the signer as Ethereum-facing: secp256k1 signatures use
    /// the `"\x19Ethereum Signed Message:\n32"` prefix. Rejected for other
    /// key families.
    pub fn ethereum_prefixed(mut self) -> Result<Self> {
        if self.algorithm != SignatureAlgorithm::Es256K {
            return Err(SageError::KeyTypeMismatch {
                expected: SignatureAlgorithm::Es256K.wire_name().to_string(),
                got: self.algorithm.wire_name().to_string(),
            });
        }
        self.ethereum_prefixed = true;
        Ok(self)
    }

    /// Signature algorithm this signer produces.
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Key identifier carried in emitted headers.
    pub fn keyid(&self) -> &str {
        &self.keyid
    }

    /// Sign `message` over its `signed_fields`.
    ///
    /// The message's own `timestamp` and `nonce` become the `created` and
    /// `nonce` signature parameters. The message's declared algorithm must
    /// match this signer's key.
    pub fn sign(&self, message: &CanonicalMessage) -> Result<SignedHeaders> {
        if message.algorithm != self.algorithm {
            return Err(SageError::KeyTypeMismatch {
                expected: message.algorithm.wire_name().to_string(),
                got: self.algorithm.wire_name().to_string(),
            });
        }

        let params = SignatureParams {
            keyid: self.keyid.clone(),
            alg: self.algorithm,
            created: message.timestamp,
            nonce: message.nonce.clone(),
            expires: None,
        };

        let covered = &message.signed_fields;
        let base = build_signature_base(message, covered, &params)?;

        let signature = if self.ethereum_prefixed {
            self.keypair.sign_ethereum_prefixed(&base)?
        } else {
            self.keypair.sign(&base)?
        };

        let content_digest = covered
            .contains(&Component::ContentDigest)
            .then(|| message.content_digest());

        Ok(SignedHeaders {
            signature: format_signature_header(DEFAULT_SIGNATURE_LABEL, &signature),
            signature_input: format_signature_input_header(
                DEFAULT_SIGNATURE_LABEL,
                covered,
                &params,
            ),
            content_digest,
        })
    }
}
