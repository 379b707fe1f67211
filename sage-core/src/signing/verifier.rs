//! Message verification
//!
//! Reconstructs the signature base from the received message and covered
//! list, resolves the signer's registered key through the DID resolver,
//! verifies the raw signature, and registers the nonce atomically so a
//! successful verification consumes the nonce.
//!
//! Failure sub-reasons are distinct internally (algorithm, base, raw,
//! digest, nonce replay) and collapse to one wire-visible code. A signature
//! that fails point verification is reported as a base mismatch: from the
//! verifier's side, a mutated covered component and a corrupted signature
//! over the true base are indistinguishable.

use std::sync::Arc;

use sage_crypto::{ct_eq_bytes, SignatureAlgorithm};
use sage_did::{Did, DidResolver};
use tracing::debug;

use super::base::build_signature_base;
use super::headers::{parse_signature_header, parse_signature_input, SignedHeaders};
use crate::config::SageConfig;
use crate::error::{Result, SageError, SignatureFailure};
use crate::message::{CanonicalMessage, Component};
use crate::replay::NonceManager;

/// Verifies RFC 9421 signatures against the DID registry.
pub struct MessageVerifier {
    resolver: Arc<dyn DidResolver>,
    nonces: Arc<NonceManager>,
    allowed_algorithms: Vec<SignatureAlgorithm>,
    ethereum_prefixed: bool,
}

impl MessageVerifier {
    pub fn new(
        resolver: Arc<dyn DidResolver>,
        nonces: Arc<NonceManager>,
        config: &SageConfig,
    ) -> Self {
        Self {
            resolver,
            nonces,
            allowed_algorithms: config.allowed_algorithms.clone(),
            ethereum_prefixed: false,
        }
    }

    /// Expect Ethereum-prefixed secp256k1 signatures from peers.
    pub fn ethereum_prefixed(mut self) -> Self {
        self.ethereum_prefixed = true;
        self
    }

    /// Shared nonce manager backing the replay cross-check.
    pub fn nonce_manager(&self) -> &Arc<NonceManager> {
        &self.nonces
    }

    /// Verify `headers` over `message`.
    ///
    /// On success the message's nonce is atomically registered as used; a
    /// second verification of the same message fails with a nonce replay.
    pub async fn verify(&self, message: &CanonicalMessage, headers: &SignedHeaders) -> Result<()> {
        // (1) Parse headers, matching labels
        let parsed = parse_signature_input(&headers.signature_input)?;
        let (sig_label, signature) = parse_signature_header(&headers.signature)?;
        if sig_label != parsed.label {
            return Err(SageError::MalformedSignatureInput(format!(
                "label mismatch: {} vs {}",
                sig_label, parsed.label
            )));
        }

        // (2) Declared algorithm must be allowed and match the message
        if !self.allowed_algorithms.contains(&parsed.params.alg) {
            debug!(alg = %parsed.params.alg, "algorithm not allowed");
            return Err(SageError::SignatureVerificationFailed(SignatureFailure::Algo));
        }
        if message.algorithm != parsed.params.alg {
            debug!("message algorithm disagrees with Signature-Input alg");
            return Err(SageError::SignatureVerificationFailed(SignatureFailure::Algo));
        }

        // (3) Reconstruct the base byte-for-byte from the covered list.
        // A covered component the message cannot produce means the message
        // no longer matches what was signed.
        let base = match build_signature_base(message, &parsed.covered, &parsed.params) {
            Ok(base) => base,
            Err(SageError::UnknownComponent(name)) => {
                debug!(component = %name, "covered component missing from message");
                return Err(SageError::SignatureVerificationFailed(SignatureFailure::Base));
            }
            Err(e) => return Err(e),
        };

        // (4) Resolve the signer's registered key of the declared family
        let signer_did = self.check_keyid(&parsed.params.keyid, &message.agent_did)?;
        let record = self.resolver.resolve(&signer_did).await?;
        if !record.active {
            return Err(SageError::InactiveAgent(signer_did.to_string()));
        }
        let public_key = record.public_key_of_type(parsed.params.alg.key_type())?;

        // (5) Raw signature: structural failures are Raw, point failures Base
        if signature.len() != parsed.params.alg.signature_len() {
            debug!(len = signature.len(), "signature has wrong length");
            return Err(SageError::SignatureVerificationFailed(SignatureFailure::Raw));
        }
        let verified = if self.ethereum_prefixed && parsed.params.alg == SignatureAlgorithm::Es256K
        {
            public_key.verify_ethereum_prefixed(&base, &signature)
        } else {
            public_key.verify(&base, &signature)
        };
        if verified.is_err() {
            debug!(did = %signer_did, "signature base mismatch");
            return Err(SageError::SignatureVerificationFailed(SignatureFailure::Base));
        }

        // (6) Register the nonce; replay fails the verification
        let scoped = format!("{}:{}", signer_did, message.nonce);
        match self.nonces.check_and_mark(&scoped) {
            Ok(()) => {}
            Err(SageError::NonceReplay) => {
                debug!(did = %signer_did, "nonce replayed");
                return Err(SageError::SignatureVerificationFailed(
                    SignatureFailure::NonceReplay,
                ));
            }
            Err(e) => return Err(e),
        }

        // (7) Covered content digest must match the body bit-exactly
        if parsed.covered.contains(&Component::ContentDigest) {
            let claimed = message.component_value(&Component::ContentDigest)?;
            let recomputed = message.content_digest();
            if !ct_eq_bytes(claimed.as_bytes(), recomputed.as_bytes()) {
                debug!("content digest does not match body");
                return Err(SageError::SignatureVerificationFailed(
                    SignatureFailure::Digest,
                ));
            }
        }

        Ok(())
    }

    /// When the keyid names a DID it must be the message's sender; opaque
    /// key labels fall back to the sender DID.
    fn check_keyid(&self, keyid: &str, agent_did: &Did) -> Result<Did> {
        if keyid.starts_with("did:") {
            let did_part = keyid.split('#').next().unwrap_or(keyid);
            let keyid_did: Did = did_part
                .parse()
                .map_err(|_| SageError::MalformedSignatureInput(format!("bad keyid DID: {keyid}")))?;
            if &keyid_did != agent_did {
                debug!(keyid = %keyid, sender = %agent_did, "keyid names a different DID");
                return Err(SageError::SignatureVerificationFailed(SignatureFailure::Base));
            }
            return Ok(keyid_did);
        }
        Ok(agent_did.clone())
    }
}
