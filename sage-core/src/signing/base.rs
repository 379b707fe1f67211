//! Canonical signature base construction
//!
//! The base is the byte string actually signed: one line per covered
//! component in covered-list order, terminated by the `@signature-params`
//! line. Reconstruction on the verifier side must be byte-for-byte
//! identical, so all serialization here is single-sourced.

use sage_crypto::SignatureAlgorithm;

use crate::error::{Result, SageError};
use crate::message::{CanonicalMessage, Component};

/// Signature metadata carried in `Signature-Input` and bound into the base
/// through the `@signature-params` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParams {
    /// Key identifier; by convention the signer DID, optionally with a
    /// `#fragment` naming the key.
    pub keyid: String,
    /// Declared signature algorithm.
    pub alg: SignatureAlgorithm,
    /// Unix-seconds creation time.
    pub created: u64,
    /// Replay nonce covered by the signature.
    pub nonce: String,
    /// Optional expiry (unix seconds).
    pub expires: Option<u64>,
}

impl SignatureParams {
    /// Serialize the inner list plus parameters:
    /// `("c1" "c2");keyid="…";alg="…";created=…;nonce="…"[;expires=…]`.
    ///
    /// This exact string is used both as the `Signature-Input` header value
    /// (after the label) and as the `@signature-params` line of the base.
    pub fn serialize_with_components(&self, covered: &[Component]) -> String {
        let list = covered
            .iter()
            .map(|c| format!("\"{}\"", c.identifier()))
            .collect::<Vec<_>>()
            .join(" ");

        let mut out = format!(
            "({list});keyid=\"{}\";alg=\"{}\";created={};nonce=\"{}\"",
            self.keyid,
            self.alg.wire_name(),
            self.created,
            self.nonce
        );
        if let Some(expires) = self.expires {
            out.push_str(&format!(";expires={expires}"));
        }
        out
    }
}

/// Reject covered lists that fail the minimum-coverage rule: `nonce` must
/// be covered, together with a freshness component (`timestamp` in the
/// covered list, or the `created` parameter).
pub fn ensure_minimum_coverage(covered: &[Component], params: &SignatureParams) -> Result<()> {
    if !covered.contains(&Component::Nonce) {
        return Err(SageError::MalformedSignatureInput(
            "covered components must include nonce".to_string(),
        ));
    }
    if !covered.contains(&Component::Timestamp) && params.created == 0 {
        return Err(SageError::MalformedSignatureInput(
            "covered components must include timestamp or a created parameter".to_string(),
        ));
    }
    Ok(())
}

/// Build the canonical signature base for `covered` over `message`.
///
/// Duplicate components are rejected; every component must resolve to a
/// value on this message.
pub fn build_signature_base(
    message: &CanonicalMessage,
    covered: &[Component],
    params: &SignatureParams,
) -> Result<Vec<u8>> {
    ensure_minimum_coverage(covered, params)?;

    let mut lines = Vec::with_capacity(covered.len() + 1);
    for (i, component) in covered.iter().enumerate() {
        if covered[..i].contains(component) {
            return Err(SageError::MalformedSignatureInput(format!(
                "duplicate covered component: {component}"
            )));
        }
        let value = message.component_value(component)?;
        lines.push(format!("\"{}\": {}", component.identifier(), value));
    }
    lines.push(format!(
        "\"@signature-params\": {}",
        params.serialize_with_components(covered)
    ));

    Ok(lines.join("\n").into_bytes())
}
