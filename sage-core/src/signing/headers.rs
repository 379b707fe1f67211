//! Signature header encoding and parsing
//!
//! RFC 9421 structured-field syntax, restricted to the subset SAGE emits:
//! one labeled byte sequence in `Signature`, one labeled inner list with
//! string/integer parameters in `Signature-Input`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sage_crypto::SignatureAlgorithm;

use super::base::SignatureParams;
use crate::error::{Result, SageError};
use crate::message::Component;

/// Label SAGE assigns to its signature entry.
pub const DEFAULT_SIGNATURE_LABEL: &str = "sig1";

/// The header set produced by signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// `Signature` header value.
    pub signature: String,
    /// `Signature-Input` header value.
    pub signature_input: String,
    /// `Content-Digest` header value, present when the digest is covered.
    pub content_digest: Option<String>,
}

/// Decoded `Signature-Input` entry.
#[derive(Debug, Clone)]
pub struct ParsedSignatureInput {
    pub label: String,
    pub covered: Vec<Component>,
    pub params: SignatureParams,
}

/// `<label>=:<base64(sig)>:`
pub fn format_signature_header(label: &str, signature: &[u8]) -> String {
    format!("{label}=:{}:", BASE64.encode(signature))
}

/// `<label>=(<covered>);keyid="…";alg="…";created=…;nonce="…"`
pub fn format_signature_input_header(
    label: &str,
    covered: &[Component],
    params: &SignatureParams,
) -> String {
    format!("{label}={}", params.serialize_with_components(covered))
}

/// Parse a `Signature` header into its label and raw signature bytes.
pub fn parse_signature_header(value: &str) -> Result<(String, Vec<u8>)> {
    let (label, rest) = value
        .split_once('=')
        .ok_or_else(|| malformed("missing '=' in Signature header"))?;

    let encoded = rest
        .strip_prefix(':')
        .and_then(|r| r.strip_suffix(':'))
        .ok_or_else(|| malformed("Signature value must be a :base64: byte sequence"))?;

    let bytes = BASE64
        .decode(encoded)
        .map_err(|_| malformed("invalid base64 in Signature header"))?;
    Ok((label.trim().to_string(), bytes))
}

/// Parse a `Signature-Input` header entry.
pub fn parse_signature_input(value: &str) -> Result<ParsedSignatureInput> {
    let (label, rest) = value
        .split_once('=')
        .ok_or_else(|| malformed("missing '=' in Signature-Input header"))?;
    let label = label.trim().to_string();

    let rest = rest.trim();
    if !rest.starts_with('(') {
        return Err(malformed("covered component list must start with '('"));
    }
    let close = rest
        .find(')')
        .ok_or_else(|| malformed("unterminated covered component list"))?;

    let covered = parse_covered_list(&rest[1..close])?;
    let params = parse_params(&rest[close + 1..])?;

    Ok(ParsedSignatureInput { label, covered, params })
}

fn parse_covered_list(list: &str) -> Result<Vec<Component>> {
    let mut covered = Vec::new();
    for token in list.split_whitespace() {
        let name = token
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .ok_or_else(|| malformed("covered components must be quoted"))?;
        covered.push(Component::parse(name)?);
    }
    if covered.is_empty() {
        return Err(malformed("empty covered component list"));
    }
    Ok(covered)
}

fn parse_params(raw: &str) -> Result<SignatureParams> {
    let mut keyid = None;
    let mut alg = None;
    let mut created = None;
    let mut nonce = None;
    let mut expires = None;

    for part in raw.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| malformed("parameter without '='"))?;
        match key {
            "keyid" => keyid = Some(unquote(value)?),
            "alg" => {
                let name = unquote(value)?;
                alg = Some(
                    SignatureAlgorithm::from_wire_name(&name)
                        .map_err(|_| malformed("unknown alg parameter"))?,
                );
            }
            "created" => {
                created = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| malformed("created must be an integer"))?,
                )
            }
            "nonce" => nonce = Some(unquote(value)?),
            "expires" => {
                expires = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| malformed("expires must be an integer"))?,
                )
            }
            // Unknown parameters are ignored for forward compatibility
            _ => {}
        }
    }

    Ok(SignatureParams {
        keyid: keyid.ok_or_else(|| malformed("missing keyid parameter"))?,
        alg: alg.ok_or_else(|| malformed("missing alg parameter"))?,
        created: created.ok_or_else(|| malformed("missing created parameter"))?,
        nonce: nonce.ok_or_else(|| malformed("missing nonce parameter"))?,
        expires,
    })
}

fn unquote(value: &str) -> Result<String> {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .map(str::to_string)
        .ok_or_else(|| malformed("parameter value must be quoted"))
}

fn malformed(reason: &str) -> SageError {
    SageError::MalformedSignatureInput(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_header_roundtrip() {
        let header = format_signature_header("sig1", &[0xAB; 64]);
        assert!(header.starts_with("sig1=:"));
        assert!(header.ends_with(':'));

        let (label, bytes) = parse_signature_header(&header).unwrap();
        assert_eq!(label, "sig1");
        assert_eq!(bytes, vec![0xAB; 64]);
    }

    #[test]
    fn test_signature_input_roundtrip() {
        let params = SignatureParams {
            keyid: "did:sage:ethereum:fe7ce99a-f19e-47d6-ae02-ce7839456b0a#key-1".to_string(),
            alg: SignatureAlgorithm::Ed25519,
            created: 1761204090,
            nonce: "nAnLbQTxYlXOQC9VgZ-uWg".to_string(),
            expires: None,
        };
        let covered = Component::default_signed_fields();
        let header = format_signature_input_header("sig1", &covered, &params);

        let parsed = parse_signature_input(&header).unwrap();
        assert_eq!(parsed.label, "sig1");
        assert_eq!(parsed.covered, covered);
        assert_eq!(parsed.params, params);
    }

    #[test]
    fn test_expires_roundtrip() {
        let params = SignatureParams {
            keyid: "k".to_string(),
            alg: SignatureAlgorithm::Es256,
            created: 100,
            nonce: "n".to_string(),
            expires: Some(400),
        };
        let header = format_signature_input_header("sig1", &[Component::Nonce], &params);
        let parsed = parse_signature_input(&header).unwrap();
        assert_eq!(parsed.params.expires, Some(400));
    }

    #[test]
    fn test_malformed_inputs_rejected() {
        for bad in [
            "sig1",                                              // no '='
            "sig1=\"nonce\");keyid=\"k\"",                       // no '('
            "sig1=(\"nonce\";keyid=\"k\"",                       // unterminated list
            "sig1=(nonce);keyid=\"k\";alg=\"ed25519\";created=1;nonce=\"n\"", // unquoted
            "sig1=();keyid=\"k\";alg=\"ed25519\";created=1;nonce=\"n\"",      // empty list
            "sig1=(\"nonce\");alg=\"ed25519\";created=1;nonce=\"n\"",         // missing keyid
            "sig1=(\"nonce\");keyid=\"k\";alg=\"spooky\";created=1;nonce=\"n\"", // bad alg
            "sig1=(\"nonce\");keyid=\"k\";alg=\"ed25519\";created=abc;nonce=\"n\"", // bad int
        ] {
            assert!(
                matches!(parse_signature_input(bad), Err(SageError::MalformedSignatureInput(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_unknown_derived_component_surfaces() {
        let bad = "sig1=(\"@status\");keyid=\"k\";alg=\"ed25519\";created=1;nonce=\"n\"";
        assert!(matches!(
            parse_signature_input(bad),
            Err(SageError::UnknownComponent(_))
        ));
    }

    #[test]
    fn test_unknown_params_ignored() {
        let header =
            "sig1=(\"nonce\");keyid=\"k\";alg=\"ed25519\";created=1;nonce=\"n\";tag=\"x\"";
        assert!(parse_signature_input(header).is_ok());
    }

    #[test]
    fn test_bad_signature_header() {
        assert!(parse_signature_header("sig1=abc").is_err());
        assert!(parse_signature_header("sig1=:!!!not-base64!!!:").is_err());
        assert!(parse_signature_header("justalabel").is_err());
    }
}
