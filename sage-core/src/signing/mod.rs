//! RFC 9421 HTTP Message Signatures
//!
//! Detached signing and verification over selected message components.
//!
//! # Wire format
//!
//! Every signed message carries two headers (plus `Content-Digest` when the
//! body digest is covered):
//!
//! ```text
//! Signature: sig1=:MEUCIQ...base64...:
//! Signature-Input: sig1=("agent_did" "message_id" "timestamp" "nonce" "body");\
//!     keyid="did:sage:ethereum:...#key-1";alg="ed25519";created=1761204090;\
//!     nonce="nAnLbQTxYlXOQC9VgZ-uWg"
//! Content-Digest: sha-256=:X48E9qOokqqrvdts8nOJRJN3OWDUoyWxBf7kbu9DBPE=:
//! ```
//!
//! # Tamper semantics
//!
//! Any single-bit change to a covered component's canonical form fails
//! verification; mutations to non-covered components do not.

mod base;
mod headers;
mod signer;
mod verifier;

pub use base::{build_signature_base, ensure_minimum_coverage, SignatureParams};
pub use headers::{
    format_signature_header, format_signature_input_header, parse_signature_header,
    parse_signature_input, ParsedSignatureInput, SignedHeaders, DEFAULT_SIGNATURE_LABEL,
};
pub use signer::MessageSigner;
pub use verifier::MessageVerifier;
