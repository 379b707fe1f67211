//! Canonical message model
//!
//! A [`CanonicalMessage`] is the unit the RFC 9421 layer signs and
//! verifies: identity fields, an opaque body, transport headers, and the
//! ordered list of covered components. Component identifiers follow RFC
//! 9421 conventions: `@`-prefixed names are derived pseudo-components,
//! everything else is a case-insensitive header or message field name.

use sage_crypto::{generate_nonce_string, SignatureAlgorithm};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use uuid::Uuid;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, SageError};
use sage_did::Did;

/// A signable message component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    /// Sender DID (`agent_did`).
    AgentDid,
    /// Message UUID (`message_id`).
    MessageId,
    /// Unix-seconds timestamp (`timestamp`).
    Timestamp,
    /// Replay nonce (`nonce`).
    Nonce,
    /// Message body, base64-encoded into the base (`body`).
    Body,
    /// `content-digest` header, recomputed from the body.
    ContentDigest,
    /// Derived `@method`.
    Method,
    /// Derived `@path`.
    Path,
    /// Derived `@query`.
    Query,
    /// Derived `@authority`.
    Authority,
    /// Derived `@target-uri`.
    TargetUri,
    /// A named transport header (stored lowercase).
    Header(String),
}

impl Component {
    /// Canonical identifier as it appears in `Signature-Input`.
    pub fn identifier(&self) -> &str {
        match self {
            Component::AgentDid => "agent_did",
            Component::MessageId => "message_id",
            Component::Timestamp => "timestamp",
            Component::Nonce => "nonce",
            Component::Body => "body",
            Component::ContentDigest => "content-digest",
            Component::Method => "@method",
            Component::Path => "@path",
            Component::Query => "@query",
            Component::Authority => "@authority",
            Component::TargetUri => "@target-uri",
            Component::Header(name) => name,
        }
    }

    /// Parse a component identifier.
    ///
    /// Unknown `@`-prefixed names are rejected; anything else is treated as
    /// a header name and lowercased.
    pub fn parse(s: &str) -> Result<Self> {
        let c = match s {
            "agent_did" => Component::AgentDid,
            "message_id" => Component::MessageId,
            "timestamp" => Component::Timestamp,
            "nonce" => Component::Nonce,
            "body" => Component::Body,
            "content-digest" => Component::ContentDigest,
            "@method" => Component::Method,
            "@path" => Component::Path,
            "@query" => Component::Query,
            "@authority" => Component::Authority,
            "@target-uri" => Component::TargetUri,
            other if other.starts_with('@') => {
                return Err(SageError::UnknownComponent(other.to_string()))
            }
            other => Component::Header(other.to_ascii_lowercase()),
        };
        Ok(c)
    }

    /// The default covered set: identity, freshness and body.
    pub fn default_signed_fields() -> Vec<Component> {
        vec![
            Component::AgentDid,
            Component::MessageId,
            Component::Timestamp,
            Component::Nonce,
            Component::Body,
        ]
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Request-line facts backing the derived `@` components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTarget {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authority: Option<String>,
    pub target_uri: Option<String>,
}

/// The message the RFC 9421 layer operates on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalMessage {
    /// Sender DID.
    pub agent_did: Did,
    /// Unique message id.
    pub message_id: Uuid,
    /// Unix-seconds creation time.
    pub timestamp: u64,
    /// High-entropy replay nonce.
    pub nonce: String,
    /// Opaque payload bytes.
    pub body: Vec<u8>,
    /// Transport headers: ordered, repeatable, case-insensitive names.
    pub headers: Vec<(String, String)>,
    /// Application metadata; not covered by signatures.
    pub metadata: BTreeMap<String, String>,
    /// Components covered by the signature, in order.
    pub signed_fields: Vec<Component>,
    /// Signature algorithm this message will be signed with.
    pub algorithm: SignatureAlgorithm,
    /// Request facts for derived components, when the message is bound to
    /// an HTTP exchange.
    pub target: Option<RequestTarget>,
}

impl CanonicalMessage {
    /// Build a message with a fresh id, nonce and current timestamp.
    pub fn new(agent_did: Did, body: impl Into<Vec<u8>>, algorithm: SignatureAlgorithm) -> Self {
        Self {
            agent_did,
            message_id: Uuid::new_v4(),
            timestamp: SystemClock.unix_now(),
            nonce: generate_nonce_string(),
            body: body.into(),
            headers: Vec::new(),
            metadata: BTreeMap::new(),
            signed_fields: Component::default_signed_fields(),
            algorithm,
            target: None,
        }
    }

    pub fn with_message_id(mut self, id: Uuid) -> Self {
        self.message_id = id;
        self
    }

    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = nonce.into();
        self
    }

    pub fn with_signed_fields(mut self, fields: Vec<Component>) -> Self {
        self.signed_fields = fields;
        self
    }

    pub fn with_target(mut self, target: RequestTarget) -> Self {
        self.target = Some(target);
        self
    }

    /// Append a transport header (names are kept as given, compared
    /// case-insensitively).
    pub fn add_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// `sha-256=:<base64(SHA-256(body))>:` structured-field value.
    pub fn content_digest(&self) -> String {
        let digest = Sha256::digest(&self.body);
        format!("sha-256=:{}:", BASE64.encode(digest))
    }

    /// Canonical value of one component, as it enters the signature base.
    ///
    /// Multi-value headers are joined with `", "` in arrival order; values
    /// are whitespace-trimmed. Derived components require a bound
    /// [`RequestTarget`].
    pub fn component_value(&self, component: &Component) -> Result<String> {
        match component {
            Component::AgentDid => Ok(self.agent_did.to_string()),
            Component::MessageId => Ok(self.message_id.to_string()),
            Component::Timestamp => Ok(self.timestamp.to_string()),
            Component::Nonce => Ok(self.nonce.clone()),
            Component::Body => Ok(BASE64.encode(&self.body)),
            Component::ContentDigest => {
                // Prefer the transported header so a digest/body mismatch is
                // detectable as its own failure; recompute when absent.
                let from_header = self
                    .headers
                    .iter()
                    .find(|(n, _)| n.eq_ignore_ascii_case("content-digest"))
                    .map(|(_, v)| v.trim().to_string());
                Ok(from_header.unwrap_or_else(|| self.content_digest()))
            }
            Component::Method => self.target_field(|t| Some(t.method.clone()), "@method"),
            Component::Path => self.target_field(|t| Some(t.path.clone()), "@path"),
            Component::Query => self.target_field(|t| t.query.clone(), "@query"),
            Component::Authority => self.target_field(|t| t.authority.clone(), "@authority"),
            Component::TargetUri => self.target_field(|t| t.target_uri.clone(), "@target-uri"),
            Component::Header(name) => {
                let values: Vec<&str> = self
                    .headers
                    .iter()
                    .filter(|(n, _)| n.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v.trim())
                    .collect();
                if values.is_empty() {
                    return Err(SageError::UnknownComponent(name.clone()));
                }
                Ok(values.join(", "))
            }
        }
    }

    fn target_field(
        &self,
        get: impl Fn(&RequestTarget) -> Option<String>,
        name: &str,
    ) -> Result<String> {
        self.target
            .as_ref()
            .and_then(get)
            .ok_or_else(|| SageError::UnknownComponent(name.to_string()))
    }
}
