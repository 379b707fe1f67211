//! DID parsing and canonicalization
//!
//! SAGE DIDs have the form `did:sage:<chain>:<uuid-v4>` with
//! `chain` one of `ethereum` or `solana`. The short aliases `eth` and
//! `sol` are accepted on input and canonicalized to the full form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// DID method name.
const DID_METHOD: &str = "sage";

/// Errors from DID parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DidError {
    #[error("malformed DID '{0}': expected did:sage:<chain>:<uuid>")]
    MalformedDid(String),

    #[error("unknown chain '{0}': expected ethereum or solana")]
    UnknownChain(String),

    #[error("invalid agent id '{0}': expected a UUID")]
    InvalidAgentId(String),
}

/// Blockchain a DID is anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainId {
    Ethereum,
    Solana,
}

impl ChainId {
    /// Canonical lowercase chain name.
    pub fn name(&self) -> &'static str {
        match self {
            ChainId::Ethereum => "ethereum",
            ChainId::Solana => "solana",
        }
    }

    /// Parse a chain name, accepting the short aliases.
    pub fn parse(s: &str) -> Result<Self, DidError> {
        match s {
            "ethereum" | "eth" => Ok(ChainId::Ethereum),
            "solana" | "sol" => Ok(ChainId::Solana),
            other => Err(DidError::UnknownChain(other.to_string())),
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed SAGE DID.
///
/// `Display` always emits the canonical full-chain form, regardless of the
/// alias used on input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Did {
    pub chain: ChainId,
    pub id: Uuid,
}

impl Did {
    /// Construct from parts.
    pub fn new(chain: ChainId, id: Uuid) -> Self {
        Self { chain, id }
    }

    /// Mint a DID with a fresh v4 UUID.
    pub fn generate(chain: ChainId) -> Self {
        Self { chain, id: Uuid::new_v4() }
    }
}

impl FromStr for Did {
    type Err = DidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(4, ':');
        let scheme = parts.next().unwrap_or_default();
        let method = parts.next().unwrap_or_default();
        let chain = parts.next().unwrap_or_default();
        let id = parts.next().unwrap_or_default();

        if scheme != "did" || method != DID_METHOD || chain.is_empty() || id.is_empty() {
            return Err(DidError::MalformedDid(s.to_string()));
        }

        let chain = ChainId::parse(chain)?;
        let id = Uuid::parse_str(id).map_err(|_| DidError::InvalidAgentId(id.to_string()))?;
        Ok(Did { chain, id })
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "did:{}:{}:{}", DID_METHOD, self.chain, self.id)
    }
}

impl Serialize for Did {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Did {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical() {
        let did: Did = "did:sage:ethereum:fe7ce99a-f19e-47d6-ae02-ce7839456b0a"
            .parse()
            .unwrap();
        assert_eq!(did.chain, ChainId::Ethereum);
        assert_eq!(
            did.to_string(),
            "did:sage:ethereum:fe7ce99a-f19e-47d6-ae02-ce7839456b0a"
        );
    }

    #[test]
    fn test_aliases_canonicalized() {
        let eth: Did = "did:sage:eth:fe7ce99a-f19e-47d6-ae02-ce7839456b0a".parse().unwrap();
        assert_eq!(eth.chain, ChainId::Ethereum);
        assert!(eth.to_string().contains(":ethereum:"));

        let sol: Did = "did:sage:sol:fe7ce99a-f19e-47d6-ae02-ce7839456b0a".parse().unwrap();
        assert_eq!(sol.chain, ChainId::Solana);
        assert!(sol.to_string().contains(":solana:"));
    }

    #[test]
    fn test_malformed_rejected() {
        for bad in [
            "did:sage:ethereum",
            "did:other:ethereum:fe7ce99a-f19e-47d6-ae02-ce7839456b0a",
            "sage:ethereum:fe7ce99a-f19e-47d6-ae02-ce7839456b0a",
            "",
        ] {
            assert!(bad.parse::<Did>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_unknown_chain() {
        let err = "did:sage:bitcoin:fe7ce99a-f19e-47d6-ae02-ce7839456b0a"
            .parse::<Did>()
            .unwrap_err();
        assert!(matches!(err, DidError::UnknownChain(_)));
    }

    #[test]
    fn test_bad_uuid() {
        let err = "did:sage:ethereum:not-a-uuid".parse::<Did>().unwrap_err();
        assert!(matches!(err, DidError::InvalidAgentId(_)));
    }

    #[test]
    fn test_serde_string_form() {
        let did = Did::generate(ChainId::Solana);
        let json = serde_json::to_string(&did).unwrap();
        assert!(json.starts_with("\"did:sage:solana:"));
        let back: Did = serde_json::from_str(&json).unwrap();
        assert_eq!(back, did);
    }
}
