//! Agent registry records
//!
//! The authoritative copy of an [`AgentRecord`] lives on-chain in the
//! multi-key registry contract; resolvers hand the core a decoded view.
//! Only keys the registry reports as ownership-verified are usable for
//! signature verification.

use chrono::{DateTime, Utc};
use sage_crypto::{KeyType, PublicKey};
use serde::{Deserialize, Serialize};

use crate::did::Did;
use crate::resolver::ResolverError;

/// One registered key of an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentKey {
    /// Algorithm family of the key.
    pub key_type: KeyType,
    /// Raw key bytes in the family's registry encoding.
    pub key_data: Vec<u8>,
    /// Whether the registry verified proof-of-ownership for this key.
    ///
    /// Ed25519 keys on Ethereum cannot be verified on-chain; the registry
    /// marks them verified only after owner approval.
    pub verified: bool,
}

impl AgentKey {
    /// Decode the registered bytes into a usable public key.
    pub fn public_key(&self) -> Result<PublicKey, ResolverError> {
        PublicKey::from_bytes(self.key_type, &self.key_data)
            .map_err(|e| ResolverError::Transport(format!("corrupt registry key: {e}")))
    }
}

/// Decoded on-chain agent record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    /// The agent's DID.
    pub did: Did,
    /// Service endpoint the agent can be reached at.
    pub endpoint: String,
    /// Chain address of the record owner.
    pub owner: String,
    /// Deactivated agents must be rejected by all verification paths.
    pub active: bool,
    /// Record creation time.
    pub created_at: DateTime<Utc>,
    /// Last on-chain update.
    pub updated_at: DateTime<Utc>,
    /// Registered keys, in registry order.
    pub keys: Vec<AgentKey>,
    /// Registered X25519 KEM public key, if any.
    pub kem_public_key: Option<Vec<u8>>,
}

impl AgentRecord {
    /// First verified key of the given family.
    pub fn key_of_type(&self, key_type: KeyType) -> Option<&AgentKey> {
        self.keys.iter().find(|k| k.key_type == key_type && k.verified)
    }

    /// Decoded verified public key of the given family.
    pub fn public_key_of_type(&self, key_type: KeyType) -> Result<PublicKey, ResolverError> {
        let key = self
            .key_of_type(key_type)
            .ok_or_else(|| ResolverError::KeyNotFound { did: self.did.to_string(), key_type })?;
        key.public_key()
    }

    /// Decoded KEM public key for handshake encapsulation.
    pub fn kem_key(&self) -> Result<PublicKey, ResolverError> {
        let bytes = self.kem_public_key.as_deref().ok_or_else(|| ResolverError::KeyNotFound {
            did: self.did.to_string(),
            key_type: KeyType::X25519,
        })?;
        PublicKey::from_bytes(KeyType::X25519, bytes)
            .map_err(|e| ResolverError::Transport(format!("corrupt registry KEM key: {e}")))
    }
}
