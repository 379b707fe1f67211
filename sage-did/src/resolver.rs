//! DID resolver interface
//!
//! The core consumes, but never implements, the on-chain registry: hosts
//! plug in a resolver backed by their chain client. [`MemoryResolver`] is a
//! map-backed implementation for tests and local deployments.

use async_trait::async_trait;
use parking_lot::RwLock;
use sage_crypto::KeyType;
use std::collections::HashMap;
use std::sync::Arc;

use crate::did::Did;
use crate::record::{AgentKey, AgentRecord};

/// Errors from DID resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolverError {
    /// No record registered for this DID.
    #[error("DID not found: {0}")]
    NotFound(String),

    /// The registry backend could not be reached.
    #[error("resolver transport error: {0}")]
    Transport(String),

    /// The record exists but carries no verified key of the requested type.
    #[error("no verified {key_type} key registered for {did}")]
    KeyNotFound { did: String, key_type: KeyType },
}

/// Resolves DIDs against the agent registry.
#[async_trait]
pub trait DidResolver: Send + Sync {
    /// Fetch the full agent record.
    async fn resolve(&self, did: &Did) -> Result<AgentRecord, ResolverError>;

    /// Fetch all registered keys for an agent.
    async fn resolve_all_keys(&self, did: &Did) -> Result<Vec<AgentKey>, ResolverError> {
        Ok(self.resolve(did).await?.keys)
    }
}

/// In-memory resolver for tests and single-process deployments.
#[derive(Clone, Default)]
pub struct MemoryResolver {
    records: Arc<RwLock<HashMap<Did, AgentRecord>>>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    pub fn register(&self, record: AgentRecord) {
        self.records.write().insert(record.did.clone(), record);
    }

    /// Flip an agent's active flag in place.
    pub fn set_active(&self, did: &Did, active: bool) {
        if let Some(record) = self.records.write().get_mut(did) {
            record.active = active;
        }
    }
}

#[async_trait]
impl DidResolver for MemoryResolver {
    async fn resolve(&self, did: &Did) -> Result<AgentRecord, ResolverError> {
        self.records
            .read()
            .get(did)
            .cloned()
            .ok_or_else(|| ResolverError::NotFound(did.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::did::ChainId;
    use chrono::Utc;

    fn record(did: Did) -> AgentRecord {
        AgentRecord {
            did,
            endpoint: "https://agent.example".to_string(),
            owner: "owner".to_string(),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            keys: vec![],
            kem_public_key: None,
        }
    }

    #[tokio::test]
    async fn test_register_and_resolve() {
        let resolver = MemoryResolver::new();
        let did = Did::generate(ChainId::Ethereum);
        resolver.register(record(did.clone()));

        let found = resolver.resolve(&did).await.unwrap();
        assert_eq!(found.did, did);
    }

    #[tokio::test]
    async fn test_unknown_did() {
        let resolver = MemoryResolver::new();
        let missing = Did::generate(ChainId::Solana);
        assert!(matches!(
            resolver.resolve(&missing).await,
            Err(ResolverError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_set_active() {
        let resolver = MemoryResolver::new();
        let did = Did::generate(ChainId::Ethereum);
        resolver.register(record(did.clone()));
        resolver.set_active(&did, false);
        assert!(!resolver.resolve(&did).await.unwrap().active);
    }
}
