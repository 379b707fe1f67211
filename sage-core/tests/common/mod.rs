//! Shared fixtures for integration tests

use chrono::Utc;
use sage_crypto::KeyPair;
use sage_did::{AgentKey, AgentRecord, Did, MemoryResolver};

/// Register `did` in the resolver with `pair`'s public key, verified and
/// active.
pub fn register_agent(resolver: &MemoryResolver, did: &Did, pair: &KeyPair) {
    let record = AgentRecord {
        did: did.clone(),
        endpoint: "https://agent.example".to_string(),
        owner: "0x0000000000000000000000000000000000000001".to_string(),
        active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        keys: vec![AgentKey {
            key_type: pair.key_type(),
            key_data: pair.public_key().to_bytes(),
            verified: true,
        }],
        kem_public_key: None,
    };
    resolver.register(record);
}
