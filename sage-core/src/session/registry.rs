//! Session registry
//!
//! Process-wide view of live sessions, keyed by session id. Enforces the
//! binding invariants: a session id is never registered twice, and at most
//! one active session exists per `(local_did, peer_did, role)` triple. The
//! sweeper transitions TTL-expired sessions to `Expiring` and removes them
//! after a grace period.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::Session;
use crate::error::{Result, SageError};
use crate::replay::Sweepable;

const DEFAULT_EXPIRY_GRACE: Duration = Duration::from_secs(60);

/// Registry of live sessions.
pub struct SessionRegistry {
    sessions: DashMap<[u8; 16], Arc<Session>>,
    expiry_grace: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_grace(DEFAULT_EXPIRY_GRACE)
    }

    pub fn with_grace(expiry_grace: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            expiry_grace,
        }
    }

    /// Register a freshly established session.
    ///
    /// Rejects duplicate session ids and a second active session for the
    /// same `(local_did, peer_did, role)` binding; concurrent handshakes
    /// between the same parties therefore yield at most one session.
    pub fn insert(&self, session: Arc<Session>) -> Result<()> {
        let duplicate_binding = self.sessions.iter().any(|entry| {
            let existing = entry.value();
            !existing.is_closed()
                && existing.local_did() == session.local_did()
                && existing.peer_did() == session.peer_did()
                && existing.role() == session.role()
        });
        if duplicate_binding {
            debug!(peer = %session.peer_did(), "binding already has an active session");
            return Err(SageError::Duplicate);
        }

        match self.sessions.entry(*session.id()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(SageError::Duplicate),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                info!(session = %hex::encode(session.id()), peer = %session.peer_did(), "session registered");
                slot.insert(session);
                Ok(())
            }
        }
    }

    /// Look up a session by id.
    pub fn get(&self, session_id: &[u8; 16]) -> Option<Arc<Session>> {
        self.sessions.get(session_id).map(|s| Arc::clone(s.value()))
    }

    /// Close and remove a session.
    pub fn remove(&self, session_id: &[u8; 16]) -> Option<Arc<Session>> {
        let (_, session) = self.sessions.remove(session_id)?;
        session.close();
        Some(session)
    }

    /// Close and remove everything. Used on shutdown.
    pub fn close_all(&self) {
        for entry in self.sessions.iter() {
            entry.value().close();
        }
        self.sessions.clear();
    }

    /// Advance expiry states; remove sessions past their grace period.
    pub fn sweep(&self) -> usize {
        let doomed: Vec<[u8; 16]> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().tick_expiry(self.expiry_grace))
            .map(|entry| *entry.key())
            .collect();

        for id in &doomed {
            if let Some((_, session)) = self.sessions.remove(id) {
                session.close();
            }
        }
        doomed.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Sweepable for SessionRegistry {
    fn sweep_expired(&self) -> usize {
        self.sweep()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SageConfig;
    use crate::handshake::exporter_secret;
    use crate::session::SessionRole;
    use sage_crypto::{kem_encap, KeyPair, KeyType};
    use sage_did::{ChainId, Did};

    fn make_session(config: &SageConfig, local: Did, peer: Did) -> Arc<Session> {
        let kem = KeyPair::generate(KeyType::X25519).unwrap();
        let (_, exporter) = kem_encap(kem.public_key(), b"info").unwrap();
        let es = exporter_secret(&exporter).unwrap();
        Arc::new(
            Session::from_exporter(&es, SessionRole::Initiator, local, peer, config).unwrap(),
        )
    }

    #[test]
    fn test_insert_get_remove() {
        let registry = SessionRegistry::new();
        let config = SageConfig::for_tests();
        let session = make_session(
            &config,
            Did::generate(ChainId::Ethereum),
            Did::generate(ChainId::Ethereum),
        );
        let id = *session.id();

        registry.insert(Arc::clone(&session)).unwrap();
        assert!(registry.get(&id).is_some());

        let removed = registry.remove(&id).unwrap();
        assert!(removed.is_closed());
        assert!(registry.get(&id).is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let registry = SessionRegistry::new();
        let config = SageConfig::for_tests();
        let session = make_session(
            &config,
            Did::generate(ChainId::Ethereum),
            Did::generate(ChainId::Ethereum),
        );

        registry.insert(Arc::clone(&session)).unwrap();
        // Same binding, same id
        assert!(matches!(
            registry.insert(Arc::clone(&session)),
            Err(SageError::Duplicate)
        ));
    }

    #[test]
    fn test_one_active_session_per_binding() {
        let registry = SessionRegistry::new();
        let config = SageConfig::for_tests();
        let local = Did::generate(ChainId::Ethereum);
        let peer = Did::generate(ChainId::Ethereum);

        let first = make_session(&config, local.clone(), peer.clone());
        let second = make_session(&config, local.clone(), peer.clone());

        registry.insert(first).unwrap();
        assert!(matches!(registry.insert(second), Err(SageError::Duplicate)));
    }

    #[test]
    fn test_closed_session_frees_binding() {
        let registry = SessionRegistry::new();
        let config = SageConfig::for_tests();
        let local = Did::generate(ChainId::Ethereum);
        let peer = Did::generate(ChainId::Ethereum);

        let first = make_session(&config, local.clone(), peer.clone());
        registry.insert(Arc::clone(&first)).unwrap();
        first.close();

        let second = make_session(&config, local, peer);
        registry.insert(second).unwrap();
    }

    #[test]
    fn test_sweep_removes_expired_after_grace() {
        let registry = SessionRegistry::with_grace(Duration::from_millis(0));
        let mut config = SageConfig::for_tests();
        config.session_ttl = Duration::from_millis(0);

        let session = make_session(
            &config,
            Did::generate(ChainId::Ethereum),
            Did::generate(ChainId::Ethereum),
        );
        registry.insert(session).unwrap();

        std::thread::sleep(Duration::from_millis(5));
        // First sweep marks Expiring, second removes past the zero grace
        registry.sweep();
        std::thread::sleep(Duration::from_millis(5));
        registry.sweep();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_close_all() {
        let registry = SessionRegistry::new();
        let config = SageConfig::for_tests();
        for _ in 0..3 {
            let session = make_session(
                &config,
                Did::generate(ChainId::Ethereum),
                Did::generate(ChainId::Ethereum),
            );
            registry.insert(session).unwrap();
        }
        registry.close_all();
        assert!(registry.is_empty());
    }
}
