//! Message deduplication
//!
//! Fingerprints the critical fields of a message and remembers them for a
//! TTL, guaranteeing at-most-once delivery even when a caller bypasses the
//! signature-and-nonce path. Same memory discipline as the nonce manager:
//! purge expired under pressure, never evict a live entry.

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::SageConfig;
use crate::error::{Result, SageError};
use crate::message::CanonicalMessage;
use sage_did::Did;

/// `SHA-256(sender_did || message_id || timestamp || body)` with a zero
/// byte delimiting the variable-length DID.
pub fn message_fingerprint(sender: &Did, message_id: &Uuid, timestamp: u64, body: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(sender.to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(message_id.as_bytes());
    hasher.update(timestamp.to_be_bytes());
    hasher.update(body);
    hasher.finalize().into()
}

/// Bounded TTL store of message fingerprints.
pub struct DedupeDetector {
    entries: Mutex<HashMap<[u8; 32], Instant>>,
    ttl: Duration,
    max_entries: usize,
}

impl DedupeDetector {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn from_config(config: &SageConfig) -> Self {
        Self::new(config.dedupe_ttl, config.max_dedupe_entries)
    }

    /// Atomically record `fingerprint` if unseen.
    ///
    /// Returns [`SageError::Duplicate`] when the fingerprint is already
    /// live, [`SageError::CapacityExceeded`] when the table is full.
    pub fn mark_if_new(&self, fingerprint: [u8; 32]) -> Result<()> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        if let Some(expires_at) = entries.get(&fingerprint) {
            if *expires_at > now {
                return Err(SageError::Duplicate);
            }
        }

        if entries.len() >= self.max_entries && !entries.contains_key(&fingerprint) {
            entries.retain(|_, expires_at| *expires_at > now);
            if entries.len() >= self.max_entries {
                warn!(max = self.max_entries, "dedupe table full, rejecting message");
                return Err(SageError::CapacityExceeded("dedupe table full"));
            }
        }

        entries.insert(fingerprint, now + self.ttl);
        Ok(())
    }

    /// Fingerprint and record a canonical message.
    pub fn mark_message(&self, message: &CanonicalMessage) -> Result<()> {
        self.mark_if_new(message_fingerprint(
            &message.agent_did,
            &message.message_id,
            message.timestamp,
            &message.body,
        ))
    }

    /// Remove expired entries; returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, remaining = entries.len(), "dedupe sweep");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sage_did::ChainId;

    fn did() -> Did {
        Did::generate(ChainId::Ethereum)
    }

    #[test]
    fn test_first_seen_then_duplicate() {
        let detector = DedupeDetector::new(Duration::from_secs(600), 1000);
        let fp = message_fingerprint(&did(), &Uuid::new_v4(), 100, b"body");

        detector.mark_if_new(fp).unwrap();
        assert!(matches!(detector.mark_if_new(fp), Err(SageError::Duplicate)));
    }

    #[test]
    fn test_fingerprint_sensitivity() {
        let sender = did();
        let id = Uuid::new_v4();
        let base = message_fingerprint(&sender, &id, 100, b"body");

        assert_ne!(base, message_fingerprint(&did(), &id, 100, b"body"));
        assert_ne!(base, message_fingerprint(&sender, &Uuid::new_v4(), 100, b"body"));
        assert_ne!(base, message_fingerprint(&sender, &id, 101, b"body"));
        assert_ne!(base, message_fingerprint(&sender, &id, 100, b"BODY"));
    }

    #[test]
    fn test_capacity_rejects_new() {
        let detector = DedupeDetector::new(Duration::from_secs(600), 1);
        detector.mark_if_new([1u8; 32]).unwrap();
        assert!(matches!(
            detector.mark_if_new([2u8; 32]),
            Err(SageError::CapacityExceeded(_))
        ));
        // The live entry survived
        assert!(matches!(
            detector.mark_if_new([1u8; 32]),
            Err(SageError::Duplicate)
        ));
    }

    #[test]
    fn test_expired_entries_swept() {
        let detector = DedupeDetector::new(Duration::from_millis(0), 1000);
        detector.mark_if_new([1u8; 32]).unwrap();
        assert_eq!(detector.sweep(), 1);
        assert!(detector.is_empty());
    }
}
