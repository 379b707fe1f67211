//! Nonce manager
//!
//! Thread-safe at-most-once nonce registry with TTL expiry and a hard
//! memory bound. Under capacity pressure, expired entries are purged in
//! place; if the table is still full the new nonce is rejected rather than
//! evicting a live entry.

use parking_lot::Mutex;
use sage_crypto::generate_nonce_string;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::SageConfig;
use crate::error::{Result, SageError};

/// Thread-safe nonce registry for replay prevention.
pub struct NonceManager {
    entries: Mutex<HashMap<String, Instant>>,
    ttl: Duration,
    max_entries: usize,
}

impl NonceManager {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn from_config(config: &SageConfig) -> Self {
        Self::new(config.nonce_ttl, config.max_nonce_entries)
    }

    /// Generate a fresh high-entropy URL-safe nonce (22 chars, 128 bits).
    pub fn generate(&self) -> String {
        generate_nonce_string()
    }

    /// Atomically check `nonce` for freshness and mark it used.
    ///
    /// Returns [`SageError::NonceReplay`] if the nonce is already present
    /// and unexpired, and [`SageError::CapacityExceeded`] if the table is
    /// full of live entries.
    pub fn check_and_mark(&self, nonce: &str) -> Result<()> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        if let Some(expires_at) = entries.get(nonce) {
            if *expires_at > now {
                return Err(SageError::NonceReplay);
            }
            // Expired entry: the nonce may be reused
        }

        if entries.len() >= self.max_entries && !entries.contains_key(nonce) {
            entries.retain(|_, expires_at| *expires_at > now);
            if entries.len() >= self.max_entries {
                warn!(max = self.max_entries, "nonce table full, rejecting new nonce");
                return Err(SageError::CapacityExceeded("nonce table full"));
            }
        }

        entries.insert(nonce.to_string(), now + self.ttl);
        Ok(())
    }

    /// Remove expired entries; returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, remaining = entries.len(), "nonce sweep");
        }
        removed
    }

    /// Current number of remembered nonces.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fill ratio of the table, 0.0..=1.0.
    pub fn utilization(&self) -> f64 {
        self.len() as f64 / self.max_entries as f64
    }
}
