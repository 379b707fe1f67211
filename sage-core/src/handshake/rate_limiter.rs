//! Handshake admission rate limiting
//!
//! Token bucket per source identifier, in front of cookie issuance. The
//! cookie/PoW machinery bounds cryptographic work; the rate limiter bounds
//! even the cheap cookie path so a single source cannot monopolize the
//! responder.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter as GovernorRateLimiter};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::config::RateLimitConfig;
use crate::error::{Result, SageError};

/// Per-source token-bucket limiter for handshake attempts.
pub struct HandshakeRateLimiter {
    limiters: Arc<RwLock<HashMap<String, DefaultDirectRateLimiter>>>,
    config: RateLimitConfig,
}

impl HandshakeRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            limiters: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Admit or refuse a handshake attempt from `source`.
    pub fn check(&self, source: &str) -> Result<()> {
        let mut limiters = self.limiters.write();
        let limiter = limiters.entry(source.to_string()).or_insert_with(|| {
            let quota = Quota::per_second(
                NonZeroU32::new(self.config.handshakes_per_second.max(1))
                    .expect("clamped to at least 1"),
            )
            .allow_burst(
                NonZeroU32::new(self.config.burst_capacity.max(1)).expect("clamped to at least 1"),
            );
            GovernorRateLimiter::direct(quota)
        });

        limiter
            .check()
            .map_err(|_| SageError::CapacityExceeded("handshake rate limit exceeded"))
    }

    /// Number of sources currently tracked.
    pub fn tracked_sources(&self) -> usize {
        self.limiters.read().len()
    }
}
