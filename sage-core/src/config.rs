//! Core configuration
//!
//! One aggregate config struct with conservative defaults. Hosts override
//! individual fields; every duration is wall-clock.

use sage_crypto::{AeadAlgorithm, SignatureAlgorithm};
use std::time::Duration;

/// Rate limit settings for handshake admission (token bucket, per source).
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Sustained handshake attempts per second per source.
    pub handshakes_per_second: u32,
    /// Burst capacity above the sustained rate.
    pub burst_capacity: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            handshakes_per_second: 10,
            burst_capacity: 50,
        }
    }
}

impl RateLimitConfig {
    /// Permissive limits for tests.
    pub fn permissive() -> Self {
        Self {
            handshakes_per_second: 1000,
            burst_capacity: 5000,
        }
    }
}

/// Aggregate configuration for the SAGE core.
#[derive(Debug, Clone)]
pub struct SageConfig {
    /// How long nonces are remembered for replay rejection.
    pub nonce_ttl: Duration,
    /// Upper bound on remembered nonces.
    pub max_nonce_entries: usize,
    /// How long message fingerprints are remembered.
    pub dedupe_ttl: Duration,
    /// Upper bound on remembered fingerprints.
    pub max_dedupe_entries: usize,
    /// Sliding window size for per-peer ordering (max 64).
    pub order_window: u8,
    /// Session time-to-live; refresh extends up to `session_max_age`.
    pub session_ttl: Duration,
    /// Hard ceiling on session age regardless of refreshes.
    pub session_max_age: Duration,
    /// Send counter value that forces rekey or termination.
    pub rekey_counter_threshold: u64,
    /// Consecutive AEAD failures that close a session.
    pub aead_failure_threshold: u32,
    /// Per-step handshake deadline.
    pub handshake_step_timeout: Duration,
    /// Required leading zero bits in proof-of-work solutions.
    pub pow_difficulty_bits: u8,
    /// Raise difficulty automatically under handshake load.
    pub pow_difficulty_autoadjust: bool,
    /// DoS cookie validity window.
    pub cookie_ttl: Duration,
    /// Signature algorithms accepted by the verifier.
    pub allowed_algorithms: Vec<SignatureAlgorithm>,
    /// Accepted divergence between message timestamps and the local clock.
    pub clock_skew_tolerance: Duration,
    /// AEAD cipher for session frames.
    pub aead: AeadAlgorithm,
    /// Handshake admission rate limiting; `None` disables it.
    pub rate_limit: Option<RateLimitConfig>,
}

impl Default for SageConfig {
    fn default() -> Self {
        Self {
            nonce_ttl: Duration::from_secs(300),
            max_nonce_entries: 100_000,
            dedupe_ttl: Duration::from_secs(600),
            max_dedupe_entries: 100_000,
            order_window: 64,
            session_ttl: Duration::from_secs(30 * 60),
            session_max_age: Duration::from_secs(24 * 60 * 60),
            rekey_counter_threshold: 1 << 48,
            aead_failure_threshold: 32,
            handshake_step_timeout: Duration::from_secs(10),
            pow_difficulty_bits: 18,
            pow_difficulty_autoadjust: false,
            cookie_ttl: Duration::from_secs(60),
            allowed_algorithms: vec![
                SignatureAlgorithm::Ed25519,
                SignatureAlgorithm::Es256,
                SignatureAlgorithm::Es256K,
            ],
            clock_skew_tolerance: Duration::from_secs(300),
            aead: AeadAlgorithm::ChaCha20Poly1305,
            rate_limit: Some(RateLimitConfig::default()),
        }
    }
}

impl SageConfig {
    /// Config for tests: tiny PoW, no rate limiting.
    pub fn for_tests() -> Self {
        Self {
            pow_difficulty_bits: 8,
            rate_limit: None,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = SageConfig::default();
        assert_eq!(config.nonce_ttl, Duration::from_secs(300));
        assert_eq!(config.dedupe_ttl, Duration::from_secs(600));
        assert_eq!(config.order_window, 64);
        assert_eq!(config.cookie_ttl, Duration::from_secs(60));
        assert_eq!(config.pow_difficulty_bits, 18);
        assert_eq!(config.rekey_counter_threshold, 1 << 48);
        assert_eq!(config.allowed_algorithms.len(), 3);
    }
}
