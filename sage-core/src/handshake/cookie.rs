//! Stateless DoS cookies
//!
//! On an unsolicited first flight the responder hands back a cookie
//! instead of doing any cryptography or storing any state. The cookie is
//! self-authenticating: issue time and required PoW difficulty ride in the
//! clear, authenticated by an HMAC under a key only the responder holds.
//!
//! Layout: `issued_at (8B be) || difficulty (1B) || HMAC-SHA256(key,
//! source || issued_at || difficulty) (32B)`.

use sage_crypto::{hmac_sha256, random_array, verify_hmac_sha256};
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{system_clock, Clock};
use crate::error::{HandshakeFailure, Result, SageError};

/// Total cookie length.
pub const COOKIE_LEN: usize = 8 + 1 + 32;

/// Issues and verifies handshake admission cookies.
pub struct CookieJar {
    key: [u8; 32],
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl CookieJar {
    /// Create a jar with a random per-process key. Restarting invalidates
    /// outstanding cookies, which only costs clients one extra round trip.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, system_clock())
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            key: random_array(),
            ttl,
            clock,
        }
    }

    /// Issue a cookie for `source` demanding `difficulty` PoW bits.
    pub fn issue(&self, source: &str, difficulty: u8) -> Vec<u8> {
        let issued_at = self.clock.unix_now();
        let mut cookie = Vec::with_capacity(COOKIE_LEN);
        cookie.extend_from_slice(&issued_at.to_be_bytes());
        cookie.push(difficulty);
        let mac = hmac_sha256(
            &self.key,
            &[source.as_bytes(), &issued_at.to_be_bytes(), &[difficulty]],
        );
        cookie.extend_from_slice(&mac);
        cookie
    }

    /// Verify a returned cookie; yields the difficulty it was issued with.
    pub fn verify(&self, source: &str, cookie: &[u8]) -> Result<u8> {
        if cookie.len() != COOKIE_LEN {
            return Err(SageError::HandshakeFailed(HandshakeFailure::Cookie));
        }
        let issued_at = u64::from_be_bytes(cookie[..8].try_into().expect("checked length"));
        let difficulty = cookie[8];
        let mac = &cookie[9..];

        verify_hmac_sha256(
            &self.key,
            &[source.as_bytes(), &issued_at.to_be_bytes(), &[difficulty]],
            mac,
        )
        .map_err(|_| SageError::HandshakeFailed(HandshakeFailure::Cookie))?;

        let now = self.clock.unix_now();
        if now < issued_at || now - issued_at > self.ttl.as_secs() {
            return Err(SageError::HandshakeFailed(HandshakeFailure::Cookie));
        }
        Ok(difficulty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_issue_verify_roundtrip() {
        let jar = CookieJar::new(Duration::from_secs(60));
        let cookie = jar.issue("10.0.0.1:4433", 18);
        assert_eq!(jar.verify("10.0.0.1:4433", &cookie).unwrap(), 18);
    }

    #[test]
    fn test_wrong_source_rejected() {
        let jar = CookieJar::new(Duration::from_secs(60));
        let cookie = jar.issue("10.0.0.1:4433", 18);
        assert!(jar.verify("10.0.0.2:4433", &cookie).is_err());
    }

    #[test]
    fn test_tampered_difficulty_rejected() {
        let jar = CookieJar::new(Duration::from_secs(60));
        let mut cookie = jar.issue("src", 18);
        cookie[8] = 1;
        assert!(jar.verify("src", &cookie).is_err());
    }

    #[test]
    fn test_expired_cookie_rejected() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let jar = CookieJar::with_clock(Duration::from_secs(60), clock.clone());
        let cookie = jar.issue("src", 18);

        clock.advance(61);
        assert!(matches!(
            jar.verify("src", &cookie),
            Err(SageError::HandshakeFailed(HandshakeFailure::Cookie))
        ));
    }

    #[test]
    fn test_foreign_jar_rejected() {
        let jar_a = CookieJar::new(Duration::from_secs(60));
        let jar_b = CookieJar::new(Duration::from_secs(60));
        let cookie = jar_a.issue("src", 18);
        assert!(jar_b.verify("src", &cookie).is_err());
    }

    #[test]
    fn test_truncated_cookie_rejected() {
        let jar = CookieJar::new(Duration::from_secs(60));
        assert!(jar.verify("src", &[0u8; 10]).is_err());
    }
}
