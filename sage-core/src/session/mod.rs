//! Session lifecycle
//!
//! A [`Session`] is a post-handshake, role-bound AEAD channel: directional
//! keys derived from the HPKE exporter, a monotonic send counter, a
//! sliding receive window, TTL with bounded refresh, and zeroization of
//! all key material on close.
//!
//! # Concurrency
//!
//! Sessions are shared across tasks behind `Arc`. Counter increments and
//! window updates run under per-direction mutexes with short critical
//! sections; no lock is held across the AEAD call's result handling in a
//! way that can deadlock.

mod frame;
mod key_schedule;
mod registry;

pub use frame::{build_aad, frame_nonce, Direction, SessionFrame};
pub use key_schedule::{derive_session_keys, SessionKeySchedule};
pub use registry::SessionRegistry;

use parking_lot::Mutex;
use sage_crypto::{aead_open, aead_seal, AeadAlgorithm, ExportedSecret};
use sage_did::Did;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::SageConfig;
use crate::error::{Result, SageError};
use crate::replay::{SlidingWindow, WindowError};

/// Which side of the handshake this session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionRole {
    Initiator,
    Responder,
}

impl SessionRole {
    /// Direction this role seals frames in.
    pub fn send_direction(&self) -> Direction {
        match self {
            SessionRole::Initiator => Direction::InitiatorToResponder,
            SessionRole::Responder => Direction::ResponderToInitiator,
        }
    }
}

/// Externally visible session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Expiring,
    Revoked,
}

/// One directional key and base nonce, wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct DirectionalKey {
    key: [u8; 32],
    base_nonce: [u8; 12],
}

struct SendState {
    keys: DirectionalKey,
    counter: u64,
}

struct RecvState {
    keys: DirectionalKey,
    window: SlidingWindow,
    consecutive_failures: u32,
}

struct Lifetime {
    expires_at: Instant,
    state: SessionState,
    expiring_since: Option<Instant>,
}

/// A live authenticated channel to one peer.
pub struct Session {
    session_id: [u8; 16],
    role: SessionRole,
    local_did: Did,
    peer_did: Did,
    aead: AeadAlgorithm,
    rekey_counter_threshold: u64,
    aead_failure_threshold: u32,
    ttl: Duration,
    max_age_deadline: Instant,
    created_at: Instant,
    send: Mutex<SendState>,
    recv: Mutex<RecvState>,
    lifetime: Mutex<Lifetime>,
    closed: AtomicBool,
}

impl Session {
    /// Build a session from the handshake's exporter output `ES`
    /// (`HPKE.Export("sage/v1/exporter", 32)`).
    ///
    /// The initiator sends on the i-to-r pair and receives on the mirrored
    /// one; the responder is reversed.
    pub fn from_exporter(
        es: &ExportedSecret,
        role: SessionRole,
        local_did: Did,
        peer_did: Did,
        config: &SageConfig,
    ) -> Result<Self> {
        let schedule = derive_session_keys(es)?;
        Ok(Self::from_schedule(schedule, role, local_did, peer_did, config))
    }

    fn from_schedule(
        schedule: SessionKeySchedule,
        role: SessionRole,
        local_did: Did,
        peer_did: Did,
        config: &SageConfig,
    ) -> Self {
        let (send_keys, recv_keys) = match role {
            SessionRole::Initiator => (
                DirectionalKey { key: schedule.key_i2r, base_nonce: schedule.nonce_i2r },
                DirectionalKey { key: schedule.key_r2i, base_nonce: schedule.nonce_r2i },
            ),
            SessionRole::Responder => (
                DirectionalKey { key: schedule.key_r2i, base_nonce: schedule.nonce_r2i },
                DirectionalKey { key: schedule.key_i2r, base_nonce: schedule.nonce_i2r },
            ),
        };
        let now = Instant::now();

        Self {
            session_id: schedule.session_id,
            role,
            local_did,
            peer_did,
            aead: config.aead,
            rekey_counter_threshold: config.rekey_counter_threshold,
            aead_failure_threshold: config.aead_failure_threshold,
            ttl: config.session_ttl,
            max_age_deadline: now + config.session_max_age,
            created_at: now,
            send: Mutex::new(SendState { keys: send_keys, counter: 0 }),
            recv: Mutex::new(RecvState {
                keys: recv_keys,
                window: SlidingWindow::new(config.order_window),
                consecutive_failures: 0,
            }),
            lifetime: Mutex::new(Lifetime {
                expires_at: now + config.session_ttl,
                state: SessionState::Active,
                expiring_since: None,
            }),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &[u8; 16] {
        &self.session_id
    }

    pub fn role(&self) -> SessionRole {
        self.role
    }

    pub fn local_did(&self) -> &Did {
        &self.local_did
    }

    pub fn peer_did(&self) -> &Did {
        &self.peer_did
    }

    pub fn state(&self) -> SessionState {
        if self.closed.load(Ordering::SeqCst) {
            return SessionState::Revoked;
        }
        self.lifetime.lock().state
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Age of the session.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    fn check_usable(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SageError::SessionClosed);
        }
        let lifetime = self.lifetime.lock();
        if lifetime.state == SessionState::Revoked || Instant::now() > lifetime.expires_at {
            return Err(SageError::SessionClosed);
        }
        Ok(())
    }

    /// Encrypt an outbound payload, consuming one counter value.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<SessionFrame> {
        self.check_usable()?;
        let direction = self.role.send_direction();

        let mut send = self.send.lock();
        let counter = send.counter + 1;
        if counter >= self.rekey_counter_threshold {
            warn!(session = %hex::encode(self.session_id), "send counter exhausted");
            return Err(SageError::CounterExhausted);
        }

        let nonce = frame_nonce(&send.keys.base_nonce, counter);
        let aad = build_aad(&self.session_id, direction, counter);
        let ciphertext = aead_seal(self.aead, &send.keys.key, &nonce, &aad, plaintext)
            .map_err(|_| SageError::AeadFailed)?;
        send.counter = counter;

        Ok(SessionFrame { session_id: self.session_id, counter, direction, ciphertext })
    }

    /// Decrypt an inbound frame, enforcing the receive window.
    ///
    /// Window state is only advanced after the frame authenticates, so
    /// forged counters cannot poison the window. Consecutive AEAD failures
    /// past the configured threshold close the session.
    pub fn decrypt(&self, frame: &SessionFrame) -> Result<Vec<u8>> {
        self.check_usable()?;

        // Wrong session or reflected direction: indistinguishable from a
        // forgery to the caller
        if frame.session_id != self.session_id
            || frame.direction != self.role.send_direction().flipped()
        {
            return Err(SageError::AeadFailed);
        }

        let mut recv = self.recv.lock();
        recv.window.check(frame.counter).map_err(|e| match e {
            WindowError::Replay => SageError::CounterReplay,
            WindowError::TooOld => SageError::CounterOutOfWindow,
        })?;

        let nonce = frame_nonce(&recv.keys.base_nonce, frame.counter);
        let aad = frame.aad();
        match aead_open(self.aead, &recv.keys.key, &nonce, &aad, &frame.ciphertext) {
            Ok(plaintext) => {
                recv.window
                    .observe(frame.counter)
                    .expect("checked before decrypt");
                recv.consecutive_failures = 0;
                Ok(plaintext)
            }
            Err(_) => {
                recv.consecutive_failures += 1;
                let failures = recv.consecutive_failures;
                drop(recv);
                if failures >= self.aead_failure_threshold {
                    warn!(
                        session = %hex::encode(self.session_id),
                        failures, "AEAD failure threshold reached, closing session"
                    );
                    self.close();
                }
                Err(SageError::AeadFailed)
            }
        }
    }

    /// Extend the TTL by one period, bounded by the maximum session age.
    pub fn refresh(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SageError::SessionClosed);
        }
        let now = Instant::now();
        if now >= self.max_age_deadline {
            debug!(session = %hex::encode(self.session_id), "max age reached, refresh refused");
            return Err(SageError::SessionClosed);
        }
        let mut lifetime = self.lifetime.lock();
        lifetime.expires_at = (now + self.ttl).min(self.max_age_deadline);
        lifetime.state = SessionState::Active;
        lifetime.expiring_since = None;
        Ok(())
    }

    /// Zeroize all key material and refuse further operations. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.send.lock().keys.zeroize();
        self.recv.lock().keys.zeroize();
        self.lifetime.lock().state = SessionState::Revoked;
        debug!(session = %hex::encode(self.session_id), "session closed");
    }

    /// Transition a TTL-expired session to `Expiring`; report whether the
    /// grace period has elapsed. Called by the registry sweeper.
    pub(crate) fn tick_expiry(&self, grace: Duration) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return true;
        }
        let now = Instant::now();
        let mut lifetime = self.lifetime.lock();
        if now <= lifetime.expires_at {
            return false;
        }
        match lifetime.expiring_since {
            None => {
                lifetime.state = SessionState::Expiring;
                lifetime.expiring_since = Some(now);
                false
            }
            Some(since) => now.duration_since(since) > grace,
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // DirectionalKey wipes itself, but close() also flips the state so
        // clones of the Arc observe Revoked
        self.close();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &hex::encode(self.session_id))
            .field("role", &self.role)
            .field("peer_did", &self.peer_did)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handshake::exporter_secret;
    use sage_crypto::{kem_decap, kem_encap, KeyPair, KeyType};
    use sage_did::ChainId;

    fn session_pair(config: &SageConfig) -> (Session, Session) {
        let kem = KeyPair::generate(KeyType::X25519).unwrap();
        let (enc, exporter_i) = kem_encap(kem.public_key(), b"info").unwrap();
        let exporter_r = kem_decap(&enc, kem.private_key(), b"info").unwrap();
        let es_i = exporter_secret(&exporter_i).unwrap();
        let es_r = exporter_secret(&exporter_r).unwrap();

        let a = Did::generate(ChainId::Ethereum);
        let b = Did::generate(ChainId::Ethereum);

        let initiator =
            Session::from_exporter(&es_i, SessionRole::Initiator, a.clone(), b.clone(), config)
                .unwrap();
        let responder =
            Session::from_exporter(&es_r, SessionRole::Responder, b, a, config).unwrap();
        (initiator, responder)
    }

    #[test]
    fn test_roundtrip_both_directions() {
        let config = SageConfig::for_tests();
        let (initiator, responder) = session_pair(&config);
        assert_eq!(initiator.id(), responder.id());

        let frame = initiator.encrypt(b"to responder").unwrap();
        assert_eq!(responder.decrypt(&frame).unwrap(), b"to responder");

        let frame = responder.encrypt(b"to initiator").unwrap();
        assert_eq!(initiator.decrypt(&frame).unwrap(), b"to initiator");
    }

    #[test]
    fn test_frame_replay_rejected() {
        let config = SageConfig::for_tests();
        let (initiator, responder) = session_pair(&config);

        let frame = initiator.encrypt(b"once").unwrap();
        responder.decrypt(&frame).unwrap();
        assert!(matches!(
            responder.decrypt(&frame),
            Err(SageError::CounterReplay)
        ));
    }

    #[test]
    fn test_reflection_rejected() {
        let config = SageConfig::for_tests();
        let (initiator, responder) = session_pair(&config);

        let frame = initiator.encrypt(b"mine").unwrap();
        // Reflecting the frame back at its sender must fail
        assert!(matches!(initiator.decrypt(&frame), Err(SageError::AeadFailed)));
        // And the responder still accepts it afterwards
        responder.decrypt(&frame).unwrap();
    }

    #[test]
    fn test_cross_session_decrypt_fails() {
        let config = SageConfig::for_tests();
        let (initiator_a, _) = session_pair(&config);
        let (_, responder_b) = session_pair(&config);

        let frame = initiator_a.encrypt(b"secret").unwrap();
        assert!(responder_b.decrypt(&frame).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let config = SageConfig::for_tests();
        let (initiator, responder) = session_pair(&config);

        let mut frame = initiator.encrypt(b"payload").unwrap();
        frame.ciphertext[0] ^= 0x01;
        assert!(matches!(responder.decrypt(&frame), Err(SageError::AeadFailed)));
    }

    #[test]
    fn test_out_of_order_within_window() {
        let config = SageConfig::for_tests();
        let (initiator, responder) = session_pair(&config);

        let f1 = initiator.encrypt(b"1").unwrap();
        let f2 = initiator.encrypt(b"2").unwrap();
        let f3 = initiator.encrypt(b"3").unwrap();

        responder.decrypt(&f3).unwrap();
        responder.decrypt(&f1).unwrap();
        responder.decrypt(&f2).unwrap();
    }

    #[test]
    fn test_counter_exhaustion() {
        let mut config = SageConfig::for_tests();
        config.rekey_counter_threshold = 3;
        let (initiator, _) = session_pair(&config);

        initiator.encrypt(b"1").unwrap();
        initiator.encrypt(b"2").unwrap();
        assert!(matches!(
            initiator.encrypt(b"3"),
            Err(SageError::CounterExhausted)
        ));
    }

    #[test]
    fn test_close_then_ops_fail() {
        let config = SageConfig::for_tests();
        let (initiator, responder) = session_pair(&config);

        let frame = initiator.encrypt(b"pre-close").unwrap();
        responder.close();
        assert!(matches!(
            responder.decrypt(&frame),
            Err(SageError::SessionClosed)
        ));
        assert!(matches!(responder.encrypt(b"x"), Err(SageError::SessionClosed)));
        assert!(matches!(responder.refresh(), Err(SageError::SessionClosed)));
        assert_eq!(responder.state(), SessionState::Revoked);
    }

    #[test]
    fn test_aead_failure_threshold_closes_session() {
        let mut config = SageConfig::for_tests();
        config.aead_failure_threshold = 2;
        let (initiator, responder) = session_pair(&config);

        for i in 0..2u8 {
            let mut frame = initiator.encrypt(format!("m{i}").as_bytes()).unwrap();
            frame.ciphertext[0] ^= 0xFF;
            assert!(matches!(responder.decrypt(&frame), Err(SageError::AeadFailed)));
        }
        assert!(responder.is_closed());
    }

    #[test]
    fn test_refresh_extends_ttl() {
        let mut config = SageConfig::for_tests();
        config.session_ttl = Duration::from_millis(30);
        let (initiator, _) = session_pair(&config);

        std::thread::sleep(Duration::from_millis(20));
        initiator.refresh().unwrap();
        std::thread::sleep(Duration::from_millis(20));
        // Still within the refreshed TTL
        initiator.encrypt(b"alive").unwrap();
    }

    #[test]
    fn test_ttl_expiry_blocks_ops() {
        let mut config = SageConfig::for_tests();
        config.session_ttl = Duration::from_millis(5);
        let (initiator, _) = session_pair(&config);

        std::thread::sleep(Duration::from_millis(15));
        assert!(matches!(initiator.encrypt(b"late"), Err(SageError::SessionClosed)));
    }

    #[test]
    fn test_refresh_capped_by_max_age() {
        let mut config = SageConfig::for_tests();
        config.session_ttl = Duration::from_millis(10);
        config.session_max_age = Duration::from_millis(20);
        let (initiator, _) = session_pair(&config);

        std::thread::sleep(Duration::from_millis(30));
        assert!(matches!(initiator.refresh(), Err(SageError::SessionClosed)));
    }
}
