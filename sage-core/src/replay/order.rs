//! Per-peer ordering
//!
//! Tracks, for every sender DID, the highest accepted sequence number and a
//! sliding window of recent acceptances, plus a timestamp-monotonicity
//! check bounded by the configured clock-skew tolerance. The peer map is
//! sharded; no global lock is taken on the hot path.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::clock::{system_clock, Clock};
use crate::config::SageConfig;
use crate::error::{Result, SageError};
use crate::replay::window::{SlidingWindow, WindowError};
use sage_did::Did;

struct PeerOrderState {
    window: SlidingWindow,
    last_timestamp: u64,
}

/// Per-peer sequence and timestamp ordering enforcement.
pub struct OrderManager {
    peers: DashMap<Did, PeerOrderState>,
    window_size: u8,
    skew_tolerance: Duration,
    clock: Arc<dyn Clock>,
}

impl OrderManager {
    pub fn new(window_size: u8, skew_tolerance: Duration) -> Self {
        Self::with_clock(window_size, skew_tolerance, system_clock())
    }

    pub fn with_clock(window_size: u8, skew_tolerance: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            peers: DashMap::new(),
            window_size,
            skew_tolerance,
            clock,
        }
    }

    pub fn from_config(config: &SageConfig) -> Self {
        Self::new(config.order_window, config.clock_skew_tolerance)
    }

    /// Accept `seq` from `peer` if it advances the window or lands unseen
    /// inside it. Duplicates and sequences behind the window are rejected
    /// as out-of-order.
    pub fn observe_sequence(&self, peer: &Did, seq: u64) -> Result<()> {
        let mut state = self.peers.entry(peer.clone()).or_insert_with(|| PeerOrderState {
            window: SlidingWindow::new(self.window_size),
            last_timestamp: 0,
        });

        state.window.observe(seq).map_err(|e| {
            debug!(peer = %peer, seq, reason = ?e, "sequence rejected");
            match e {
                WindowError::Replay | WindowError::TooOld => SageError::OutOfOrder { seq },
            }
        })
    }

    /// Validate `timestamp` against the local clock and the peer's last
    /// accepted timestamp, both within the skew tolerance.
    pub fn check_timestamp(&self, peer: &Did, timestamp: u64) -> Result<()> {
        let now = self.clock.unix_now();
        let skew = self.skew_tolerance.as_secs();

        if timestamp > now + skew || timestamp + skew < now {
            debug!(peer = %peer, timestamp, now, "timestamp outside skew tolerance");
            return Err(SageError::ClockSkew { timestamp });
        }

        let mut state = self.peers.entry(peer.clone()).or_insert_with(|| PeerOrderState {
            window: SlidingWindow::new(self.window_size),
            last_timestamp: 0,
        });

        if timestamp + skew < state.last_timestamp {
            debug!(peer = %peer, timestamp, last = state.last_timestamp, "timestamp regressed");
            return Err(SageError::ClockSkew { timestamp });
        }
        if timestamp > state.last_timestamp {
            state.last_timestamp = timestamp;
        }
        Ok(())
    }

    /// Drop ordering state for a peer (e.g. after session teardown).
    pub fn forget(&self, peer: &Did) {
        self.peers.remove(peer);
    }

    /// Number of tracked peers.
    pub fn tracked_peers(&self) -> usize {
        self.peers.len()
    }
}
