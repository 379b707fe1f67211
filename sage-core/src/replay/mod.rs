//! Replay and ordering defenses
//!
//! Three managers, each with a short critical section and bounded memory:
//!
//! - [`NonceManager`]: at-most-once nonces per sender within a TTL
//! - [`DedupeDetector`]: at-most-once message fingerprints within a TTL,
//!   even if the signature path is bypassed
//! - [`OrderManager`]: per-peer sliding-window sequence acceptance plus
//!   timestamp monotonicity within a clock-skew tolerance
//!
//! No manager holds its lock across I/O or a signature verification.

mod dedupe;
mod nonce;
mod order;
mod sweeper;
mod window;

pub use dedupe::{message_fingerprint, DedupeDetector};
pub use nonce::NonceManager;
pub use order::OrderManager;
pub use sweeper::{spawn_sweeper, Sweepable, SweeperHandle};
pub use window::{SlidingWindow, WindowError};
