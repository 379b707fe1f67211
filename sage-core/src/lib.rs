//! SAGE Core
//!
//! End-to-end authenticated and confidential messaging between agents
//! whose identities are anchored in a DID registry. Layered bottom-up:
//!
//! - [`signing`]: RFC 9421 canonical signature base, detached
//!   signing/verification, tamper detection
//! - [`replay`]: nonce uniqueness, message dedup, per-peer ordering
//!   windows, shared background sweeper
//! - [`handshake`]: HPKE-based authenticated key establishment with DoS
//!   cookies, proof-of-work and replay protection
//! - [`session`]: exporter-derived AEAD channels with role binding,
//!   monotonic counters, TTL and rekey thresholds
//! - [`validator`]: the fixed inbound pipeline (dedup, order, signature,
//!   session decrypt)
//!
//! The DID registry itself is consumed through `sage_did::DidResolver`;
//! cryptographic primitives through `sage_crypto`.

pub mod clock;
pub mod config;
pub mod error;
pub mod handshake;
pub mod message;
pub mod replay;
pub mod session;
pub mod signing;
pub mod validator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{RateLimitConfig, SageConfig};
pub use error::{
    CorrelationId, HandshakeFailure, Result, SageError, SignatureFailure, WireCode,
};
pub use message::{CanonicalMessage, Component, RequestTarget};
pub use replay::{
    message_fingerprint, spawn_sweeper, DedupeDetector, NonceManager, OrderManager,
    SlidingWindow, SweeperHandle,
};
pub use session::{
    derive_session_keys, Direction, Session, SessionFrame, SessionRegistry, SessionRole,
    SessionState,
};
pub use signing::{MessageSigner, MessageVerifier, SignedHeaders};
pub use validator::{InboundMessage, MessageValidator, Rejection, ValidatedMessage};
