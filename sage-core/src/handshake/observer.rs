//! Handshake observability hooks
//!
//! Hosts plug in an observer to feed their metrics pipeline; the default
//! observer does nothing, and [`LoggingObserver`] forwards to `tracing`.

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::HandshakeFailure;

/// One notable handshake event.
#[derive(Debug, Clone)]
pub enum HandshakeEvent {
    /// A cookie challenge was issued to an unproven source.
    CookieIssued { source: String },
    /// A solved invitation passed admission and signature checks.
    InvitationAccepted { initiator: String },
    /// A handshake completed and a session was derived.
    Established { peer: String },
    /// A handshake terminally failed.
    Failed { peer: Option<String>, reason: HandshakeFailure },
}

/// Receives handshake events.
pub trait HandshakeObserver: Send + Sync {
    fn on_event(&self, event: HandshakeEvent);
}

/// Discards all events.
pub struct NoOpObserver;

impl HandshakeObserver for NoOpObserver {
    fn on_event(&self, _event: HandshakeEvent) {}
}

/// Forwards events to the tracing subscriber.
pub struct LoggingObserver;

impl HandshakeObserver for LoggingObserver {
    fn on_event(&self, event: HandshakeEvent) {
        match event {
            HandshakeEvent::CookieIssued { source } => {
                info!(source = %source, "handshake cookie issued");
            }
            HandshakeEvent::InvitationAccepted { initiator } => {
                info!(initiator = %initiator, "handshake invitation accepted");
            }
            HandshakeEvent::Established { peer } => {
                info!(peer = %peer, "handshake established");
            }
            HandshakeEvent::Failed { peer, reason } => {
                warn!(peer = ?peer, reason = %reason, "handshake failed");
            }
        }
    }
}

/// Default no-op observer handle.
pub fn noop_observer() -> Arc<dyn HandshakeObserver> {
    Arc::new(NoOpObserver)
}
