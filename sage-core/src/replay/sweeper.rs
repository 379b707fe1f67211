//! Background garbage collection
//!
//! One periodic task sweeps every TTL-bounded store (nonces, dedupe
//! fingerprints, sessions) instead of a task per entity. The handle stops
//! the task cooperatively; dropping it detaches the sweeper.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::dedupe::DedupeDetector;
use super::nonce::NonceManager;

/// A store the sweeper can garbage-collect.
pub trait Sweepable: Send + Sync {
    /// Remove expired entries; returns how many were dropped.
    fn sweep_expired(&self) -> usize;
}

impl Sweepable for NonceManager {
    fn sweep_expired(&self) -> usize {
        self.sweep()
    }
}

impl Sweepable for DedupeDetector {
    fn sweep_expired(&self) -> usize {
        self.sweep()
    }
}

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// Spawn the shared maintenance task over `targets`.
pub fn spawn_sweeper(targets: Vec<Arc<dyn Sweepable>>, interval: Duration) -> SweeperHandle {
    let (tx, mut rx) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let mut removed = 0;
                    for target in &targets {
                        removed += target.sweep_expired();
                    }
                    if removed > 0 {
                        debug!(removed, "maintenance sweep");
                    }
                }
                _ = rx.changed() => {
                    info!("sweeper shutting down");
                    break;
                }
            }
        }
    });
    SweeperHandle { shutdown: tx, task }
}
