//! Graceful shutdown coordinator: a `broadcast` channel subscribed to by
//! every long-running task, plus an ordered teardown of owned resources.
//!
//! Grounded on `src/graceful_shutdown.rs`'s `GracefulShutdown`, trimmed of
//! the component-registry/closure machinery — this server only ever has
//! two long-running tasks (listener, refresh loop) and one resource to
//! close (the cache's storage backend), so a fixed teardown sequence reads
//! more plainly than a generic registry.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::cache::RecordCache;

pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Signal shutdown, give in-flight tasks a moment to notice, then close
    /// the cache's storage backend.
    pub async fn shutdown(&self, cache: &Arc<RecordCache>) {
        info!("shutdown requested");

        if self.tx.send(()).is_err() {
            warn!("shutdown signal had no subscribers");
        }

        tokio::time::sleep(Duration::from_millis(200)).await;

        if let Err(e) = cache.close() {
            error!(error = %e, "failed to close storage backend cleanly");
        }

        info!("shutdown complete");
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for SIGINT (or, on unix, SIGTERM too), matching the signal set a
/// POSIX service is expected to honor (spec §7).
pub async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
