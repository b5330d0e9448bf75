//! Shutdown coordination for the router.

use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::watch;

use crate::lifecycle::startup::{ActiveListener, ListenerSet};

/// Stop trigger for one listener.
///
/// Its server and relay sessions watch the flag; dropping the trigger has
/// the same effect as firing it.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Number of live subscribers (server plus relay sessions).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// How a [`ListenerSet::shutdown`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every listener drained before the deadline.
    Graceful,
    /// The deadline elapsed; remaining work was abandoned.
    Forced,
}

impl ListenerSet {
    /// Stop every listener concurrently, bounded by `grace`.
    ///
    /// The listeners are taken out of the set under the lock, then stopped
    /// without it: each stops accepting and waits for in-flight requests and
    /// relay sessions.
    pub async fn shutdown(&self, grace: Duration) -> ShutdownOutcome {
        let mut stopping = std::mem::take(&mut *self.active.lock().await);
        tracing::info!(
            listeners = stopping.len(),
            grace_secs = grace.as_secs_f64(),
            "Shutting down listeners"
        );

        for listener in &stopping {
            listener.shutdown.trigger();
        }

        let stops = join_all(stopping.iter_mut().map(ActiveListener::stop));
        let drained = tokio::time::timeout(grace, stops).await.is_ok();

        if drained {
            tracing::info!("All servers gracefully shut down");
            ShutdownOutcome::Graceful
        } else {
            tracing::warn!("Shutdown timed out, forcing exit");
            for listener in &stopping {
                listener.task.abort();
            }
            ShutdownOutcome::Forced
        }
    }
}

impl ActiveListener {
    /// Stop this listener and wait for its server task and relay sessions.
    ///
    /// Errors are logged, never propagated, so one listener cannot hold up
    /// the others.
    async fn stop(&mut self) {
        let port = self.spec.listen_port;
        self.shutdown.trigger();

        match (&mut self.task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(listen_port = port, error = %e, "Error during server shutdown"),
            Err(e) => tracing::error!(listen_port = port, error = %e, "Server task failed"),
        }

        self.sessions.drained().await;
        tracing::info!(listen_port = port, "Server has been shut down");
    }
}
