//! Shutdown coordination for remote clients.
//!
//! Calls enter the coordinator before they start and leave it when their
//! guard drops. Once shutdown is triggered new calls are refused, in-flight
//! calls get a grace period to drain, and whatever is still running after
//! that is cancelled through the teardown token.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use vaultlink_core::{CancellationToken, Error, Result};

/// Coordinator for graceful shutdown
#[derive(Debug, Clone)]
pub struct Shutdown {
    inner: Arc<ShutdownInner>,
}

#[derive(Debug)]
struct ShutdownInner {
    component: String,
    triggered: AtomicBool,
    in_flight: AtomicUsize,
    drained: Notify,
    teardown: CancellationToken,
}

impl Shutdown {
    /// Create a new shutdown coordinator for `component`
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ShutdownInner {
                component: component.into(),
                triggered: AtomicBool::new(false),
                in_flight: AtomicUsize::new(0),
                drained: Notify::new(),
                teardown: CancellationToken::new(),
            }),
        }
    }

    /// Register a call; fails with `ShutDown` once shutdown has started
    pub fn enter(&self) -> Result<InFlightGuard> {
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        // Checked after incrementing so shutdown() never misses a call that got in
        if self.inner.triggered.load(Ordering::SeqCst) {
            self.leave();
            return Err(Error::shut_down(self.inner.component.clone()));
        }
        Ok(InFlightGuard {
            shutdown: self.clone(),
        })
    }

    /// Token cancelled when the grace period runs out
    pub fn teardown_token(&self) -> &CancellationToken {
        &self.inner.teardown
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Refuse new calls and wait up to `grace` for in-flight calls to finish.
    ///
    /// Returns `true` if everything drained in time. Otherwise the remaining
    /// calls are cancelled and `false` is returned.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        if !self.inner.triggered.swap(true, Ordering::SeqCst) {
            tracing::info!(
                component = %self.inner.component,
                in_flight = self.in_flight(),
                "Shutting down"
            );
        }

        let drained = tokio::time::timeout(grace, self.wait_drained()).await.is_ok();
        if !drained {
            tracing::warn!(
                component = %self.inner.component,
                in_flight = self.in_flight(),
                grace_ms = grace.as_millis() as u64,
                "Grace period elapsed, cancelling in-flight calls"
            );
            self.inner.teardown.cancel();
        }
        drained
    }

    async fn wait_drained(&self) {
        loop {
            let notified = self.inner.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn leave(&self) {
        if self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.drained.notify_waiters();
        }
    }
}

/// Marks one call as in flight until dropped
#[derive(Debug)]
pub struct InFlightGuard {
    shutdown: Shutdown,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.shutdown.leave();
    }
}
