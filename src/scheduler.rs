//! Cancellable expiry timers
//!
//! Each armed timer is an independent tokio task selecting between its
//! deadline and a oneshot cancel channel. Cancelling an already-fired or
//! already-cancelled timer is a safe no-op; firing one timer never delays
//! another.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::trace;

/// Handle to a pending timer; dropping it without cancelling leaves the
/// timer armed
pub struct ExpiryHandle {
    cancel: Option<oneshot::Sender<()>>,
}

impl ExpiryHandle {
    /// Prevent a not-yet-fired timer from invoking its callback. Safe to
    /// call after the timer fired (the receiver is simply gone).
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
    }

    pub fn is_armed(&self) -> bool {
        self.cancel.is_some()
    }
}

/// Schedules one-shot expiry callbacks on the runtime
pub struct ExpiryScheduler {
    armed_total: Arc<AtomicU64>,
    cancelled_total: Arc<AtomicU64>,
}

impl ExpiryScheduler {
    pub fn new() -> Self {
        Self {
            armed_total: Arc::new(AtomicU64::new(0)),
            cancelled_total: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Schedule `on_expire` to run once after `delay`; returns the
    /// cancellation handle
    pub fn arm<F, Fut>(&self, delay: Duration, on_expire: F) -> ExpiryHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        self.armed_total.fetch_add(1, Ordering::Relaxed);
        let cancelled_total = self.cancelled_total.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    trace!("expiry timer fired");
                    on_expire().await;
                }
                _ = cancel_rx => {
                    trace!("expiry timer cancelled");
                    cancelled_total.fetch_add(1, Ordering::Relaxed);
                }
            }
        });

        ExpiryHandle {
            cancel: Some(cancel_tx),
        }
    }

    pub fn armed_total(&self) -> u64 {
        self.armed_total.load(Ordering::Relaxed)
    }

    pub fn cancelled_total(&self) -> u64 {
        self.cancelled_total.load(Ordering::Relaxed)
    }
}

impl Default for ExpiryScheduler {
    fn default() -> Self {
        Self::new()
    }
}
