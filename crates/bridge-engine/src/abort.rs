use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Cooperative cancellation shared by everything working on one item.
///
/// Requesting an abort never interrupts an operation body already in
/// flight; it stops the next attempt and wakes any pending backoff wait.
#[derive(Clone, Debug, Default)]
pub struct AbortHandle {
    requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_abort(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_abort_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Sleeps for `delay` unless an abort arrives first. Returns `false` when
    /// the wait ended because of an abort.
    pub async fn wait_or_abort(&self, delay: Duration) -> bool {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_abort_requested() {
            return false;
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => !self.is_abort_requested(),
            _ = &mut notified => false,
        }
    }
}
