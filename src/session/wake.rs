use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Wake-up notification from the session (or a canceller) to the driver
///
/// A notification sent while nobody waits is kept as a single permit, so a
/// wake that races with the driver's processing is never lost.
#[derive(Debug, Clone, Default)]
pub struct WakeSignal {
    notify: Arc<Notify>,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Safe to call from any thread
    pub fn notify(&self) {
        self.notify.notify_one();
    }

    /// Wait for a notification or until `timeout` elapses.
    ///
    /// Returns true if woken by a notification.
    pub async fn wait(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.notify.notified())
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pending_notification_is_kept() {
        let wake = WakeSignal::new();
        wake.notify();
        assert!(wake.wait(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_times_out_without_notification() {
        let wake = WakeSignal::new();
        assert!(!wake.wait(Duration::from_millis(5)).await);
    }

    #[tokio::test]
    async fn test_notify_from_other_thread() {
        let wake = WakeSignal::new();
        let remote = wake.clone();
        std::thread::spawn(move || remote.notify());
        assert!(wake.wait(Duration::from_secs(1)).await);
    }
}
