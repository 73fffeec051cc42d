//! Periodic Refresh
//!
//! Runs a fetch immediately and then on a fixed interval, publishing each
//! result through a `watch` channel. The returned handle owns the task:
//! cancelling or dropping it stops the loop, and a fetch that completes
//! after cancellation is discarded instead of published.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Shortest refresh interval; shorter requests are raised to this
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Spawns refresh loops
pub struct Poller;

impl Poller {
    /// Start refreshing with `fetch` every `every`
    pub fn spawn<T, E, F, Fut>(every: Duration, mut fetch: F) -> RefreshHandle<T>
    where
        T: Send + Sync + 'static,
        E: std::fmt::Display + Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(None);
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let every = every.max(MIN_INTERVAL);

        let task = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if flag.load(Ordering::Acquire) {
                    break;
                }

                let result = fetch().await;

                if flag.load(Ordering::Acquire) {
                    tracing::debug!("Discarding refresh result after cancellation");
                    break;
                }
                if let Err(e) = &result {
                    tracing::error!("Refresh failed: {}", e);
                }
                let result = result.map_err(|e| e.to_string());
                if tx.send(Some(result)).is_err() {
                    // Nobody is watching any more
                    break;
                }
            }
        });

        RefreshHandle {
            rx,
            cancelled,
            task: Some(task),
        }
    }
}

/// Owns a refresh loop; dropping it stops the loop
pub struct RefreshHandle<T> {
    rx: watch::Receiver<Option<Result<T, String>>>,
    cancelled: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl<T> RefreshHandle<T> {
    /// Wait for the next published result
    ///
    /// Returns `None` once the loop has stopped.
    pub async fn next(&mut self) -> Option<watch::Ref<'_, Option<Result<T, String>>>> {
        if self.is_cancelled() {
            return None;
        }
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update())
    }

    /// Latest published result, if any
    pub fn latest(&self) -> watch::Ref<'_, Option<Result<T, String>>> {
        self.rx.borrow()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Stop refreshing; results still in flight are discarded
    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<T> Drop for RefreshHandle<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_publishes_immediately_and_repeatedly() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut handle = Poller::spawn(Duration::from_millis(20), move || {
            let counter = Arc::clone(&counter);
            async move { Ok::<_, String>(counter.fetch_add(1, Ordering::SeqCst) + 1) }
        });

        let first = handle.next().await.map(|r| r.clone());
        assert_eq!(first, Some(Some(Ok(1))));
        let second = handle.next().await.map(|r| r.clone());
        assert_eq!(second, Some(Some(Ok(2))));

        handle.cancel();
        assert!(handle.next().await.is_none());
    }

    #[tokio::test]
    async fn test_zero_interval_is_clamped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut handle = Poller::spawn(Duration::ZERO, move || {
            let counter = Arc::clone(&counter);
            async move { Ok::<_, String>(counter.fetch_add(1, Ordering::SeqCst) + 1) }
        });

        let first = handle.next().await.and_then(|r| r.clone()).unwrap().unwrap();
        let second = handle.next().await.and_then(|r| r.clone()).unwrap().unwrap();
        assert!(second > first);
        handle.cancel();
    }

    #[tokio::test]
    async fn test_errors_are_published_as_text() {
        let mut handle = Poller::spawn(Duration::from_secs(60), || async {
            Err::<u32, _>("backend down")
        });

        let result = handle.next().await.map(|r| r.clone());
        assert_eq!(result, Some(Some(Err("backend down".to_string()))));
    }

    #[tokio::test]
    async fn test_cancel_discards_in_flight_result() {
        let started = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&started);

        let mut handle = Poller::spawn(Duration::from_secs(60), move || {
            let flag = Arc::clone(&flag);
            async move {
                flag.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok::<_, String>(42)
            }
        });

        // Let the first fetch start, then cancel while it sleeps
        while started.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        handle.cancel();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(handle.latest().is_none());
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_stops_loop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let handle = Poller::spawn(Duration::from_millis(10), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(())
            }
        });

        tokio::time::sleep(Duration::from_millis(35)).await;
        drop(handle);
        let after_drop = calls.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), after_drop);
    }
}
