//! Repeating background task that stops when its owner says so or goes away.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

const MIN_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug)]
pub struct Poller {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    /// Run `tick` immediately and then every `interval` until stopped.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn start<F, Fut>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let period = interval.max(MIN_INTERVAL);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = tick() => {}
                }
            }
            tracing::debug!("poller stopped");
        });

        Self {
            token,
            handle: Some(handle),
        }
    }

    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
            && self
                .handle
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop and wait for the task to wind down.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "poller task ended abnormally");
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(interval: Duration) -> (Poller, Arc<AtomicUsize>) {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let poller = Poller::start(interval, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        (poller, ticks)
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_until_stopped() {
        let (poller, ticks) = counting(Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(poller.is_running());

        poller.stop();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(!poller.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_owner_stops_polling() {
        let (poller, ticks) = counting(Duration::from_secs(5));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        drop(poller);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_the_task() {
        let (poller, _ticks) = counting(Duration::from_secs(5));
        poller.shutdown().await;
    }
}
