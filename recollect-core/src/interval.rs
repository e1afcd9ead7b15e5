//! Periodic background task with an explicit stop handle.

use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::error::Error;

/// Handle to a running periodic task
///
/// The task stops when [`Interval::stop`] is called, when the handle is
/// dropped, or when its callback returns `false`.
#[derive(Debug)]
pub struct Interval {
    /// Sender to signal shutdown to the task
    shutdown_tx: watch::Sender<bool>,
}

impl Interval {
    /// Stops future invocations. Safe to call any number of times.
    ///
    /// A run already in progress is allowed to finish.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Returns `true` until the task has exited
    pub fn is_running(&self) -> bool {
        !self.shutdown_tx.is_closed()
    }
}

impl Drop for Interval {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Runs `task` every `period` on the runtime behind `handle`.
///
/// The callback returns whether to keep running. With `immediate` set the
/// first run happens right away, otherwise after one full period. The caller
/// does not need to be inside the runtime itself.
///
/// # Errors
///
/// Returns `Error::InvalidArgument` for a zero period.
pub fn every<F, Fut>(handle: &Handle, period: Duration, immediate: bool, mut task: F) -> Result<Interval, Error>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    if period.is_zero() {
        return Err(Error::InvalidArgument("interval period must be positive".to_string()));
    }

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    handle.spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        if !immediate {
            // Skip the first immediate tick - we want to wait for the interval first
            ticker.tick().await;
        }

        loop {
            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if !task().await {
                        break;
                    }
                }
            }
        }
    });

    Ok(Interval { shutdown_tx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(counter: &Arc<AtomicUsize>) -> impl FnMut() -> std::future::Ready<bool> + Send + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(true)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_every_period() {
        let runs = Arc::new(AtomicUsize::new(0));
        let _interval = every(&Handle::current(), Duration::from_millis(100), false, counting(&runs)).unwrap();

        tokio::time::sleep(Duration::from_millis(550)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_runs_at_start() {
        let runs = Arc::new(AtomicUsize::new(0));
        let _interval = every(&Handle::current(), Duration::from_millis(100), true, counting(&runs)).unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_runs_and_is_idempotent() {
        let runs = Arc::new(AtomicUsize::new(0));
        let interval = every(&Handle::current(), Duration::from_millis(100), false, counting(&runs)).unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;
        interval.stop();
        interval.stop();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(!interval.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_task() {
        let runs = Arc::new(AtomicUsize::new(0));
        let interval = every(&Handle::current(), Duration::from_millis(100), false, counting(&runs)).unwrap();
        drop(interval);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_false_ends_task() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let interval = every(&Handle::current(), Duration::from_millis(100), false, move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(n < 3)
        })
        .unwrap();

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert!(!interval.is_running());
    }

    #[tokio::test]
    async fn test_zero_period_rejected() {
        let err = every(&Handle::current(), Duration::ZERO, false, || std::future::ready(true)).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_spawns_from_outside_runtime() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();
        let runs = Arc::new(AtomicUsize::new(0));

        // Scheduled from a plain thread, runs once the runtime is driven
        let interval = every(runtime.handle(), Duration::from_millis(100), false, counting(&runs)).unwrap();
        assert!(interval.is_running());

        runtime.block_on(async { tokio::time::sleep(Duration::from_millis(350)).await });
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}
