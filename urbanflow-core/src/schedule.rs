//! Fixed-interval polling loop.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A background task that runs a tick callback at a fixed interval.
///
/// The first tick fires immediately. Each tick awaits the previous one, so
/// ticks never overlap; ticks that fall due while a slow one is still
/// running are skipped rather than queued.
///
/// Dropping the loop aborts the task.
#[derive(Debug)]
pub struct PollLoop {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollLoop {
    /// Spawn the loop on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let period = period.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = timer.tick() => {}
                    _ = stop_rx.changed() => break,
                }
                if *stop_rx.borrow() {
                    break;
                }
                tick().await;
            }
        });

        Self { stop_tx, task }
    }

    /// Stop the loop, cancelling a tick that is still awaiting.
    pub fn stop(self) {
        // Drop does the rest.
        let _ = self.stop_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollLoop {
    fn drop(&mut self) {
        self.task.abort();
    }
}
