//! Generic debounce utility.
//!
//! Delays emission of a value until no new value has arrived for a fixed
//! quiet period. A newer value discards the pending one and restarts the
//! timer, so at most one value is emitted per quiet period.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Debouncer<T> {
    input: mpsc::UnboundedSender<T>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Spawn a debouncer that forwards settled values to `output`.
    pub fn new(quiet: Duration, output: mpsc::UnboundedSender<T>) -> Self {
        let (input, mut rx) = mpsc::unbounded_channel::<T>();
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        let task = tokio::spawn(async move {
            let mut pending: Option<T> = None;
            loop {
                if pending.is_none() {
                    tokio::select! {
                        _ = task_cancel.cancelled() => break,
                        value = rx.recv() => match value {
                            Some(v) => pending = Some(v),
                            None => break,
                        },
                    }
                } else {
                    tokio::select! {
                        _ = task_cancel.cancelled() => break,
                        value = rx.recv() => match value {
                            // Supersede: restart the quiet period
                            Some(v) => pending = Some(v),
                            None => break,
                        },
                        _ = tokio::time::sleep(quiet) => {
                            if let Some(v) = pending.take() {
                                if output.send(v).is_err() {
                                    break;
                                }
                            }
                        },
                    }
                }
            }
        });

        Self {
            input,
            cancel,
            task,
        }
    }

    /// Submit a new value, discarding any pending emission.
    pub fn submit(&self, value: T) {
        let _ = self.input.send(value);
    }

    /// Cancel any pending emission and stop the debouncer.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn emits_latest_value_after_quiet_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let debouncer = Debouncer::new(Duration::from_millis(2000), tx);

        debouncer.submit("err");
        tokio::time::sleep(Duration::from_millis(500)).await;
        debouncer.submit("error");

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(rx.recv().await, Some("error"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn supersede_restarts_the_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let debouncer = Debouncer::new(Duration::from_millis(2000), tx);

        debouncer.submit(1);
        tokio::time::sleep(Duration::from_millis(1900)).await;
        debouncer.submit(2);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        // Neither value has settled yet
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(rx.recv().await, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_discards_pending_value() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let debouncer = Debouncer::new(Duration::from_millis(2000), tx);

        debouncer.submit("pending");
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert!(rx.try_recv().is_err());
    }
}
