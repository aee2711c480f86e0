//! Live-tail session: owns at most one push-stream subscription at a time.
//!
//! State machine: `Idle -> Starting -> Active -> Stopping -> Idle`, plus
//! `Failed` on transport errors. Starting a new session implicitly stops
//! the previous one, and `stop()` guarantees that no message delivered
//! afterwards can reach the buffer.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::query::TailEndpoint;
use crate::types::LogRecord;

/// Raw event payloads from the push stream, one JSON log record per item
pub type TailStream = BoxStream<'static, Result<String>>;

/// The push-stream transport collaborator.
///
/// `open` resolves once the connection is confirmed open; the returned
/// stream yields event payloads until the transport fails or the server
/// closes the subscription.
#[async_trait]
pub trait TailTransport: Send + Sync {
    async fn open(&self, endpoint: TailEndpoint, token: Option<String>) -> Result<TailStream>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TailState {
    Idle,
    Starting,
    Active,
    Stopping,
    Failed,
}

#[derive(Debug)]
enum TailEvent {
    Opened,
    Record(LogRecord),
    Error(Error),
    Closed,
}

struct LiveTail {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    events: mpsc::UnboundedReceiver<TailEvent>,
}

impl LiveTail {
    fn release(self) {
        self.cancel.cancel();
        self.task.abort();
        // Dropping the receiver discards anything still in flight
    }
}

/// Owner of the single live subscription.
pub struct TailSession {
    transport: Arc<dyn TailTransport>,
    state: TailState,
    live: Option<LiveTail>,
}

impl TailSession {
    pub fn new(transport: Arc<dyn TailTransport>) -> Self {
        Self {
            transport,
            state: TailState::Idle,
            live: None,
        }
    }

    pub fn state(&self) -> TailState {
        self.state
    }

    /// True while a subscription is being opened or receiving
    pub fn is_live(&self) -> bool {
        matches!(self.state, TailState::Starting | TailState::Active)
    }

    /// Open a subscription for the given endpoint.
    ///
    /// Any previous subscription is stopped first; there is never more than
    /// one live transport resource per session.
    pub fn start(&mut self, endpoint: TailEndpoint, token: Option<String>) {
        self.stop();

        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let transport = Arc::clone(&self.transport);

        let task = tokio::spawn(async move {
            let opened = tokio::select! {
                _ = task_cancel.cancelled() => return,
                opened = transport.open(endpoint, token) => opened,
            };

            let mut stream = match opened {
                Ok(stream) => {
                    let _ = tx.send(TailEvent::Opened);
                    stream
                }
                Err(err) => {
                    let _ = tx.send(TailEvent::Error(err));
                    return;
                }
            };

            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    next = stream.next() => match next {
                        Some(Ok(payload)) => match serde_json::from_str::<LogRecord>(&payload) {
                            Ok(record) => {
                                if tx.send(TailEvent::Record(record)).is_err() {
                                    break;
                                }
                            }
                            // Malformed messages are dropped, not fatal
                            Err(err) => {
                                let err = Error::MalformedStreamMessage(err);
                                tracing::warn!(error = %err, "dropping malformed stream message");
                            }
                        },
                        Some(Err(err)) => {
                            let _ = tx.send(TailEvent::Error(err));
                            break;
                        }
                        None => {
                            let _ = tx.send(TailEvent::Closed);
                            break;
                        }
                    },
                }
            }
        });

        self.live = Some(LiveTail {
            cancel,
            task,
            events: rx,
        });
        self.state = TailState::Starting;
        tracing::debug!("tail session starting");
    }

    /// Tear down the subscription. Idempotent; a no-op from `Idle`.
    ///
    /// Once this returns, no further event from the old subscription can be
    /// observed through `drain`.
    pub fn stop(&mut self) {
        if let Some(live) = self.live.take() {
            self.state = TailState::Stopping;
            live.release();
            tracing::debug!("tail session stopped");
        }
        self.state = TailState::Idle;
    }

    /// Drain pending events, advancing the state machine.
    ///
    /// Returns records in arrival order plus the terminal error, if the
    /// stream failed. On failure the transport resource is released and the
    /// session parks in `Failed` until `stop` returns it to `Idle`.
    pub fn drain(&mut self) -> (Vec<LogRecord>, Option<Error>) {
        let mut records = Vec::new();
        let mut failure = None;

        {
            let Some(live) = self.live.as_mut() else {
                return (records, None);
            };
            loop {
                match live.events.try_recv() {
                    Ok(TailEvent::Opened) => self.state = TailState::Active,
                    Ok(TailEvent::Record(record)) => records.push(record),
                    Ok(TailEvent::Error(err)) => {
                        failure = Some(err);
                        break;
                    }
                    Ok(TailEvent::Closed) => {
                        failure = Some(Error::StreamError {
                            detail: "stream closed by server".to_string(),
                        });
                        break;
                    }
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            }
        }

        if failure.is_some() {
            if let Some(live) = self.live.take() {
                live.release();
            }
            self.state = TailState::Failed;
        }

        (records, failure)
    }
}

impl Drop for TailSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::TailParam;
    use crate::types::Platform;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport that replays a scripted list of payloads, tracking how
    /// many streams are open at once.
    struct ScriptedTransport {
        scripts: Mutex<Vec<Vec<Result<String>>>>,
        opens: AtomicUsize,
        live: Arc<AtomicUsize>,
    }

    impl ScriptedTransport {
        fn new(scripts: Vec<Vec<Result<String>>>) -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(scripts),
                opens: AtomicUsize::new(0),
                live: Arc::new(AtomicUsize::new(0)),
            })
        }
    }

    struct LiveGuard(Arc<AtomicUsize>);

    impl Drop for LiveGuard {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl TailTransport for ScriptedTransport {
        async fn open(&self, _endpoint: TailEndpoint, _token: Option<String>) -> Result<TailStream> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            let mut scripts = self.scripts.lock().unwrap();
            if scripts.is_empty() {
                return Err(Error::StreamError {
                    detail: "connection refused".to_string(),
                });
            }
            let items = scripts.remove(0);
            self.live.fetch_add(1, Ordering::SeqCst);
            let guard = LiveGuard(Arc::clone(&self.live));
            // After the scripted items the stream stays open (pending) until
            // dropped; the guard rides along so the live count drops with it
            let tail = futures::stream::poll_fn(move |_| {
                let _ = &guard;
                std::task::Poll::Pending
            });
            Ok(futures::stream::iter(items).chain(tail).boxed())
        }
    }

    fn endpoint() -> TailEndpoint {
        TailEndpoint {
            platform: Platform::Aws,
            param: TailParam::LogGroup("app-logs".to_string()),
        }
    }

    fn record_json(n: usize) -> Result<String> {
        Ok(format!(
            r#"{{"timestamp":"2024-01-15T10:00:00Z","level":"INFO","message":"m{}","source":"app-logs"}}"#,
            n
        ))
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn records_arrive_in_order_and_session_activates() {
        let transport = ScriptedTransport::new(vec![vec![record_json(1), record_json(2)]]);
        let mut session = TailSession::new(transport.clone());
        assert_eq!(session.state(), TailState::Idle);

        session.start(endpoint(), None);
        assert_eq!(session.state(), TailState::Starting);
        settle().await;

        let (records, failure) = session.drain();
        assert_eq!(session.state(), TailState::Active);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message, "m1");
        assert_eq!(records[1].message, "m2");
        assert!(failure.is_none());
    }

    #[tokio::test]
    async fn malformed_messages_are_dropped_without_killing_the_session() {
        let transport = ScriptedTransport::new(vec![vec![
            record_json(1),
            Ok("not json".to_string()),
            record_json(2),
        ]]);
        let mut session = TailSession::new(transport);
        session.start(endpoint(), None);
        settle().await;

        let (records, failure) = session.drain();
        assert_eq!(records.len(), 2);
        assert!(failure.is_none());
        assert_eq!(session.state(), TailState::Active);
    }

    #[tokio::test]
    async fn transport_error_parks_the_session_in_failed() {
        let transport = ScriptedTransport::new(vec![vec![
            record_json(1),
            Err(Error::StreamError {
                detail: "connection reset".to_string(),
            }),
        ]]);
        let mut session = TailSession::new(transport);
        session.start(endpoint(), None);
        settle().await;

        let (records, failure) = session.drain();
        assert_eq!(records.len(), 1);
        assert!(matches!(failure, Some(Error::StreamError { .. })));
        assert_eq!(session.state(), TailState::Failed);

        // stop() from Failed returns to Idle
        session.stop();
        assert_eq!(session.state(), TailState::Idle);
    }

    #[tokio::test]
    async fn failed_open_is_surfaced_and_resumable() {
        let transport = ScriptedTransport::new(vec![]);
        let mut session = TailSession::new(transport);
        session.start(endpoint(), None);
        settle().await;

        let (records, failure) = session.drain();
        assert!(records.is_empty());
        assert!(matches!(failure, Some(Error::StreamError { .. })));
        assert_eq!(session.state(), TailState::Failed);
    }

    #[tokio::test]
    async fn restart_never_holds_two_transport_resources() {
        let transport = ScriptedTransport::new(vec![vec![record_json(1)], vec![record_json(2)]]);
        let mut session = TailSession::new(transport.clone());

        session.start(endpoint(), None);
        settle().await;
        assert!(transport.live.load(Ordering::SeqCst) <= 1);

        session.start(endpoint(), None);
        settle().await;
        assert!(transport.live.load(Ordering::SeqCst) <= 1);
        assert_eq!(transport.opens.load(Ordering::SeqCst), 2);

        let (records, _) = session.drain();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "m2");
    }

    #[tokio::test]
    async fn messages_after_stop_are_never_observed() {
        let transport = ScriptedTransport::new(vec![vec![record_json(1), record_json(2)]]);
        let mut session = TailSession::new(transport);
        session.start(endpoint(), None);
        settle().await;

        // Events are already queued; stop before draining them
        session.stop();
        assert_eq!(session.state(), TailState::Idle);

        let (records, failure) = session.drain();
        assert!(records.is_empty());
        assert!(failure.is_none());

        settle().await;
        let (records, _) = session.drain();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn stop_is_idempotent_from_idle() {
        let transport = ScriptedTransport::new(vec![]);
        let mut session = TailSession::new(transport);
        session.stop();
        session.stop();
        assert_eq!(session.state(), TailState::Idle);
    }
}
