use crate::batch::BatchAccumulator;
use crate::config::{FailureCallback, LogzioConfig};
use crate::diagnostics;
use crate::error::{DeliveryError, DispatcherClosed};
use crate::event::LogEvent;
use crate::formatter::{report_drop, EventFormatter};
use crate::transport::HttpTransport;
use std::ops::Deref;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout_at, Duration, Instant};
use tokio_util::sync::CancellationToken;

const CONTENT_TYPE: &str = "application/json";

/// Messages processed by the dispatcher task.
#[derive(Debug)]
enum Command {
    Event(LogEvent),
    Flush(oneshot::Sender<()>),
}

/// Observable state of the dispatcher task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// No pending events.
    Idle,
    /// Events queued, flush timer running.
    Accumulating,
    /// A batch is being formatted and sent.
    Flushing,
    /// Shut down; no further events are accepted.
    Closed,
}

impl DispatcherState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => DispatcherState::Idle,
            1 => DispatcherState::Accumulating,
            2 => DispatcherState::Flushing,
            _ => DispatcherState::Closed,
        }
    }
}

/// Cheap, cloneable producer side of a running dispatcher.
///
/// `enqueue` never blocks and never touches the network: events go into a
/// bounded channel and are dropped (and counted) when it is full or closed.
#[derive(Clone)]
pub struct DispatcherHandle {
    sender: mpsc::Sender<Command>,
    shutdown: CancellationToken,
    closed: CancellationToken,
    shutdown_timeout: Duration,
    state: Arc<AtomicU8>,
    /// Events accepted into the queue.
    pub enqueued_events: Arc<AtomicU64>,
    /// Events rejected because the queue was full or closed.
    pub dropped_events: Arc<AtomicU64>,
    /// Batches accepted by the listener.
    pub delivered_batches: Arc<AtomicU64>,
    /// Batches that failed with a non-2xx status or a transport error.
    pub failed_batches: Arc<AtomicU64>,
}

impl DispatcherHandle {
    /// Queue an event for the next batch. Returns `false` if it was dropped.
    pub fn enqueue(&self, event: LogEvent) -> bool {
        if self.shutdown.is_cancelled() {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        match self.sender.try_send(Command::Event(event)) {
            Ok(()) => {
                self.enqueued_events.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => {
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Flush everything queued so far and wait for the send attempt.
    pub async fn flush(&self) -> Result<(), DispatcherClosed> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(Command::Flush(tx))
            .await
            .map_err(|_| DispatcherClosed)?;
        rx.await.map_err(|_| DispatcherClosed)
    }

    /// Stop the dispatcher: abandon any request in flight, drain the queue
    /// through final flushes, then release the transport.
    ///
    /// The signal bypasses the queue. The dispatcher bounds its drain by the
    /// configured shutdown timeout and this call waits at most that long.
    /// Calling it again is harmless.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        if tokio::time::timeout(self.shutdown_timeout, self.closed.cancelled())
            .await
            .is_err()
        {
            tracing::warn!(
                target: diagnostics::TARGET,
                timeout = ?self.shutdown_timeout,
                "dispatcher did not close in time"
            );
        }
    }

    /// Signal shutdown without waiting for it.
    pub fn begin_shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn state(&self) -> DispatcherState {
        DispatcherState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

/// Keeps the dispatcher alive for as long as it is held.
///
/// Dropping the guard signals shutdown, so the final drain and the transport
/// release happen on every exit path of the host, including early returns
/// and unwinding. Await [`DispatcherHandle::shutdown`] through the guard to
/// also wait for it.
#[must_use = "dropping the guard shuts the dispatcher down"]
pub struct DispatcherGuard {
    handle: DispatcherHandle,
}

impl DispatcherGuard {
    pub fn new(handle: DispatcherHandle) -> Self {
        Self { handle }
    }
}

impl Deref for DispatcherGuard {
    type Target = DispatcherHandle;

    fn deref(&self) -> &DispatcherHandle {
        &self.handle
    }
}

impl Drop for DispatcherGuard {
    fn drop(&mut self) {
        self.handle.begin_shutdown();
    }
}

/// Background batching engine.
///
/// One task per sink owns the transport, the formatter and the pending
/// batch. Flushes run inline in that task, so at most one request is in
/// flight and triggers that fire meanwhile wait for it to complete. A
/// shutdown signal cuts a flush in flight short.
pub struct Dispatcher {
    receiver: mpsc::Receiver<Command>,
    transport: Box<dyn HttpTransport>,
    formatter: EventFormatter,
    assembler: BatchAccumulator,
    url: Option<String>,
    batch_size_limit: usize,
    period: Duration,
    shutdown_timeout: Duration,
    failure_callback: Option<FailureCallback>,
    shutdown: CancellationToken,
    closed: CancellationToken,
    state: Arc<AtomicU8>,
    delivered_batches: Arc<AtomicU64>,
    failed_batches: Arc<AtomicU64>,
}

impl Dispatcher {
    /// Validate `config`, spawn the dispatcher task on the current Tokio
    /// runtime and return its handle.
    ///
    /// Minimal thresholds are enforced for the queue, batch size and period
    /// to avoid degenerate configurations. A config without a usable URL
    /// produces one diagnostic here and a dispatcher that discards batches.
    pub fn spawn<T>(config: LogzioConfig, transport: T) -> (DispatcherHandle, JoinHandle<()>)
    where
        T: HttpTransport + 'static,
    {
        let queue_limit = config.queue_limit.max(16);
        let batch_size_limit = config.batch_size_limit.max(1);
        let period = config.period.max(Duration::from_millis(10));

        let url = match config.listener_url() {
            Ok(url) => Some(url),
            Err(err) => {
                tracing::warn!(target: diagnostics::TARGET, "{}", err);
                None
            }
        };

        let (tx, rx) = mpsc::channel(queue_limit);
        let shutdown = CancellationToken::new();
        let closed = CancellationToken::new();
        let state = Arc::new(AtomicU8::new(DispatcherState::Idle as u8));
        let delivered_batches = Arc::new(AtomicU64::new(0));
        let failed_batches = Arc::new(AtomicU64::new(0));

        let dispatcher = Dispatcher {
            receiver: rx,
            transport: Box::new(transport),
            formatter: EventFormatter::new(config.formatting),
            assembler: BatchAccumulator::new(config.document_limit_bytes),
            url,
            batch_size_limit,
            period,
            shutdown_timeout: config.shutdown_timeout,
            failure_callback: config.failure_callback,
            shutdown: shutdown.clone(),
            closed: closed.clone(),
            state: Arc::clone(&state),
            delivered_batches: Arc::clone(&delivered_batches),
            failed_batches: Arc::clone(&failed_batches),
        };
        let handle = tokio::spawn(dispatcher.run());

        (
            DispatcherHandle {
                sender: tx,
                shutdown,
                closed,
                shutdown_timeout: config.shutdown_timeout,
                state,
                enqueued_events: Arc::new(AtomicU64::new(0)),
                dropped_events: Arc::new(AtomicU64::new(0)),
                delivered_batches,
                failed_batches,
            },
            handle,
        )
    }

    async fn run(mut self) {
        let shutdown = self.shutdown.clone();
        let mut batch: Vec<LogEvent> = Vec::with_capacity(self.batch_size_limit);
        let mut deadline: Option<Instant> = None;

        loop {
            let next_deadline = deadline;
            let timer = async move {
                match next_deadline {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            let flush_now = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                command = self.receiver.recv() => match command {
                    Some(Command::Event(event)) => {
                        if batch.is_empty() {
                            deadline = Some(Instant::now() + self.period);
                            self.set_state(DispatcherState::Accumulating);
                        }
                        batch.push(event);
                        (batch.len() >= self.batch_size_limit).then_some(None)
                    }
                    Some(Command::Flush(ack)) => Some(Some(ack)),
                    // Every handle is gone: same shutdown sequence.
                    None => break,
                },
                _ = timer => Some(None),
            };

            if let Some(ack) = flush_now {
                deadline = None;
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => {
                        tracing::warn!(
                            target: diagnostics::TARGET,
                            "shutdown requested during a flush, abandoning the request in flight"
                        );
                        break;
                    }
                    _ = self.flush(&mut batch) => {}
                }
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
            }
        }

        self.close(batch).await;
    }

    async fn close(mut self, mut batch: Vec<LogEvent>) {
        self.receiver.close();
        let shutdown_timeout = self.shutdown_timeout;
        let drain_deadline = Instant::now() + shutdown_timeout;

        let final_flush = async {
            while let Some(command) = self.receiver.recv().await {
                match command {
                    Command::Event(event) => {
                        batch.push(event);
                        if batch.len() >= self.batch_size_limit {
                            self.flush(&mut batch).await;
                        }
                    }
                    Command::Flush(ack) => {
                        self.flush(&mut batch).await;
                        let _ = ack.send(());
                    }
                }
            }
            self.flush(&mut batch).await;
        };

        if timeout_at(drain_deadline, final_flush).await.is_err() {
            tracing::warn!(
                target: diagnostics::TARGET,
                timeout = ?shutdown_timeout,
                "final flush did not complete in time, remaining events are lost"
            );
        }

        self.transport.close().await;
        self.set_state(DispatcherState::Closed);
        self.shutdown.cancel();
        self.closed.cancel();
    }

    /// Format, assemble and send the pending batch. The batch is consumed
    /// whatever the outcome; nothing is requeued.
    ///
    /// Events that arrived during the send leave the dispatcher in
    /// `Accumulating`. Their period starts when they are dequeued.
    async fn flush(&mut self, batch: &mut Vec<LogEvent>) {
        if batch.is_empty() {
            return;
        }
        self.set_state(DispatcherState::Flushing);
        let events = std::mem::replace(batch, Vec::with_capacity(self.batch_size_limit));

        if let Some(url) = self.url.clone() {
            self.send(&url, &events).await;
        }

        if self.receiver.is_empty() {
            self.set_state(DispatcherState::Idle);
        } else {
            self.set_state(DispatcherState::Accumulating);
        }
    }

    async fn send(&self, url: &str, events: &[LogEvent]) {
        let documents: Vec<String> = events
            .iter()
            .filter_map(|event| match self.formatter.format(event) {
                Ok(json) => Some(json),
                Err(reason) => {
                    report_drop(event, &reason);
                    None
                }
            })
            .collect();

        let assembled = self.assembler.assemble(&documents);
        if assembled.is_empty() {
            tracing::debug!(
                target: diagnostics::TARGET,
                events = events.len(),
                "every event in the batch was dropped, skipping request"
            );
            return;
        }

        let included = assembled.included;
        let result = self
            .transport
            .post(url, assembled.payload.into_bytes(), CONTENT_TYPE)
            .await;

        let failure = match result {
            Ok(resp) if resp.is_success() => {
                self.delivered_batches.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    target: diagnostics::TARGET,
                    events = included,
                    status = resp.status,
                    "batch delivered"
                );
                return;
            }
            Ok(resp) => DeliveryError::Status {
                status: resp.status,
                url: url.to_string(),
                body: resp.body,
            },
            Err(source) => DeliveryError::Transport {
                url: url.to_string(),
                source,
            },
        };
        self.report_failure(&failure, included);
    }

    fn report_failure(&self, failure: &DeliveryError, events: usize) {
        self.failed_batches.fetch_add(1, Ordering::Relaxed);
        tracing::error!(
            target: diagnostics::TARGET,
            events,
            error = %failure,
            "failed to deliver log batch, dropping it"
        );

        if let Some(callback) = &self.failure_callback {
            if panic::catch_unwind(AssertUnwindSafe(|| callback(failure))).is_err() {
                tracing::error!(target: diagnostics::TARGET, "failure callback panicked");
            }
        }
    }

    fn set_state(&self, state: DispatcherState) {
        self.state.store(state as u8, Ordering::Release);
    }
}
