use std::time::Duration;

use ramdb_wal::{repo::Repo, SegmentWriter};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error};

use crate::error::DurabilityError;

/// Configuration for a [`Barrier`].
#[derive(Clone, Copy, Debug)]
pub struct Options {
    /// Requests per flush before a size-triggered flush fires. Must be > 0.
    pub batch_max: usize,
    /// Upper bound on how long a request waits before a time-triggered
    /// flush fires. Must be >= 1ms.
    pub batch_timeout: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            batch_max: 64,
            batch_timeout: Duration::from_millis(50),
        }
    }
}

type Ack = oneshot::Sender<Result<(), DurabilityError>>;

struct Submission {
    bytes: Vec<u8>,
    ack: Ack,
}

enum Msg {
    Submit(Submission),
    Close(oneshot::Sender<Result<(), DurabilityError>>),
}

/// A cheaply-cloneable handle to a running [`Barrier`] worker.
///
/// A small `Clone` handle wrapping an `mpsc` sender, backed by a spawned
/// task that owns all the mutable state — the familiar actor split of a
/// thin handle in front of a task nothing else touches directly.
#[derive(Clone)]
pub struct Handle {
    tx: mpsc::UnboundedSender<Msg>,
    join: std::sync::Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Handle {
    /// Append `entry_bytes` to the in-flight batch and await durability.
    ///
    /// Returns once the batch containing this submission has been written
    /// and fsynced by the active segment (or has failed, in which case the
    /// same [`DurabilityError`] is returned to every submission in that
    /// batch).
    pub async fn submit(&self, entry_bytes: Vec<u8>) -> Result<(), DurabilityError> {
        let (ack, wait) = oneshot::channel();
        self.tx
            .send(Msg::Submit(Submission { bytes: entry_bytes, ack }))
            .map_err(|_| DurabilityError::Closed)?;
        wait.await.map_err(|_| DurabilityError::Closed)?
    }

    /// Stop accepting new submissions, drain any already in flight, perform
    /// a final flush, and close the underlying segment writer. Idempotent:
    /// calling twice returns `Closed` the second time.
    pub async fn close(&self) -> Result<(), DurabilityError> {
        let (done, wait) = oneshot::channel();
        if self.tx.send(Msg::Close(done)).is_err() {
            return Err(DurabilityError::Closed);
        }
        let result = wait.await.map_err(|_| DurabilityError::Closed)?;
        if let Some(join) = self.join.lock().await.take() {
            let _ = join.await;
        }
        result
    }
}

/// The group-commit barrier itself. Construct with
/// [`Barrier::spawn`], which starts the dedicated worker task and returns a
/// [`Handle`] to it; there is no public constructor for `Barrier` — it only
/// exists as the `run()` loop driving the worker.
pub struct Barrier<R: Repo> {
    rx: mpsc::UnboundedReceiver<Msg>,
    writer: SegmentWriter<R>,
    batch_max: usize,
    batch_timeout: Duration,
    buf: Vec<u8>,
    waiters: Vec<Ack>,
    degraded: Option<DurabilityError>,
}

impl<R: Repo + Send + 'static> Barrier<R>
where
    R::Segment: Send,
{
    /// Start the dedicated worker task that owns `writer` and drains
    /// submissions, returning a [`Handle`] for producers.
    pub fn spawn(writer: SegmentWriter<R>, opts: Options) -> Handle {
        assert!(opts.batch_max > 0, "batch_max must be strictly positive");
        assert!(opts.batch_timeout >= Duration::from_millis(1), "batch_timeout must be >= 1ms");

        let (tx, rx) = mpsc::unbounded_channel();
        let actor = Barrier {
            rx,
            writer,
            batch_max: opts.batch_max,
            batch_timeout: opts.batch_timeout,
            buf: Vec::new(),
            waiters: Vec::new(),
            degraded: None,
        };
        let join = tokio::spawn(actor.run());
        Handle {
            tx,
            join: std::sync::Arc::new(Mutex::new(Some(join))),
        }
    }

    /// A `{Submit, Tick, Close}` state machine collapsed into one
    /// `tokio::select!` loop owning `(buf, waiters)` single-threaded, so
    /// claiming the buffer is atomic for free — no other task ever
    /// observes `buf`.
    async fn run(mut self) {
        let mut ticker = interval(self.batch_timeout);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // first tick fires immediately; consume it.

        loop {
            tokio::select! {
                msg = self.rx.recv() => {
                    match msg {
                        Some(Msg::Submit(sub)) => {
                            self.accept(sub);
                            if self.waiters.len() >= self.batch_max {
                                self.flush().await;
                                ticker.reset();
                            }
                        }
                        Some(Msg::Close(done)) => {
                            self.drain_pending();
                            self.flush().await;
                            let close_result = self.writer.close().map_err(DurabilityError::from);
                            let result = match (&self.degraded, close_result) {
                                (Some(e), _) => Err(e.clone()),
                                (None, Err(e)) => Err(e),
                                (None, Ok(())) => Ok(()),
                            };
                            let _ = done.send(result);
                            return;
                        }
                        None => {
                            // All handles dropped without an explicit close: flush
                            // what we have and exit quietly.
                            self.flush().await;
                            return;
                        }
                    }
                }
                _ = ticker.tick() => {
                    if !self.waiters.is_empty() {
                        self.flush().await;
                    }
                }
            }
        }
    }

    /// Append one submission's bytes to the batch, or fail it immediately
    /// if a prior flush already put the barrier into the degraded state —
    /// a write failure here degrades the facade until restart.
    fn accept(&mut self, sub: Submission) {
        if let Some(err) = &self.degraded {
            let _ = sub.ack.send(Err(err.clone()));
            return;
        }
        self.buf.extend_from_slice(&sub.bytes);
        self.waiters.push(sub.ack);
    }

    /// Drain any submissions already queued on the channel without
    /// blocking for more.
    fn drain_pending(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                Msg::Submit(sub) => self.accept(sub),
                Msg::Close(done) => {
                    // A second close raced in; it will see the same
                    // outcome once we finish this one.
                    let _ = done.send(Err(DurabilityError::Closed));
                }
            }
        }
    }

    /// Take the current batch, write it via the segment writer, and notify
    /// every waiter exactly once.
    ///
    /// Runs synchronously on this worker task: the barrier has no other
    /// work in flight while a flush is outstanding, so blocking here for
    /// the duration of the write+fsync is the intended backpressure, not a
    /// stall — it caps concurrent in-flight flushes at one, so only one
    /// segment is ever being written at a time.
    async fn flush(&mut self) {
        if self.waiters.is_empty() {
            return;
        }
        let buf = std::mem::take(&mut self.buf);
        let waiters = std::mem::take(&mut self.waiters);
        let n = waiters.len();

        match self.writer.write(&buf) {
            Ok(_) => {
                debug!(requests = n, bytes = buf.len(), "flushed batch");
                for ack in waiters {
                    let _ = ack.send(Ok(()));
                }
            }
            Err(e) => {
                error!(requests = n, error = %e, "wal write failed, entering degraded state");
                let err = DurabilityError::from(e);
                self.degraded = Some(err.clone());
                for ack in waiters {
                    let _ = ack.send(Err(err.clone()));
                }
            }
        }
    }
}
