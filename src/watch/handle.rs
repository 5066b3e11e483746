//! Completion handle and counters for a running watch loop.

use crate::error::{GpsdError, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Why a watch loop stopped without error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchExit {
    /// The peer closed the connection.
    EndOfStream,
    /// The session was closed locally.
    Closed,
}

/// Live counters updated by the watch loop.
#[derive(Debug, Default)]
pub(crate) struct WatchCounters {
    pub lines_read: AtomicU64,
    pub lines_skipped: AtomicU64,
    pub decode_attempts: AtomicU64,
    pub decode_errors: AtomicU64,
    pub reports_dispatched: AtomicU64,
}

impl WatchCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WatchStats {
        WatchStats {
            lines_read: self.lines_read.load(Ordering::Relaxed),
            lines_skipped: self.lines_skipped.load(Ordering::Relaxed),
            decode_attempts: self.decode_attempts.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            reports_dispatched: self.reports_dispatched.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time watch loop statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WatchStats {
    /// Non-empty lines read from the stream.
    pub lines_read: u64,
    /// Lines discarded because their class is unmodelled or unsubscribed.
    pub lines_skipped: u64,
    /// Full decodes attempted.
    pub decode_attempts: u64,
    /// Lines that failed to classify or decode.
    pub decode_errors: u64,
    /// Reports handed to the filter registry.
    pub reports_dispatched: u64,
}

/// Handle to a watch loop running on a background thread.
///
/// The loop sends its outcome exactly once when it stops. The first
/// successful wait returns it; later waits return
/// [`GpsdError::WatchFinished`]. If the loop thread died without sending
/// an outcome, the first wait returns [`GpsdError::WatchPanicked`].
pub struct WatchHandle {
    receiver: Receiver<Result<WatchExit>>,
    counters: Arc<WatchCounters>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl WatchHandle {
    pub(crate) fn new(
        receiver: Receiver<Result<WatchExit>>,
        counters: Arc<WatchCounters>,
        thread: JoinHandle<()>,
    ) -> Self {
        Self {
            receiver,
            counters,
            thread: Mutex::new(Some(thread)),
        }
    }

    /// Block until the loop stops.
    pub fn wait(&self) -> Result<WatchExit> {
        match self.receiver.recv() {
            Ok(outcome) => {
                self.join();
                outcome
            }
            Err(_) => Err(self.disconnected()),
        }
    }

    /// Block until the loop stops or `timeout` elapses.
    ///
    /// Returns `None` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<WatchExit>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => {
                self.join();
                Some(outcome)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(self.disconnected())),
        }
    }

    /// Take the outcome if the loop has stopped (non-blocking).
    pub fn try_wait(&self) -> Option<Result<WatchExit>> {
        match self.receiver.try_recv() {
            Ok(outcome) => {
                self.join();
                Some(outcome)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(self.disconnected())),
        }
    }

    /// Whether the loop thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread
            .lock()
            .as_ref()
            .map_or(true, JoinHandle::is_finished)
    }

    /// Current counters.
    pub fn stats(&self) -> WatchStats {
        self.counters.snapshot()
    }

    /// Join the loop thread if it has not been joined yet.
    ///
    /// Returns `false` if the thread panicked.
    fn join(&self) -> bool {
        match self.thread.lock().take() {
            Some(thread) => match thread.join() {
                Ok(()) => true,
                Err(_) => {
                    tracing::error!("Watch thread panicked");
                    false
                }
            },
            None => true,
        }
    }

    /// Error for a closed outcome channel.
    ///
    /// The sender is gone either because the outcome was already taken or
    /// because the thread unwound before sending one.
    fn disconnected(&self) -> GpsdError {
        if self.join() {
            GpsdError::WatchFinished
        } else {
            GpsdError::WatchPanicked
        }
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("finished", &self.is_finished())
            .field("stats", &self.stats())
            .finish()
    }
}
