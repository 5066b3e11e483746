//! The watch loop.
//!
//! One background thread per session reads lines, classifies them,
//! decodes the ones somebody listens to and dispatches them to the
//! filter registry. Callbacks run inline, so a slow filter delays the
//! next read.
//!
//! The loop stops on end of stream, on a local close, or on a read
//! error. Per-line problems never stop it.

mod handle;

pub use handle::{WatchExit, WatchHandle, WatchStats};
pub(crate) use handle::WatchCounters;

use crate::error::{DecodeError, GpsdError, Result};
use crate::filters::FilterRegistry;
use crate::report::{decode, is_known_class, peek_class};
use crossbeam_channel::bounded;
use std::io::BufRead;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Callback receiving every line that could not be classified or decoded.
pub type DecodeErrorHandler = Arc<dyn Fn(&DecodeError) + Send + Sync>;

/// State owned by the loop thread.
pub(crate) struct WatchLoop<R> {
    reader: R,
    filters: Arc<FilterRegistry>,
    /// Set by the session before it shuts the socket down.
    closed: Arc<AtomicBool>,
    counters: Arc<WatchCounters>,
    on_decode_error: Option<DecodeErrorHandler>,
}

impl<R: BufRead> WatchLoop<R> {
    pub fn new(
        reader: R,
        filters: Arc<FilterRegistry>,
        closed: Arc<AtomicBool>,
        on_decode_error: Option<DecodeErrorHandler>,
    ) -> Self {
        Self {
            reader,
            filters,
            closed,
            counters: Arc::new(WatchCounters::default()),
            on_decode_error,
        }
    }

    /// Run until the stream ends, the session closes or a read fails.
    pub fn run(mut self) -> Result<WatchExit> {
        let mut line = Vec::new();

        loop {
            line.clear();
            match self.reader.read_until(b'\n', &mut line) {
                Ok(0) => return Ok(self.quiet_exit()),
                Ok(_) if line.last() != Some(&b'\n') => {
                    tracing::debug!(bytes = line.len(), "Discarding unterminated trailing line");
                    return Ok(self.quiet_exit());
                }
                Ok(_) => self.process_line(&line),
                Err(e) => {
                    if self.closed.load(Ordering::SeqCst) {
                        return Ok(WatchExit::Closed);
                    }
                    tracing::error!(error = %e, "gpsd stream read failed");
                    return Err(GpsdError::Stream(e));
                }
            }
        }
    }

    fn quiet_exit(&self) -> WatchExit {
        if self.closed.load(Ordering::SeqCst) {
            WatchExit::Closed
        } else {
            WatchExit::EndOfStream
        }
    }

    fn process_line(&self, raw: &[u8]) {
        let line = raw.trim_ascii();
        if line.is_empty() {
            return;
        }
        WatchCounters::bump(&self.counters.lines_read);

        let class = match peek_class(line) {
            Ok(class) => class,
            Err(e) => return self.report_decode_error(e),
        };

        // Unmodelled classes are skipped like unsubscribed ones, even if
        // a filter was registered for them.
        if !is_known_class(&class) || !self.filters.has_subscribers(&class) {
            WatchCounters::bump(&self.counters.lines_skipped);
            tracing::trace!(class = %class, "No decoder or filters, skipping report");
            return;
        }

        WatchCounters::bump(&self.counters.decode_attempts);
        match decode(&class, line) {
            Ok(report) => {
                WatchCounters::bump(&self.counters.reports_dispatched);
                self.filters.dispatch(&class, &report);
            }
            Err(e) => self.report_decode_error(e),
        }
    }

    fn report_decode_error(&self, error: DecodeError) {
        WatchCounters::bump(&self.counters.decode_errors);
        tracing::warn!(error = %error, class = ?error.class(), "Dropping undecodable report");

        if let Some(handler) = &self.on_decode_error {
            if panic::catch_unwind(AssertUnwindSafe(|| handler(&error))).is_err() {
                tracing::warn!("Decode error handler panicked");
            }
        }
    }
}

impl<R: BufRead + Send + 'static> WatchLoop<R> {
    /// Move the loop onto a named thread and return its handle.
    pub fn spawn(self, thread_name: &str) -> Result<WatchHandle> {
        let (sender, receiver) = bounded(1);
        let counters = Arc::clone(&self.counters);

        let thread = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || {
                tracing::debug!("Watch loop started");
                let outcome = self.run();
                tracing::debug!(outcome = ?outcome, "Watch loop stopped");
                // Receiver may already be gone if the handle was dropped.
                let _ = sender.send(outcome);
            })?;

        Ok(WatchHandle::new(receiver, counters, thread))
    }
}
