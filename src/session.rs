//! Connection session tying the socket, filters and watch loop together.

use crate::error::{DecodeError, GpsdError, Result};
use crate::filters::FilterRegistry;
use crate::report::{peek_class, Report, ReportKind};
use crate::watch::{WatchHandle, WatchLoop};
use parking_lot::Mutex;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default gpsd address.
pub const DEFAULT_ADDRESS: &str = "localhost:2947";

/// Command body that enables JSON reporting.
pub const WATCH_ENABLE: &str = r#"WATCH={"enable":true,"json":true}"#;

/// Session configuration.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// `host:port` of the daemon.
    pub address: String,

    /// Per-address connect timeout (None = OS default).
    pub connect_timeout: Option<Duration>,

    /// Command body sent by [`Session::start_watch`].
    pub watch_command: String,

    /// Name of the watch loop thread.
    pub thread_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            connect_timeout: None,
            watch_command: WATCH_ENABLE.to_string(),
            thread_name: "gpsd-watch".to_string(),
        }
    }
}

/// A connection to gpsd.
///
/// Register filters, then call [`start_watch`](Self::start_watch). Filters
/// added after the watch has started may miss reports already in flight.
pub struct Session {
    config: SessionConfig,

    peer: SocketAddr,

    /// Write half; `None` once closed.
    writer: Mutex<Option<TcpStream>>,

    /// Read half, positioned past the banner; moved into the watch loop.
    reader: Mutex<Option<BufReader<TcpStream>>>,

    filters: Arc<FilterRegistry>,

    on_decode_error: Mutex<Option<crate::watch::DecodeErrorHandler>>,

    closed: Arc<AtomicBool>,
}

impl Session {
    /// Connect to gpsd at `address`.
    pub fn connect(address: impl Into<String>) -> Result<Self> {
        Self::open(SessionConfig {
            address: address.into(),
            ..Default::default()
        })
    }

    /// Connect to gpsd at `address`, giving up after `timeout`.
    pub fn connect_timeout(address: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::open(SessionConfig {
            address: address.into(),
            connect_timeout: Some(timeout),
            ..Default::default()
        })
    }

    /// Connect using a full configuration.
    ///
    /// Reads and discards the banner line before returning.
    pub fn open(config: SessionConfig) -> Result<Self> {
        let stream = Self::dial(&config)?;
        let peer = stream.peer_addr()?;
        let mut reader = BufReader::new(stream.try_clone()?);

        Self::skip_banner(&mut reader)?;
        tracing::debug!(address = %config.address, peer = %peer, "Connected to gpsd");

        Ok(Self {
            config,
            peer,
            writer: Mutex::new(Some(stream)),
            reader: Mutex::new(Some(reader)),
            filters: Arc::new(FilterRegistry::new()),
            on_decode_error: Mutex::new(None),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    fn dial(config: &SessionConfig) -> Result<TcpStream> {
        let resolve_error = |source: io::Error| GpsdError::Resolve {
            address: config.address.clone(),
            source,
        };

        let addrs: Vec<SocketAddr> = config
            .address
            .to_socket_addrs()
            .map_err(resolve_error)?
            .collect();
        if addrs.is_empty() {
            return Err(resolve_error(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no resolved addresses",
            )));
        }

        let mut last_error = None;
        for addr in addrs {
            let attempt = match config.connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    tracing::debug!(addr = %addr, error = %e, "Connect attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(GpsdError::Connect {
            address: config.address.clone(),
            source: last_error
                .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no attempts")),
        })
    }

    fn skip_banner(reader: &mut BufReader<TcpStream>) -> Result<()> {
        let mut banner = Vec::new();
        if reader.read_until(b'\n', &mut banner)? == 0 {
            return Err(GpsdError::Stream(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before banner",
            )));
        }
        tracing::debug!(class = ?peek_class(&banner).ok(), "Skipped banner");
        Ok(())
    }

    // --- Filters ---

    /// Subscribe `filter` to reports of `class`.
    pub fn add_filter<F>(&self, class: impl Into<String>, filter: F)
    where
        F: Fn(&Report) + Send + Sync + 'static,
    {
        self.filters.add_filter(class, filter);
    }

    /// Subscribe `filter` to reports of type `T`.
    pub fn add_report_filter<T, F>(&self, filter: F)
    where
        T: ReportKind,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.filters.add_report_filter(filter);
    }

    /// Receive lines the watch loop could not classify or decode.
    ///
    /// Must be set before [`start_watch`](Self::start_watch); replaces any
    /// earlier handler.
    pub fn on_decode_error<F>(&self, handler: F)
    where
        F: Fn(&DecodeError) + Send + Sync + 'static,
    {
        *self.on_decode_error.lock() = Some(Arc::new(handler));
    }

    /// The session's filter registry.
    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    // --- Commands ---

    /// Send `?<command>;` without waiting for a response.
    pub fn send_command(&self, command: &str) -> Result<()> {
        let mut writer = self.writer.lock();
        let stream = writer.as_mut().ok_or(GpsdError::Closed)?;

        stream.write_all(format!("?{command};").as_bytes())?;
        stream.flush()?;
        Ok(())
    }

    /// Enable JSON reporting and start the watch loop.
    ///
    /// Returns immediately. The handle yields the loop's outcome once it
    /// stops.
    pub fn start_watch(&self) -> Result<WatchHandle> {
        let mut reader = self.reader.lock();
        if reader.is_none() {
            return Err(if self.is_closed() {
                GpsdError::Closed
            } else {
                GpsdError::WatchAlreadyStarted
            });
        }

        self.send_command(&self.config.watch_command)?;
        let Some(reader) = reader.take() else {
            return Err(GpsdError::WatchAlreadyStarted);
        };

        let watch = WatchLoop::new(
            reader,
            Arc::clone(&self.filters),
            Arc::clone(&self.closed),
            self.on_decode_error.lock().clone(),
        );
        tracing::debug!(peer = %self.peer, classes = ?self.filters.classes(), "Starting watch");
        watch.spawn(&self.config.thread_name)
    }

    // --- Lifecycle ---

    /// Close the connection.
    ///
    /// A running watch loop stops with [`WatchExit::Closed`](crate::WatchExit::Closed).
    pub fn close(&self) -> Result<()> {
        let stream = self.writer.lock().take().ok_or(GpsdError::AlreadyClosed)?;
        self.closed.store(true, Ordering::SeqCst);
        self.reader.lock().take();

        match stream.shutdown(Shutdown::Both) {
            Ok(()) => {}
            // Peer already went away.
            Err(e) if e.kind() == io::ErrorKind::NotConnected => {}
            Err(e) => return Err(GpsdError::Stream(e)),
        }
        tracing::debug!(peer = %self.peer, "Closed gpsd session");
        Ok(())
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Address of the connected daemon.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.is_closed() {
            let _ = self.close();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.config.address)
            .field("peer", &self.peer)
            .field("closed", &self.is_closed())
            .finish()
    }
}
