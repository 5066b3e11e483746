//! # gpsd watch client
//!
//! A streaming client for gpsd's JSON reporting protocol. A [`Session`]
//! holds one TCP connection; a background watch loop reads one JSON
//! object per line, classifies it by its `class` field, decodes it into a
//! typed [`Report`] and hands it to the filters subscribed to that class.
//!
//! ## Core Concepts
//!
//! - **Session**: the connection, its filters and the command channel
//! - **Filters**: callbacks per report class, run in registration order
//! - **Reports**: a closed set of typed gpsd messages (TPV, SKY, ...)
//! - **Watch**: the read/classify/dispatch loop and its completion handle
//!
//! ## Example
//!
//! ```ignore
//! use gpsd_watch::{Session, SkyReport, TpvReport, DEFAULT_ADDRESS};
//!
//! let session = Session::connect(DEFAULT_ADDRESS)?;
//!
//! session.add_report_filter(|tpv: &TpvReport| {
//!     println!("TPV {} {:?}", tpv.mode, tpv.time);
//! });
//! session.add_report_filter(|sky: &SkyReport| {
//!     println!("SKY {} satellites", sky.satellites.len());
//! });
//!
//! let watch = session.start_watch()?;
//! watch.wait()?;
//! ```

pub mod error;
pub mod filters;
pub mod report;
pub mod session;
pub mod watch;

// Re-exports
pub use error::{DecodeError, GpsdError, Result};
pub use filters::{Filter, FilterRegistry};
pub use report::{
    decode, is_known_class, peek_class, AttReport, DeviceReport, DevicesReport, ErrorReport,
    GstReport, Mode, PpsReport, Report, ReportKind, Satellite, SkyReport, ToffReport, TpvReport,
    VersionReport, KNOWN_CLASSES,
};
pub use session::{Session, SessionConfig, DEFAULT_ADDRESS, WATCH_ENABLE};
pub use watch::{DecodeErrorHandler, WatchExit, WatchHandle, WatchStats};
