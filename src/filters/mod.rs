//! Report filters.
//!
//! A filter is a callback subscribed to one report class. Filters for a
//! class run in the order they were added, each with the same decoded
//! report, on the watch loop's thread.
//!
//! # Example
//!
//! ```ignore
//! let registry = FilterRegistry::new();
//!
//! registry.add_report_filter(|tpv: &TpvReport| {
//!     println!("{:?} {:?} {:?}", tpv.mode, tpv.lat, tpv.lon);
//! });
//! registry.add_filter("SKY", |report| println!("{}", report.class()));
//! ```

mod registry;

pub use registry::{Filter, FilterRegistry};
