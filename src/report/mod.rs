//! Report decoding.
//!
//! Every gpsd message carries a `class` discriminator. Lines are first
//! classified with a cheap envelope parse ([`peek_class`]) and only
//! decoded into a full [`Report`] ([`decode`]) when someone is listening.
//!
//! The set of modelled classes is closed: decoding an unmodelled class
//! yields [`DecodeError::UnknownClass`], which callers can tell apart from
//! a malformed message of a known class.

mod types;

pub use types::{
    AttReport, DeviceReport, DevicesReport, ErrorReport, GstReport, Mode, PpsReport, Satellite,
    SkyReport, ToffReport, TpvReport, VersionReport,
};

use crate::error::DecodeError;
use serde::Deserialize;

/// Minimal view of a message used to classify it.
#[derive(Debug, Deserialize)]
struct Envelope {
    class: String,
}

/// Links a report struct to its wire discriminator.
pub trait ReportKind: Sized + Send + Sync + 'static {
    /// Value of the `class` field for this report type.
    const CLASS: &'static str;

    /// Borrow the concrete report out of a [`Report`], if it is this kind.
    fn from_report(report: &Report) -> Option<&Self>;
}

macro_rules! reports {
    ($($variant:ident($ty:ty) => $class:literal,)+) => {
        /// A decoded gpsd report.
        #[derive(Clone, Debug, PartialEq)]
        pub enum Report {
            $($variant($ty),)+
        }

        impl Report {
            /// Discriminator of this report.
            pub fn class(&self) -> &'static str {
                match self {
                    $(Report::$variant(_) => $class,)+
                }
            }
        }

        /// Classes this crate knows how to decode.
        pub const KNOWN_CLASSES: &[&str] = &[$($class,)+];

        $(
            impl ReportKind for $ty {
                const CLASS: &'static str = $class;

                fn from_report(report: &Report) -> Option<&Self> {
                    match report {
                        Report::$variant(inner) => Some(inner),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }
            }

            impl From<$ty> for Report {
                fn from(report: $ty) -> Self {
                    Report::$variant(report)
                }
            }
        )+

        /// Decode a raw line of the given class into a typed report.
        pub fn decode(class: &str, bytes: &[u8]) -> Result<Report, DecodeError> {
            match class {
                $($class => serde_json::from_slice::<$ty>(bytes)
                    .map(Report::$variant)
                    .map_err(|source| DecodeError::Malformed {
                        class: class.to_string(),
                        source,
                    }),)+
                other => Err(DecodeError::UnknownClass(other.to_string())),
            }
        }
    };
}

reports! {
    Version(VersionReport) => "VERSION",
    Tpv(TpvReport) => "TPV",
    Sky(SkyReport) => "SKY",
    Gst(GstReport) => "GST",
    Att(AttReport) => "ATT",
    Pps(PpsReport) => "PPS",
    Toff(ToffReport) => "TOFF",
    Devices(DevicesReport) => "DEVICES",
    Device(DeviceReport) => "DEVICE",
    Error(ErrorReport) => "ERROR",
}

/// Read only the `class` field of a line.
pub fn peek_class(bytes: &[u8]) -> Result<String, DecodeError> {
    serde_json::from_slice::<Envelope>(bytes)
        .map(|envelope| envelope.class)
        .map_err(DecodeError::Envelope)
}

/// Whether `class` has a decoder.
pub fn is_known_class(class: &str) -> bool {
    KNOWN_CLASSES.contains(&class)
}
