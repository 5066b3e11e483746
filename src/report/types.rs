//! Report payload schemas.
//!
//! One struct per gpsd message class. Field names follow the wire
//! protocol; values gpsd omits when it has no data are `Option`s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fix quality of a TPV report.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub enum Mode {
    /// No data has been received yet.
    #[default]
    NoValueSeen,
    /// Data received but no fix.
    NoFix,
    /// Two-dimensional fix.
    Fix2D,
    /// Three-dimensional fix.
    Fix3D,
}

impl TryFrom<u8> for Mode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Mode::NoValueSeen),
            1 => Ok(Mode::NoFix),
            2 => Ok(Mode::Fix2D),
            3 => Ok(Mode::Fix3D),
            other => Err(format!("invalid fix mode {other}, expected 0..=3")),
        }
    }
}

impl From<Mode> for u8 {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::NoValueSeen => 0,
            Mode::NoFix => 1,
            Mode::Fix2D => 2,
            Mode::Fix3D => 3,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::NoValueSeen => "no value seen",
            Mode::NoFix => "no fix",
            Mode::Fix2D => "2D",
            Mode::Fix3D => "3D",
        };
        f.write_str(name)
    }
}

/// Time-position-velocity report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TpvReport {
    pub class: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub mode: Mode,
    pub time: Option<DateTime<Utc>>,
    pub ept: Option<f64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt: Option<f64>,
    pub epx: Option<f64>,
    pub epy: Option<f64>,
    pub epv: Option<f64>,
    pub track: Option<f64>,
    pub speed: Option<f64>,
    pub climb: Option<f64>,
    pub epd: Option<f64>,
    pub eps: Option<f64>,
    pub epc: Option<f64>,
}

/// Sky view of the GPS satellite constellation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkyReport {
    pub class: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub device: String,
    pub time: Option<DateTime<Utc>>,
    pub xdop: Option<f64>,
    pub ydop: Option<f64>,
    pub vdop: Option<f64>,
    pub tdop: Option<f64>,
    pub hdop: Option<f64>,
    pub pdop: Option<f64>,
    pub gdop: Option<f64>,
    #[serde(default)]
    pub satellites: Vec<Satellite>,
}

impl SkyReport {
    /// Satellites used in the current solution.
    pub fn used_satellites(&self) -> impl Iterator<Item = &Satellite> {
        self.satellites.iter().filter(|s| s.used)
    }
}

/// One satellite entry of a SKY report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Satellite {
    #[serde(rename = "PRN")]
    pub prn: u16,
    pub az: Option<f64>,
    pub el: Option<f64>,
    pub ss: Option<f64>,
    #[serde(default)]
    pub used: bool,
}

/// Pseudorange noise report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GstReport {
    pub class: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub device: String,
    pub time: Option<DateTime<Utc>>,
    pub rms: Option<f64>,
    pub major: Option<f64>,
    pub minor: Option<f64>,
    pub orient: Option<f64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt: Option<f64>,
}

/// Vehicle attitude from a digital compass or gyroscope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttReport {
    pub class: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub device: String,
    pub time: Option<DateTime<Utc>>,
    pub heading: Option<f64>,
    pub mag_st: Option<String>,
    pub pitch: Option<f64>,
    pub pitch_st: Option<String>,
    pub yaw: Option<f64>,
    pub yaw_st: Option<String>,
    pub roll: Option<f64>,
    pub roll_st: Option<String>,
    pub dip: Option<f64>,
    pub mag_len: Option<f64>,
    pub mag_x: Option<f64>,
    pub mag_y: Option<f64>,
    pub mag_z: Option<f64>,
    pub acc_len: Option<f64>,
    pub acc_x: Option<f64>,
    pub acc_y: Option<f64>,
    pub acc_z: Option<f64>,
    pub gyro_x: Option<f64>,
    pub gyro_y: Option<f64>,
    pub depth: Option<f64>,
    pub temperature: Option<f64>,
}

/// Daemon version, sent as the connection banner and on request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VersionReport {
    pub class: String,
    pub release: String,
    pub rev: String,
    pub proto_major: u32,
    pub proto_minor: u32,
    pub remote: Option<String>,
}

/// All devices known to the daemon.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DevicesReport {
    pub class: String,
    #[serde(default)]
    pub devices: Vec<DeviceReport>,
    pub remote: Option<String>,
}

/// State of one device.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceReport {
    /// Entries nested in a DEVICES list may omit the class.
    #[serde(default = "DeviceReport::default_class")]
    pub class: String,
    #[serde(default)]
    pub path: String,
    pub activated: Option<String>,
    pub flags: Option<u32>,
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub subtype: String,
    pub bps: Option<u32>,
    pub parity: Option<String>,
    pub stopbits: Option<u8>,
    pub native: Option<u8>,
    pub cycle: Option<f64>,
    pub mincycle: Option<f64>,
}

impl DeviceReport {
    fn default_class() -> String {
        "DEVICE".to_string()
    }
}

/// Pulse-per-second strobe from a device.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PpsReport {
    pub class: String,
    #[serde(default)]
    pub device: String,
    pub real_sec: Option<f64>,
    pub real_musec: Option<f64>,
    pub real_nsec: Option<f64>,
    pub clock_sec: Option<f64>,
    pub clock_musec: Option<f64>,
    pub clock_nsec: Option<f64>,
    pub precision: Option<i32>,
}

/// Time offset between a device's reported time and the local clock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToffReport {
    pub class: String,
    #[serde(default)]
    pub device: String,
    pub real_sec: Option<f64>,
    pub real_nsec: Option<f64>,
    pub clock_sec: Option<f64>,
    pub clock_nsec: Option<f64>,
}

/// Error response to a client command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub class: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_wire() {
        assert_eq!(Mode::try_from(0u8), Ok(Mode::NoValueSeen));
        assert_eq!(Mode::try_from(3u8), Ok(Mode::Fix3D));
        assert!(Mode::try_from(4u8).is_err());
        assert_eq!(u8::from(Mode::Fix2D), 2);
    }

    #[test]
    fn test_mode_defaults_when_absent() {
        let tpv: TpvReport = serde_json::from_str(r#"{"class":"TPV"}"#).unwrap();
        assert_eq!(tpv.mode, Mode::NoValueSeen);
        assert_eq!(Mode::default(), Mode::NoValueSeen);
    }

    #[test]
    fn test_mode_rejects_out_of_range() {
        let result: Result<Mode, _> = serde_json::from_str("7");
        assert!(result.is_err());
    }

    #[test]
    fn test_used_satellites() {
        let sky: SkyReport = serde_json::from_str(
            r#"{"class":"SKY","satellites":[
                {"PRN":5,"az":10.0,"el":45.0,"ss":30.0,"used":true},
                {"PRN":7,"az":200.0,"el":12.0,"ss":18.0,"used":false}
            ]}"#,
        )
        .unwrap();

        let used: Vec<u16> = sky.used_satellites().map(|s| s.prn).collect();
        assert_eq!(used, vec![5]);
    }

    #[test]
    fn test_nested_device_defaults_class() {
        let devices: DevicesReport = serde_json::from_str(
            r#"{"class":"DEVICES","devices":[{"path":"/dev/ttyUSB0","driver":"NMEA0183"}]}"#,
        )
        .unwrap();

        assert_eq!(devices.devices[0].class, "DEVICE");
        assert_eq!(devices.devices[0].path, "/dev/ttyUSB0");
    }
}
