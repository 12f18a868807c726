//! Core types for Li-850 telemetry.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Placeholder written for both ambient columns when the auxiliary sensor
/// could not be read. Downstream scripts filter on this exact value.
pub const AMBIENT_SENTINEL: f64 = 9999.0;

/// Ambient air reading from the auxiliary I2C sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AmbientReading {
    /// Air temperature in °C.
    pub air_temp: f64,
    /// Relative humidity in %.
    pub air_rel_humidity: f64,
}

impl AmbientReading {
    /// Reading substituted when the sensor fails.
    pub const UNAVAILABLE: Self = Self {
        air_temp: AMBIENT_SENTINEL,
        air_rel_humidity: AMBIENT_SENTINEL,
    };

    /// Create a new ambient reading.
    pub fn new(air_temp: f64, air_rel_humidity: f64) -> Self {
        Self {
            air_temp,
            air_rel_humidity,
        }
    }

    /// Whether this reading is the failure sentinel.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        self.air_temp == AMBIENT_SENTINEL && self.air_rel_humidity == AMBIENT_SENTINEL
    }
}

/// One parsed telemetry line.
///
/// Every field is optional: a tag missing from the analyzer output leaves the
/// field as `None` rather than zero. Only samples carrying both CO2 and H2O
/// are [valid](Self::is_valid) and get recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sample {
    /// CO2 concentration in ppm.
    pub co2_ppm: Option<f64>,
    /// H2O concentration in ppt (mmol/mol).
    pub h2o: Option<f64>,
    /// Optical cell pressure in kPa.
    pub cell_pressure: Option<f64>,
    /// Optical cell temperature in °C.
    pub cell_temp: Option<f64>,
    /// Ambient reading, present only when an auxiliary sensor is configured.
    pub ambient: Option<AmbientReading>,
}

impl Sample {
    /// Parse a telemetry line. See [`crate::telemetry`].
    pub fn parse(line: &str) -> Self {
        crate::telemetry::parse_telemetry(line)
    }

    /// Attach an ambient reading.
    #[must_use]
    pub fn with_ambient(mut self, ambient: AmbientReading) -> Self {
        self.ambient = Some(ambient);
        self
    }

    /// A sample is recordable only when CO2 and H2O are both present.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.co2_ppm.is_some() && self.h2o.is_some()
    }

    /// Ambient air temperature, if an ambient reading is attached.
    pub fn air_temp(&self) -> Option<f64> {
        self.ambient.map(|a| a.air_temp)
    }

    /// Ambient relative humidity, if an ambient reading is attached.
    pub fn air_rel_humidity(&self) -> Option<f64> {
        self.ambient.map(|a| a.air_rel_humidity)
    }
}

/// Lifecycle of a serial session.
///
/// `Reading` and `Recording` are sub-states of a live connection; recording
/// always implies that the background reader is running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
    Reading,
    Recording,
}

impl ConnectionState {
    /// True for every state except `Disconnected`.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !matches!(self, Self::Disconnected)
    }

    /// True while the background reader is running.
    #[must_use]
    pub fn is_reading(&self) -> bool {
        matches!(self, Self::Reading | Self::Recording)
    }

    /// True while samples are being persisted.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connected => write!(f, "connected"),
            Self::Reading => write!(f, "reading"),
            Self::Recording => write!(f, "recording"),
        }
    }
}

/// A serial device reported by the operating system.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PortInfo {
    /// Device path or name used to open the port (`/dev/ttyACM0`, `COM3`).
    pub device: String,
    /// Short name (last path component on Unix).
    pub name: String,
    /// Human-readable description, e.g. the USB product string.
    pub description: String,
}
