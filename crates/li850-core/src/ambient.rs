//! Auxiliary ambient air sensor.

use li850_types::AmbientReading;

use crate::error::Result;

/// A sensor providing ambient air temperature and relative humidity.
///
/// Reads happen on the background reader thread once per telemetry line,
/// so implementations should return promptly.
pub trait AmbientSensor: Send {
    /// Take one reading.
    fn read(&mut self) -> Result<AmbientReading>;
}

impl<S: AmbientSensor + ?Sized> AmbientSensor for Box<S> {
    fn read(&mut self) -> Result<AmbientReading> {
        (**self).read()
    }
}
