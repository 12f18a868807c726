//! Telemetry parsing with optional ambient augmentation.

use tracing::warn;

use li850_types::{AmbientReading, Sample, parse_telemetry};

use crate::ambient::AmbientSensor;

/// Turns raw analyzer lines into [`Sample`]s.
///
/// When an [`AmbientSensor`] is attached, every parsed sample also carries
/// an ambient reading. A failed sensor read substitutes
/// [`AmbientReading::UNAVAILABLE`] and never fails the parse.
#[derive(Default)]
pub struct TelemetryParser {
    ambient: Option<Box<dyn AmbientSensor>>,
}

impl TelemetryParser {
    /// A parser without ambient augmentation.
    pub fn new() -> Self {
        Self::default()
    }

    /// A parser that reads `sensor` for every line.
    pub fn with_ambient(sensor: Box<dyn AmbientSensor>) -> Self {
        Self {
            ambient: Some(sensor),
        }
    }

    /// Attach or replace the ambient sensor.
    pub fn set_ambient(&mut self, sensor: Box<dyn AmbientSensor>) {
        self.ambient = Some(sensor);
    }

    pub fn has_ambient(&self) -> bool {
        self.ambient.is_some()
    }

    /// Parse one line.
    pub fn parse(&mut self, line: &str) -> Sample {
        let sample = parse_telemetry(line);
        match self.ambient.as_mut() {
            Some(sensor) => {
                let reading = sensor.read().unwrap_or_else(|e| {
                    warn!("{}; recording sentinel values", e);
                    AmbientReading::UNAVAILABLE
                });
                sample.with_ambient(reading)
            }
            None => sample,
        }
    }
}

impl std::fmt::Debug for TelemetryParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryParser")
            .field("ambient", &self.has_ambient())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockAmbient;

    const LINE: &str = "<li850><data><co2>412.3</co2><h2o>9.1</h2o></data></li850>";

    #[test]
    fn test_parse_without_ambient() {
        let mut parser = TelemetryParser::new();
        let sample = parser.parse(LINE);
        assert_eq!(sample.co2_ppm, Some(412.3));
        assert_eq!(sample.ambient, None);
    }

    #[test]
    fn test_parse_with_ambient() {
        let mut parser =
            TelemetryParser::with_ambient(Box::new(MockAmbient::fixed(AmbientReading::new(
                21.0, 55.0,
            ))));
        let sample = parser.parse(LINE);
        assert_eq!(sample.air_temp(), Some(21.0));
        assert_eq!(sample.air_rel_humidity(), Some(55.0));
    }

    #[test]
    fn test_failed_ambient_read_uses_sentinel() {
        let sensor = MockAmbient::failing();
        let counter = sensor.clone();
        let mut parser = TelemetryParser::with_ambient(Box::new(sensor));

        let sample = parser.parse(LINE);
        assert_eq!(sample.co2_ppm, Some(412.3));
        assert_eq!(sample.ambient, Some(AmbientReading::UNAVAILABLE));
        assert_eq!(counter.read_count(), 1);
    }
}
