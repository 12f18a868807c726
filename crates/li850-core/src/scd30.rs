//! Sensirion SCD30 as the ambient air sensor.
//!
//! The frame decoding is always compiled. Talking to the device needs the
//! `i2c` feature on Linux.
//!
//! Every 16-bit word on the bus is followed by a CRC-8 byte (polynomial
//! `0x31`, init `0xFF`). A measurement frame is 18 bytes: CO2, temperature
//! and humidity, each a big-endian `f32` split over two checked words.

use crate::error::{Error, Result};

/// Default 7-bit I2C address of the SCD30.
pub const SCD30_ADDRESS: u16 = 0x61;

/// Default I2C bus device on a Raspberry Pi.
pub const DEFAULT_I2C_BUS: &str = "/dev/i2c-1";

const CRC8_POLYNOMIAL: u8 = 0x31;
const CRC8_INIT: u8 = 0xFF;

/// Sensirion CRC-8 over `data`.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = CRC8_INIT;
    for byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC8_POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Check one `[msb, lsb, crc]` triple and return the word.
pub fn decode_word(chunk: &[u8]) -> Result<u16> {
    let [msb, lsb, crc] = chunk else {
        return Err(Error::SensorRead(format!(
            "expected 3-byte word, got {} bytes",
            chunk.len()
        )));
    };
    let expected = crc8(&[*msb, *lsb]);
    if expected != *crc {
        return Err(Error::SensorRead(format!(
            "CRC mismatch: expected {:#04x}, got {:#04x}",
            expected, crc
        )));
    }
    Ok(u16::from_be_bytes([*msb, *lsb]))
}

/// Decode a float transmitted as two checked words.
pub fn decode_float(chunk: &[u8]) -> Result<f32> {
    if chunk.len() != 6 {
        return Err(Error::SensorRead(format!(
            "expected 6-byte float, got {} bytes",
            chunk.len()
        )));
    }
    let high = decode_word(&chunk[..3])?.to_be_bytes();
    let low = decode_word(&chunk[3..])?.to_be_bytes();
    Ok(f32::from_be_bytes([high[0], high[1], low[0], low[1]]))
}

/// A decoded measurement frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scd30Measurement {
    pub co2_ppm: f32,
    pub temperature: f32,
    pub humidity: f32,
}

impl Scd30Measurement {
    /// Decode an 18-byte measurement frame.
    pub fn decode(frame: &[u8; 18]) -> Result<Self> {
        Ok(Self {
            co2_ppm: decode_float(&frame[0..6])?,
            temperature: decode_float(&frame[6..12])?,
            humidity: decode_float(&frame[12..18])?,
        })
    }

    pub fn to_ambient(self) -> li850_types::AmbientReading {
        li850_types::AmbientReading::new(f64::from(self.temperature), f64::from(self.humidity))
    }
}

/// Command frame: two command bytes, optionally one checked argument word.
#[cfg_attr(not(all(target_os = "linux", feature = "i2c")), allow(dead_code))]
fn command(cmd: u16, arg: Option<u16>) -> Vec<u8> {
    let mut frame = cmd.to_be_bytes().to_vec();
    if let Some(arg) = arg {
        let word = arg.to_be_bytes();
        frame.extend_from_slice(&word);
        frame.push(crc8(&word));
    }
    frame
}

#[cfg(all(target_os = "linux", feature = "i2c"))]
pub use device::Scd30Sensor;

#[cfg(all(target_os = "linux", feature = "i2c"))]
mod device {
    use std::thread;
    use std::time::Duration;

    use i2cdev::core::I2CDevice;
    use i2cdev::linux::LinuxI2CDevice;
    use tracing::{debug, info};

    use li850_types::AmbientReading;

    use super::{Scd30Measurement, command, decode_word};
    use crate::ambient::AmbientSensor;
    use crate::error::{Error, Result};

    const CMD_CONTINUOUS: u16 = 0x0010;
    const CMD_INTERVAL: u16 = 0x4600;
    const CMD_DATA_READY: u16 = 0x0202;
    const CMD_READ_MEASUREMENT: u16 = 0x0300;
    const MEASUREMENT_INTERVAL_SECS: u16 = 2;
    const WRITE_READ_DELAY: Duration = Duration::from_millis(3);

    /// SCD30 on a Linux I2C bus.
    ///
    /// The sensor measures every two seconds while the analyzer streams
    /// faster, so between measurements the last value is repeated.
    pub struct Scd30Sensor {
        dev: LinuxI2CDevice,
        last: Option<AmbientReading>,
    }

    fn i2c_err(e: impl std::fmt::Display) -> Error {
        Error::SensorRead(e.to_string())
    }

    impl Scd30Sensor {
        /// Open the sensor and start continuous measurement.
        pub fn open(bus: &str, address: u16) -> Result<Self> {
            let mut dev = LinuxI2CDevice::new(bus, address).map_err(i2c_err)?;
            dev.write(&command(CMD_INTERVAL, Some(MEASUREMENT_INTERVAL_SECS)))
                .map_err(i2c_err)?;
            // Ambient pressure compensation disabled.
            dev.write(&command(CMD_CONTINUOUS, Some(0))).map_err(i2c_err)?;
            info!("SCD30 started on {} at {:#04x}", bus, address);
            Ok(Self { dev, last: None })
        }

        fn query(&mut self, cmd: u16, buf: &mut [u8]) -> Result<()> {
            self.dev.write(&command(cmd, None)).map_err(i2c_err)?;
            thread::sleep(WRITE_READ_DELAY);
            self.dev.read(buf).map_err(i2c_err)
        }

        fn data_ready(&mut self) -> Result<bool> {
            let mut buf = [0u8; 3];
            self.query(CMD_DATA_READY, &mut buf)?;
            Ok(decode_word(&buf)? == 1)
        }

        fn measure(&mut self) -> Result<Scd30Measurement> {
            let mut frame = [0u8; 18];
            self.query(CMD_READ_MEASUREMENT, &mut frame)?;
            Scd30Measurement::decode(&frame)
        }
    }

    impl AmbientSensor for Scd30Sensor {
        fn read(&mut self) -> Result<AmbientReading> {
            if self.data_ready()? {
                let reading = self.measure()?.to_ambient();
                debug!(
                    "SCD30: {:.2} C, {:.2} %RH",
                    reading.air_temp, reading.air_rel_humidity
                );
                self.last = Some(reading);
            }
            self.last
                .ok_or_else(|| Error::SensorRead("no SCD30 measurement yet".to_string()))
        }
    }
}
