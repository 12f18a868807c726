//! Byte-level access to the analyzer's serial line.
//!
//! [`SerialLink`] is the seam between the session and the hardware. The
//! production implementation wraps a `serialport` handle; tests use
//! [`MockLink`](crate::mock::MockLink).

use std::io::{self, BufRead, BufReader};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};
use tracing::debug;

use crate::error::{ConnectionFailureReason, Error, Result};

/// A line-oriented serial link.
///
/// Implementations must be `Send` so the link can be handed to the
/// background reader.
pub trait SerialLink: Send {
    /// Device identifier of the underlying port.
    fn port_name(&self) -> &str;

    /// Bytes buffered and ready to be read without blocking.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Read one newline-terminated line, blocking at most the port timeout.
    ///
    /// The returned text is trimmed. A timeout yields an empty string; bytes
    /// of an unfinished line are kept and prefixed to the next read.
    fn read_line(&mut self) -> Result<String>;

    /// Discard all buffered, unread input.
    fn clear_input(&mut self) -> Result<()>;

    /// Read a line only if input is waiting.
    fn read_available_line(&mut self) -> Result<Option<String>> {
        if self.bytes_available()? > 0 {
            self.read_line().map(Some)
        } else {
            Ok(None)
        }
    }
}

/// [`SerialLink`] over an OS serial port.
pub struct SerialPortLink {
    name: String,
    reader: BufReader<Box<dyn SerialPort>>,
    partial: Vec<u8>,
}

impl SerialPortLink {
    /// Open `device` with 8N1 framing at `baud_rate`.
    pub fn open(device: &str, baud_rate: u32, timeout: Duration) -> Result<Self> {
        let port = serialport::new(device, baud_rate)
            .timeout(timeout)
            .open()
            .map_err(|e| Error::connection_failed(device, ConnectionFailureReason::from(&e)))?;
        debug!("Opened {} at {} baud", device, baud_rate);

        Ok(Self {
            name: device.to_string(),
            reader: BufReader::new(port),
            partial: Vec::new(),
        })
    }
}

impl std::fmt::Debug for SerialPortLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortLink")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl SerialLink for SerialPortLink {
    fn port_name(&self) -> &str {
        &self.name
    }

    fn bytes_available(&mut self) -> Result<usize> {
        let pending = self
            .reader
            .get_ref()
            .bytes_to_read()
            .map_err(io::Error::from)?;
        Ok(self.reader.buffer().len() + pending as usize)
    }

    fn read_line(&mut self) -> Result<String> {
        Ok(read_line_from(&mut self.reader, &mut self.partial)?)
    }

    fn clear_input(&mut self) -> Result<()> {
        self.reader
            .get_ref()
            .clear(ClearBuffer::Input)
            .map_err(io::Error::from)?;
        let buffered = self.reader.buffer().len();
        self.reader.consume(buffered);
        self.partial.clear();
        Ok(())
    }
}

/// Read up to a newline, accumulating into `partial` across timeouts.
///
/// Returns the trimmed line once it is complete (or the stream ended), and an
/// empty string while it is still unfinished.
fn read_line_from<R: BufRead>(reader: &mut R, partial: &mut Vec<u8>) -> io::Result<String> {
    match reader.read_until(b'\n', partial) {
        Ok(_) => {
            let line = std::mem::take(partial);
            Ok(String::from_utf8_lossy(&line).trim().to_string())
        }
        Err(e) if e.kind() == io::ErrorKind::TimedOut => {
            debug!("Read timed out with {} bytes of partial line", partial.len());
            Ok(String::new())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::Read;

    use super::*;

    /// Serves one scripted chunk per `read`; `None` is a timeout.
    struct Scripted(VecDeque<Option<&'static [u8]>>);

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(Some(chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    Ok(n)
                }
                Some(None) => Err(io::Error::new(io::ErrorKind::TimedOut, "timed out")),
                None => Ok(0),
            }
        }
    }

    #[test]
    fn test_partial_line_joined_across_timeout() {
        let mut reader = BufReader::new(Scripted(VecDeque::from([
            Some(&b"<li850><raw><co2>1"[..]),
            None,
            Some(&b"2</co2></raw><data><co2>400</co2></data></li850>\r\n"[..]),
            Some(&b"<li850><data><co2>401</co2></data></li850>\n"[..]),
        ])));
        let mut partial = Vec::new();

        assert_eq!(read_line_from(&mut reader, &mut partial).unwrap(), "");
        assert_eq!(partial, b"<li850><raw><co2>1");

        assert_eq!(
            read_line_from(&mut reader, &mut partial).unwrap(),
            "<li850><raw><co2>12</co2></raw><data><co2>400</co2></data></li850>"
        );
        assert!(partial.is_empty());
        assert_eq!(
            read_line_from(&mut reader, &mut partial).unwrap(),
            "<li850><data><co2>401</co2></data></li850>"
        );
    }

    #[test]
    fn test_read_error_propagates() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
            }
        }
        let mut partial = Vec::new();
        let err = read_line_from(&mut BufReader::new(Broken), &mut partial).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_open_missing_device_fails() {
        let err = SerialPortLink::open(
            "/dev/li850-does-not-exist",
            9600,
            Duration::from_millis(100),
        )
        .unwrap_err();
        match err {
            Error::ConnectionFailed { device_id, .. } => {
                assert_eq!(device_id, "/dev/li850-does-not-exist");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
