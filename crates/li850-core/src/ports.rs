//! Serial port discovery.
//!
//! Enumeration never fails: when the OS cannot be queried the result is
//! simply empty. On-board UARTs (`/dev/ttyS*`) are hidden by default since
//! the analyzer is always attached over USB.

use std::path::Path;

use serialport::{SerialPortInfo, SerialPortType};
use tracing::debug;

use li850_types::PortInfo;

/// Device-path fragments hidden by [`PortFilter::default`].
pub const DEFAULT_EXCLUDED_PATTERNS: &[&str] = &["/dev/ttyS"];

/// Which ports to hide from listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortFilter {
    excluded: Vec<String>,
}

impl Default for PortFilter {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDED_PATTERNS.iter().copied())
    }
}

impl PortFilter {
    /// Hide ports whose device path contains any of `patterns`.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded: patterns
                .into_iter()
                .map(Into::into)
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// A filter that hides nothing.
    pub fn allow_all() -> Self {
        Self {
            excluded: Vec::new(),
        }
    }

    pub fn is_excluded(&self, device: &str) -> bool {
        self.excluded.iter().any(|p| device.contains(p.as_str()))
    }

    pub fn patterns(&self) -> &[String] {
        &self.excluded
    }
}

fn available() -> Vec<SerialPortInfo> {
    match serialport::available_ports() {
        Ok(ports) => ports,
        Err(e) => {
            debug!("Port enumeration unavailable: {}", e);
            Vec::new()
        }
    }
}

/// Device identifiers of the serial ports currently present, minus the
/// default exclusions.
pub fn list_ports() -> Vec<String> {
    list_ports_filtered(&PortFilter::default())
}

/// Device identifiers of present ports that pass `filter`.
pub fn list_ports_filtered(filter: &PortFilter) -> Vec<String> {
    available()
        .into_iter()
        .map(|info| info.port_name)
        .filter(|name| !filter.is_excluded(name))
        .collect()
}

/// Like [`list_ports_filtered`] but with descriptions for display.
pub fn list_port_details(filter: &PortFilter) -> Vec<PortInfo> {
    available()
        .iter()
        .filter(|info| !filter.is_excluded(&info.port_name))
        .map(describe)
        .collect()
}

/// Describe an enumerated port.
pub fn describe(info: &SerialPortInfo) -> PortInfo {
    let name = Path::new(&info.port_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| info.port_name.clone());

    let description = match &info.port_type {
        SerialPortType::UsbPort(usb) => usb
            .product
            .clone()
            .or_else(|| usb.manufacturer.clone())
            .unwrap_or_else(|| format!("USB {:04x}:{:04x}", usb.vid, usb.pid)),
        SerialPortType::PciPort => "PCI serial".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth serial".to_string(),
        SerialPortType::Unknown => "n/a".to_string(),
    };

    PortInfo {
        device: info.port_name.clone(),
        name,
        description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_hides_onboard_uarts() {
        let filter = PortFilter::default();
        assert!(filter.is_excluded("/dev/ttyS0"));
        assert!(filter.is_excluded("/dev/ttyS12"));
        assert!(!filter.is_excluded("/dev/ttyACM0"));
        assert!(!filter.is_excluded("/dev/ttyUSB0"));
        assert!(!filter.is_excluded("COM3"));
    }

    #[test]
    fn test_custom_filter() {
        let filter = PortFilter::new(["ttyAMA", ""]);
        assert_eq!(filter.patterns(), &["ttyAMA".to_string()]);
        assert!(filter.is_excluded("/dev/ttyAMA0"));
        assert!(!filter.is_excluded("/dev/ttyS0"));

        assert!(!PortFilter::allow_all().is_excluded("/dev/ttyS0"));
    }

    #[test]
    fn test_describe() {
        let info = SerialPortInfo {
            port_name: "/dev/ttyS1".to_string(),
            port_type: SerialPortType::PciPort,
        };
        let port = describe(&info);
        assert_eq!(port.device, "/dev/ttyS1");
        assert_eq!(port.name, "ttyS1");
        assert_eq!(port.description, "PCI serial");

        let info = SerialPortInfo {
            port_name: "COM3".to_string(),
            port_type: SerialPortType::Unknown,
        };
        assert_eq!(describe(&info).name, "COM3");
    }

    #[test]
    fn test_enumeration_never_panics() {
        // Whatever the host has, listings are consistent and filtered.
        let ports = list_ports();
        assert!(ports.iter().all(|p| !p.contains("/dev/ttyS")));
        let details = list_port_details(&PortFilter::default());
        assert_eq!(ports.len(), details.len());
    }
}
