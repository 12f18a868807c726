//! Host network identity for the status display.
//!
//! Both lookups degrade to placeholder text instead of failing; a field
//! instrument is often offline.

use std::net::{IpAddr, UdpSocket};
use std::process::{Command, Stdio};

use serde::Serialize;
use tracing::debug;

/// Shown when no wireless network is joined.
pub const SSID_UNAVAILABLE: &str = "Not Connected";
/// Shown when no outbound route exists.
pub const IP_UNAVAILABLE: &str = "No Connection";

/// Wireless SSID and local address of the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkIdentity {
    pub ssid: String,
    pub ip: String,
}

impl NetworkIdentity {
    /// Look up both values now.
    pub fn capture() -> Self {
        Self {
            ssid: ssid(),
            ip: local_ip(),
        }
    }
}

/// SSID of the joined wireless network, via `iwgetid -r`.
pub fn ssid() -> String {
    let output = Command::new("iwgetid")
        .arg("-r")
        .stderr(Stdio::null())
        .output();
    match output {
        Ok(out) if out.status.success() => {
            non_empty(String::from_utf8_lossy(&out.stdout).trim(), SSID_UNAVAILABLE)
        }
        Ok(_) => SSID_UNAVAILABLE.to_string(),
        Err(e) => {
            debug!("iwgetid unavailable: {}", e);
            SSID_UNAVAILABLE.to_string()
        }
    }
}

/// Address of the interface that routes to the internet.
///
/// Connecting a UDP socket sends nothing; it only selects a route.
pub fn local_ip() -> String {
    match route_address() {
        Ok(ip) => ip.to_string(),
        Err(e) => {
            debug!("No outbound route: {}", e);
            IP_UNAVAILABLE.to_string()
        }
    }
}

fn route_address() -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect("8.8.8.8:80")?;
    Ok(socket.local_addr()?.ip())
}

fn non_empty(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty("", SSID_UNAVAILABLE), "Not Connected");
        assert_eq!(non_empty("lab-wifi", SSID_UNAVAILABLE), "lab-wifi");
    }

    #[test]
    fn test_lookups_never_fail() {
        let identity = NetworkIdentity::capture();
        assert!(!identity.ssid.is_empty());
        assert!(!identity.ip.is_empty());
    }
}
