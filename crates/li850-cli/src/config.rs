//! Configuration file management.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use li850_core::ports::{DEFAULT_EXCLUDED_PATTERNS, PortFilter};
use li850_core::{
    DEFAULT_BAUD_RATE, DEFAULT_JOIN_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_READ_TIMEOUT,
    SessionOptions,
};

use crate::cli::ConfigKey;

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Default serial port
    #[serde(default)]
    pub port: Option<String>,

    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Per-read timeout in milliseconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Reader polling period in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Seconds to wait for the reader to stop before giving up on it
    #[serde(default = "default_join_timeout_secs")]
    pub join_timeout_secs: u64,

    /// Directory recordings are written into
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Default operator label
    #[serde(default)]
    pub user: Option<String>,

    /// Device-path fragments hidden from port listings
    #[serde(default = "default_exclude_ports")]
    pub exclude_ports: Vec<String>,

    /// Disable colored output
    #[serde(default)]
    pub no_color: bool,

    /// Auxiliary ambient sensor
    #[serde(default)]
    pub ambient: AmbientConfig,
}

/// SCD30 ambient sensor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbientConfig {
    /// Read the sensor and add Air_temp/Air_RH columns
    #[serde(default)]
    pub enabled: bool,

    /// I2C bus device
    #[serde(default = "default_i2c_bus")]
    pub bus: String,

    /// 7-bit I2C address
    #[serde(default = "default_i2c_address")]
    pub address: u16,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT.as_millis() as u64
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_join_timeout_secs() -> u64 {
    DEFAULT_JOIN_TIMEOUT.as_secs()
}

fn default_exclude_ports() -> Vec<String> {
    DEFAULT_EXCLUDED_PATTERNS
        .iter()
        .map(|p| p.to_string())
        .collect()
}

fn default_i2c_bus() -> String {
    li850_core::scd30::DEFAULT_I2C_BUS.to_string()
}

fn default_i2c_address() -> u16 {
    li850_core::scd30::SCD30_ADDRESS
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bus: default_i2c_bus(),
            address: default_i2c_address(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            join_timeout_secs: default_join_timeout_secs(),
            data_dir: None,
            user: None,
            exclude_ports: default_exclude_ports(),
            no_color: false,
            ambient: AmbientConfig::default(),
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("li850")
            .join("config.toml")
    }

    /// Load config from file, or return default if not found
    pub fn load() -> Self {
        let path = Self::path();
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        eprintln!("Warning: Failed to parse config: {}", e);
                    }
                },
                Err(e) => {
                    eprintln!("Warning: Failed to read config: {}", e);
                }
            }
        }
        Self::default()
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Session options from config, with an optional baud override.
    pub fn session_options(&self, baud: Option<u32>, data_dir: Option<PathBuf>) -> Result<SessionOptions> {
        let options = SessionOptions::builder()
            .baud_rate(baud.unwrap_or(self.baud_rate))
            .read_timeout(Duration::from_millis(self.read_timeout_ms))
            .poll_interval(Duration::from_millis(self.poll_interval_ms))
            .join_timeout(Duration::from_secs(self.join_timeout_secs))
            .data_dir(
                data_dir
                    .or_else(|| self.data_dir.clone())
                    .unwrap_or_else(li850_store::default_data_dir),
            )
            .build();
        options.validate().context("Invalid session settings")?;
        Ok(options)
    }

    pub fn port_filter(&self) -> PortFilter {
        PortFilter::new(self.exclude_ports.iter().cloned())
    }

    /// Current value of `key` as text, `None` when unset.
    pub fn get(&self, key: ConfigKey) -> Option<String> {
        match key {
            ConfigKey::Port => self.port.clone(),
            ConfigKey::Baud => Some(self.baud_rate.to_string()),
            ConfigKey::DataDir => self.data_dir.as_ref().map(|d| d.display().to_string()),
            ConfigKey::User => self.user.clone(),
            ConfigKey::ExcludePorts => Some(self.exclude_ports.join(",")),
            ConfigKey::JoinTimeout => Some(self.join_timeout_secs.to_string()),
            ConfigKey::NoColor => Some(self.no_color.to_string()),
            ConfigKey::Ambient => Some(self.ambient.enabled.to_string()),
        }
    }

    /// Parse and store `value` for `key`.
    pub fn set(&mut self, key: ConfigKey, value: &str) -> Result<()> {
        match key {
            ConfigKey::Port => self.port = non_empty(value),
            ConfigKey::Baud => {
                let baud: u32 = value
                    .parse()
                    .with_context(|| format!("'{}' is not a valid baud rate", value))?;
                if baud == 0 {
                    bail!("Baud rate must be > 0");
                }
                self.baud_rate = baud;
            }
            ConfigKey::DataDir => self.data_dir = non_empty(value).map(PathBuf::from),
            ConfigKey::User => self.user = non_empty(value),
            ConfigKey::ExcludePorts => {
                self.exclude_ports = value
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            ConfigKey::JoinTimeout => {
                self.join_timeout_secs = value
                    .parse()
                    .with_context(|| format!("'{}' is not a number of seconds", value))?;
            }
            ConfigKey::NoColor => self.no_color = parse_bool(value)?,
            ConfigKey::Ambient => self.ambient.enabled = parse_bool(value)?,
        }
        Ok(())
    }

    /// Reset `key` to its default.
    pub fn unset(&mut self, key: ConfigKey) {
        let defaults = Self::default();
        match key {
            ConfigKey::Port => self.port = defaults.port,
            ConfigKey::Baud => self.baud_rate = defaults.baud_rate,
            ConfigKey::DataDir => self.data_dir = defaults.data_dir,
            ConfigKey::User => self.user = defaults.user,
            ConfigKey::ExcludePorts => self.exclude_ports = defaults.exclude_ports,
            ConfigKey::JoinTimeout => self.join_timeout_secs = defaults.join_timeout_secs,
            ConfigKey::NoColor => self.no_color = defaults.no_color,
            ConfigKey::Ambient => self.ambient.enabled = defaults.ambient.enabled,
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_bool(s: &str) -> Result<bool> {
    match s.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => bail!(
            "Invalid boolean value '{}'. Use: true/false, yes/no, on/off, 1/0",
            s
        ),
    }
}

/// Resolve port from arg (which already includes LI850_PORT) or config.
pub fn resolve_port(port: Option<String>, config: &Config) -> Option<String> {
    port.filter(|p| !p.is_empty())
        .or_else(|| config.port.clone())
}

/// Resolve the operator label: explicit flag, then config, then empty.
pub fn resolve_user(user: Option<String>, config: &Config) -> String {
    user.or_else(|| config.user.clone()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.read_timeout_ms, 1000);
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.join_timeout_secs, 10);
        assert_eq!(config.exclude_ports, vec!["/dev/ttyS".to_string()]);
        assert!(!config.ambient.enabled);
        assert_eq!(config.ambient.address, 0x61);
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str(
            r#"
port = "/dev/ttyACM0"
user = "alice"

[ambient]
enabled = true
"#,
        )
        .unwrap();
        assert_eq!(config.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(config.user.as_deref(), Some("alice"));
        assert_eq!(config.baud_rate, 9600);
        assert!(config.ambient.enabled);
        assert_eq!(config.ambient.bus, "/dev/i2c-1");
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let mut config = Config::default();
        config.set(ConfigKey::DataDir, "/srv/li850").unwrap();
        config.set(ConfigKey::ExcludePorts, "/dev/ttyS, /dev/ttyAMA").unwrap();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_resolve_port_prefers_arg() {
        let config = Config {
            port: Some("/dev/ttyUSB0".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve_port(Some("/dev/ttyACM0".to_string()), &config),
            Some("/dev/ttyACM0".to_string())
        );
        assert_eq!(resolve_port(None, &config), Some("/dev/ttyUSB0".to_string()));
        assert_eq!(resolve_port(None, &Config::default()), None);
    }

    #[test]
    fn test_resolve_user() {
        let config = Config {
            user: Some("bob".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_user(Some("alice".to_string()), &config), "alice");
        assert_eq!(resolve_user(None, &config), "bob");
        assert_eq!(resolve_user(None, &Config::default()), "");
    }

    #[test]
    fn test_set_get_unset() {
        let mut config = Config::default();
        config.set(ConfigKey::Baud, "19200").unwrap();
        assert_eq!(config.get(ConfigKey::Baud).as_deref(), Some("19200"));
        assert!(config.set(ConfigKey::Baud, "fast").is_err());
        assert!(config.set(ConfigKey::Baud, "0").is_err());

        config.set(ConfigKey::ExcludePorts, "/dev/ttyS, ,/dev/ttyAMA").unwrap();
        assert_eq!(config.exclude_ports, vec!["/dev/ttyS", "/dev/ttyAMA"]);

        config.set(ConfigKey::Ambient, "yes").unwrap();
        assert!(config.ambient.enabled);
        assert!(config.set(ConfigKey::Ambient, "maybe").is_err());

        config.set(ConfigKey::Port, "").unwrap();
        assert_eq!(config.get(ConfigKey::Port), None);

        config.unset(ConfigKey::Baud);
        assert_eq!(config.baud_rate, 9600);
    }

    #[test]
    fn test_session_options() {
        let config = Config {
            data_dir: Some(PathBuf::from("/srv/li850")),
            join_timeout_secs: 3,
            ..Default::default()
        };
        let options = config.session_options(Some(19200), None).unwrap();
        assert_eq!(options.baud_rate, 19200);
        assert_eq!(options.join_timeout, Duration::from_secs(3));
        assert_eq!(options.data_dir, PathBuf::from("/srv/li850"));

        let options = config
            .session_options(None, Some(PathBuf::from("here")))
            .unwrap();
        assert_eq!(options.baud_rate, 9600);
        assert_eq!(options.data_dir, PathBuf::from("here"));

        let bad = Config {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(bad.session_options(None, None).is_err());
    }

    #[test]
    fn test_port_filter_from_config() {
        let config = Config {
            exclude_ports: vec!["ttyAMA".to_string()],
            ..Default::default()
        };
        let filter = config.port_filter();
        assert!(filter.is_excluded("/dev/ttyAMA0"));
        assert!(!filter.is_excluded("/dev/ttyS0"));
    }
}
