//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

/// Reusable serial connection arguments
#[derive(Debug, Clone, Args)]
pub struct PortArgs {
    /// Serial device (e.g. /dev/ttyACM0, COM3), or use LI850_PORT env var
    #[arg(short, long, env = "LI850_PORT")]
    pub port: Option<String>,

    /// Baud rate (default from config, else 9600)
    #[arg(short, long)]
    pub baud: Option<u32>,
}

#[derive(Parser)]
#[command(name = "li850")]
#[command(author, version, about = "Acquisition tool for the LI-COR Li-850 gas analyzer", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output compact JSON (no pretty-printing)
    #[arg(long, global = true)]
    pub compact: bool,

    /// Omit header row in CSV output
    #[arg(long, global = true)]
    pub no_header: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Write output to file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List serial ports
    Ports {
        /// Include ports hidden by the exclusion patterns
        #[arg(short, long)]
        all: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Stream live readings from the analyzer
    Watch {
        #[command(flatten)]
        port: PortArgs,

        /// Print interval in seconds
        #[arg(short, long, default_value = "5")]
        interval: u64,

        /// Number of readings to print before exiting (0 for unlimited)
        #[arg(short = 'n', long, default_value = "0")]
        count: u32,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Record valid samples to a timestamped CSV file
    Record {
        #[command(flatten)]
        port: PortArgs,

        /// Base file name; the capture time is appended
        #[arg(short, long, default_value = "")]
        name: String,

        /// Operator label written into every row (default from config)
        #[arg(short, long)]
        user: Option<String>,

        /// Directory to write into (default from config, else ./data)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Stop after this many rows
        #[arg(short, long)]
        count: Option<usize>,
    },

    /// Show the instrument status frame
    Status {
        /// Serial device to read CO2 from; network status only if omitted
        #[arg(short, long, env = "LI850_PORT")]
        port: Option<String>,

        /// Print a single frame and exit
        #[arg(long)]
        once: bool,

        /// Refresh interval in seconds
        #[arg(short, long, default_value = "5")]
        interval: u64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Summarize a recorded CSV file
    Inspect {
        /// Recording to read
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Configuration keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigKey {
    /// Default serial port
    Port,
    /// Baud rate
    Baud,
    /// Directory recordings are written into
    DataDir,
    /// Default operator label
    User,
    /// Comma-separated device-path fragments hidden from `ports`
    ExcludePorts,
    /// Seconds to wait for the reader to stop
    JoinTimeout,
    /// Disable colored output
    NoColor,
    /// Read the SCD30 ambient sensor
    Ambient,
}

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key
        #[arg(value_enum)]
        key: ConfigKey,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        #[arg(value_enum)]
        key: ConfigKey,
        /// Configuration value
        value: String,
    },

    /// Unset (reset to default) a configuration value
    Unset {
        /// Configuration key to reset
        #[arg(value_enum)]
        key: ConfigKey,
    },

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init,
}
