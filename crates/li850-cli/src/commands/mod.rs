//! Command implementations for the CLI.

mod config;
mod inspect;
mod ports;
mod record;
mod status;
mod watch;

pub use config::cmd_config;
pub use inspect::cmd_inspect;
pub use ports::cmd_ports;
pub use record::{RecordArgs, cmd_record};
pub use status::{StatusArgs, cmd_status};
pub use watch::{WatchArgs, cmd_watch};
