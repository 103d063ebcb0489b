//! Command-line and environment configuration for the daemon.

use std::env;
use std::path::PathBuf;

use clap::Parser;

use crate::telemetry::LogFormat;

/// Environment variable whose presence switches the daemon into test mode:
/// no hardware device is opened and deadline expiry terminates the process.
pub const TEST_MODE_ENV_VAR: &str = "WATCHDOGD_TEST_MODE";

/// Environment variable holding the log filter expression.
pub const LOG_FILTER_ENV_VAR: &str = "WATCHDOGD_LOG";

const DEFAULT_LOG_FILTER: &str = "info";

/// Command-line arguments accepted by the daemon.
///
/// The positional arguments mirror the traditional invocation:
/// `watchdogd [interval [margin [grace]]]`, all in seconds.
#[derive(Debug, Parser)]
#[command(name = "watchdogd", version, about = "Hardware watchdog petting daemon")]
pub struct Cli {
    /// Normal pet period in seconds.
    #[arg(default_value_t = 10)]
    pub interval: u32,

    /// Slack in seconds added on top of the interval when requesting the
    /// hardware timeout.
    #[arg(default_value_t = 20)]
    pub margin: u32,

    /// Initial grace period in seconds before the deadline first expires.
    #[arg(default_value_t = 30)]
    pub grace: u32,

    /// Path of the control FIFO external processes write extensions to.
    #[arg(long, default_value = "/run/watchdogd/pet")]
    pub control_path: PathBuf,

    /// Path of the hardware watchdog device.
    #[arg(long, default_value = "/dev/watchdog")]
    pub device_path: PathBuf,

    /// Log output format.
    #[arg(long, value_enum, default_value = "compact")]
    pub log_format: LogFormat,
}

/// True when the test-mode environment variable is present.
#[must_use]
pub fn test_mode() -> bool {
    env::var_os(TEST_MODE_ENV_VAR).is_some()
}

/// Log filter expression from the environment, defaulting to `info`.
#[must_use]
pub fn log_filter() -> String {
    env::var(LOG_FILTER_ENV_VAR).unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_owned())
}
