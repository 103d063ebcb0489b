//! Hardware watchdog petting daemon.
//!
//! `watchdogd` keeps a kernel watchdog device from resetting the machine by
//! writing to it on a fixed cadence, while letting external processes move
//! the "stay alive" deadline through a named control FIFO. The process is
//! single-threaded: one bounded poll on the FIFO services both the pet
//! cadence and the expiry deadline, so the loop never busy-waits and never
//! blocks past its next obligation.
//!
//! Writing a line such as `60` to the FIFO moves the deadline sixty seconds
//! into the future; any other non-empty traffic counts as a bare liveness
//! ping. In test mode (`WATCHDOGD_TEST_MODE` set) no device is opened and an
//! expired deadline terminates the process instead of letting the hardware
//! reset the machine.

pub mod cli;
mod clock;
mod control;
mod daemon;
mod device;
mod telemetry;

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

pub use clock::SystemClock;
pub use control::{ControlChannel, ControlChannelError};
pub use daemon::{ControlSource, ExpiryPolicy, LaunchError, PetLoop, PetSink, run_daemon};
pub use device::{DeviceError, WatchdogDevice};
pub use telemetry::{LogFormat, TelemetryError};

use cli::Cli;

/// Parses the command line, initialises telemetry, and runs the daemon.
///
/// Returns exit status 0 on clean shutdown and 1 on fatal startup failure,
/// notably when the watchdog device cannot be opened outside test mode.
#[must_use]
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    if let Err(problem) = telemetry::initialise(&cli::log_filter(), cli.log_format) {
        // Telemetry is not up; stderr is all we have.
        writeln!(io::stderr(), "watchdogd: {problem}").ok();
        return ExitCode::FAILURE;
    }
    match run_daemon(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(problem) => {
            error!(error = %problem, "daemon failed");
            ExitCode::FAILURE
        }
    }
}
