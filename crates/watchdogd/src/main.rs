//! Daemon entrypoint for `watchdogd`.
//!
//! The binary delegates to [`watchdogd::run`], which parses arguments,
//! initialises telemetry, and drives the pet loop until shutdown.

use std::process::ExitCode;

fn main() -> ExitCode {
    watchdogd::run()
}
