//! Event loop tying the clock, device, and control channel together.
//!
//! Each iteration pets the device if the deadline has not expired, then
//! blocks on the control channel for at most the arbitrated wait. Extensions
//! obtained from the channel replace the deadline wholesale; everything else
//! leaves it untouched. The loop is single-threaded and its only suspension
//! point is that bounded wait, so no state needs locking.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use signal_hook::consts::signal::{SIGINT, SIGTERM};
use thiserror::Error;
use tracing::info;

use watchdog_core::{Clock, Deadline, PetRequest, PetSchedule, ScheduleError, minimum_wait};

use crate::cli::{self, Cli};
use crate::clock::SystemClock;
use crate::control::ControlChannel;
use crate::device::{DeviceError, WatchdogDevice};

const DAEMON_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::daemon");

/// Source of extension requests from external processes.
pub trait ControlSource {
    /// Waits up to `budget` for a request, returning one if it arrived.
    fn wait_for_request(&mut self, budget: Duration) -> Option<PetRequest>;
}

/// Destination of pet writes.
#[cfg_attr(test, mockall::automock)]
pub trait PetSink {
    /// Signals liveness to the hardware.
    fn pet(&mut self);
}

/// What the loop does once the deadline expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryPolicy {
    /// Stop petting but keep running; the hardware countdown does the rest.
    CeasePetting,
    /// Leave the loop; used in test mode where no hardware is armed.
    Terminate,
}

/// Errors fatal to daemon startup.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The pet schedule was rejected.
    #[error("invalid pet schedule: {source}")]
    Schedule {
        /// Underlying validation error.
        #[from]
        source: ScheduleError,
    },
    /// The watchdog device could not be opened outside test mode.
    #[error("watchdog device unavailable: {source}")]
    Device {
        /// Underlying device error.
        #[from]
        source: DeviceError,
    },
    /// Installing the shutdown signal flag failed.
    #[error("failed to install signal handlers: {source}")]
    Signals {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Single-threaded pet loop over injected collaborators.
#[derive(Debug)]
pub struct PetLoop<C, D, S> {
    clock: C,
    device: D,
    control: S,
    schedule: PetSchedule,
    deadline: Deadline,
    policy: ExpiryPolicy,
    shutdown: Arc<AtomicBool>,
}

impl<C, D, S> PetLoop<C, D, S>
where
    C: Clock,
    D: PetSink,
    S: ControlSource,
{
    /// Builds a loop starting from `deadline`.
    pub const fn new(
        clock: C,
        device: D,
        control: S,
        schedule: PetSchedule,
        deadline: Deadline,
        policy: ExpiryPolicy,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            clock,
            device,
            control,
            schedule,
            deadline,
            policy,
            shutdown,
        }
    }

    /// Current expiration deadline.
    #[must_use]
    pub const fn deadline(&self) -> Deadline {
        self.deadline
    }

    /// Runs until the shutdown flag is observed or, under
    /// [`ExpiryPolicy::Terminate`], the deadline expires.
    pub fn run(&mut self) {
        while !self.shutdown.load(Ordering::SeqCst) {
            if !self.iterate() {
                break;
            }
        }
        info!(target: DAEMON_TARGET, "pet loop stopped");
    }

    /// One loop iteration; returns false when the loop should end.
    fn iterate(&mut self) -> bool {
        let now = self.clock.now();
        if self.deadline.is_expired(now) {
            if self.policy == ExpiryPolicy::Terminate {
                info!(target: DAEMON_TARGET, "pet deadline expired; terminating");
                return false;
            }
        } else {
            let remaining = self.deadline.remaining(now).unwrap_or(Duration::ZERO);
            info!(
                target: DAEMON_TARGET,
                remaining_secs = remaining.as_secs(),
                "pet"
            );
            self.device.pet();
        }

        let budget = minimum_wait(self.schedule.interval_duration(), self.deadline, now);
        if let Some(request) = self.control.wait_for_request(budget) {
            self.apply(request);
        }
        true
    }

    fn apply(&mut self, request: PetRequest) {
        let seconds = match request {
            PetRequest::ExtendSeconds(seconds) => seconds,
            // Unparsed but non-empty traffic counts as a proxy pet for a full
            // timeout, not just one interval.
            PetRequest::Ping => u64::from(self.schedule.timeout()),
        };
        self.deadline = Deadline::after(self.clock.now(), seconds);
        info!(target: DAEMON_TARGET, seconds, "pet deadline extended");
    }
}

/// Runs the daemon with the production collaborators.
///
/// # Errors
///
/// Returns [`LaunchError`] when startup cannot complete: an unusable
/// schedule, a missing watchdog device outside test mode, or a failed signal
/// registration. Control-channel setup failures are not fatal; the channel
/// retries on every iteration.
pub fn run_daemon(cli: &Cli) -> Result<(), LaunchError> {
    let test_mode = cli::test_mode();
    let mut schedule = PetSchedule::new(cli.interval, cli.margin)?;

    let device = if test_mode {
        WatchdogDevice::disengaged()
    } else {
        WatchdogDevice::open(&cli.device_path)?
    };
    schedule = device.negotiate_timeout(schedule);

    info!(
        target: DAEMON_TARGET,
        timeout_secs = schedule.timeout(),
        interval_secs = schedule.interval(),
        test_mode,
        "starting watchdogd"
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&shutdown))
            .map_err(|source| LaunchError::Signals { source })?;
    }

    let clock = SystemClock::new();
    let deadline = Deadline::after(clock.now(), u64::from(cli.grace));
    let control = ControlChannel::create(&cli.control_path);
    let policy = if test_mode {
        ExpiryPolicy::Terminate
    } else {
        ExpiryPolicy::CeasePetting
    };

    let mut pet_loop = PetLoop::new(clock, device, control, schedule, deadline, policy, shutdown);
    pet_loop.run();

    info!(target: DAEMON_TARGET, "watchdogd shutting down");
    Ok(())
}
