//! System clock with stale-value degradation.

use std::cell::Cell;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use nix::sys::time::TimeSpec;
use nix::time::{ClockId, clock_gettime};
use tracing::error;

use watchdog_core::Clock;

const CLOCK_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::clock");

/// Wall clock backed by `CLOCK_REALTIME`.
///
/// A failed read is logged and degrades to the last successfully observed
/// value rather than aborting the process; a stale pet beats a reset caused
/// by the daemon dying.
#[derive(Debug)]
pub struct SystemClock {
    last: Cell<SystemTime>,
}

impl SystemClock {
    /// Builds a clock with [`UNIX_EPOCH`] as the initial stale fallback.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: Cell::new(UNIX_EPOCH),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        let reading = clock_gettime(ClockId::CLOCK_REALTIME)
            .ok()
            .and_then(timespec_to_system_time);
        match reading {
            Some(now) => {
                self.last.set(now);
                now
            }
            None => {
                error!(
                    target: CLOCK_TARGET,
                    "failed to read system clock; using stale value"
                );
                self.last.get()
            }
        }
    }
}

fn timespec_to_system_time(spec: TimeSpec) -> Option<SystemTime> {
    let secs = u64::try_from(spec.tv_sec()).ok()?;
    let nanos = u32::try_from(spec.tv_nsec()).ok()?;
    UNIX_EPOCH.checked_add(Duration::new(secs, nanos))
}
