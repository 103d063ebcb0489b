//! Wall-clock seam and absolute pet deadlines.

use std::time::{Duration, SystemTime};

/// Upper bound applied to a single extension so deadline arithmetic can never
/// overflow the platform time representation. A century of seconds.
const MAX_EXTENSION_SECS: u64 = 3_155_760_000;

/// Source of the current wall-clock time.
///
/// The daemon injects a system-backed implementation; tests substitute a fake
/// so deadline behaviour can be driven without sleeping.
pub trait Clock {
    /// Returns the current absolute time.
    fn now(&self) -> SystemTime;
}

/// Absolute point in time after which the system counts as unpetted.
///
/// A deadline is only ever replaced wholesale by the event loop when an
/// extension is accepted; between iterations it is immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(SystemTime);

impl Deadline {
    /// Deadline `secs` seconds after `now`.
    ///
    /// Extensions are clamped to [`MAX_EXTENSION_SECS`] so a pathological
    /// request cannot overflow the underlying time type.
    #[must_use]
    pub fn after(now: SystemTime, secs: u64) -> Self {
        let span = Duration::from_secs(secs.min(MAX_EXTENSION_SECS));
        Self(now.checked_add(span).unwrap_or(now))
    }

    /// Time left until the deadline, or `None` once it has passed.
    #[must_use]
    pub fn remaining(self, now: SystemTime) -> Option<Duration> {
        if self.is_expired(now) {
            None
        } else {
            self.0.duration_since(now).ok()
        }
    }

    /// True once the deadline is at or before `now`.
    #[must_use]
    pub fn is_expired(self, now: SystemTime) -> bool {
        self.0 <= now
    }
}
