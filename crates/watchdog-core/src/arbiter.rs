//! Bounded-wait arbitration between the pet cadence and the expiry deadline.

use std::time::{Duration, SystemTime};

use crate::clock::Deadline;

/// Longest the event loop may block before its next obligation.
///
/// An expired deadline yields [`Duration::ZERO`] so expiry is handled
/// immediately rather than after another full interval. Otherwise the wait is
/// the lesser of the routine pet interval and the time left before expiry, so
/// the loop neither misses a scheduled pet nor notices expiry late.
#[must_use]
pub fn minimum_wait(interval: Duration, deadline: Deadline, now: SystemTime) -> Duration {
    deadline
        .remaining(now)
        .map_or(Duration::ZERO, |left| interval.min(left))
}
