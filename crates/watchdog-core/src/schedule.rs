//! Pet schedule: the interval/margin pair negotiated with the kernel driver.

use std::time::Duration;

use thiserror::Error;

/// Errors rejecting an unusable pet schedule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    /// The pet interval must be at least one second.
    #[error("pet interval must be at least one second")]
    ZeroInterval,
}

/// Pet cadence and the slack added when requesting a hardware timeout.
///
/// `interval` is how often the daemon normally pets; `margin` is the extra
/// slack requested on top so the daemon can usually pet again before the
/// hardware countdown reaches zero. The value asked of the driver is always
/// `interval + margin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PetSchedule {
    interval: u32,
    margin: u32,
}

impl PetSchedule {
    /// Builds a schedule from interval and margin seconds.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::ZeroInterval`] when `interval` is zero. A zero
    /// margin is accepted.
    pub const fn new(interval: u32, margin: u32) -> Result<Self, ScheduleError> {
        if interval == 0 {
            return Err(ScheduleError::ZeroInterval);
        }
        Ok(Self { interval, margin })
    }

    /// Pet interval in seconds.
    #[must_use]
    pub const fn interval(&self) -> u32 {
        self.interval
    }

    /// Margin in seconds.
    #[must_use]
    pub const fn margin(&self) -> u32 {
        self.margin
    }

    /// Timeout requested from the hardware driver, in seconds.
    #[must_use]
    pub const fn timeout(&self) -> u32 {
        self.interval.saturating_add(self.margin)
    }

    /// Pet interval as a [`Duration`].
    #[must_use]
    pub const fn interval_duration(&self) -> Duration {
        Duration::from_secs(self.interval as u64)
    }

    /// Requested timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout() as u64)
    }

    /// Schedule recomputed against the timeout the driver actually enforces.
    ///
    /// The margin is kept; the interval shrinks to `granted - margin`, floored
    /// at one second, so a driver that cannot honour the request still leaves
    /// the daemon petting ahead of the hardware countdown. Idempotent for a
    /// fixed `granted` value. Once forced to one second the interval is never
    /// re-grown later.
    #[must_use]
    pub const fn adjusted_to_driver(self, granted: u32) -> Self {
        let interval = if granted > self.margin {
            granted - self.margin
        } else {
            1
        };
        Self {
            interval,
            margin: self.margin,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::{PetSchedule, ScheduleError};

    fn schedule(interval: u32, margin: u32) -> PetSchedule {
        PetSchedule::new(interval, margin).expect("valid schedule")
    }

    #[test]
    fn timeout_is_interval_plus_margin() {
        let sched = schedule(10, 20);
        assert_eq!(sched.timeout(), 30);
        assert_eq!(sched.interval_duration(), Duration::from_secs(10));
        assert_eq!(sched.timeout_duration(), Duration::from_secs(30));
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert_eq!(PetSchedule::new(0, 20), Err(ScheduleError::ZeroInterval));
    }

    #[test]
    fn zero_margin_is_accepted() {
        let sched = schedule(10, 0);
        assert_eq!(sched.timeout(), 10);
    }

    #[rstest]
    #[case::driver_accepts_request(30, 10)]
    #[case::driver_grants_more(45, 25)]
    #[case::driver_grants_less_than_margin(15, 1)]
    #[case::driver_grants_exactly_margin(20, 1)]
    #[case::driver_grants_nothing(0, 1)]
    fn adjusts_interval_to_granted_timeout(#[case] granted: u32, #[case] expected_interval: u32) {
        let adjusted = schedule(10, 20).adjusted_to_driver(granted);
        assert_eq!(adjusted.interval(), expected_interval);
        assert_eq!(adjusted.margin(), 20);
    }

    #[test]
    fn adjustment_is_idempotent() {
        let once = schedule(10, 20).adjusted_to_driver(15);
        let twice = once.adjusted_to_driver(15);
        assert_eq!(once, twice);
        assert_eq!(twice.interval(), 1);
    }

    #[test]
    fn timeout_saturates_instead_of_overflowing() {
        let sched = schedule(u32::MAX, u32::MAX);
        assert_eq!(sched.timeout(), u32::MAX);
    }
}
