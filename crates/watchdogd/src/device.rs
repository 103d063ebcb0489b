//! Hardware watchdog device driver.
//!
//! Owns the device descriptor, negotiates the effective timeout with the
//! kernel driver, and performs the one-byte pet write. In test mode the
//! driver is disengaged: no device is opened and every operation succeeds as
//! a no-op.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

use nix::libc::c_int;
use thiserror::Error;
use tracing::error;

use watchdog_core::PetSchedule;

use crate::daemon::PetSink;

const DEVICE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::device");

// From <linux/watchdog.h>: WDIOC_SETTIMEOUT is _IOWR('W', 6, int) and
// WDIOC_GETTIMEOUT is _IOR('W', 7, int).
const WATCHDOG_IOCTL_BASE: u8 = b'W';
nix::ioctl_readwrite!(wdioc_settimeout, WATCHDOG_IOCTL_BASE, 6, c_int);
nix::ioctl_read!(wdioc_gettimeout, WATCHDOG_IOCTL_BASE, 7, c_int);

/// Errors fatal to opening the watchdog device.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The device node could not be opened read/write.
    #[error("failed to open watchdog device '{path}': {source}")]
    Open {
        /// Device path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Writable handle to the hardware watchdog, or a test-mode stand-in.
#[derive(Debug)]
pub struct WatchdogDevice {
    device: Option<File>,
}

impl WatchdogDevice {
    /// Opens the device node read/write.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Open`] when the node cannot be opened; outside
    /// test mode the daemon cannot usefully run without it.
    pub fn open(path: &Path) -> Result<Self, DeviceError> {
        let device = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| DeviceError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            device: Some(device),
        })
    }

    /// Test-mode stand-in with no underlying device.
    ///
    /// Pets are no-ops and timeout negotiation reports the requested schedule
    /// back unchanged.
    #[must_use]
    pub const fn disengaged() -> Self {
        Self { device: None }
    }

    /// True when no device is attached.
    #[must_use]
    pub const fn is_disengaged(&self) -> bool {
        self.device.is_none()
    }

    /// Negotiates `interval + margin` with the kernel driver.
    ///
    /// When the driver rejects the request, the timeout it actually enforces
    /// is queried and the schedule is recomputed around it; the caller must
    /// adopt the returned schedule for all subsequent waits. If the query
    /// also fails the schedule is returned unchanged. Repeating the call with
    /// the same inputs yields the same result.
    #[must_use]
    pub fn negotiate_timeout(&self, schedule: PetSchedule) -> PetSchedule {
        let Some(device) = self.device.as_ref() else {
            return schedule;
        };
        let mut timeout: c_int = i32::try_from(schedule.timeout()).unwrap_or(c_int::MAX);
        let requested = timeout;
        if let Err(errno) = unsafe { wdioc_settimeout(device.as_raw_fd(), &mut timeout) } {
            error!(
                target: DEVICE_TARGET,
                error = %errno,
                requested,
                "driver rejected requested watchdog timeout"
            );
            return self.adopt_driver_timeout(schedule);
        }
        schedule
    }

    fn adopt_driver_timeout(&self, schedule: PetSchedule) -> PetSchedule {
        let Some(device) = self.device.as_ref() else {
            return schedule;
        };
        let mut granted: c_int = 0;
        match unsafe { wdioc_gettimeout(device.as_raw_fd(), &mut granted) } {
            Ok(_) => {
                let granted = u32::try_from(granted).unwrap_or(0);
                let adjusted = schedule.adjusted_to_driver(granted);
                error!(
                    target: DEVICE_TARGET,
                    timeout = granted,
                    interval = adjusted.interval(),
                    margin = adjusted.margin(),
                    "adjusted pet interval to driver-enforced timeout"
                );
                adjusted
            }
            Err(errno) => {
                error!(
                    target: DEVICE_TARGET,
                    error = %errno,
                    "failed to query driver-enforced timeout"
                );
                schedule
            }
        }
    }
}

impl PetSink for WatchdogDevice {
    /// Writes a single arbitrary byte to the device; a no-op when disengaged.
    fn pet(&mut self) {
        let Some(device) = self.device.as_mut() else {
            return;
        };
        if let Err(problem) = device.write_all(&[0_u8]) {
            error!(
                target: DEVICE_TARGET,
                error = %problem,
                "failed to pet watchdog device"
            );
        }
    }
}
