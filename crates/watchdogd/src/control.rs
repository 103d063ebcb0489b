//! Owned control FIFO resource.
//!
//! The control channel is a named pipe external processes write extension
//! requests to. The channel owns the descriptor's whole lifecycle: creation
//! with writer-only permissions, bounded readiness waits, and recreation
//! whenever a read reports an error or end-of-file (a FIFO is consumed by at
//! most one writer turn at a time). The event loop never touches the
//! descriptor directly.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::stat::{Mode, fchmod};
use nix::unistd::mkfifo;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use watchdog_core::{PetRequest, interpret};

use crate::daemon::ControlSource;

const CONTROL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::control");

/// Largest chunk read from the FIFO in one wake-up.
const READ_BUFFER_BYTES: usize = 1024;

/// Errors raised while setting up the control FIFO.
///
/// Setup failures are never fatal to the daemon: they are logged and the
/// channel retries creation on the next bounded wait.
#[derive(Debug, Error)]
pub enum ControlChannelError {
    /// The directory holding the FIFO could not be created.
    #[error("failed to create control fifo directory '{path}': {source}")]
    Directory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A stale filesystem entry at the FIFO path could not be removed.
    #[error("failed to remove stale control fifo '{path}': {source}")]
    RemoveStale {
        /// Path of the stale entry.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The FIFO itself could not be created.
    #[error("failed to create control fifo '{path}': {source}")]
    Create {
        /// FIFO path.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// The FIFO could not be opened for reading.
    #[error("failed to open control fifo '{path}' for reading: {source}")]
    Open {
        /// FIFO path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Named control channel owned by the daemon.
///
/// Dropping the channel closes the descriptor and removes the FIFO from the
/// filesystem.
#[derive(Debug)]
pub struct ControlChannel {
    path: PathBuf,
    fifo: Option<File>,
}

impl ControlChannel {
    /// Creates the FIFO at `path` and opens it for reading.
    ///
    /// A setup failure is logged and leaves the channel in a broken state;
    /// creation is retried on each subsequent wait, so the daemon keeps its
    /// pet cadence even while the channel is unavailable.
    #[must_use]
    pub fn create(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let fifo = match open_fifo(&path) {
            Ok(fifo) => {
                info!(
                    target: CONTROL_TARGET,
                    path = %path.display(),
                    "control fifo ready"
                );
                Some(fifo)
            }
            Err(problem) => {
                error!(target: CONTROL_TARGET, error = %problem, "failed to create control fifo");
                None
            }
        };
        Self { path, fifo }
    }

    /// Waits up to `budget` for a request from an external writer.
    ///
    /// A poll error is treated as "nothing to read". A zero-byte read or a
    /// read error recreates the FIFO and yields no request, leaving the
    /// caller's deadline untouched.
    pub fn wait_for_request(&mut self, budget: Duration) -> Option<PetRequest> {
        if self.fifo.is_none() {
            self.reopen();
        }

        let mut buf = [0_u8; READ_BUFFER_BYTES];
        let outcome = {
            let Some(fifo) = self.fifo.as_ref() else {
                // Channel still broken; preserve the loop cadence anyway.
                thread::sleep(budget);
                return None;
            };
            if !ready_within(fifo.as_fd(), budget) {
                return None;
            }
            let mut reader = fifo;
            reader.read(&mut buf)
        };

        match outcome {
            Ok(0) => {
                debug!(target: CONTROL_TARGET, "control fifo writer gone; recreating");
                self.reopen();
                None
            }
            Ok(len) => buf.get(..len).and_then(interpret),
            Err(problem) if problem.kind() == io::ErrorKind::WouldBlock => None,
            Err(problem) => {
                error!(
                    target: CONTROL_TARGET,
                    error = %problem,
                    path = %self.path.display(),
                    "error reading control fifo; recreating"
                );
                self.reopen();
                None
            }
        }
    }

    /// Path the FIFO lives at.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    fn reopen(&mut self) {
        // Drop the old descriptor before unlinking and recreating the FIFO.
        self.fifo = None;
        match open_fifo(&self.path) {
            Ok(fifo) => {
                self.fifo = Some(fifo);
            }
            Err(problem) => {
                error!(target: CONTROL_TARGET, error = %problem, "failed to recreate control fifo");
            }
        }
    }
}

impl Drop for ControlChannel {
    fn drop(&mut self) {
        self.fifo = None;
        match fs::remove_file(&self.path) {
            Err(problem) if problem.kind() != io::ErrorKind::NotFound => {
                warn!(
                    target: CONTROL_TARGET,
                    path = %self.path.display(),
                    error = %problem,
                    "failed to remove control fifo"
                );
            }
            _ => {}
        }
    }
}

impl ControlSource for ControlChannel {
    fn wait_for_request(&mut self, budget: Duration) -> Option<PetRequest> {
        Self::wait_for_request(self, budget)
    }
}

fn open_fifo(path: &Path) -> Result<File, ControlChannelError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| ControlChannelError::Directory {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(problem) if problem.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(ControlChannelError::RemoveStale {
                path: path.to_path_buf(),
                source,
            });
        }
    }
    mkfifo(path, Mode::from_bits_truncate(0o620)).map_err(|source| {
        ControlChannelError::Create {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let mut options = OpenOptions::new();
    options.read(true);
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.custom_flags(nix::libc::O_NONBLOCK);
    }
    let fifo = options.open(path).map_err(|source| ControlChannelError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    // External processes only ever write to the FIFO.
    if let Err(errno) = fchmod(fifo.as_raw_fd(), Mode::from_bits_truncate(0o220)) {
        warn!(
            target: CONTROL_TARGET,
            error = %errno,
            path = %path.display(),
            "failed to make control fifo write-only"
        );
    }
    Ok(fifo)
}

fn ready_within(fd: BorrowedFd<'_>, budget: Duration) -> bool {
    let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
    match poll(&mut fds, poll_timeout(budget)) {
        Ok(ready) => ready > 0,
        Err(Errno::EINTR) => {
            // A signal landed mid-wait; the loop observes the shutdown flag
            // on its next iteration.
            debug!(target: CONTROL_TARGET, "control poll interrupted");
            false
        }
        Err(errno) => {
            error!(target: CONTROL_TARGET, error = %errno, "control fifo poll failed");
            false
        }
    }
}

fn poll_timeout(budget: Duration) -> PollTimeout {
    i32::try_from(budget.as_millis())
        .ok()
        .and_then(|millis| PollTimeout::try_from(millis).ok())
        .unwrap_or(PollTimeout::MAX)
}
