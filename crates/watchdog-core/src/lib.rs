//! Pet-expiration core for the hardware watchdog daemon.
//!
//! This crate holds the pure model the daemon is built around: the wall-clock
//! seam, absolute pet deadlines, the bounded-wait arbiter that reconciles the
//! pet cadence with the expiry deadline, the interval/margin schedule
//! negotiated with the kernel driver, and the parser for the textual control
//! protocol. No I/O happens here; descriptors are owned by the daemon crate.

mod arbiter;
mod clock;
mod parse;
mod schedule;

pub use arbiter::minimum_wait;
pub use clock::{Clock, Deadline};
pub use parse::{PetRequest, interpret, last_integer};
pub use schedule::{PetSchedule, ScheduleError};
