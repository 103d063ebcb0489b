//! End-to-end pet loop runs over a real control FIFO and system clock.

use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use watchdog_core::{Deadline, PetSchedule};
use watchdogd::{ControlChannel, ExpiryPolicy, PetLoop, PetSink, SystemClock};

struct CountingSink {
    pets: Arc<AtomicUsize>,
}

impl PetSink for CountingSink {
    fn pet(&mut self) {
        self.pets.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn expired_deadline_in_test_mode_exits_without_petting() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("pet");
    let pets = Arc::new(AtomicUsize::new(0));
    let clock = SystemClock::new();
    let schedule = PetSchedule::new(10, 20).expect("valid schedule");
    let deadline = Deadline::after(std::time::SystemTime::now(), 0);

    let mut pet_loop = PetLoop::new(
        clock,
        CountingSink {
            pets: Arc::clone(&pets),
        },
        ControlChannel::create(&path),
        schedule,
        deadline,
        ExpiryPolicy::Terminate,
        Arc::new(AtomicBool::new(false)),
    );
    pet_loop.run();

    assert_eq!(pets.load(Ordering::SeqCst), 0);
}

#[test]
fn buffered_extension_keeps_the_loop_petting_until_it_lapses() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("pet");
    let pets = Arc::new(AtomicUsize::new(0));
    let clock = SystemClock::new();
    let schedule = PetSchedule::new(1, 0).expect("valid schedule");
    let deadline = Deadline::after(std::time::SystemTime::now(), 1);
    let channel = ControlChannel::create(&path);

    // Queue an extension in the pipe before the loop ever polls it.
    let mut writer = OpenOptions::new()
        .write(true)
        .custom_flags(nix::libc::O_NONBLOCK)
        .open(&path)
        .expect("open fifo for writing");
    writer.write_all(b"2\n").expect("write extension");
    drop(writer);

    let mut pet_loop = PetLoop::new(
        clock,
        CountingSink {
            pets: Arc::clone(&pets),
        },
        channel,
        schedule,
        deadline,
        ExpiryPolicy::Terminate,
        Arc::new(AtomicBool::new(false)),
    );
    pet_loop.run();
    drop(pet_loop);

    // The initial grace and the queued two-second extension were both
    // honoured before expiry terminated the loop.
    assert!(pets.load(Ordering::SeqCst) >= 2);
    // Every exit path releases the FIFO.
    assert!(!path.exists());
}
