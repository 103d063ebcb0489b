//! Integration tests for the control FIFO resource against a real filesystem.

use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::Path;
use std::time::Duration;

use watchdog_core::PetRequest;
use watchdogd::ControlChannel;

fn open_writer(path: &Path) -> std::fs::File {
    // Non-blocking open only succeeds while the daemon holds the read end.
    OpenOptions::new()
        .write(true)
        .custom_flags(nix::libc::O_NONBLOCK)
        .open(path)
        .expect("open fifo for writing")
}

#[test]
fn creates_a_fifo_at_the_requested_path() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("pet");
    let _channel = ControlChannel::create(&path);

    let metadata = std::fs::metadata(&path).expect("fifo metadata");
    assert!(metadata.file_type().is_fifo());
}

#[test]
fn last_valid_integer_in_a_chunk_wins() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("pet");
    let mut channel = ControlChannel::create(&path);

    let mut writer = open_writer(&path);
    writer.write_all(b"banana\n12\n").expect("write request");

    let request = channel.wait_for_request(Duration::from_secs(1));
    assert_eq!(request, Some(PetRequest::ExtendSeconds(12)));
}

#[test]
fn unparsable_traffic_degrades_to_a_ping() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("pet");
    let mut channel = ControlChannel::create(&path);

    let mut writer = open_writer(&path);
    writer.write_all(b"are you alive?\n").expect("write ping");

    let request = channel.wait_for_request(Duration::from_secs(1));
    assert_eq!(request, Some(PetRequest::Ping));
}

#[test]
fn negative_extensions_degrade_to_a_ping() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("pet");
    let mut channel = ControlChannel::create(&path);

    let mut writer = open_writer(&path);
    writer.write_all(b"-5\n").expect("write request");

    let request = channel.wait_for_request(Duration::from_secs(1));
    assert_eq!(request, Some(PetRequest::Ping));
}

#[test]
fn empty_wait_times_out_with_no_request() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("pet");
    let mut channel = ControlChannel::create(&path);

    let request = channel.wait_for_request(Duration::from_millis(50));
    assert_eq!(request, None);
}

#[test]
fn writer_hangup_recreates_the_fifo_without_an_extension() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("pet");
    let mut channel = ControlChannel::create(&path);

    // Open and close the write end without sending anything.
    drop(open_writer(&path));

    let request = channel.wait_for_request(Duration::from_secs(1));
    assert_eq!(request, None);

    // The channel recreated itself and keeps accepting requests.
    let metadata = std::fs::metadata(&path).expect("fifo metadata");
    assert!(metadata.file_type().is_fifo());
    let mut writer = open_writer(&path);
    writer.write_all(b"7\n").expect("write request");
    let request = channel.wait_for_request(Duration::from_secs(1));
    assert_eq!(request, Some(PetRequest::ExtendSeconds(7)));
}

#[test]
fn dropping_the_channel_removes_the_fifo() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("pet");
    let channel = ControlChannel::create(&path);
    assert!(path.exists());

    drop(channel);
    assert!(!path.exists());
}
