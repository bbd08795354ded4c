// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn read_back_what_was_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run/child.pid");

    write_pid(&path, 4321).unwrap();
    assert_eq!(read_pid(&path), Some(4321));
}

#[test]
fn missing_pidfile_reads_as_none() {
    assert_eq!(read_pid(Path::new("/nonexistent/child.pid")), None);
}

#[yare::parameterized(
    garbage  = { "not-a-pid" },
    empty    = { "" },
    zero     = { "0" },
    negative = { "-4" },
)]
fn unusable_pidfile_content_reads_as_none(content: &str) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("child.pid");
    fs::write(&path, content).unwrap();
    assert_eq!(read_pid(&path), None);
}

#[test]
fn pid_with_trailing_newline_parses() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("child.pid");
    fs::write(&path, "99\n").unwrap();
    assert_eq!(read_pid(&path), Some(99));
}

#[test]
fn role_pidfile_records_our_pid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dpd-workerd.pid");

    let lock = RolePidFile::acquire(path.clone()).unwrap();
    let recorded: u32 = fs::read_to_string(&path).unwrap().trim().parse().unwrap();
    assert_eq!(recorded, std::process::id());

    lock.release();
    assert!(!path.exists());
}

#[test]
fn second_acquire_fails_while_locked() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dpd-workerd.pid");

    let _lock = RolePidFile::acquire(path.clone()).unwrap();
    let err = RolePidFile::acquire(path).unwrap_err();
    assert!(matches!(err, PidFileError::AlreadyRunning(_)));
}
