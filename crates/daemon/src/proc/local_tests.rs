// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use dpd_core::test_support::spec;
use dpd_core::UserRef;

use super::*;

fn current_ids() -> (u32, u32) {
    (nix::unistd::geteuid().as_raw(), nix::unistd::getegid().as_raw())
}

/// A spec that runs as the test user with its pidfile in `dir`.
fn local_spec(dir: &Path, name: &str, run: &str, args: &[&str]) -> ProcessSpec {
    let mut s = spec(name);
    s.run = PathBuf::from(run);
    s.args = args.iter().map(|a| a.to_string()).collect();
    s.pid_file = dir.join(format!("{name}.pid"));
    s.user = UserRef::Id(nix::unistd::geteuid().as_raw());
    s
}

#[tokio::test]
async fn spawn_writes_pidfile_and_child_is_alive() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = LocalProcessAdapter::new();
    let spec = local_spec(dir.path(), "sleeper", "/bin/sleep", &["60"]);
    let (uid, gid) = current_ids();

    let pid = adapter.spawn(&spec, uid, gid).await.unwrap();
    assert!(adapter.is_alive(pid));
    assert_eq!(adapter.read_pid_file(&spec.pid_file), Some(pid));
    assert!(adapter.started_at(pid).is_some());

    assert!(adapter.terminate(pid, Duration::from_secs(1)).await);
    assert!(!adapter.is_alive(pid));
}

#[tokio::test]
async fn write_pid_false_leaves_the_pidfile_alone() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = LocalProcessAdapter::new();
    let mut spec = local_spec(dir.path(), "quiet", "/bin/sleep", &["60"]);
    spec.write_pid = false;
    let (uid, gid) = current_ids();

    let pid = adapter.spawn(&spec, uid, gid).await.unwrap();
    assert!(!spec.pid_file.exists());

    adapter.terminate(pid, Duration::from_secs(1)).await;
}

#[tokio::test]
async fn missing_executable_is_a_terminal_error() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = LocalProcessAdapter::new();
    let spec = local_spec(dir.path(), "ghost", "/nonexistent/binary", &[]);
    let (uid, gid) = current_ids();

    let err = adapter.spawn(&spec, uid, gid).await.unwrap_err();
    assert!(matches!(err, SpawnError::Io { .. }));
}

#[tokio::test]
async fn immediately_exiting_child_times_out_as_died_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = LocalProcessAdapter::new();
    let spec = local_spec(dir.path(), "flash", "/bin/true", &[]);
    let (uid, gid) = current_ids();

    let err = adapter.spawn(&spec, uid, gid).await.unwrap_err();
    assert!(matches!(err, SpawnError::DiedImmediately));
}

#[tokio::test]
async fn logs_capture_child_output() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = LocalProcessAdapter::new();
    let log_path = dir.path().join("out.log");
    // `sh -c` keeps the process alive long enough to dodge the
    // immediate-exit retry.
    let mut spec = local_spec(
        dir.path(),
        "echoer",
        "/bin/sh",
        &["-c", "echo captured; sleep 60"],
    );
    spec.logs = Some(log_path.clone());
    let (uid, gid) = current_ids();

    let pid = adapter.spawn(&spec, uid, gid).await.unwrap();
    // Give the child a moment to write.
    for _ in 0..50 {
        if log_path.exists() && !std::fs::read_to_string(&log_path).unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    adapter.terminate(pid, Duration::from_secs(1)).await;

    let captured = std::fs::read_to_string(&log_path).unwrap();
    assert!(captured.contains("captured"), "log was: {captured:?}");
}

#[test]
fn unknown_user_name_fails_resolution() {
    let adapter = LocalProcessAdapter::new();
    let err = adapter.resolve_user(&UserRef::Name("no-such-user-dpd".to_string())).unwrap_err();
    assert_eq!(err.0, "no-such-user-dpd");
}

#[test]
fn root_resolves_to_uid_zero() {
    let adapter = LocalProcessAdapter::new();
    let (uid, _gid) = adapter.resolve_user(&UserRef::Name("root".to_string())).unwrap();
    assert_eq!(uid, 0);
}

#[test]
fn numeric_user_is_taken_on_faith() {
    let adapter = LocalProcessAdapter::new();
    let (uid, _gid) = adapter.resolve_user(&UserRef::Id(54_321)).unwrap();
    assert_eq!(uid, 54_321);
}

#[test]
fn nonexistent_pid_is_not_alive() {
    let adapter = LocalProcessAdapter::new();
    assert!(!adapter.is_alive(0));
    assert!(!adapter.is_alive(-1));
}

#[test]
fn our_own_pid_is_alive() {
    let adapter = LocalProcessAdapter::new();
    assert!(adapter.is_alive(std::process::id() as Pid));
}
