// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use dpd_core::test_support::spec;
use dpd_core::{FakeClock, UserRef};

use super::*;
use crate::proc::FakeProcessAdapter;

fn profile(name: &str, adapter: &FakeProcessAdapter, clock: &FakeClock) -> Profile<FakeClock> {
    Profile::new(spec(name), adapter, clock.clone()).unwrap()
}

#[tokio::test]
async fn waiting_profile_starts_on_first_tick() {
    let adapter = FakeProcessAdapter::new();
    let clock = FakeClock::new();
    let mut p = profile("a", &adapter, &clock);

    assert_eq!(p.state(), ProfileState::Waiting);
    p.supervise(&adapter).await;

    assert_eq!(p.state(), ProfileState::Running);
    assert!(p.pid().is_some());
    assert_eq!(p.nb_starts(), 1);
    assert_eq!(adapter.spawn_count("a"), 1);
    assert!(p.last_start().is_some());
}

#[tokio::test]
async fn spawn_records_the_pidfile() {
    let adapter = FakeProcessAdapter::new();
    let clock = FakeClock::new();
    let mut p = profile("a", &adapter, &clock);

    p.supervise(&adapter).await;

    let pid = p.pid().unwrap();
    assert_eq!(adapter.read_pid_file(&p.spec().pid_file), Some(pid));
}

#[tokio::test]
async fn crash_and_restart_within_two_ticks() {
    let adapter = FakeProcessAdapter::new();
    let clock = FakeClock::new();
    let mut p = profile("a", &adapter, &clock);

    p.supervise(&adapter).await;
    let first_pid = p.pid().unwrap();

    adapter.kill_externally(first_pid);
    clock.advance(Duration::from_secs(1));
    p.supervise(&adapter).await;

    assert_eq!(p.state(), ProfileState::Running);
    let second_pid = p.pid().unwrap();
    assert_ne!(first_pid, second_pid);
    assert_eq!(p.nb_starts(), 2);
}

#[tokio::test]
async fn no_restart_spec_goes_admin_down_on_death() {
    let adapter = FakeProcessAdapter::new();
    let clock = FakeClock::new();
    let mut s = spec("oneshot");
    s.restart = false;
    let mut p = Profile::new(s, &adapter, clock.clone()).unwrap();

    p.supervise(&adapter).await;
    adapter.kill_externally(p.pid().unwrap());
    p.supervise(&adapter).await;

    assert_eq!(p.state(), ProfileState::AdminDown);
}

#[tokio::test]
async fn pid_rewritten_outside_is_adopted_without_spawn() {
    let adapter = FakeProcessAdapter::new();
    let clock = FakeClock::new();
    let mut p = profile("a", &adapter, &clock);

    p.supervise(&adapter).await;
    let old_pid = p.pid().unwrap();

    // An outside restart: old pid dies, pidfile points at a new live pid.
    adapter.kill_externally(old_pid);
    adapter.add_live_process(777);
    adapter.set_pid_file(&p.spec().pid_file, 777);

    p.supervise(&adapter).await;

    assert_eq!(p.state(), ProfileState::Running);
    assert_eq!(p.pid(), Some(777));
    assert_eq!(adapter.spawn_count("a"), 1, "no new spawn");
}

#[tokio::test]
async fn recovery_adopts_a_live_pidfile_without_spawning() {
    let adapter = FakeProcessAdapter::new();
    let clock = FakeClock::new();
    let mut p = profile("a", &adapter, &clock);

    adapter.add_live_process(42);
    adapter.set_pid_file(&p.spec().pid_file, 42);

    p.initialize(&adapter);

    assert_eq!(p.state(), ProfileState::Running);
    assert_eq!(p.pid(), Some(42));
    assert_eq!(p.nb_starts(), 0);
    assert!(p.last_start().is_some());
    assert_eq!(adapter.spawn_count("a"), 0);
}

#[tokio::test]
async fn recovery_ignores_a_dead_pidfile() {
    let adapter = FakeProcessAdapter::new();
    let clock = FakeClock::new();
    let mut p = profile("a", &adapter, &clock);

    adapter.set_pid_file(&p.spec().pid_file, 42); // 42 is not alive

    p.initialize(&adapter);

    assert_eq!(p.state(), ProfileState::Waiting);
    assert_eq!(p.pid(), None);
}

#[tokio::test]
async fn sixth_start_in_window_trips_the_rate_gate() {
    let adapter = FakeProcessAdapter::new();
    let clock = FakeClock::new();
    let mut p = profile("thrash", &adapter, &clock);

    // Five crash-restart rounds, one second apart.
    for _ in 0..5 {
        p.supervise(&adapter).await;
        assert_eq!(p.state(), ProfileState::Running);
        adapter.kill_externally(p.pid().unwrap());
        clock.advance(Duration::from_secs(1));
    }
    assert_eq!(p.nb_starts(), 5);

    // The sixth attempt is inside the window: no spawn, gate trips.
    p.supervise(&adapter).await;
    assert_eq!(p.state(), ProfileState::AdminNotRestarted);
    assert_eq!(adapter.spawn_count("thrash"), 5);

    // And it stays put: AdminNotRestarted is not retried.
    clock.advance(Duration::from_secs(120));
    p.supervise(&adapter).await;
    assert_eq!(p.state(), ProfileState::AdminNotRestarted);
    assert_eq!(adapter.spawn_count("thrash"), 5);
}

#[tokio::test]
async fn slow_crashes_never_trip_the_gate() {
    let adapter = FakeProcessAdapter::new();
    let clock = FakeClock::new();
    let mut p = profile("slow", &adapter, &clock);

    // Crashing once every 61 seconds keeps the window clear.
    for round in 0..8 {
        p.supervise(&adapter).await;
        assert_eq!(p.state(), ProfileState::Running, "round {round}");
        adapter.kill_externally(p.pid().unwrap());
        clock.advance(Duration::from_secs(61));
    }
    assert_eq!(adapter.spawn_count("slow"), 8);
}

#[tokio::test]
async fn failed_spawns_count_against_the_gate() {
    let adapter = FakeProcessAdapter::new();
    let clock = FakeClock::new();
    adapter.fail_spawns_of("broken");
    let mut p = profile("broken", &adapter, &clock);

    for _ in 0..5 {
        p.supervise(&adapter).await;
        assert_eq!(p.state(), ProfileState::ErrorDown);
        clock.advance(Duration::from_secs(1));
    }
    p.supervise(&adapter).await;

    assert_eq!(p.state(), ProfileState::AdminNotRestarted);
    assert_eq!(adapter.spawn_count("broken"), 5);
}

#[tokio::test]
async fn error_up_profile_is_stopped_and_dropped() {
    let adapter = FakeProcessAdapter::new();
    let clock = FakeClock::new();
    let mut p = profile("a", &adapter, &clock);

    p.supervise(&adapter).await;
    let pid = p.pid().unwrap();

    p.set_state(ProfileState::ErrorUp);
    p.supervise(&adapter).await;

    assert_eq!(p.state(), ProfileState::AdminDown);
    assert_eq!(p.pid(), None);
    assert!(!adapter.is_alive(pid));
}

#[tokio::test]
async fn stubborn_child_leaves_the_profile_error_up() {
    let adapter = FakeProcessAdapter::new();
    let clock = FakeClock::new();
    let mut p = profile("a", &adapter, &clock);

    p.supervise(&adapter).await;
    adapter.make_stubborn(p.pid().unwrap());

    p.set_state(ProfileState::ErrorUp);
    p.supervise(&adapter).await;

    assert_eq!(p.state(), ProfileState::ErrorUp);
    assert!(p.pid().is_some());
}

#[tokio::test]
async fn need_restart_stops_then_starts_on_one_tick() {
    let adapter = FakeProcessAdapter::new();
    let clock = FakeClock::new();
    let mut p = profile("a", &adapter, &clock);

    p.supervise(&adapter).await;
    let old_pid = p.pid().unwrap();

    p.set_state(ProfileState::AdminNeedRestart);
    p.supervise(&adapter).await;

    assert_eq!(p.state(), ProfileState::Running);
    let new_pid = p.pid().unwrap();
    assert_ne!(old_pid, new_pid);
    assert!(!adapter.is_alive(old_pid));
    assert_eq!(adapter.spawn_count("a"), 2);
}

#[tokio::test]
async fn configure_resets_the_spawn_budget() {
    let adapter = FakeProcessAdapter::new();
    let clock = FakeClock::new();
    let mut p = profile("a", &adapter, &clock);

    p.supervise(&adapter).await;
    assert_eq!(p.nb_starts(), 1);

    let mut changed = spec("a");
    changed.args = vec!["--changed".to_string()];
    p.configure(changed, &adapter).unwrap();

    assert_eq!(p.nb_starts(), 0);
    assert_eq!(p.spec().args, vec!["--changed"]);
}

#[tokio::test]
async fn unknown_user_fails_configure_and_keeps_the_old_spec() {
    let adapter = FakeProcessAdapter::new();
    let clock = FakeClock::new();
    let mut s = spec("a");
    s.user = UserRef::Name("appuser".to_string());
    let mut p = Profile::new(s, &adapter, clock.clone()).unwrap();

    adapter.forget_user("ghost");
    let mut changed = spec("a");
    changed.user = UserRef::Name("ghost".to_string());

    let err = p.configure(changed, &adapter).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownUser { .. }));
    assert_eq!(p.spec().user, UserRef::Name("appuser".to_string()));
}

#[tokio::test]
async fn unknown_user_blocks_profile_creation() {
    let adapter = FakeProcessAdapter::new();
    adapter.forget_user("ghost");
    let clock = FakeClock::new();
    let mut s = spec("a");
    s.user = UserRef::Name("ghost".to_string());

    let err = Profile::new(s, &adapter, clock).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownUser { .. }));
}

#[tokio::test]
async fn daemonizing_spec_adopts_the_pid_its_child_wrote() {
    let adapter = FakeProcessAdapter::new();
    let clock = FakeClock::new();
    let mut s = spec("forker");
    s.daemon = true;
    s.write_pid = false;
    let pid_file = s.pid_file.clone();
    let mut p = Profile::new(s, &adapter, clock.clone()).unwrap();

    // The double-forked grandchild "writes" its pid before we re-read.
    adapter.add_live_process(900);
    adapter.set_pid_file(&pid_file, 900);

    p.supervise(&adapter).await;

    assert_eq!(p.state(), ProfileState::Running);
    assert_eq!(p.pid(), Some(900));
}

#[tokio::test]
async fn daemonizing_spec_without_a_pidfile_is_a_failed_start() {
    let adapter = FakeProcessAdapter::new();
    let clock = FakeClock::new();
    let mut s = spec("forker");
    s.daemon = true;
    s.write_pid = false;
    let mut p = Profile::new(s, &adapter, clock.clone()).unwrap();

    p.supervise(&adapter).await;

    assert_eq!(p.state(), ProfileState::ErrorDown);
    assert_eq!(p.pid(), None);
}
