// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory [`ProcessAdapter`] for state-machine tests.
//!
//! Simulates pid liveness, pidfile contents, spawn failures and children
//! that ignore signals, without touching the operating system.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use dpd_core::{ProcessSpec, UserRef};
use parking_lot::Mutex;

use super::{Pid, ProcessAdapter, SpawnError, UnknownUser};

#[derive(Default)]
struct FakeState {
    next_pid: Pid,
    alive: HashSet<Pid>,
    pid_files: HashMap<PathBuf, Pid>,
    spawned: Vec<String>,
    fail_spawns: HashSet<String>,
    stubborn: HashSet<Pid>,
    unknown_users: HashSet<String>,
}

/// Shared-state fake; clones observe the same world.
#[derive(Clone, Default)]
pub struct FakeProcessAdapter {
    state: Arc<Mutex<FakeState>>,
}

impl FakeProcessAdapter {
    pub fn new() -> Self {
        let adapter = Self::default();
        adapter.state.lock().next_pid = 100;
        adapter
    }

    /// Simulate a process dying behind the supervisor's back.
    pub fn kill_externally(&self, pid: Pid) {
        self.state.lock().alive.remove(&pid);
    }

    /// Plant a pidfile, as if written by an earlier supervisor or by a
    /// daemonizing child.
    pub fn set_pid_file(&self, path: &Path, pid: Pid) {
        self.state.lock().pid_files.insert(path.to_path_buf(), pid);
    }

    /// Register a live process that nobody spawned through this adapter.
    pub fn add_live_process(&self, pid: Pid) {
        self.state.lock().alive.insert(pid);
    }

    /// Make every spawn of `name` die immediately.
    pub fn fail_spawns_of(&self, name: &str) {
        self.state.lock().fail_spawns.insert(name.to_string());
    }

    /// Make `pid` survive terminate calls.
    pub fn make_stubborn(&self, pid: Pid) {
        self.state.lock().stubborn.insert(pid);
    }

    /// Make `name` unresolvable as a user.
    pub fn forget_user(&self, name: &str) {
        self.state.lock().unknown_users.insert(name.to_string());
    }

    /// How many times `name` was spawned.
    pub fn spawn_count(&self, name: &str) -> usize {
        self.state.lock().spawned.iter().filter(|n| n.as_str() == name).count()
    }

    /// Spec names in spawn order.
    pub fn spawn_order(&self) -> Vec<String> {
        self.state.lock().spawned.clone()
    }
}

#[async_trait]
impl ProcessAdapter for FakeProcessAdapter {
    fn resolve_user(&self, user: &UserRef) -> Result<(u32, u32), UnknownUser> {
        match user {
            UserRef::Name(name) if self.state.lock().unknown_users.contains(name) => {
                Err(UnknownUser(name.clone()))
            }
            UserRef::Name(_) => Ok((1000, 1000)),
            UserRef::Id(uid) => Ok((*uid, *uid)),
        }
    }

    async fn spawn(&self, spec: &ProcessSpec, _uid: u32, _gid: u32) -> Result<Pid, SpawnError> {
        let mut state = self.state.lock();
        state.spawned.push(spec.name.clone());
        if state.fail_spawns.contains(&spec.name) {
            return Err(SpawnError::DiedImmediately);
        }
        let pid = state.next_pid;
        state.next_pid += 1;
        state.alive.insert(pid);
        if spec.write_pid {
            state.pid_files.insert(spec.pid_file.clone(), pid);
        }
        Ok(pid)
    }

    fn is_alive(&self, pid: Pid) -> bool {
        self.state.lock().alive.contains(&pid)
    }

    async fn terminate(&self, pid: Pid, _linger: Duration) -> bool {
        let mut state = self.state.lock();
        if state.stubborn.contains(&pid) {
            return false;
        }
        state.alive.remove(&pid);
        true
    }

    fn read_pid_file(&self, path: &Path) -> Option<Pid> {
        self.state.lock().pid_files.get(path).copied()
    }

    fn started_at(&self, pid: Pid) -> Option<SystemTime> {
        if self.is_alive(pid) {
            Some(SystemTime::UNIX_EPOCH + Duration::from_secs(500_000))
        } else {
            None
        }
    }
}
