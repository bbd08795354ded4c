// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-process lifecycle state machine.
//!
//! A Profile pairs one [`ProcessSpec`] with its live state. Each
//! supervisor tick drives it through CheckPid → Stop → Start; the
//! ordering matters so a reloaded profile stops and restarts on the
//! same tick.

use std::collections::VecDeque;
use std::time::{Instant, SystemTime};

use dpd_core::{Clock, ConfigError, ProcessSpec, ProfileState};
use tracing::{debug, info, warn};

use super::{MAX_STARTS, STOP_LINGER, THROTTLE_WINDOW};
use crate::proc::{Pid, ProcessAdapter};

/// Runtime envelope around one managed process.
#[derive(Debug)]
pub struct Profile<C: Clock> {
    spec: ProcessSpec,
    uid: u32,
    gid: u32,
    pid: Option<Pid>,
    state: ProfileState,
    /// Most recent spawn instants, newest last; only the last
    /// `MAX_STARTS` matter to the rate gate.
    starts: VecDeque<Instant>,
    /// Spawn attempts since the last Configure or adoption.
    nb_starts: u32,
    last_start: Option<SystemTime>,
    clock: C,
}

impl<C: Clock> Profile<C> {
    /// Create a profile for a spec, resolving its credentials. An
    /// unknown user is a configuration error and the profile must not
    /// be added.
    pub fn new<A: ProcessAdapter>(
        spec: ProcessSpec,
        adapter: &A,
        clock: C,
    ) -> Result<Self, ConfigError> {
        let (uid, gid) = resolve(&spec, adapter)?;
        Ok(Self {
            spec,
            uid,
            gid,
            pid: None,
            state: ProfileState::Waiting,
            starts: VecDeque::new(),
            nb_starts: 0,
            last_start: None,
            clock,
        })
    }

    /// Apply a changed spec, re-resolving credentials and resetting the
    /// spawn bookkeeping. On an unknown user the previous spec stays in
    /// force.
    pub fn configure<A: ProcessAdapter>(
        &mut self,
        spec: ProcessSpec,
        adapter: &A,
    ) -> Result<(), ConfigError> {
        let (uid, gid) = resolve(&spec, adapter)?;
        self.spec = spec;
        self.uid = uid;
        self.gid = gid;
        self.nb_starts = 0;
        self.starts.clear();
        Ok(())
    }

    /// Adopt an already-running process recorded in the pidfile. This is
    /// the recovery path across supervisor restarts; pidfile read
    /// failures mean "no prior process".
    pub fn initialize<A: ProcessAdapter>(&mut self, adapter: &A) {
        info!(profile = %self.spec.name, "init profile");
        let Some(pid) = adapter.read_pid_file(&self.spec.pid_file) else {
            return;
        };
        if adapter.is_alive(pid) {
            info!(profile = %self.spec.name, pid, "already running, adopting");
            self.pid = Some(pid);
            self.state = ProfileState::Running;
            self.nb_starts = 0;
            self.last_start = adapter.started_at(pid);
        }
    }

    /// One supervision pass: liveness check, then stop and/or start as
    /// the state demands.
    pub async fn supervise<A: ProcessAdapter>(&mut self, adapter: &A) {
        debug!(profile = %self.spec.name, state = %self.state, "supervise");
        self.check_pid(adapter);
        if self.state.needs_stop() {
            self.stop(adapter).await;
        }
        if self.state.needs_start() {
            self.start(adapter).await;
        }
    }

    /// Verify a Running profile's pid is still alive. A pid rewritten in
    /// the pidfile by an outside restart is adopted; otherwise the death
    /// routes to a restart or a drop depending on `restart`.
    fn check_pid<A: ProcessAdapter>(&mut self, adapter: &A) {
        if self.state != ProfileState::Running {
            return;
        }
        if let Some(pid) = self.pid {
            if adapter.is_alive(pid) {
                return;
            }
        }
        if let Some(new_pid) = adapter.read_pid_file(&self.spec.pid_file) {
            if Some(new_pid) != self.pid && adapter.is_alive(new_pid) {
                debug!(profile = %self.spec.name, pid = new_pid, "adopting rewritten pidfile");
                self.pid = Some(new_pid);
                return;
            }
        }
        warn!(profile = %self.spec.name, "child is gone");
        self.state = if self.spec.restart {
            ProfileState::ErrorDown
        } else {
            ProfileState::AdminDown
        };
    }

    /// Stop the child: signal, linger, escalate. A profile mid-reload
    /// keeps `AdminNeedRestart` so Start fires on this same tick; one
    /// that will not die becomes `ErrorUp` and is retried next tick.
    async fn stop<A: ProcessAdapter>(&mut self, adapter: &A) {
        info!(profile = %self.spec.name, "stop profile");
        let dead = match self.pid {
            Some(pid) => adapter.terminate(pid, STOP_LINGER).await,
            None => true,
        };
        if self.state != ProfileState::AdminNeedRestart {
            self.state = ProfileState::AdminDown;
        }
        if dead {
            self.pid = None;
        } else {
            warn!(profile = %self.spec.name, "child refused to stop");
            self.state = ProfileState::ErrorUp;
        }
    }

    /// Start the child, unless the rate gate trips first. Every attempt
    /// counts against the throttle window, successful or not.
    async fn start<A: ProcessAdapter>(&mut self, adapter: &A) {
        if self.throttled() {
            info!(profile = %self.spec.name, "not restarted (max starts reached in window)");
            self.state = ProfileState::AdminNotRestarted;
            return;
        }

        info!(profile = %self.spec.name, "start profile");
        self.record_start();
        match adapter.spawn(&self.spec, self.uid, self.gid).await {
            Ok(spawned) => {
                let pid = if self.spec.daemon {
                    // The child forked again and wrote the real pid itself.
                    match adapter.read_pid_file(&self.spec.pid_file) {
                        Some(real) => real,
                        None => {
                            warn!(profile = %self.spec.name, "daemonized child left no pidfile");
                            self.state = ProfileState::ErrorDown;
                            self.pid = None;
                            return;
                        }
                    }
                } else {
                    spawned
                };
                debug!(profile = %self.spec.name, pid, "running");
                self.pid = Some(pid);
                self.state = ProfileState::Running;
            }
            Err(error) => {
                warn!(profile = %self.spec.name, error = %error, "failed to start");
                self.pid = None;
                self.state = ProfileState::ErrorDown;
            }
        }
    }

    /// True when `MAX_STARTS` attempts already happened inside the
    /// rolling window.
    fn throttled(&self) -> bool {
        if self.nb_starts < MAX_STARTS {
            return false;
        }
        // The deque is capped at MAX_STARTS entries, so the front is
        // exactly the attempt MAX_STARTS ago.
        let Some(&cut_off) = self.starts.front() else {
            return false;
        };
        self.clock.now().duration_since(cut_off) < THROTTLE_WINDOW
    }

    fn record_start(&mut self) {
        self.starts.push_back(self.clock.now());
        while self.starts.len() > MAX_STARTS as usize {
            self.starts.pop_front();
        }
        self.nb_starts += 1;
        self.last_start = Some(self.clock.system_now());
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    pub fn state(&self) -> ProfileState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ProfileState) {
        self.state = state;
    }

    pub fn pid(&self) -> Option<Pid> {
        self.pid
    }

    pub fn nb_starts(&self) -> u32 {
        self.nb_starts
    }

    pub fn last_start(&self) -> Option<SystemTime> {
        self.last_start
    }
}

fn resolve<A: ProcessAdapter>(
    spec: &ProcessSpec,
    adapter: &A,
) -> Result<(u32, u32), ConfigError> {
    adapter.resolve_user(&spec.user).map_err(|_| ConfigError::UnknownUser {
        user: spec.user.to_string(),
        profile: spec.name.clone(),
    })
}

#[cfg(test)]
#[path = "profile_tests.rs"]
mod tests;
