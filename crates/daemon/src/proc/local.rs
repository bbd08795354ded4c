// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The real subprocess implementation of [`ProcessAdapter`].

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use dpd_core::{ProcessSpec, UserRef};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::{Uid, User};
use tokio::process::Command;
use tracing::{debug, warn};

use super::{Pid, ProcessAdapter, SpawnError, UnknownUser};
use crate::pidfile;
use crate::retry::{retry_with_backoff, Attempt, RetryError};

/// Give a signalled child up to 5 seconds to exit before and after the
/// SIGKILL escalation.
pub const CHILD_LINGER_TIMEOUT: Duration = Duration::from_secs(5);

/// Backoff schedule for a child that exits right after spawn.
pub const LAUNCH_RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_millis(1200),
    Duration::from_secs(5),
];

/// Overall budget for launch retries.
pub const LAUNCH_TIMEOUT: Duration = Duration::from_secs(10);

/// How long after spawn to look for an immediate exit.
const SPAWN_SETTLE: Duration = Duration::from_millis(50);

/// Poll interval while waiting for a signalled child to go away.
const EXIT_POLL: Duration = Duration::from_millis(50);

/// Spawns, probes and signals real processes.
#[derive(Clone, Default)]
pub struct LocalProcessAdapter;

impl LocalProcessAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessAdapter for LocalProcessAdapter {
    fn resolve_user(&self, user: &UserRef) -> Result<(u32, u32), UnknownUser> {
        match user {
            UserRef::Name(name) => match User::from_name(name) {
                Ok(Some(entry)) => Ok((entry.uid.as_raw(), entry.gid.as_raw())),
                _ => Err(UnknownUser(name.clone())),
            },
            // Raw ids are taken on faith: a passwd entry supplies the
            // primary group, otherwise gid mirrors uid.
            UserRef::Id(uid) => match User::from_uid(Uid::from_raw(*uid)) {
                Ok(Some(entry)) => Ok((entry.uid.as_raw(), entry.gid.as_raw())),
                _ => Ok((*uid, *uid)),
            },
        }
    }

    async fn spawn(&self, spec: &ProcessSpec, uid: u32, gid: u32) -> Result<Pid, SpawnError> {
        let launched =
            retry_with_backoff(&LAUNCH_RETRY_DELAYS, LAUNCH_TIMEOUT, || launch_once(spec, uid, gid))
                .await;
        match launched {
            Ok(pid) => {
                if spec.write_pid {
                    pidfile::write_pid(&spec.pid_file, pid).map_err(|source| {
                        SpawnError::PidFile { path: spec.pid_file.clone(), source }
                    })?;
                }
                Ok(pid)
            }
            Err(RetryError::TimedOut) => Err(SpawnError::DiedImmediately),
            Err(RetryError::Terminal(error)) => Err(error),
        }
    }

    fn is_alive(&self, pid: Pid) -> bool {
        if pid <= 0 {
            return false;
        }
        // Signal 0: EPERM still means the process exists.
        match signal::kill(nix::unistd::Pid::from_raw(pid), None) {
            Ok(()) => true,
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    async fn terminate(&self, pid: Pid, linger: Duration) -> bool {
        if !self.is_alive(pid) {
            return true;
        }
        let target = nix::unistd::Pid::from_raw(pid);

        if let Err(e) = signal::kill(target, Signal::SIGTERM) {
            debug!(pid, "SIGTERM failed: {e}");
        }
        if wait_for_exit(self, pid, linger.min(CHILD_LINGER_TIMEOUT)).await {
            return true;
        }

        warn!(pid, "child ignored SIGTERM, escalating to SIGKILL");
        if let Err(e) = signal::kill(target, Signal::SIGKILL) {
            debug!(pid, "SIGKILL failed: {e}");
        }
        wait_for_exit(self, pid, CHILD_LINGER_TIMEOUT).await
    }

    fn read_pid_file(&self, path: &Path) -> Option<Pid> {
        pidfile::read_pid(path)
    }

    fn started_at(&self, pid: Pid) -> Option<SystemTime> {
        std::fs::metadata(format!("/proc/{pid}")).ok().and_then(|meta| meta.modified().ok())
    }
}

/// One spawn attempt. A child that exits within the settle window is
/// retried unless the spec daemonizes (those exit by design, leaving the
/// real pid in the pidfile).
async fn launch_once(spec: &ProcessSpec, uid: u32, gid: u32) -> Attempt<Pid, SpawnError> {
    let mut cmd = match build_command(spec, uid, gid) {
        Ok(cmd) => cmd,
        Err(error) => return Attempt::Fail(error),
    };
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(source) => {
            return Attempt::Fail(SpawnError::Io {
                program: spec.run.display().to_string(),
                source,
            })
        }
    };
    let Some(pid) = child.id() else {
        return Attempt::Fail(SpawnError::NoPid);
    };

    tokio::time::sleep(SPAWN_SETTLE).await;
    match child.try_wait() {
        Ok(Some(status)) if !spec.daemon => {
            debug!(program = %spec.run.display(), %status, "child exited immediately");
            Attempt::Again
        }
        // The child is dropped without being awaited; the runtime reaps
        // it in the background when it eventually exits, and it is not
        // killed when the supervisor goes away.
        _ => Attempt::Done(pid as Pid),
    }
}

fn build_command(spec: &ProcessSpec, uid: u32, gid: u32) -> Result<Command, SpawnError> {
    let mut cmd = Command::new(&spec.run);
    cmd.args(&spec.args);
    cmd.env_clear();
    cmd.envs(crate::env::base_env());
    cmd.envs(&spec.env);
    cmd.stdin(Stdio::null());

    match &spec.logs {
        Some(path) => {
            let open = |p: &Path| {
                std::fs::OpenOptions::new().create(true).append(true).open(p).map_err(|source| {
                    SpawnError::Logs { path: p.to_path_buf(), source }
                })
            };
            let out = open(path)?;
            let err = out.try_clone().map_err(|source| SpawnError::Logs {
                path: path.clone(),
                source,
            })?;
            cmd.stdout(Stdio::from(out));
            cmd.stderr(Stdio::from(err));
        }
        None => {
            cmd.stdout(Stdio::null());
            cmd.stderr(Stdio::null());
        }
    }

    // Own process group: the child survives the supervisor and never
    // receives its terminal signals.
    cmd.process_group(0);

    if gid != nix::unistd::getegid().as_raw() {
        cmd.gid(gid);
    }
    if uid != nix::unistd::geteuid().as_raw() {
        cmd.uid(uid);
    }

    match &spec.chroot {
        Some(root) => {
            // The root and cwd switch must happen in the child between
            // fork and exec; cwd is interpreted inside the jail.
            let root = root.clone();
            let cwd = spec.cwd.clone();
            unsafe {
                cmd.pre_exec(move || {
                    nix::unistd::chroot(root.as_path())?;
                    nix::unistd::chdir(cwd.as_path())?;
                    Ok(())
                });
            }
        }
        None => {
            cmd.current_dir(&spec.cwd);
        }
    }

    Ok(cmd)
}

async fn wait_for_exit(adapter: &LocalProcessAdapter, pid: Pid, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if !adapter.is_alive(pid) {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(EXIT_POLL).await;
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
