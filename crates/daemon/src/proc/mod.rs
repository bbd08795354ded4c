// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess utilities behind the [`ProcessAdapter`] seam.
//!
//! The supervisor only ever talks to processes through this trait, so
//! the state machine is tested against [`FakeProcessAdapter`] while the
//! worker binary runs [`LocalProcessAdapter`].

mod local;

#[cfg(any(test, feature = "test-support"))]
mod fake;

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use dpd_core::{ProcessSpec, UserRef};
use thiserror::Error;

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeProcessAdapter;
pub use local::LocalProcessAdapter;

/// Operating-system process id.
pub type Pid = i32;

/// Spawn failures.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to launch {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("child kept exiting immediately; retries timed out")]
    DiedImmediately,

    #[error("failed to open log file {path}: {source}")]
    Logs {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write pidfile {path}: {source}")]
    PidFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("spawned child has no pid")]
    NoPid,
}

/// User lookup failure; terminal for the profile being configured.
#[derive(Debug, Error)]
#[error("user {0:?} not found")]
pub struct UnknownUser(pub String);

/// Everything the supervisor needs from the operating system.
#[async_trait]
pub trait ProcessAdapter: Send + Sync {
    /// Resolve a user reference to (uid, gid).
    fn resolve_user(&self, user: &UserRef) -> Result<(u32, u32), UnknownUser>;

    /// Launch the process described by `spec` under the given
    /// credentials. The supervisor writes the pidfile from the returned
    /// pid iff `spec.write_pid`; `daemon` specs are re-probed through
    /// the pidfile by the caller.
    async fn spawn(&self, spec: &ProcessSpec, uid: u32, gid: u32) -> Result<Pid, SpawnError>;

    /// Signal-0 liveness probe.
    fn is_alive(&self, pid: Pid) -> bool;

    /// SIGTERM, wait up to `linger`, escalate to SIGKILL. Returns true
    /// once the process is gone.
    async fn terminate(&self, pid: Pid, linger: Duration) -> bool;

    /// Read a pid from a pidfile; any failure means "no prior process".
    fn read_pid_file(&self, path: &Path) -> Option<Pid>;

    /// Wall-clock start time of a live process, for adoption bookkeeping.
    fn started_at(&self, pid: Pid) -> Option<SystemTime>;
}
