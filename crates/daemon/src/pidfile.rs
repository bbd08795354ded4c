// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pidfile handling.
//!
//! Two kinds of pidfile exist here: the child pidfiles the supervisor
//! probes and rewrites (plain read/write, failures are recoverable), and
//! the role's own pidfile, which doubles as an exclusive lock so two
//! instances never run against one config.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::proc::Pid;

/// Read a pid from a pidfile. Any failure (missing file, garbage
/// content, non-positive pid) means "no prior process".
pub fn read_pid(path: &Path) -> Option<Pid> {
    let text = fs::read_to_string(path).ok()?;
    text.trim().parse().ok().filter(|pid| *pid > 0)
}

/// Write a child's pid to its pidfile, creating parent directories.
pub fn write_pid(path: &Path, pid: Pid) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format!("{pid}\n"))
}

/// Role pidfile errors.
#[derive(Debug, Error)]
pub enum PidFileError {
    #[error("failed to prepare pidfile {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("already running (pidfile {0} is locked)")]
    AlreadyRunning(PathBuf),
}

/// The role's own pidfile, held under an exclusive advisory lock for the
/// life of the process.
#[derive(Debug)]
pub struct RolePidFile {
    path: PathBuf,
    // NOTE(lifetime): held to maintain the exclusive lock; released on drop
    #[allow(dead_code)]
    file: File,
}

impl RolePidFile {
    /// Acquire the lock and record our pid. A held lock means another
    /// instance is already running against this config.
    pub fn acquire(path: PathBuf) -> Result<Self, PidFileError> {
        let io_err = |source| PidFileError::Io { path: path.clone(), source };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        // Open without truncating so a running instance's pid is not
        // wiped before we hold the lock.
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(io_err)?;
        file.try_lock_exclusive().map_err(|_| PidFileError::AlreadyRunning(path.clone()))?;

        file.set_len(0).map_err(io_err)?;
        writeln!(file, "{}", std::process::id()).map_err(io_err)?;

        Ok(Self { path, file })
    }

    /// Remove the pidfile; the lock dies with the file handle.
    pub fn release(self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
#[path = "pidfile_tests.rs"]
mod tests;
