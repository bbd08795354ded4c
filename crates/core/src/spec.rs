// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative description of one managed process.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Account a child process runs as: a name looked up at Configure time,
/// or a raw numeric uid whose primary group is used as gid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Id(u32),
    Name(String),
}

impl Default for UserRef {
    fn default() -> Self {
        UserRef::Name("nobody".to_string())
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRef::Name(name) => write!(f, "{}", name),
            UserRef::Id(uid) => write!(f, "{}", uid),
        }
    }
}

/// Declarative description of one managed process.
///
/// `name` is the identity key: the differ and the supervisor both key on
/// it, and two specs with the same name never coexist in one manifest.
/// Unknown fields are a parse error so configuration drift surfaces at
/// load time instead of being silently dropped.
///
/// Field equality (`PartialEq`) is what classifies a process as changed
/// during a reload diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessSpec {
    /// Unique name within a node's manifest.
    pub name: String,
    /// Executable path.
    pub run: PathBuf,
    /// Pid file path. Absolute, and always outside any chroot.
    pub pid_file: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_cwd")]
    pub cwd: PathBuf,
    #[serde(default)]
    pub user: UserRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chroot: Option<PathBuf>,
    /// Redirect child stdout/stderr to this file (appended).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<PathBuf>,
    /// Restart on unexpected death.
    #[serde(default = "default_true")]
    pub restart: bool,
    /// Names this process depends on. Recorded and republished verbatim;
    /// start ordering is not enforced by the supervisor.
    #[serde(default)]
    pub depends: Vec<String>,
    /// Extra environment merged over the minimal base environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// The child double-forks and writes its own pidfile; after spawn the
    /// supervisor re-reads the pidfile to learn the real pid.
    #[serde(default)]
    pub daemon: bool,
    /// When false, the child is responsible for creating the pidfile.
    #[serde(default = "default_true")]
    pub write_pid: bool,
}

fn default_cwd() -> PathBuf {
    PathBuf::from("/")
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
#[path = "spec_tests.rs"]
mod tests;
