// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration loading for the three roles.
//!
//! One JSON envelope is shared by everyone: the master reads `nodes` and
//! the bus endpoints, the worker reads `procs`, and the client rewrites
//! `procs` inside the worker's file on every received update.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ProcessSpec;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate process name {0:?}")]
    DuplicateName(String),

    #[error("user {user:?} not found for profile {profile}")]
    UnknownUser { user: String, profile: String },

    #[error("missing required field {0:?} for this role")]
    MissingField(&'static str),

    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The shared configuration envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Pid file for the role's own daemon process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid_file: Option<PathBuf>,

    /// Processes managed on this node (worker view; client-owned).
    #[serde(default)]
    pub procs: Vec<ProcessSpec>,

    /// Per-node manifests (master view). Insertion order is preserved so
    /// publish output and diffs stay deterministic.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub nodes: IndexMap<String, Vec<ProcessSpec>>,

    /// Publish endpoint for manifest updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_updates: Option<String>,

    /// Pull endpoint for stats pushed by nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_stats: Option<String>,

    /// This node's name; `%H` expands to the machine hostname.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    /// Local configuration file the client materializes updates into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conf_file: Option<PathBuf>,
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::parse(&text)
    }

    /// Parse and validate a configuration document.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let cfg: Config = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a bare process list (the payload of a published update).
    pub fn parse_procs(text: &str) -> Result<Vec<ProcessSpec>, ConfigError> {
        let procs: Vec<ProcessSpec> = serde_json::from_str(text)?;
        check_unique(&procs)?;
        Ok(procs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_unique(&self.procs)?;
        for specs in self.nodes.values() {
            check_unique(specs)?;
        }
        Ok(())
    }

    /// Serialize and atomically replace `path` (temp file + rename).
    ///
    /// The worker only observes the file through mtime monotonicity, so a
    /// concurrent reader sees either the prior full content or the new
    /// one, never a truncated write.
    pub fn write_atomic(&self, path: &Path) -> Result<(), ConfigError> {
        let data = serde_json::to_vec_pretty(self)?;
        let tmp = path.with_extension("tmp");
        let result = (|| -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&data)?;
            file.sync_all()?;
            fs::rename(&tmp, path)
        })();
        result.map_err(|source| ConfigError::Write { path: path.to_path_buf(), source })
    }
}

/// Names must be unique within one proc list; the supervisor keys on them.
fn check_unique(specs: &[ProcessSpec]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for spec in specs {
        if !seen.insert(spec.name.as_str()) {
            return Err(ConfigError::DuplicateName(spec.name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
