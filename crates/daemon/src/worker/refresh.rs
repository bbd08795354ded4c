// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-based configuration refresher.
//!
//! Watches the local config file's mtime between ticks and applies the
//! manifest diff to the live profile set. The client writes the file
//! atomically (temp + rename), so mtime monotonicity is the only
//! synchronization needed; read and parse failures keep the previous
//! configuration and are retried on the next tick.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use async_trait::async_trait;
use dpd_core::{diff_procs, Clock, Config, ProcessSpec, ProfileState};
use tracing::{debug, error, info, warn};

use super::{Profile, RefreshHook};
use crate::proc::ProcessAdapter;

/// Reloads profiles when the watched config file changes.
pub struct FileRefresher {
    conf_file: PathBuf,
    last_update: SystemTime,
}

impl FileRefresher {
    pub fn new<C: Clock>(conf_file: PathBuf, clock: &C) -> Self {
        Self { conf_file, last_update: clock.system_now() }
    }

    #[cfg(test)]
    pub(crate) fn with_last_update(conf_file: PathBuf, last_update: SystemTime) -> Self {
        Self { conf_file, last_update }
    }
}

#[async_trait]
impl<A: ProcessAdapter, C: Clock> RefreshHook<A, C> for FileRefresher {
    async fn refresh(
        &mut self,
        profiles: Vec<Profile<C>>,
        config: Config,
        adapter: &A,
        clock: &C,
        force: bool,
    ) -> (Vec<Profile<C>>, Config) {
        if !force {
            let modified = match fs::metadata(&self.conf_file).and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    debug!(error = %e, "config stat failed; retrying next tick");
                    return (profiles, config);
                }
            };
            if modified <= self.last_update {
                return (profiles, config);
            }
        }

        let new_config = match Config::load(&self.conf_file) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(error = %e, "config reload failed; keeping previous");
                return (profiles, config);
            }
        };
        self.last_update = clock.system_now();

        info!(path = %self.conf_file.display(), "refreshing profiles");
        let profiles = apply_diff(profiles, &config.procs, &new_config.procs, adapter, clock);
        (profiles, new_config)
    }
}

/// Apply a manifest diff to the live profile set.
///
/// Removed names are marked `ErrorUp` (the next tick stops them),
/// changed names are reconfigured and marked `AdminNeedRestart`, new
/// names become fresh profiles with pidfile recovery. Unchanged
/// profiles pass through untouched, in-flight state intact.
pub(crate) fn apply_diff<A: ProcessAdapter, C: Clock>(
    profiles: Vec<Profile<C>>,
    old: &[ProcessSpec],
    new: &[ProcessSpec],
    adapter: &A,
    clock: &C,
) -> Vec<Profile<C>> {
    let diff = diff_procs(old, new);
    let new_by_name: HashMap<&str, &ProcessSpec> =
        new.iter().map(|s| (s.name.as_str(), s)).collect();

    let mut next = Vec::with_capacity(profiles.len() + diff.to_start.len());
    for mut profile in profiles {
        let name = profile.name().to_string();
        if diff.to_stop.contains(&name) {
            debug!(profile = %name, "to stop");
            profile.set_state(ProfileState::ErrorUp);
            next.push(profile);
        } else if diff.to_reload.contains(&name) {
            debug!(profile = %name, "to reload");
            let Some(spec) = new_by_name.get(name.as_str()) else {
                next.push(profile);
                continue;
            };
            match profile.configure((*spec).clone(), adapter) {
                Ok(()) => profile.set_state(ProfileState::AdminNeedRestart),
                Err(e) => error!(profile = %name, error = %e, "reconfigure failed; keeping old spec"),
            }
            next.push(profile);
        } else {
            debug!(profile = %name, "to keep");
            next.push(profile);
        }
    }

    for name in &diff.to_start {
        debug!(profile = %name, "to start");
        let Some(spec) = new_by_name.get(name.as_str()) else {
            continue;
        };
        match Profile::new((*spec).clone(), adapter, clock.clone()) {
            Ok(mut profile) => {
                profile.initialize(adapter);
                next.push(profile);
            }
            Err(e) => error!(profile = %name, error = %e, "profile not added"),
        }
    }

    next
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
