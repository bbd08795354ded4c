// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker supervisor: one cooperative loop that owns every profile
//! on the node, ticking once per second.
//!
//! Each tick visits the profiles in stable order, supervises them, and
//! drops the ones that reached `AdminDown` by rebuilding the active set
//! at end of tick. Between ticks the refresh hook ingests configuration
//! changes. Shutdown leaves children running; they are re-adopted from
//! their pidfiles on the next startup.

mod profile;
mod refresh;

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use dpd_core::{Clock, Config, ProfileState};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub use profile::Profile;
pub use refresh::FileRefresher;

use crate::proc::ProcessAdapter;

/// Maximal number of starts within the throttle window before giving up.
pub const MAX_STARTS: u32 = 5;

/// Rolling window the rate gate counts spawn attempts in.
pub const THROTTLE_WINDOW: Duration = Duration::from_secs(60);

/// Base delay between supervisor ticks.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// How long Stop waits after SIGTERM before escalating.
pub const STOP_LINGER: Duration = Duration::from_secs(1);

/// Pluggable configuration-change source, invoked synchronously between
/// ticks. Takes and returns the profile set so an implementation can
/// rebuild it without sharing mutable state with the tick.
#[async_trait]
pub trait RefreshHook<A: ProcessAdapter, C: Clock>: Send {
    async fn refresh(
        &mut self,
        profiles: Vec<Profile<C>>,
        config: Config,
        adapter: &A,
        clock: &C,
        force: bool,
    ) -> (Vec<Profile<C>>, Config);
}

/// Refresh hook that never changes anything; for embedders that manage
/// configuration some other way.
pub struct NoRefresh;

#[async_trait]
impl<A: ProcessAdapter, C: Clock> RefreshHook<A, C> for NoRefresh {
    async fn refresh(
        &mut self,
        profiles: Vec<Profile<C>>,
        config: Config,
        _adapter: &A,
        _clock: &C,
        _force: bool,
    ) -> (Vec<Profile<C>>, Config) {
        (profiles, config)
    }
}

/// The worker's supervisor loop.
pub struct Supervisor<A: ProcessAdapter, C: Clock> {
    profiles: Vec<Profile<C>>,
    config: Config,
    adapter: A,
    clock: C,
}

impl<A: ProcessAdapter, C: Clock> Supervisor<A, C> {
    /// Build the profile set from a worker config and adopt any
    /// processes still alive from an earlier supervisor. Specs whose
    /// user cannot be resolved are logged and skipped.
    pub fn from_config(config: Config, adapter: A, clock: C) -> Self {
        let mut profiles = Vec::with_capacity(config.procs.len());
        for spec in &config.procs {
            match Profile::new(spec.clone(), &adapter, clock.clone()) {
                Ok(mut profile) => {
                    profile.initialize(&adapter);
                    profiles.push(profile);
                }
                Err(e) => error!(profile = %spec.name, error = %e, "profile not added"),
            }
        }
        Self { profiles, config, adapter, clock }
    }

    /// One pass over the active set, in stable order. Profiles that end
    /// the tick in `AdminDown` release their identity.
    pub async fn tick(&mut self) {
        let mut next = Vec::with_capacity(self.profiles.len());
        for mut profile in std::mem::take(&mut self.profiles) {
            profile.supervise(&self.adapter).await;
            if profile.state() == ProfileState::AdminDown {
                info!(profile = %profile.name(), "dropped from active set");
            } else {
                next.push(profile);
            }
        }
        self.profiles = next;
    }

    /// Run until cancelled: tick, sleep with jitter, refresh, repeat.
    /// `reload` short-circuits the sleep and forces the next refresh
    /// (wired to SIGHUP by the worker binary).
    pub async fn run<R>(mut self, mut refresh: R, reload: Arc<Notify>, cancel: CancellationToken)
    where
        R: RefreshHook<A, C>,
    {
        info!(profiles = self.profiles.len(), "supervisor running");
        loop {
            self.tick().await;

            let mut force = false;
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("supervisor stopping; children are left running");
                    return;
                }
                _ = reload.notified() => {
                    info!("forcing configuration reload");
                    force = true;
                }
                _ = tokio::time::sleep(jittered(TICK_INTERVAL)) => {}
            }

            let (profiles, config) = refresh
                .refresh(
                    std::mem::take(&mut self.profiles),
                    std::mem::take(&mut self.config),
                    &self.adapter,
                    &self.clock,
                    force,
                )
                .await;
            self.profiles = profiles;
            self.config = config;
        }
    }

    pub fn profiles(&self) -> &[Profile<C>] {
        &self.profiles
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// `base` ± 10%, so a fleet of workers sharing a master does not tick in
/// lockstep. Subsecond wall-clock noise stands in for a PRNG.
fn jittered(base: Duration) -> Duration {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as i64;
    let spread = base.as_millis() as i64 / 5;
    let offset = nanos % (spread + 1) - spread / 2;
    Duration::from_millis((base.as_millis() as i64 + offset).max(0) as u64)
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
