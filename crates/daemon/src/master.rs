// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The master role: fan per-node manifests out, drain stats.
//!
//! The bus is broker-less, so frames published before a subscriber
//! connects are gone; the master sleeps a settle interval before its
//! first publish and republishes whenever the config file's mtime
//! advances, which is also how late subscribers eventually converge.

use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};

use dpd_bus::{BusError, Endpoint, Publisher, StatsCollector};
use dpd_core::{Config, ConfigError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Grace period for subscribers to connect before the first publish.
pub const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Maximum wait on the stats channel, and the config re-check cadence.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Master errors.
#[derive(Debug, Error)]
pub enum MasterError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Bus(#[from] BusError),
}

/// The master loop.
#[derive(Debug)]
pub struct Master {
    config: Config,
    config_path: PathBuf,
    updates_ep: Endpoint,
    stats_ep: Endpoint,
}

impl Master {
    /// Validate the config's bus endpoints.
    pub fn new(config: Config, config_path: PathBuf) -> Result<Self, MasterError> {
        let updates_ep = Endpoint::parse(
            config.master_updates.as_deref().ok_or(ConfigError::MissingField("master_updates"))?,
        )?;
        let stats_ep = Endpoint::parse(
            config.master_stats.as_deref().ok_or(ConfigError::MissingField("master_stats"))?,
        )?;
        Ok(Self { config, config_path, updates_ep, stats_ep })
    }

    /// Run until cancelled.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), MasterError> {
        let updates = Publisher::bind(&self.updates_ep).await?;
        let mut stats = StatsCollector::bind(&self.stats_ep).await?;
        info!(endpoint = %self.updates_ep, "publishing updates");
        info!(endpoint = %self.stats_ep, "collecting stats");

        info!("sleeping {}s to let clients connect", SETTLE_DELAY.as_secs());
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = tokio::time::sleep(SETTLE_DELAY) => {}
        }

        let mut watcher = ConfigWatcher::new(self.config_path.clone());
        publish_manifests(&self.config, &updates).await;

        let mut last_check = Instant::now();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("master stopping");
                    return Ok(());
                }
                payload = stats.recv(POLL_INTERVAL) => {
                    if let Some(payload) = payload {
                        // Stats are opaque to the core; log them verbatim.
                        info!(stats = %String::from_utf8_lossy(&payload), "node stats");
                    }
                }
            }

            if last_check.elapsed() >= POLL_INTERVAL {
                last_check = Instant::now();
                if let Some(new_config) = watcher.poll() {
                    self.config = new_config;
                    publish_manifests(&self.config, &updates).await;
                }
            }
        }
    }
}

/// Publish one update frame per node, in manifest order.
async fn publish_manifests(config: &Config, updates: &Publisher) {
    for (node, procs) in &config.nodes {
        info!(node = %node, procs = procs.len(), "publish manifest");
        match dpd_wire::encode_update(node, procs) {
            Ok(frame) => {
                let delivered = updates.send(&frame).await;
                debug!(node = %node, subscribers = delivered, "manifest delivered");
            }
            Err(e) => warn!(node = %node, error = %e, "failed to encode manifest"),
        }
    }
}

/// Reloads the whole config when the file's mtime advances past the
/// last successful load. Not smart, and not trying to be: the differ
/// lives on the worker side.
struct ConfigWatcher {
    path: PathBuf,
    last_update: SystemTime,
}

impl ConfigWatcher {
    fn new(path: PathBuf) -> Self {
        Self { path, last_update: SystemTime::now() }
    }

    #[cfg(test)]
    fn with_last_update(path: PathBuf, last_update: SystemTime) -> Self {
        Self { path, last_update }
    }

    /// The freshly loaded config, when the file changed and parses.
    fn poll(&mut self) -> Option<Config> {
        let modified = match std::fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                debug!(error = %e, "config stat failed");
                return None;
            }
        };
        if modified <= self.last_update {
            return None;
        }
        match Config::load(&self.path) {
            Ok(config) => {
                info!(path = %self.path.display(), "configuration refreshed");
                self.last_update = SystemTime::now();
                Some(config)
            }
            Err(e) => {
                warn!(error = %e, "config reload failed; keeping previous");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "master_tests.rs"]
mod tests;
