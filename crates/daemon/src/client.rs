// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The client role: subscribe to this node's manifest updates and
//! materialize them into the local config file the worker watches.
//!
//! The atomic rewrite of that file is the only synchronization between
//! client and worker.

use std::path::PathBuf;
use std::time::Duration;

use dpd_bus::{BusError, Endpoint, StatsPusher, Subscriber};
use dpd_core::{Config, ConfigError};
use dpd_wire::Update;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Maximum wait on the updates channel per loop turn.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Bus(#[from] BusError),
}

/// The client loop.
#[derive(Debug)]
pub struct Client {
    node_name: String,
    conf_file: PathBuf,
    updates_ep: Endpoint,
    stats_ep: Endpoint,
}

impl Client {
    /// Validate the client's config and expand `%H` in the node name.
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let raw_name =
            config.node_name.as_deref().ok_or(ConfigError::MissingField("node_name"))?;
        let conf_file =
            config.conf_file.clone().ok_or(ConfigError::MissingField("conf_file"))?;
        let updates_ep = Endpoint::parse(
            config.master_updates.as_deref().ok_or(ConfigError::MissingField("master_updates"))?,
        )?;
        let stats_ep = Endpoint::parse(
            config.master_stats.as_deref().ok_or(ConfigError::MissingField("master_stats"))?,
        )?;
        Ok(Self {
            node_name: crate::env::expand_node_name(raw_name),
            conf_file,
            updates_ep,
            stats_ep,
        })
    }

    /// The node name after `%H` expansion; this is the subscribe filter.
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Run until cancelled.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), ClientError> {
        // The local envelope updates merge into. Its absence is a
        // deployment error, and fatal like any other startup config
        // failure.
        let mut local = Config::load(&self.conf_file)?;

        let mut updates = Subscriber::connect(self.updates_ep.clone(), self.node_name.clone());
        info!(endpoint = %self.updates_ep, node = %self.node_name, "subscribed for updates");

        let mut stats = StatsPusher::connect(self.stats_ep.clone());
        info!(endpoint = %self.stats_ep, "stats producer connected");
        // Make the node visible on the stats channel right away.
        stats.send(format!("{} client started", self.node_name).as_bytes()).await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("client stopping");
                    return Ok(());
                }
                frame = updates.recv(RECV_TIMEOUT) => {
                    let Some(frame) = frame else { continue };
                    match Update::decode(&frame) {
                        Ok(update) => {
                            if !self.apply_update(&mut local, update) {
                                continue;
                            }
                            if let Err(e) = local.write_atomic(&self.conf_file) {
                                warn!(error = %e, "failed to write local config");
                            }
                        }
                        Err(e) => warn!(error = %e, "discarding malformed update"),
                    }
                }
            }
        }
    }

    /// Merge a received update into the local envelope. Returns whether
    /// anything should be written. The subscription filter is a prefix
    /// match, so another node's update can still arrive here (filter
    /// `alpha`, update for `alphabet`) and must be dropped.
    fn apply_update(&self, local: &mut Config, update: Update) -> bool {
        if update.node != self.node_name {
            debug!(node = %update.node, "prefix-matched update for another node");
            return false;
        }
        info!(node = %update.node, procs = update.procs.len(), "manifest update received");
        local.procs = update.procs;
        true
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
