// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker-less TCP message fabric for dpd.
//!
//! Two channel shapes, mirroring how the roles talk:
//!
//! - updates: [`Publisher`] fans frames out to every connected
//!   [`Subscriber`]; subscribers filter by a node-name prefix. Frames
//!   sent while nobody is connected are dropped; a late subscriber
//!   simply catches the next publish.
//! - stats: [`StatsPusher`] → [`StatsCollector`], many producers into
//!   one consumer.
//!
//! All socket failures are recoverable: connections are re-established
//! in the background and the roles' loops never see them.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod endpoint;
mod publish;
mod stats;
mod subscribe;

use thiserror::Error;

pub use endpoint::Endpoint;
pub use publish::Publisher;
pub use stats::{StatsCollector, StatsPusher};
pub use subscribe::Subscriber;

/// Bus errors.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("invalid endpoint {uri:?}: {reason}")]
    InvalidEndpoint { uri: String, reason: String },

    #[error("failed to bind {endpoint}: {source}")]
    Bind {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Wire(#[from] dpd_wire::WireError),
}

/// Delay before a dropped connection is retried.
pub(crate) const RECONNECT_DELAY: std::time::Duration = std::time::Duration::from_secs(1);
