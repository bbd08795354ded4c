// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! dpd-daemon: the three dpd roles.
//!
//! - master: watches the master config and fans per-node manifests out
//!   over the updates channel, draining stats pushed by nodes.
//! - client: subscribes to its node's manifest updates and materializes
//!   them into the local config file the worker watches.
//! - worker: the supervisor loop that keeps declared processes alive,
//!   restarting within rate limits and reconciling config changes.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod client;
pub mod env;
pub mod logging;
pub mod master;
pub mod pidfile;
pub mod proc;
pub mod retry;
pub mod shutdown;
pub mod worker;

pub use client::{Client, ClientError};
pub use master::{Master, MasterError};
pub use worker::{FileRefresher, Supervisor};
