// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire format for the dpd message bus.
//!
//! Frames are 4-byte length prefix (big-endian) + payload bytes. Manifest
//! updates ride inside frames as `<node-name>\x20<json proc list>`, so a
//! subscriber can filter on the node-name prefix without parsing JSON.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod frame;
mod update;

pub use frame::{read_frame, write_frame, WireError, MAX_FRAME_SIZE};
pub use update::{encode_update, matches_filter, Update};
