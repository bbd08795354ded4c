// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node-addressed manifest updates.
//!
//! Message format: `<node-name>\x20<json proc list>`. The node name comes
//! first so subscribers can filter with a plain byte-prefix match.

use dpd_core::{Config, ProcessSpec};

use crate::frame::WireError;

/// Encode a per-node manifest update.
pub fn encode_update(node: &str, procs: &[ProcessSpec]) -> Result<Vec<u8>, WireError> {
    let payload = serde_json::to_vec(procs)?;
    let mut frame = Vec::with_capacity(node.len() + 1 + payload.len());
    frame.extend_from_slice(node.as_bytes());
    frame.push(b' ');
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Does a raw update frame pass a subscriber's node-name prefix filter?
pub fn matches_filter(frame: &[u8], filter: &str) -> bool {
    frame.starts_with(filter.as_bytes())
}

/// A decoded manifest update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub node: String,
    pub procs: Vec<ProcessSpec>,
}

impl Update {
    /// Decode an update frame: split on the first space, parse the rest
    /// as a proc list (duplicate names rejected).
    pub fn decode(frame: &[u8]) -> Result<Self, WireError> {
        let text = std::str::from_utf8(frame)
            .map_err(|_| WireError::MalformedUpdate("frame is not UTF-8".to_string()))?;
        let (node, payload) = text
            .split_once(' ')
            .ok_or_else(|| WireError::MalformedUpdate("missing node separator".to_string()))?;
        if node.is_empty() {
            return Err(WireError::MalformedUpdate("empty node name".to_string()));
        }
        let procs = Config::parse_procs(payload)
            .map_err(|e| WireError::MalformedUpdate(e.to_string()))?;
        Ok(Self { node: node.to_string(), procs })
    }
}

#[cfg(test)]
#[path = "update_tests.rs"]
mod tests;
