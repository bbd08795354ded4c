// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host environment helpers.

/// Literal in `node_name` that expands to the machine's node name.
pub const HOSTNAME_TOKEN: &str = "%H";

/// Expand `%H` in a configured node name to the machine hostname.
pub fn expand_node_name(raw: &str) -> String {
    if raw.contains(HOSTNAME_TOKEN) {
        raw.replace(HOSTNAME_TOKEN, &hostname())
    } else {
        raw.to_string()
    }
}

/// The machine's network node name.
pub fn hostname() -> String {
    nix::unistd::gethostname()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Minimal base environment supervised children start from; the spec's
/// `env` entries are layered on top.
pub fn base_env() -> Vec<(String, String)> {
    vec![("PATH".to_string(), "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin".to_string())]
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
