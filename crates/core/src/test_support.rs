// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use std::path::PathBuf;

use crate::{Config, ProcessSpec};

/// A minimal valid spec for a long-lived process named `name`.
pub fn spec(name: &str) -> ProcessSpec {
    ProcessSpec {
        name: name.to_string(),
        run: PathBuf::from("/bin/sleep"),
        pid_file: PathBuf::from(format!("/tmp/dpd-test/{name}.pid")),
        args: vec!["3600".to_string()],
        cwd: PathBuf::from("/"),
        user: crate::UserRef::Id(0),
        chroot: None,
        logs: None,
        restart: true,
        depends: Vec::new(),
        env: Default::default(),
        daemon: false,
        write_pid: true,
    }
}

/// Like [`spec`] but with explicit args, for exercising reload diffs.
pub fn spec_with_args(name: &str, args: &[&str]) -> ProcessSpec {
    let mut s = spec(name);
    s.args = args.iter().map(|a| a.to_string()).collect();
    s
}

/// A worker-side config holding the given procs.
pub fn worker_config(procs: Vec<ProcessSpec>) -> Config {
    Config { procs, ..Config::default() }
}

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for differ and serde properties.
pub mod strategies {
    use proptest::prelude::*;

    use super::spec_with_args;
    use crate::ProcessSpec;

    /// A proc list with unique names drawn from a small pool, each with
    /// one of a few argument variants so reload classification has
    /// something to chew on.
    pub fn arb_proc_list() -> impl Strategy<Value = Vec<ProcessSpec>> {
        proptest::collection::btree_map(0usize..10, 0u8..3, 0..8).prop_map(|entries| {
            entries
                .into_iter()
                .map(|(idx, variant)| {
                    let name = format!("proc-{idx}");
                    spec_with_args(&name, &[&format!("variant-{variant}")])
                })
                .collect()
        })
    }
}
