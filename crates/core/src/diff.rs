// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manifest differ: partition two process lists by required action.

use indexmap::IndexMap;

use crate::ProcessSpec;

/// Partition of `old ∪ new` process names, keyed by what the supervisor
/// must do. The four sets are pairwise disjoint and together cover every
/// name in either list.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcDiff {
    /// In old, not in new: stop and drop.
    pub to_stop: Vec<String>,
    /// In new, not in old: create and start.
    pub to_start: Vec<String>,
    /// In both with a changed spec: stop, reconfigure, start.
    pub to_reload: Vec<String>,
    /// In both, unchanged: leave alone.
    pub to_keep: Vec<String>,
}

/// Classify each process name in `old ∪ new`.
///
/// Order is deterministic: `to_stop`, `to_reload` and `to_keep` follow
/// the old list's order, `to_start` follows the new list's order.
pub fn diff_procs(old: &[ProcessSpec], new: &[ProcessSpec]) -> ProcDiff {
    let old_by_name: IndexMap<&str, &ProcessSpec> =
        old.iter().map(|s| (s.name.as_str(), s)).collect();
    let new_by_name: IndexMap<&str, &ProcessSpec> =
        new.iter().map(|s| (s.name.as_str(), s)).collect();

    let mut diff = ProcDiff::default();
    for spec in old {
        match new_by_name.get(spec.name.as_str()) {
            None => diff.to_stop.push(spec.name.clone()),
            Some(replacement) if **replacement != *spec => diff.to_reload.push(spec.name.clone()),
            Some(_) => diff.to_keep.push(spec.name.clone()),
        }
    }
    for spec in new {
        if !old_by_name.contains_key(spec.name.as_str()) {
            diff.to_start.push(spec.name.clone());
        }
    }
    diff
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
