// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Profile lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of one supervised profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileState {
    /// Newly created; never started this session.
    Waiting,
    /// Believed alive; the recorded pid was live at the last check.
    Running,
    /// Deliberately stopped; dropped from the active set at end of tick.
    AdminDown,
    /// Exceeded the spawn budget inside the throttle window; left alone
    /// until the window rolls off or an operator intervenes.
    AdminNotRestarted,
    /// Spec changed while running; stop then start on the same tick.
    AdminNeedRestart,
    /// Crashed and due for a restart.
    ErrorDown,
    /// Should be stopped but still alive.
    ErrorUp,
}

impl ProfileState {
    /// States the supervisor stops before considering a start.
    pub fn needs_stop(self) -> bool {
        matches!(self, ProfileState::ErrorUp | ProfileState::AdminNeedRestart)
    }

    /// States eligible for a (re)start this tick.
    pub fn needs_start(self) -> bool {
        matches!(
            self,
            ProfileState::Waiting | ProfileState::ErrorDown | ProfileState::AdminNeedRestart
        )
    }
}

impl fmt::Display for ProfileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProfileState::Waiting => "waiting",
            ProfileState::Running => "running",
            ProfileState::AdminDown => "admin_down",
            ProfileState::AdminNotRestarted => "admin_not_restarted",
            ProfileState::AdminNeedRestart => "admin_need_restart",
            ProfileState::ErrorDown => "error_down",
            ProfileState::ErrorUp => "error_up",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
