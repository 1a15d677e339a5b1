// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::ArmState;

/// A `WatchPaths` entry can be mid-reopen: the watched path disappeared
/// and came back (or the job consuming it exited) between one fs event
/// and the descriptor being reattached. `PendingReopen` marks that gap
/// so the daemon knows to re-stat and re-register rather than assume
/// the old descriptor is still valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchState {
    Armed,
    PendingReopen,
    Unarmed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchPath {
    pub path: PathBuf,
    /// Only fire when the path transitions from absent to present.
    pub only_if_no_senders_on_prior: bool,
    /// `QueueDirectories` entry: fires only while the directory is
    /// non-empty, rather than on every change notification.
    pub is_queue_directory: bool,
    pub state: WatchState,
}

impl WatchPath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            only_if_no_senders_on_prior: false,
            is_queue_directory: false,
            state: WatchState::Unarmed,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn arm_state(&self) -> ArmState {
        match self.state {
            WatchState::Armed | WatchState::PendingReopen => ArmState::Armed,
            WatchState::Unarmed => ArmState::Unarmed,
        }
    }

    pub fn mark_armed(&mut self) {
        self.state = WatchState::Armed;
    }

    pub fn mark_unarmed(&mut self) {
        self.state = WatchState::Unarmed;
    }

    /// Called when the watched descriptor needs to be reopened (e.g. the
    /// underlying path was removed and recreated).
    pub fn mark_pending_reopen(&mut self) {
        self.state = WatchState::PendingReopen;
    }
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
