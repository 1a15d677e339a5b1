// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keep-alive predicates. Immutable once set on a job; `keepalive()`
//! consults them each time dispatch decides whether to (re)start.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A single predicate from `KeepAlive`'s dict form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeepAlivePredicate {
    NetworkUp,
    NetworkDown,
    SuccessfulExit,
    FailedExit,
    PathExists(PathBuf),
    PathMissing(PathBuf),
    QueuedMessagesOn(String),
}

/// The last observed exit outcome, recorded by `reap` and consulted by
/// `SuccessfulExit` / `FailedExit` predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LastExit {
    /// No run has completed yet.
    #[default]
    Unknown,
    Success,
    Failed,
}

/// Ambient facts the predicate set needs that don't live on the job
/// itself: current network reachability and a path-existence oracle.
/// Passed in rather than read from a global, per the design notes'
/// "collect globals into a single supervisor state" re-architecture.
pub trait PredicateContext {
    fn network_up(&self) -> bool;
    fn path_exists(&self, path: &std::path::Path) -> bool;
}

impl KeepAlivePredicate {
    /// Whether this predicate is currently satisfied. `last_exit` and
    /// `queued_messages` are the job-local facts; everything else comes
    /// through `ctx`.
    pub fn is_satisfied(
        &self,
        last_exit: LastExit,
        queued_messages: impl Fn(&str) -> bool,
        ctx: &impl PredicateContext,
    ) -> bool {
        match self {
            KeepAlivePredicate::NetworkUp => ctx.network_up(),
            KeepAlivePredicate::NetworkDown => !ctx.network_up(),
            KeepAlivePredicate::SuccessfulExit => last_exit == LastExit::Success,
            KeepAlivePredicate::FailedExit => last_exit == LastExit::Failed,
            KeepAlivePredicate::PathExists(p) => ctx.path_exists(p),
            KeepAlivePredicate::PathMissing(p) => !ctx.path_exists(p),
            KeepAlivePredicate::QueuedMessagesOn(service) => queued_messages(service),
        }
    }

    /// The filesystem path this predicate watches, if any. Used to find
    /// sibling jobs that share a path predicate so one job's restart
    /// re-dispatches the other (the "don't starve the inverse condition"
    /// rule in §4.3.2).
    pub fn watched_path(&self) -> Option<&std::path::Path> {
        match self {
            KeepAlivePredicate::PathExists(p) | KeepAlivePredicate::PathMissing(p) => Some(p),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "keepalive_tests.rs"]
mod tests;
