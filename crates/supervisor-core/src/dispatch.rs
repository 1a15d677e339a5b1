// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch policy: the state machine that decides whether a job should
//! be started, reaped as useless, or simply have its sources armed.
//! These functions are pure — they read a [`Job`] and a couple of
//! ambient facts and return a decision; actually forking, reaping, or
//! freeing the job is the daemon's job.

use serde::{Deserialize, Serialize};

use crate::constants::FAILED_EXITS_THRESHOLD;
use crate::job::Job;
use crate::keepalive::{LastExit, PredicateContext};
use crate::source::Source;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DispatchState {
    #[default]
    Idle,
    Armed,
    Running,
    Throttled,
    Dead,
}

/// What the caller should do as a result of a dispatch decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchAction {
    /// Already running; nothing to do.
    AlreadyActive,
    /// The job is useless; tear it down.
    Remove,
    /// Start (or, if throttled, arm the `MIN_RUN_SECONDS` timer first).
    Start,
    /// Arm activation sources and wait.
    ArmSources,
    /// Shutting down and still running: send the termination signal.
    Stop,
}

/// §4.3.1: whether a job should be torn down rather than considered for
/// restart.
pub fn useless(job: &Job, shutting_down: bool) -> bool {
    if shutting_down {
        return true;
    }
    if job.flags.unload_at_exit && job.last_exit != LastExit::Unknown {
        return true;
    }
    if job.failed_exits >= FAILED_EXITS_THRESHOLD {
        return true;
    }
    let exited_without_checkin =
        !job.sources.is_empty() && !job.checked_in && job.last_exit != LastExit::Unknown;
    if exited_without_checkin {
        return true;
    }
    let legacy_with_no_services = job.flags.legacy_mach_job
        && !job.is_launchable()
        && !job.sources.iter().any(|s| matches!(s, Source::Mach(_)));
    if legacy_with_no_services {
        return true;
    }
    false
}

/// §4.3.2: whether the job should be (re)started right now. `queued_messages`
/// answers "does this Mach service name have undelivered messages waiting".
pub fn keepalive(
    job: &Job,
    ctx: &impl PredicateContext,
    queued_messages: &impl Fn(&str) -> bool,
) -> bool {
    let never_started = job.started_at_epoch_ms.is_none() && job.last_exit == LastExit::Unknown;
    if job.flags.run_at_load && never_started {
        return true;
    }
    if !job.flags.on_demand {
        return true;
    }
    let mach_has_queue =
        job.sources.iter().any(|s| matches!(s, Source::Mach(m) if queued_messages(&m.name)));
    if mach_has_queue {
        return true;
    }
    job.keep_alive.iter().any(|p| p.is_satisfied(job.last_exit, queued_messages, ctx))
}

/// §4.3: `dispatch(job)`.
pub fn dispatch(
    job: &Job,
    shutting_down: bool,
    ctx: &impl PredicateContext,
    queued_messages: &impl Fn(&str) -> bool,
) -> DispatchAction {
    if job.is_running() {
        // A running job can't simply be left alone once shutdown starts:
        // `useless()` would remove it the moment it exits, but nothing
        // stops it exiting on its own otherwise. Tell the caller to
        // signal it instead of reporting it as merely active.
        if shutting_down {
            return DispatchAction::Stop;
        }
        return DispatchAction::AlreadyActive;
    }
    if useless(job, shutting_down) {
        return DispatchAction::Remove;
    }
    if keepalive(job, ctx, queued_messages) {
        return DispatchAction::Start;
    }
    DispatchAction::ArmSources
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
