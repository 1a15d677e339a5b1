// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-exit handling: the daemon side of §4.3.3. [`Job::record_exit`]
//! owns the pure bookkeeping (rusage-adjacent counters, last-exit
//! latch); this module adds the parts that need a clock and the
//! dispatch policy — throttling and the decision of what happens next.

use supervisor_core::{dispatch, useless, DispatchAction, DispatchState, Job, PredicateContext};

/// What the event loop should do after a child has been reaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapOutcome {
    /// The job is useless now; the caller should mark it for removal in
    /// the arena (cascading to its children) and free any broker state
    /// rooted on it.
    Remove,
    /// The job entered (or re-entered) the throttle window; arm a
    /// one-shot timer for `MIN_RUN_SECONDS` before reconsidering it.
    Throttled { until_epoch_ms: u64 },
    /// Dispatch already decided the next action; apply it immediately.
    Dispatch(DispatchAction),
}

/// Reap a child: latch its exit, decide whether it throttles, and run
/// the dispatch policy to see what happens next. `exit_code` follows
/// [`Job::record_exit`]'s convention: `0` for a clean exit, non-zero
/// (including a negated signal number) for anything else.
pub fn reap(
    job: &mut Job,
    exit_code: i32,
    now_epoch_ms: u64,
    shutting_down: bool,
    ctx: &impl PredicateContext,
    queued_messages: &impl Fn(&str) -> bool,
) -> ReapOutcome {
    let ran_long_enough = job.started_at_epoch_ms.is_some_and(|start| {
        now_epoch_ms.saturating_sub(start) >= supervisor_core::constants::MIN_RUN_SECONDS * 1000
    });

    job.record_exit(exit_code, now_epoch_ms);

    if !ran_long_enough && !job.flags.on_demand {
        let until = now_epoch_ms + supervisor_core::constants::MIN_RUN_SECONDS * 1000;
        job.dispatch = DispatchState::Throttled;
        job.throttled_until_epoch_ms = Some(until);
    } else {
        job.dispatch = DispatchState::Idle;
        job.throttled_until_epoch_ms = None;
    }

    if useless(job, shutting_down) {
        job.dispatch = DispatchState::Dead;
        return ReapOutcome::Remove;
    }

    if let Some(until) = job.throttled_until_epoch_ms {
        return ReapOutcome::Throttled { until_epoch_ms: until };
    }

    ReapOutcome::Dispatch(dispatch(job, shutting_down, ctx, queued_messages))
}

/// Release a job from its throttle window once its one-shot timer fires,
/// per §4.5 `Throttled -> Running`: start directly rather than re-arming
/// sources.
pub fn release_from_throttle(job: &mut Job) {
    job.dispatch = DispatchState::Idle;
    job.throttled_until_epoch_ms = None;
}

#[cfg(test)]
#[path = "reap_tests.rs"]
mod tests;
