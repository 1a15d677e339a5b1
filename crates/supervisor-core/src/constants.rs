// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tuning constants carried over from the original job-dispatch policy.

use std::time::Duration;

/// A run shorter than this is considered a "fast crash": it throttles the
/// job and counts toward `FAILED_EXITS_THRESHOLD` when also non-zero.
pub const MIN_RUN_SECONDS: u64 = 10;

/// A run at least this long resets the consecutive-failed-exit counter,
/// even if its exit status was non-zero.
pub const REWARD_RUN_SECONDS: u64 = 60;

/// Consecutive fast-crash count at which a job is declared useless and removed.
pub const FAILED_EXITS_THRESHOLD: u32 = 10;

/// Upper bound on the number of names accepted by a single batch lookup.
pub const MAX_LOOKUP: usize = 10_000;

/// Labels starting with this prefix are reserved for the supervisor's
/// own bookkeeping jobs and rejected from external submission.
pub const RESERVED_LABEL_PREFIX: &str = "com.supervisor.system.";

/// POSIX signal numbers, mirrored here because this crate has no `nix`
/// dependency of its own. [`Job::record_exit`] uses these to recognize a
/// deliberate `stop` as distinct from a crash.
pub const SIGTERM_NUMBER: i32 = 15;
pub const SIGKILL_NUMBER: i32 = 9;

pub const fn min_run_duration() -> Duration {
    Duration::from_secs(MIN_RUN_SECONDS)
}

pub const fn reward_run_duration() -> Duration {
    Duration::from_secs(REWARD_RUN_SECONDS)
}
