// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job definition and runtime state.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::dispatch::DispatchState;
use crate::keepalive::{KeepAlivePredicate, LastExit};
use crate::limits::{EnvironmentSet, LimitItem};
use crate::source::Source;

crate::define_id! {
    /// Unique identifier for a submitted job.
    pub struct JobId("job-");
}

/// Boolean switches that change how a job is launched or supervised.
/// Grouped separately from the rest of [`Job`] because most of them map
/// one-to-one onto a submission key and are otherwise inert data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobFlags {
    /// Never auto-started; only runs in response to an activation source
    /// or an explicit start request.
    pub on_demand: bool,
    pub run_at_load: bool,
    /// `KeepAlive: true` — restart unconditionally on every exit.
    pub keep_alive_always: bool,
    pub low_priority_io: bool,
    pub init_groups: bool,
    pub session_create: bool,
    pub wait_for_debugger: bool,
    /// Remove the job when the submitting session ends rather than
    /// persisting it across daemon restarts.
    pub unload_at_exit: bool,
    /// Bootstrap-compatibility bookkeeping: this job predates the
    /// per-service broker subset and owns the root bootstrap context's
    /// fallback lookup.
    pub legacy_mach_job: bool,
    /// The very first job submitted into a bootstrap context; torn down
    /// last when the context is demolished.
    pub first_born: bool,
    /// Hold the child at the handshake barrier until a debugger attaches
    /// and releases it, instead of the usual immediate continue.
    pub stall_before_exec: bool,
    /// Expand `ProgramArguments` glob patterns before exec.
    pub enable_globbing: bool,
}

/// A job's identity and launch configuration, plus the runtime state the
/// dispatch policy needs to decide what happens to it next. Submission
/// produces the configuration half; the daemon event loop mutates the
/// runtime half as the child is spawned, runs, and exits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub label: String,
    /// `None` is valid for a service-only job that exists purely to hold
    /// `MachServices` reservations; such a job is never dispatched.
    pub program: Option<PathBuf>,
    pub program_arguments: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub root_directory: Option<PathBuf>,
    pub user: Option<String>,
    pub group: Option<String>,
    pub umask: Option<u32>,
    pub nice: Option<i32>,
    /// Grace period between SIGTERM and SIGKILL during teardown.
    pub exit_timeout_seconds: Option<u32>,
    /// Override of the default throttle-on-crash window.
    pub throttle_interval_seconds: Option<u64>,
    pub stdout_path: Option<PathBuf>,
    pub stderr_path: Option<PathBuf>,
    pub environment: EnvironmentSet,
    #[serde(default)]
    pub limits: Vec<LimitItem>,
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default)]
    pub keep_alive: Vec<KeepAlivePredicate>,
    pub flags: JobFlags,
    pub parent: Option<JobId>,
    #[serde(default)]
    pub children: Vec<JobId>,

    #[serde(default)]
    pub dispatch: DispatchState,
    /// Whether the job has acknowledged its inherited sockets/services
    /// since its last start. A job with activation sources that exits
    /// without ever checking in is broken and will be reaped as useless.
    #[serde(default)]
    pub checked_in: bool,
    pub pid: Option<u32>,
    #[serde(default)]
    pub last_exit: LastExit,
    pub last_exit_status: Option<i32>,
    pub started_at_epoch_ms: Option<u64>,
    #[serde(default)]
    pub failed_exits: u32,
    pub throttled_until_epoch_ms: Option<u64>,
}

impl Job {
    /// Whether this job can ever be spawned. A service-only job (no
    /// `Program`/`ProgramArguments`) exists only to reserve service
    /// names in the broker.
    pub fn is_launchable(&self) -> bool {
        self.program.is_some() || !self.program_arguments.is_empty()
    }

    /// Whether any activation source is currently contributing demand.
    pub fn has_armed_source(&self) -> bool {
        self.sources.iter().any(|s| s.arm_state() == crate::source::ArmState::Armed)
    }

    pub fn is_running(&self) -> bool {
        matches!(self.dispatch, DispatchState::Running)
    }

    /// Record that the child exited, updating exit bookkeeping that the
    /// dispatch policy (throttling, keep-alive) reads back. `status`
    /// follows [`crate::reap`]'s convention: `0` for a clean exit, a
    /// positive value for a non-zero exit code, or a negated signal
    /// number when the child was terminated by a signal.
    pub fn record_exit(&mut self, status: i32, now_epoch_ms: u64) {
        self.pid = None;
        self.last_exit_status = Some(status);
        self.last_exit = if status == 0 { LastExit::Success } else { LastExit::Failed };

        // A deliberate `stop` (SIGTERM, or SIGKILL after the grace period
        // expires) is not a crash, and a legacy job's exits never feed the
        // crash-loop counter.
        let terminated_by_stop_signal =
            status < 0 && matches!(-status, crate::constants::SIGTERM_NUMBER | crate::constants::SIGKILL_NUMBER);
        let counts_as_failure = status != 0 && !terminated_by_stop_signal && !self.flags.legacy_mach_job;

        if counts_as_failure {
            self.failed_exits = self.failed_exits.saturating_add(1);
        } else {
            self.failed_exits = 0;
        }
        let earned_reward = self
            .started_at_epoch_ms
            .is_some_and(|start| now_epoch_ms.saturating_sub(start) >= crate::constants::REWARD_RUN_SECONDS * 1000);
        if earned_reward {
            self.failed_exits = 0;
        }
        self.started_at_epoch_ms = None;
    }

    pub fn record_start(&mut self, pid: u32, now_epoch_ms: u64) {
        self.pid = Some(pid);
        self.started_at_epoch_ms = Some(now_epoch_ms);
        self.dispatch = DispatchState::Running;
        self.checked_in = false;
    }

    pub fn mark_checked_in(&mut self) {
        self.checked_in = true;
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            label: String = "com.example.test",
        }
        set {
            program_arguments: Vec<String> = Vec::new(),
            environment: EnvironmentSet = EnvironmentSet::default(),
            limits: Vec<LimitItem> = Vec::new(),
            sources: Vec<Source> = Vec::new(),
            keep_alive: Vec<KeepAlivePredicate> = Vec::new(),
            flags: JobFlags = JobFlags::default(),
            children: Vec<JobId> = Vec::new(),
            dispatch: DispatchState = DispatchState::Idle,
            checked_in: bool = false,
            last_exit: LastExit = LastExit::Unknown,
            failed_exits: u32 = 0,
        }
        option {
            program: PathBuf = None,
            working_directory: PathBuf = None,
            root_directory: PathBuf = None,
            user: String = None,
            group: String = None,
            parent: JobId = None,
        }
        computed {
            id: JobId = JobId::new(),
            umask: Option<u32> = None,
            nice: Option<i32> = None,
            exit_timeout_seconds: Option<u32> = None,
            throttle_interval_seconds: Option<u64> = None,
            stdout_path: Option<PathBuf> = None,
            stderr_path: Option<PathBuf> = None,
            pid: Option<u32> = None,
            last_exit_status: Option<i32> = None,
            started_at_epoch_ms: Option<u64> = None,
            throttled_until_epoch_ms: Option<u64> = None,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
