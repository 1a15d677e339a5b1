// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `SupervisorState`: the single owner of all mutable state the event
//! loop touches. Per §5 ("single-threaded, cooperative, event-loop
//! driven... all state is owned by the loop thread"), this struct is
//! never shared across threads; the event loop holds the only handle.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use supervisor_core::{
    dispatch, import, DispatchAction, Job, JobArena, JobId, PredicateContext, ServiceBroker, Source, SupervisorError,
};
use tracing::{info, warn};

use crate::error::DaemonError;
use crate::reap::{self, ReapOutcome};

/// Network reachability as observed by the event loop's periodic probe,
/// shared with the predicate context so `keepalive()` can read it
/// without the core crate ever touching a socket itself.
#[derive(Clone, Default)]
pub struct NetworkState {
    up: Arc<AtomicBool>,
}

impl NetworkState {
    pub fn new(initially_up: bool) -> Self {
        Self { up: Arc::new(AtomicBool::new(initially_up)) }
    }

    pub fn set(&self, up: bool) {
        self.up.store(up, Ordering::Relaxed);
    }

    pub fn get(&self) -> bool {
        self.up.load(Ordering::Relaxed)
    }
}

/// The daemon's concrete [`PredicateContext`]: real `stat` calls for path
/// predicates, and whatever the event loop last observed for network
/// reachability.
pub struct DaemonPredicateContext {
    pub network: NetworkState,
}

impl PredicateContext for DaemonPredicateContext {
    fn network_up(&self) -> bool {
        self.network.get()
    }

    fn path_exists(&self, path: &Path) -> bool {
        path.try_exists().unwrap_or(false)
    }
}

/// Pending Mach-style queued-message bookkeeping, keyed by service name.
/// A stand-in for the real message queue depth a capability-messaging
/// layer would expose; populated by whatever IPC collaborator delivers
/// inbound messages to a hidden or not-yet-checked-in service.
#[derive(Default)]
pub struct MessageQueues {
    pending: HashMap<String, bool>,
}

impl MessageQueues {
    pub fn mark_pending(&mut self, service: &str) {
        self.pending.insert(service.to_string(), true);
    }

    pub fn clear(&mut self, service: &str) {
        self.pending.remove(service);
    }

    pub fn has_pending(&self, service: &str) -> bool {
        self.pending.get(service).copied().unwrap_or(false)
    }
}

pub struct SupervisorState {
    pub arena: JobArena,
    pub broker: ServiceBroker,
    pub ctx: DaemonPredicateContext,
    pub queues: MessageQueues,
    /// Every job that owns a subset bootstrap context gets a
    /// daemon-assigned [`supervisor_core::RequestorToken`] watched for
    /// dead-name; recorded here so a reaped job's context subtree can be
    /// collapsed by token.
    requestor_tokens: HashMap<JobId, supervisor_core::RequestorToken>,
    next_token: u64,
    shutting_down: bool,
}

impl SupervisorState {
    pub fn new(root_owner: JobId) -> Self {
        Self {
            arena: JobArena::new(),
            broker: ServiceBroker::new(root_owner),
            ctx: DaemonPredicateContext { network: NetworkState::new(true) },
            queues: MessageQueues::default(),
            requestor_tokens: HashMap::new(),
            next_token: 1,
            shutting_down: false,
        }
    }

    /// Assign (or return the existing) dead-name-watched token for a job
    /// that is about to own a subset bootstrap context.
    pub fn requestor_token_for(&mut self, job_id: JobId) -> supervisor_core::RequestorToken {
        if let Some(token) = self.requestor_tokens.get(&job_id) {
            return *token;
        }
        let token = supervisor_core::RequestorToken(self.next_token);
        self.next_token += 1;
        self.requestor_tokens.insert(job_id, token);
        token
    }

    pub fn begin_shutdown(&mut self) {
        self.shutting_down = true;
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    /// Parse and admit a submission, returning the new job's id and any
    /// non-fatal warnings about unrecognized keys.
    pub fn submit(
        &mut self,
        tree: &serde_json::Value,
        parent: Option<JobId>,
    ) -> Result<(JobId, Vec<String>), DaemonError> {
        let parsed = import(tree, parent)?;
        if self.arena.label_in_use(&parsed.job.label) {
            return Err(SupervisorError::invalid_input(
                format!("label '{}' already in use", parsed.job.label),
                supervisor_core::ErrorCode::NameInUse,
            )
            .into());
        }
        let mach_names: Vec<String> = parsed
            .job
            .sources
            .iter()
            .filter_map(|s| if let Source::Mach(m) = s { Some(m.name.clone()) } else { None })
            .collect();
        let id = self.arena.insert(parsed.job);
        let root = self.broker.root();
        for name in mach_names {
            if let Err(err) = self.broker.create_service(root, &name, id) {
                warn!(job = %id, service = %name, error = %err, "could not reserve MachServices entry");
            }
        }
        Ok((id, parsed.warnings))
    }

    /// Run the dispatch policy over every live job, returning the action
    /// each one needs. Does not itself fork or touch the broker; the
    /// event loop interprets each action (forking on `Start`, arming
    /// timers/watches on `ArmSources`, tearing down on `Remove`).
    pub fn dispatch_all(&self) -> Vec<(JobId, DispatchAction)> {
        let queued = |service: &str| self.queues.has_pending(service);
        self.arena.iter().map(|job| (job.id, dispatch(job, self.shutting_down, &self.ctx, &queued))).collect()
    }

    /// Gather the contributed-environment maps of a job's siblings under
    /// the same parent. Used to build the peer-contributed half of a
    /// child's environment per §6.
    pub fn peer_contributed_environment(&self, job_id: JobId) -> Vec<BTreeMap<String, String>> {
        let Some(job) = self.arena.get(job_id) else {
            return Vec::new();
        };
        let Some(parent) = job.parent else {
            return Vec::new();
        };
        self.arena
            .children_of(parent)
            .filter(|sibling| sibling.id != job_id)
            .map(|sibling| sibling.environment.contributed.clone())
            .collect()
    }

    /// Reap a finished child and apply the outcome to the arena: mark
    /// the job (and its children) for removal, or leave it throttled /
    /// re-dispatched for the event loop to act on.
    pub fn reap(&mut self, job_id: JobId, exit_code: i32, now_epoch_ms: u64) -> Option<ReapOutcome> {
        let queued = |service: &str| self.queues.has_pending(service);
        let job = self.arena.get_mut(job_id)?;
        let outcome = reap::reap(job, exit_code, now_epoch_ms, self.shutting_down, &self.ctx, &queued);
        match outcome {
            ReapOutcome::Remove => {
                info!(job = %job_id, "job reaped as useless, removing");
                self.arena.mark_for_removal(job_id);
            }
            ReapOutcome::Throttled { until_epoch_ms } => {
                info!(job = %job_id, until_epoch_ms, "job throttled after a fast exit");
            }
            ReapOutcome::Dispatch(action) => {
                info!(job = %job_id, ?action, "job re-dispatched after exit");
            }
        }
        Some(outcome)
    }

    /// Mark every job whose only path predicate just flipped for
    /// re-dispatch, so a restart on one side of a path predicate doesn't
    /// starve a sibling waiting on the opposite condition (§4.3.2).
    pub fn jobs_watching_path(&self, path: &Path) -> Vec<JobId> {
        self.arena
            .iter()
            .filter(|job| job.keep_alive.iter().any(|p| p.watched_path() == Some(path)))
            .map(|job| job.id)
            .collect()
    }

    /// Sweep jobs marked for removal, pruning their broker state first.
    pub fn sweep(&mut self) -> Vec<Job> {
        let removed = self.arena.sweep();
        for job in &removed {
            if let Some(token) = self.requestor_tokens.remove(&job.id) {
                let collapsed = self.broker.on_dead_name(token);
                if !collapsed.is_empty() {
                    warn!(job = %job.id, collapsed = collapsed.len(), "collapsed broker contexts on job removal");
                }
            }
        }
        removed
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
