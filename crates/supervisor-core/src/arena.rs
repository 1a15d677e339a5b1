// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job storage. Jobs reference their parent and children by [`JobId`]
//! rather than holding each other directly, which would otherwise form
//! reference cycles. Deletion is two-phase: `mark_for_removal` flags a
//! job Dead without touching the map, and `sweep` removes every marked
//! job at the end of a dispatch cycle and detaches it from its parent.
//! Callbacks mid-iteration never observe a job disappear out from under
//! them.

use std::collections::{HashMap, HashSet};

use crate::dispatch::DispatchState;
use crate::job::{Job, JobId};

#[derive(Debug, Default)]
pub struct JobArena {
    jobs: HashMap<JobId, Job>,
    marked: HashSet<JobId>,
}

impl JobArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invariant 1: labels are globally unique across the whole tree.
    pub fn label_in_use(&self, label: &str) -> bool {
        self.jobs.values().any(|job| job.label == label)
    }

    pub fn find_by_label(&self, label: &str) -> Option<&Job> {
        self.jobs.values().find(|job| job.label == label)
    }

    pub fn insert(&mut self, job: Job) -> JobId {
        let id = job.id;
        if let Some(parent_id) = job.parent {
            if let Some(parent) = self.jobs.get_mut(&parent_id) {
                parent.children.push(id);
            }
        }
        self.jobs.insert(id, job);
        id
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(&id)
    }

    pub fn get_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.jobs.values_mut()
    }

    pub fn children_of(&self, id: JobId) -> impl Iterator<Item = &Job> {
        self.jobs.get(&id).into_iter().flat_map(|job| job.children.iter()).filter_map(|cid| self.jobs.get(cid))
    }

    /// Phase one: flag a job (and, recursively, its children) Dead and
    /// queue it for removal. Does not mutate the map.
    pub fn mark_for_removal(&mut self, id: JobId) {
        let mut queue = vec![id];
        while let Some(current) = queue.pop() {
            if !self.marked.insert(current) {
                continue;
            }
            if let Some(job) = self.jobs.get_mut(&current) {
                job.dispatch = DispatchState::Dead;
                queue.extend(job.children.iter().copied());
            }
        }
    }

    pub fn is_marked(&self, id: JobId) -> bool {
        self.marked.contains(&id)
    }

    /// Phase two: remove every marked job, detaching survivors from the
    /// removed ones' parent-child links. Returns the removed jobs so the
    /// caller can tear down their owned sources and services.
    pub fn sweep(&mut self) -> Vec<Job> {
        let marked = std::mem::take(&mut self.marked);
        let mut removed = Vec::with_capacity(marked.len());
        for id in &marked {
            if let Some(job) = self.jobs.remove(id) {
                removed.push(job);
            }
        }
        for job in self.jobs.values_mut() {
            job.children.retain(|cid| !marked.contains(cid));
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
#[path = "arena_tests.rs"]
mod tests;
