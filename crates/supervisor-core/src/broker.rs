// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service-name broker: a tree of bootstrap contexts, each owning a set
//! of named services. A lookup walks from a context up to the root on
//! a local miss. This module never touches a real capability port —
//! the daemon crate is responsible for turning a [`PortHandle`] into
//! whatever IPC primitive the platform actually uses; here a handle is
//! just "this name, in this context".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::MAX_LOOKUP;
use crate::error::{ErrorCode, SupervisorError};
use crate::job::JobId;

crate::define_id! {
    /// Identifies one bootstrap (naming) context.
    pub struct ContextId("ctx-");
}

/// An opaque handle the daemon assigns to whatever it is watching for
/// "the holder went away" (a pid, a socket peer). Dead-name delivery is
/// "this token's holder is gone"; no-senders delivery is "this
/// service's last client disconnected". Both are reported back to the
/// broker by token rather than by a real port, since capability
/// messaging primitives are assumed to exist outside this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestorToken(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachService {
    pub name: String,
    pub owner: JobId,
    pub is_active: bool,
    pub reset_on_close: bool,
    pub hide_until_check_in: bool,
    pub is_receive_right_held_by_us: bool,
    pub is_exception_server: bool,
    pub is_kunc_server: bool,
    /// A dead-name watch on whoever externally holds a send right to
    /// this service, if any have been registered.
    pub held_by: Vec<RequestorToken>,
}

impl MachService {
    fn reserved(name: impl Into<String>, owner: JobId) -> Self {
        Self {
            name: name.into(),
            owner,
            is_active: false,
            reset_on_close: false,
            hide_until_check_in: false,
            is_receive_right_held_by_us: true,
            is_exception_server: false,
            is_kunc_server: false,
            held_by: Vec::new(),
        }
    }

    /// Whether a miss-free `look_up` can see this service: hidden
    /// services are invisible until they've checked in at least once.
    fn visible(&self) -> bool {
        self.is_active || !self.hide_until_check_in
    }
}

/// Refers to a resolved service without granting ownership of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortHandle {
    pub context: ContextId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapContext {
    pub id: ContextId,
    pub owner: JobId,
    pub parent: Option<ContextId>,
    /// Present only for subset contexts created on behalf of an
    /// anonymous child job; its requestor token is dead-name-watched so
    /// the whole subtree collapses when that process dies.
    pub requestor: Option<RequestorToken>,
    pub services: BTreeMap<String, MachService>,
}

#[derive(Debug, Default)]
pub struct ServiceBroker {
    contexts: BTreeMap<ContextId, BootstrapContext>,
    root: Option<ContextId>,
}

impl ServiceBroker {
    pub fn new(root_owner: JobId) -> Self {
        let mut broker = Self { contexts: BTreeMap::new(), root: None };
        let root_id = ContextId::new();
        broker.contexts.insert(
            root_id,
            BootstrapContext { id: root_id, owner: root_owner, parent: None, requestor: None, services: BTreeMap::new() },
        );
        broker.root = Some(root_id);
        broker
    }

    pub fn root(&self) -> ContextId {
        #[allow(clippy::expect_used)]
        self.root.expect("root context always present after construction")
    }

    pub fn context(&self, id: ContextId) -> Option<&BootstrapContext> {
        self.contexts.get(&id)
    }

    /// §4.4 `subset`: a sub-context rooted at `parent`, owned by
    /// `owner`, watched for dead-name on `requestor`.
    pub fn subset(&mut self, parent: ContextId, owner: JobId, requestor: RequestorToken) -> Result<ContextId, SupervisorError> {
        if !self.contexts.contains_key(&parent) {
            return Err(SupervisorError::invalid_input("unknown bootstrap context", ErrorCode::UnknownService));
        }
        let id = ContextId::new();
        self.contexts.insert(
            id,
            BootstrapContext { id, owner, parent: Some(parent), requestor: Some(requestor), services: BTreeMap::new() },
        );
        Ok(id)
    }

    /// §4.4 `create_service`: reserves an inactive name.
    pub fn create_service(&mut self, context: ContextId, name: &str, owner: JobId) -> Result<PortHandle, SupervisorError> {
        let ctx = self.context_mut(context)?;
        if ctx.services.contains_key(name) {
            return Err(SupervisorError::invalid_input(
                format!("service '{name}' already exists in this context"),
                ErrorCode::NameInUse,
            ));
        }
        ctx.services.insert(name.to_string(), MachService::reserved(name, owner));
        Ok(PortHandle { context, name: name.to_string() })
    }

    /// §4.4 `check_in`: succeeds only for the owning job; activates the service.
    pub fn check_in(&mut self, context: ContextId, name: &str, caller: JobId) -> Result<PortHandle, SupervisorError> {
        let ctx = self.context_mut(context)?;
        let service = ctx.services.get_mut(name).ok_or_else(|| {
            SupervisorError::invalid_input(format!("no such service '{name}'"), ErrorCode::UnknownService)
        })?;
        if service.owner != caller {
            return Err(SupervisorError::invalid_input(
                "check-in attempted by a job that does not own this service",
                ErrorCode::NotPrivileged,
            ));
        }
        service.is_active = true;
        Ok(PortHandle { context, name: name.to_string() })
    }

    /// §4.4 `register`: legacy path. `owner = None` deletes the entry.
    pub fn register(&mut self, context: ContextId, name: &str, owner: Option<JobId>) -> Result<(), SupervisorError> {
        let ctx = self.context_mut(context)?;
        match owner {
            None => {
                ctx.services.remove(name);
                Ok(())
            }
            Some(owner) => {
                if let Some(existing) = ctx.services.get(name) {
                    if existing.is_active {
                        return Err(SupervisorError::invalid_input(
                            format!("service '{name}' is already active"),
                            ErrorCode::NameInUse,
                        ));
                    }
                }
                let mut service = MachService::reserved(name, owner);
                service.is_active = true;
                service.is_receive_right_held_by_us = false;
                ctx.services.insert(name.to_string(), service);
                Ok(())
            }
        }
    }

    /// §4.4 `look_up`, walking to the parent on a local miss.
    pub fn look_up(&self, context: ContextId, name: &str) -> Option<PortHandle> {
        let mut current = Some(context);
        while let Some(id) = current {
            let ctx = self.contexts.get(&id)?;
            if let Some(service) = ctx.services.get(name) {
                if service.visible() {
                    return Some(PortHandle { context: id, name: name.to_string() });
                }
            }
            current = ctx.parent;
        }
        None
    }

    /// §4.4 `look_up_array`: batch lookup, nulls for misses.
    pub fn look_up_array(&self, context: ContextId, names: &[String]) -> Result<(Vec<Option<PortHandle>>, bool), SupervisorError> {
        if names.len() > MAX_LOOKUP {
            return Err(SupervisorError::invalid_input("batch lookup exceeds MAX_LOOKUP", ErrorCode::BadCount));
        }
        let results: Vec<Option<PortHandle>> = names.iter().map(|n| self.look_up(context, n)).collect();
        let all_known = results.iter().all(Option::is_some);
        Ok((results, all_known))
    }

    /// §4.4 `info`: snapshot of names and activity.
    pub fn info(&self, context: ContextId) -> Vec<(String, bool)> {
        match self.contexts.get(&context) {
            Some(ctx) => ctx.services.values().map(|s| (s.name.clone(), s.is_active)).collect(),
            None => Vec::new(),
        }
    }

    /// Dead-name delivery: the holder of `token` is gone. Collapses any
    /// subset context rooted on that token and prunes every service
    /// whose external holder matches. Returns the removed context ids so
    /// the caller can also remove their owning (anonymous) jobs.
    pub fn on_dead_name(&mut self, token: RequestorToken) -> Vec<ContextId> {
        let mut collapsed = Vec::new();
        let doomed: Vec<ContextId> =
            self.contexts.values().filter(|ctx| ctx.requestor == Some(token)).map(|ctx| ctx.id).collect();
        for id in doomed {
            self.remove_context_subtree(id, &mut collapsed);
        }
        for ctx in self.contexts.values_mut() {
            for service in ctx.services.values_mut() {
                service.held_by.retain(|held| *held != token);
            }
        }
        collapsed
    }

    fn remove_context_subtree(&mut self, id: ContextId, collapsed: &mut Vec<ContextId>) {
        let children: Vec<ContextId> =
            self.contexts.values().filter(|ctx| ctx.parent == Some(id)).map(|ctx| ctx.id).collect();
        for child in children {
            self.remove_context_subtree(child, collapsed);
        }
        if self.contexts.remove(&id).is_some() {
            collapsed.push(id);
        }
    }

    /// No-senders delivery: the last external client of `name` in
    /// `context` disconnected. Marks the service inactive again (unless
    /// `reset_on_close` keeps it armed for the next client) and returns
    /// whether the owning job should be re-dispatched.
    pub fn on_no_senders(&mut self, context: ContextId, name: &str) -> bool {
        let Some(ctx) = self.contexts.get_mut(&context) else { return false };
        let Some(service) = ctx.services.get_mut(name) else { return false };
        if service.reset_on_close {
            service.is_active = false;
        }
        true
    }

    fn context_mut(&mut self, id: ContextId) -> Result<&mut BootstrapContext, SupervisorError> {
        self.contexts.get_mut(&id).ok_or_else(|| {
            SupervisorError::invalid_input("unknown bootstrap context", ErrorCode::UnknownService)
        })
    }

    #[cfg(test)]
    pub fn context_mut_for_test(&mut self, id: ContextId) -> &mut BootstrapContext {
        #[allow(clippy::expect_used)]
        self.contexts.get_mut(&id).expect("context present in test")
    }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
