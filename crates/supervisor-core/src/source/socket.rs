// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

use super::ArmState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocketFamily {
    Ipv4,
    Ipv6,
    Unix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocketKind {
    Stream,
    Datagram,
}

/// One named group of listening sockets (the `Sockets` submission key).
/// A group may bind several addresses, but they all arm and disarm
/// together and all map to the same `inetdCompatibility` behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketGroup {
    pub name: String,
    pub family: SocketFamily,
    pub kind: SocketKind,
    pub node_name: Option<String>,
    pub service_name: Option<String>,
    pub path_name: Option<String>,
    /// Pre-bound descriptors handed to us by the submitting process,
    /// when the `Sockets` entry names inherited fds rather than asking
    /// us to bind one ourselves.
    pub descriptors: Vec<i32>,
    /// `inetdCompatibility.Wait`: if true, the socket is only re-armed
    /// once the spawned job closes its end, matching classic inetd's
    /// "wait" services. If false, every connection dispatches the job
    /// (or, for a running job, is handed off on the shared descriptor).
    pub inetd_wait: bool,
    pub arm_state: ArmState,
}

impl SocketGroup {
    pub fn new(name: impl Into<String>, family: SocketFamily, kind: SocketKind) -> Self {
        Self {
            name: name.into(),
            family,
            kind,
            node_name: None,
            service_name: None,
            path_name: None,
            descriptors: Vec::new(),
            inetd_wait: false,
            arm_state: ArmState::Unarmed,
        }
    }
}

#[cfg(test)]
#[path = "socket_tests.rs"]
mod tests;
