// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

use super::ArmState;

/// The activation-source view of a `MachServices` entry: a lookup of
/// this name through the broker should dispatch the owning job on
/// demand. The broker module owns the service-name table itself; this
/// struct only tracks the bits this crate's dispatch policy needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachServiceSource {
    pub name: String,
    /// Reset the port to "no senders" state when the job exits rather
    /// than handing the same port to the next incarnation.
    pub reset_on_close: bool,
    /// Don't dispatch until some other event arms the job; a check-in
    /// only reserves the name without itself being on-demand activation.
    pub hide_until_check_in: bool,
    pub arm_state: ArmState,
}

impl MachServiceSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), reset_on_close: false, hide_until_check_in: false, arm_state: ArmState::Unarmed }
    }
}

#[cfg(test)]
#[path = "mach_tests.rs"]
mod tests;
