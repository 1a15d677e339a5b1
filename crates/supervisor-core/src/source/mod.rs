// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activation sources: the tagged sum type from the design notes'
//! "tagged, variant activation sources" re-architecture. Each variant
//! carries only the data needed to decide *whether* it should be armed;
//! the actual registration with the event loop (opening descriptors,
//! scheduling timers) is the daemon crate's job, since this crate has no
//! I/O. `arm_state` here tracks only what this crate needs to answer
//! "is this source currently contributing demand".

mod calendar;
mod interval;
mod mach;
mod socket;
mod watch;

pub use calendar::CalendarSource;
pub use interval::StartInterval;
pub use mach::MachServiceSource;
pub use socket::{SocketFamily, SocketGroup, SocketKind};
pub use watch::{WatchPath, WatchState};

use serde::{Deserialize, Serialize};

/// Whether a source is currently wired into the event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArmState {
    Unarmed,
    Armed,
}

/// One activation source attached to a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Source {
    Socket(SocketGroup),
    Watch(WatchPath),
    Calendar(CalendarSource),
    Interval(StartInterval),
    Mach(MachServiceSource),
}

impl Source {
    pub fn arm_state(&self) -> ArmState {
        match self {
            Source::Socket(s) => s.arm_state,
            Source::Watch(s) => s.arm_state(),
            Source::Calendar(s) => s.arm_state,
            Source::Interval(s) => s.arm_state,
            Source::Mach(s) => s.arm_state,
        }
    }

    /// Mark the source armed (called once the daemon has actually
    /// registered it with the event loop).
    pub fn mark_armed(&mut self) {
        match self {
            Source::Socket(s) => s.arm_state = ArmState::Armed,
            Source::Watch(s) => s.mark_armed(),
            Source::Calendar(s) => s.arm_state = ArmState::Armed,
            Source::Interval(s) => s.arm_state = ArmState::Armed,
            Source::Mach(s) => s.arm_state = ArmState::Armed,
        }
    }

    /// Mark the source unarmed (called once the daemon has unregistered
    /// it from the event loop, e.g. because the job started running).
    pub fn mark_unarmed(&mut self) {
        match self {
            Source::Socket(s) => s.arm_state = ArmState::Unarmed,
            Source::Watch(s) => s.mark_unarmed(),
            Source::Calendar(s) => s.arm_state = ArmState::Unarmed,
            Source::Interval(s) => s.arm_state = ArmState::Unarmed,
            Source::Mach(s) => s.arm_state = ArmState::Unarmed,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Source::Socket(_) => "socket",
            Source::Watch(_) => "watch",
            Source::Calendar(_) => "calendar",
            Source::Interval(_) => "interval",
            Source::Mach(_) => "mach",
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
