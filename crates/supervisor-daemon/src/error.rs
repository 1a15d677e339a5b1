// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-level errors: everything that can go wrong doing real I/O and
//! syscalls, as opposed to [`supervisor_core::SupervisorError`], which
//! covers rejected submissions and policy violations in the pure core.

use std::path::PathBuf;

use supervisor_core::SupervisorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("could not determine a state directory (no $HOME and no XDG_STATE_HOME)")]
    NoStateDir,

    #[error("failed to create state directory {path}: {source}")]
    StateDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("control socket {path} is already bound by another process")]
    ControlSocketInUse { path: PathBuf },

    #[error("another daemon instance already holds the lock at {path}")]
    LockHeld {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("fork failed: {0}")]
    Fork(#[source] nix::Error),

    #[error("exec of {program} failed: {source}")]
    Exec {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("wait on pid {pid} failed: {source}")]
    Wait {
        pid: i32,
        #[source]
        source: nix::Error,
    },

    #[error("signaling pid {pid} failed: {source}")]
    Signal {
        pid: i32,
        #[source]
        source: nix::Error,
    },

    #[error("filesystem watch on {path} failed: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error(transparent)]
    Rejected(#[from] SupervisorError),

    #[error("job {label} not found")]
    UnknownJob { label: String },

    #[error("malformed submission payload: {0}")]
    MalformedPayload(String),
}

impl DaemonError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
