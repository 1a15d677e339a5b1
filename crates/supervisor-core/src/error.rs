// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for the supervisor core.
//!
//! Mirrors the five-way split in the design's error-handling section:
//! invalid submissions are rejected synchronously with a precise code;
//! everything else is absorbed by the event loop and only ever observed
//! through exit status, `info` queries, or logs.

use thiserror::Error;

/// Stable numeric codes returned to submitters, kept distinct from the
/// richer `SupervisorError` so wire callers get a small closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,
    NotPrivileged = 1,
    NameInUse = 2,
    UnknownService = 3,
    BadCount = 4,
    NoMemory = 5,
}

/// The taxonomy from the design's error-handling section, in Rust shape.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Malformed payload, reserved label, duplicate label. Surfaces
    /// synchronously to the submitter with a stable [`ErrorCode`].
    #[error("invalid input: {message}")]
    InvalidInput { message: String, code: ErrorCode },

    /// fork/open/port-allocation failure. Logged and retried at the next
    /// event; never propagated to a submitter.
    #[error("transient system failure: {0}")]
    TransientSystemFailure(String),

    /// exec failed, or the job exceeded `FAILED_EXITS_THRESHOLD`. The job
    /// is removed; this is recorded, not retried.
    #[error("child lifecycle failure: {0}")]
    ChildLifecycleFailure(String),

    /// A peer context died (dead-name); owned state under it is pruned.
    #[error("peer failure: {0}")]
    PeerFailure(String),

    /// An internal post-condition that should never fail. Logged and the
    /// loop continues — this variant must never cause a panic or abort.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

impl SupervisorError {
    pub fn invalid_input(message: impl Into<String>, code: ErrorCode) -> Self {
        Self::InvalidInput { message: message.into(), code }
    }

    /// The stable wire error code for submitter-facing errors, or
    /// `NoMemory` as the catch-all for errors that never reach a submitter.
    pub fn code(&self) -> ErrorCode {
        match self {
            SupervisorError::InvalidInput { code, .. } => *code,
            _ => ErrorCode::NoMemory,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
