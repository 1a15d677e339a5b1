// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `superviserd`'s library half: configuration, the fork/exec pipeline,
//! process-exit handling, and the event loop. The binary (`src/main.rs`)
//! is a thin `Config::resolve` / lock / `EventLoop::run` shell around
//! what's exposed here.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod error;
pub mod event_loop;
pub mod execpipeline;
pub mod lockfile;
pub mod reap;
pub mod supervisor;

pub use config::DaemonConfig;
pub use error::DaemonError;
pub use event_loop::{accept_loop, bind_control_socket, Command, EventLoop};
pub use lockfile::LockFile;
pub use supervisor::SupervisorState;
