// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-wide configuration resolved from environment variables, with
//! XDG-style defaults for state that needs to persist across restarts.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::DaemonError;

/// Resolve the state directory: `SUPERVISORD_STATE_DIR` >
/// `XDG_STATE_HOME/supervisord` > `~/.local/state/supervisord`.
pub fn state_dir() -> Result<PathBuf, DaemonError> {
    if let Ok(dir) = std::env::var("SUPERVISORD_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(dir) = dirs::state_dir() {
        return Ok(dir.join("supervisord"));
    }
    let home = dirs::home_dir().ok_or(DaemonError::NoStateDir)?;
    Ok(home.join(".local/state/supervisord"))
}

/// Path to the Unix-domain control socket submissions arrive on.
pub fn control_socket_path(state_dir: &std::path::Path) -> PathBuf {
    state_dir.join("control.sock")
}

/// Path to the exclusive lock file that guarantees a single running
/// instance per state directory.
pub fn lock_path(state_dir: &std::path::Path) -> PathBuf {
    state_dir.join("supervisord.lock")
}

/// How often the timer registry is polled for due calendar/interval
/// sources, when the platform timer primitive isn't precise enough to
/// wake exactly on the next deadline.
pub fn timer_poll_interval() -> Duration {
    std::env::var("SUPERVISORD_TIMER_POLL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(500))
}

/// Grace period between SIGTERM and SIGKILL when no per-job
/// `TimeOut` was given.
pub fn default_exit_timeout() -> Duration {
    std::env::var("SUPERVISORD_EXIT_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(20))
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub state_dir: PathBuf,
    pub control_socket: PathBuf,
    pub lock_path: PathBuf,
    pub timer_poll_interval: Duration,
    pub default_exit_timeout: Duration,
}

impl DaemonConfig {
    pub fn resolve() -> Result<Self, DaemonError> {
        let state_dir = state_dir()?;
        let control_socket = control_socket_path(&state_dir);
        let lock_path = lock_path(&state_dir);
        Ok(Self {
            state_dir,
            control_socket,
            lock_path,
            timer_poll_interval: timer_poll_interval(),
            default_exit_timeout: default_exit_timeout(),
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
