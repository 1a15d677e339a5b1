// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-instance guarantee: an exclusive advisory lock on a PID file
//! under the state directory. Acquired before anything else touches the
//! state directory so a second daemon process fails fast rather than
//! racing the first one over the control socket or job persistence.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use fs2::FileExt;

use crate::error::DaemonError;

/// An acquired lock. Held for the process lifetime; the lock (and the
/// PID it names) releases automatically when this is dropped.
pub struct LockFile {
    file: File,
}

/// Acquire the exclusive lock at `path`, writing this process's PID into
/// it once held. Fails immediately — never blocks — if another process
/// already holds it.
pub fn acquire(path: &Path) -> Result<LockFile, DaemonError> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|err| DaemonError::io("opening lock file", err))?;
    file.try_lock_exclusive().map_err(|source| DaemonError::LockHeld { path: path.to_path_buf(), source })?;

    let mut file = file;
    file.set_len(0).map_err(|err| DaemonError::io("truncating lock file", err))?;
    writeln!(file, "{}", std::process::id()).map_err(|err| DaemonError::io("writing pid to lock file", err))?;
    Ok(LockFile { file })
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
#[path = "lockfile_tests.rs"]
mod tests;
