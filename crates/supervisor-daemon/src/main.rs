// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `superviserd`: the privileged process-supervisor daemon binary.

use supervisor_core::JobId;
use supervisor_daemon::{accept_loop, bind_control_socket, lockfile, DaemonConfig, EventLoop, SupervisorState};
use tokio::sync::mpsc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "superviserd exiting");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), supervisor_daemon::DaemonError> {
    let config = DaemonConfig::resolve()?;
    std::fs::create_dir_all(&config.state_dir)
        .map_err(|err| supervisor_daemon::DaemonError::StateDirCreate { path: config.state_dir.clone(), source: err })?;

    // Acquire the lock before anything else touches the state directory;
    // a held lock means another instance owns the control socket.
    let _lock = lockfile::acquire(&config.lock_path)?;

    let listener = bind_control_socket(&config).await?;
    tracing::info!(path = %config.control_socket.display(), "control socket bound");

    let state = SupervisorState::new(JobId::new());
    let (command_tx, command_rx) = mpsc::channel(256);

    tokio::spawn(accept_loop(listener, command_tx));

    let event_loop = EventLoop::new(state, config, command_rx);
    event_loop.run().await
}
