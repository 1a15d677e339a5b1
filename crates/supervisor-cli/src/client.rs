// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A thin client over the daemon's control socket: write one submission
//! payload, read back one JSON response, done. The daemon's side of this
//! contract lives in `supervisor_daemon::event_loop::handle_connection`.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not connect to the control socket at {path}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error talking to the daemon: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed response from the daemon: {0}")]
    MalformedResponse(String),

    #[error("daemon rejected the submission: {0}")]
    Rejected(String),
}

pub struct SubmitOutcome {
    pub job_id: String,
    pub warnings: Vec<String>,
}

/// Connect to the control socket, send `tree`, and parse the response.
pub async fn submit(socket_path: &Path, tree: &Value) -> Result<SubmitOutcome, ClientError> {
    let mut stream = UnixStream::connect(socket_path)
        .await
        .map_err(|source| ClientError::Connect { path: socket_path.to_path_buf(), source })?;

    let bytes = serde_json::to_vec(tree).map_err(|err| ClientError::MalformedResponse(err.to_string()))?;
    stream.write_all(&bytes).await?;
    stream.shutdown().await?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    let parsed: Value =
        serde_json::from_slice(&response).map_err(|err| ClientError::MalformedResponse(err.to_string()))?;

    let ok = parsed.get("ok").and_then(Value::as_bool).unwrap_or(false);
    if !ok {
        let error = parsed.get("error").and_then(Value::as_str).unwrap_or("unknown error").to_string();
        return Err(ClientError::Rejected(error));
    }

    let job_id = parsed
        .get("job_id")
        .and_then(Value::as_str)
        .ok_or_else(|| ClientError::MalformedResponse("response missing job_id".to_string()))?
        .to_string();
    let warnings = parsed
        .get("warnings")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    Ok(SubmitOutcome { job_id, warnings })
}

/// Ask the daemon to stop (and optionally unload) the job named `label`.
pub async fn stop(socket_path: &Path, label: &str, unload: bool) -> Result<(), ClientError> {
    let mut stream = UnixStream::connect(socket_path)
        .await
        .map_err(|source| ClientError::Connect { path: socket_path.to_path_buf(), source })?;

    let request = serde_json::json!({"op": "stop", "label": label, "unload": unload});
    let bytes = serde_json::to_vec(&request).map_err(|err| ClientError::MalformedResponse(err.to_string()))?;
    stream.write_all(&bytes).await?;
    stream.shutdown().await?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    let parsed: Value =
        serde_json::from_slice(&response).map_err(|err| ClientError::MalformedResponse(err.to_string()))?;

    let ok = parsed.get("ok").and_then(Value::as_bool).unwrap_or(false);
    if !ok {
        let error = parsed.get("error").and_then(Value::as_str).unwrap_or("unknown error").to_string();
        return Err(ClientError::Rejected(error));
    }
    Ok(())
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
