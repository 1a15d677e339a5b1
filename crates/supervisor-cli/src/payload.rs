// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builds a submission payload tree from CLI flags, using the same key
//! table the daemon's submission parser recognizes.

use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Default)]
pub struct SubmitArgs {
    pub label: String,
    pub program: Option<String>,
    pub program_arguments: Vec<String>,
    pub working_directory: Option<String>,
    pub root_directory: Option<String>,
    pub user: Option<String>,
    pub group: Option<String>,
    pub stdout_path: Option<String>,
    pub stderr_path: Option<String>,
    pub on_demand: bool,
    pub keep_alive: bool,
    pub run_at_load: bool,
    pub enable_globbing: bool,
    pub stall_before_exec: bool,
    pub nice: Option<i32>,
    pub start_interval_seconds: Option<u64>,
    pub watch_paths: Vec<String>,
    pub env: Vec<(String, String)>,
}

/// Turn a filled-out [`SubmitArgs`] into the JSON tree `supervisor_core::import`
/// expects, omitting any key whose flag wasn't given.
pub fn build_tree(args: &SubmitArgs) -> Value {
    let mut object = Map::new();
    object.insert("Label".to_string(), json!(args.label));

    if let Some(program) = &args.program {
        object.insert("Program".to_string(), json!(program));
    }
    if !args.program_arguments.is_empty() {
        object.insert("ProgramArguments".to_string(), json!(args.program_arguments));
    }
    if let Some(dir) = &args.working_directory {
        object.insert("WorkingDirectory".to_string(), json!(dir));
    }
    if let Some(dir) = &args.root_directory {
        object.insert("RootDirectory".to_string(), json!(dir));
    }
    if let Some(user) = &args.user {
        object.insert("UserName".to_string(), json!(user));
    }
    if let Some(group) = &args.group {
        object.insert("GroupName".to_string(), json!(group));
    }
    if let Some(path) = &args.stdout_path {
        object.insert("StandardOutPath".to_string(), json!(path));
    }
    if let Some(path) = &args.stderr_path {
        object.insert("StandardErrorPath".to_string(), json!(path));
    }
    if args.keep_alive {
        object.insert("KeepAlive".to_string(), json!(true));
    } else {
        object.insert("OnDemand".to_string(), json!(args.on_demand));
    }
    if args.run_at_load {
        object.insert("RunAtLoad".to_string(), json!(true));
    }
    if args.enable_globbing {
        object.insert("EnableGlobbing".to_string(), json!(true));
    }
    if args.stall_before_exec {
        object.insert("Debug".to_string(), json!(true));
    }
    if let Some(nice) = args.nice {
        object.insert("Nice".to_string(), json!(nice));
    }
    if let Some(period) = args.start_interval_seconds {
        object.insert("StartInterval".to_string(), json!(period));
    }
    if !args.watch_paths.is_empty() {
        object.insert("WatchPaths".to_string(), json!(args.watch_paths));
    }
    if !args.env.is_empty() {
        let map: Map<String, Value> = args.env.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
        object.insert("EnvironmentVariables".to_string(), Value::Object(map));
    }

    Value::Object(object)
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
