// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parses a job submission payload (§6's key table) into a [`Job`].
//! The payload itself is a language-neutral tree; we represent it as
//! `serde_json::Value` since the on-disk/wire job-file parser producing
//! that tree is an external collaborator. Unknown keys are logged as
//! warnings and otherwise ignored, never rejected.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::Value;
use tracing::warn;

use crate::constants::RESERVED_LABEL_PREFIX;
use crate::cron::CalendarInterval;
use crate::error::{ErrorCode, SupervisorError};
use crate::job::{Job, JobFlags, JobId};
use crate::keepalive::KeepAlivePredicate;
use crate::limits::{EnvironmentSet, LimitItem, ResourceId};
use crate::source::{
    CalendarSource, MachServiceSource, SocketFamily, SocketGroup, SocketKind, Source, StartInterval, WatchPath,
};

pub struct ParsedSubmission {
    pub job: Job,
    pub warnings: Vec<String>,
}

const RECOGNIZED_KEYS: &[&str] = &[
    "Label",
    "Program",
    "ProgramArguments",
    "RootDirectory",
    "WorkingDirectory",
    "UserName",
    "GroupName",
    "StandardInPath",
    "StandardOutPath",
    "StandardErrorPath",
    "EnvironmentVariables",
    "UserEnvironmentVariables",
    "KeepAlive",
    "OnDemand",
    "RunAtLoad",
    "Debug",
    "SessionCreate",
    "LowPriorityIO",
    "InitGroups",
    "EnableGlobbing",
    "WaitForDebugger",
    "ForcePowerPC",
    "Nice",
    "TimeOut",
    "Umask",
    "StartInterval",
    "SoftResourceLimits",
    "HardResourceLimits",
    "StartCalendarInterval",
    "WatchPaths",
    "QueueDirectories",
    "Sockets",
    "MachServices",
    "inetdCompatibility",
];

/// §4.3 `import(tree) -> Job | error`.
pub fn import(tree: &Value, parent: Option<JobId>) -> Result<ParsedSubmission, SupervisorError> {
    let object = tree.as_object().ok_or_else(|| {
        SupervisorError::invalid_input("submission payload must be an object", ErrorCode::NotPrivileged)
    })?;

    let mut warnings = Vec::new();
    for key in object.keys() {
        if !RECOGNIZED_KEYS.contains(&key.as_str()) {
            warnings.push(format!("unrecognized submission key '{key}' ignored"));
            warn!(key, "unrecognized submission key ignored");
        }
    }

    let label = object.get("Label").and_then(Value::as_str).unwrap_or_default().to_string();
    validate_label(&label)?;

    let program_arguments = string_array(object.get("ProgramArguments"));
    // `Program` absent falls back to the first element of `ProgramArguments`.
    let program = object
        .get("Program")
        .and_then(Value::as_str)
        .map(PathBuf::from)
        .or_else(|| program_arguments.first().map(PathBuf::from));

    let mut flags = JobFlags {
        on_demand: true,
        ..Default::default()
    };
    if let Some(v) = object.get("OnDemand").and_then(Value::as_bool) {
        flags.on_demand = v;
    }
    if let Some(v) = object.get("RunAtLoad").and_then(Value::as_bool) {
        flags.run_at_load = v;
    }
    flags.stall_before_exec = object.get("Debug").and_then(Value::as_bool).unwrap_or(false);
    flags.session_create = object.get("SessionCreate").and_then(Value::as_bool).unwrap_or(false);
    flags.low_priority_io = object.get("LowPriorityIO").and_then(Value::as_bool).unwrap_or(false);
    flags.init_groups = object.get("InitGroups").and_then(Value::as_bool).unwrap_or(false);
    flags.enable_globbing = object.get("EnableGlobbing").and_then(Value::as_bool).unwrap_or(false);
    flags.wait_for_debugger = object.get("WaitForDebugger").and_then(Value::as_bool).unwrap_or(false);
    // ForcePowerPC is a recognized legacy key with no modern equivalent; parsed and discarded.

    let mut keep_alive = Vec::new();
    if let Some(ka) = object.get("KeepAlive") {
        match ka {
            Value::Bool(true) => {
                flags.on_demand = false;
                flags.keep_alive_always = true;
            }
            Value::Bool(false) => {}
            Value::Object(dict) => {
                if let Some(up) = dict.get("NetworkState").and_then(Value::as_bool) {
                    keep_alive.push(if up { KeepAlivePredicate::NetworkUp } else { KeepAlivePredicate::NetworkDown });
                }
                if let Some(ok) = dict.get("SuccessfulExit").and_then(Value::as_bool) {
                    keep_alive.push(if ok { KeepAlivePredicate::SuccessfulExit } else { KeepAlivePredicate::FailedExit });
                }
                if let Some(Value::Object(paths)) = dict.get("PathState") {
                    for (path, want_exists) in paths {
                        let Some(want_exists) = want_exists.as_bool() else { continue };
                        let path = PathBuf::from(path);
                        keep_alive.push(if want_exists {
                            KeepAlivePredicate::PathExists(path)
                        } else {
                            KeepAlivePredicate::PathMissing(path)
                        });
                    }
                }
            }
            _ => {}
        }
    }

    let nice = object.get("Nice").and_then(Value::as_i64).map(|n| n as i32);
    let exit_timeout_seconds = object.get("TimeOut").and_then(Value::as_u64).map(|n| n as u32);
    let umask = object.get("Umask").and_then(Value::as_u64).map(|n| n as u32);

    let environment = parse_environment(object);
    let limits = parse_limits(object);
    let mut sources = parse_calendar_sources(object);
    sources.extend(parse_watch_sources(object));
    sources.extend(parse_socket_sources(object, &mut warnings));
    if let Some(period) = object.get("StartInterval").and_then(Value::as_u64) {
        sources.push(Source::Interval(StartInterval::new(period)));
    }
    sources.extend(parse_mach_sources(object, &mut warnings));
    apply_inetd_compatibility(object, &mut sources);

    let job = Job {
        id: JobId::new(),
        label,
        program,
        program_arguments,
        working_directory: object.get("WorkingDirectory").and_then(Value::as_str).map(PathBuf::from),
        root_directory: object.get("RootDirectory").and_then(Value::as_str).map(PathBuf::from),
        user: object.get("UserName").and_then(Value::as_str).map(String::from),
        group: object.get("GroupName").and_then(Value::as_str).map(String::from),
        umask,
        nice,
        exit_timeout_seconds,
        throttle_interval_seconds: None,
        stdout_path: object.get("StandardOutPath").and_then(Value::as_str).map(PathBuf::from),
        stderr_path: object.get("StandardErrorPath").and_then(Value::as_str).map(PathBuf::from),
        environment,
        limits,
        sources,
        keep_alive,
        flags,
        parent,
        children: Vec::new(),
        dispatch: crate::dispatch::DispatchState::Idle,
        checked_in: false,
        pid: None,
        last_exit: crate::keepalive::LastExit::Unknown,
        last_exit_status: None,
        started_at_epoch_ms: None,
        failed_exits: 0,
        throttled_until_epoch_ms: None,
    };

    Ok(ParsedSubmission { job, warnings })
}

fn validate_label(label: &str) -> Result<(), SupervisorError> {
    if label.is_empty() {
        return Err(SupervisorError::invalid_input("label must not be empty", ErrorCode::NotPrivileged));
    }
    if label.starts_with(RESERVED_LABEL_PREFIX) {
        return Err(SupervisorError::invalid_input(
            "label uses the reserved vendor prefix",
            ErrorCode::NotPrivileged,
        ));
    }
    if label.chars().all(|c| c.is_ascii_digit()) {
        return Err(SupervisorError::invalid_input("label must not be purely numeric", ErrorCode::NotPrivileged));
    }
    Ok(())
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default()
}

fn parse_environment(object: &serde_json::Map<String, Value>) -> EnvironmentSet {
    let mut environment = EnvironmentSet::default();
    if let Some(Value::Object(vars)) = object.get("EnvironmentVariables") {
        for (k, v) in vars {
            if let Some(v) = v.as_str() {
                environment.private.insert(k.clone(), v.to_string());
            }
        }
    }
    if let Some(Value::Object(vars)) = object.get("UserEnvironmentVariables") {
        for (k, v) in vars {
            if let Some(v) = v.as_str() {
                environment.contributed.insert(k.clone(), v.to_string());
            }
        }
    }
    environment
}

fn resource_id_from_key(key: &str) -> Option<ResourceId> {
    match key {
        "CPU" => Some(ResourceId::Cpu),
        "FileSize" => Some(ResourceId::FileSize),
        "Data" => Some(ResourceId::Data),
        "Stack" => Some(ResourceId::StackSize),
        "Core" => Some(ResourceId::CoreSize),
        "ResidentSetSize" => Some(ResourceId::ResidentSetSize),
        "MemoryLock" => Some(ResourceId::MemoryLock),
        "NumberOfProcesses" => Some(ResourceId::NumberOfProcesses),
        "NumberOfFiles" => Some(ResourceId::NumberOfFiles),
        _ => None,
    }
}

fn parse_limits(object: &serde_json::Map<String, Value>) -> Vec<LimitItem> {
    let mut by_resource: BTreeMap<ResourceId, LimitItem> = BTreeMap::new();
    let mut apply = |key: &str, soft: bool| {
        if let Some(Value::Object(dict)) = object.get(key) {
            for (name, value) in dict {
                let Some(resource) = resource_id_from_key(name) else { continue };
                let Some(value) = value.as_u64() else { continue };
                let entry = by_resource.entry(resource).or_insert(LimitItem { resource, soft: None, hard: None });
                if soft {
                    entry.soft = Some(value);
                } else {
                    entry.hard = Some(value);
                }
            }
        }
    };
    apply("SoftResourceLimits", true);
    apply("HardResourceLimits", false);
    by_resource.into_values().collect()
}

fn parse_calendar_interval(dict: &serde_json::Map<String, Value>) -> CalendarInterval {
    let field = |key: &str| dict.get(key).and_then(Value::as_i64).filter(|v| *v >= 0).map(|v| v as u32);
    CalendarInterval {
        minute: field("Minute"),
        hour: field("Hour"),
        mday: field("Day"),
        weekday: field("Weekday"),
        month: field("Month"),
    }
}

fn parse_calendar_sources(object: &serde_json::Map<String, Value>) -> Vec<Source> {
    let mut sources = Vec::new();
    match object.get("StartCalendarInterval") {
        Some(Value::Object(dict)) => {
            sources.push(Source::Calendar(CalendarSource::new(parse_calendar_interval(dict))));
        }
        Some(Value::Array(entries)) => {
            for entry in entries {
                if let Some(dict) = entry.as_object() {
                    sources.push(Source::Calendar(CalendarSource::new(parse_calendar_interval(dict))));
                }
            }
        }
        _ => {}
    }
    sources
}

fn parse_watch_sources(object: &serde_json::Map<String, Value>) -> Vec<Source> {
    let mut sources = Vec::new();
    for path in string_array(object.get("WatchPaths")) {
        sources.push(Source::Watch(WatchPath::new(path)));
    }
    for path in string_array(object.get("QueueDirectories")) {
        let mut watch = WatchPath::new(path);
        watch.is_queue_directory = true;
        sources.push(Source::Watch(watch));
    }
    sources
}

fn parse_socket_sources(object: &serde_json::Map<String, Value>, warnings: &mut Vec<String>) -> Vec<Source> {
    let mut sources = Vec::new();
    let Some(Value::Object(dict)) = object.get("Sockets") else { return sources };
    for (name, value) in dict {
        let mut group = SocketGroup::new(name.clone(), SocketFamily::Unix, SocketKind::Stream);
        match value {
            Value::Number(n) => {
                if let Some(fd) = n.as_i64() {
                    group.descriptors.push(fd as i32);
                }
            }
            Value::Array(items) => {
                for item in items {
                    if let Some(fd) = item.as_i64() {
                        group.descriptors.push(fd as i32);
                    }
                }
            }
            _ => warnings.push(format!("socket entry '{name}' has an unrecognized shape and was skipped")),
        }
        sources.push(Source::Socket(group));
    }
    sources
}

fn parse_mach_sources(object: &serde_json::Map<String, Value>, warnings: &mut Vec<String>) -> Vec<Source> {
    let mut sources = Vec::new();
    let Some(Value::Object(dict)) = object.get("MachServices") else { return sources };
    for (name, value) in dict {
        let mut source = MachServiceSource::new(name.clone());
        match value {
            Value::Bool(_) => {}
            Value::Object(options) => {
                source.reset_on_close = options.get("ResetAtClose").and_then(Value::as_bool).unwrap_or(false);
                source.hide_until_check_in =
                    options.get("HideUntilCheckIn").and_then(Value::as_bool).unwrap_or(false);
                if options.contains_key("TaskSpecialPort") || options.contains_key("HostSpecialPort") {
                    warnings.push(format!(
                        "MachServices entry '{name}' requests a special port; not supported and ignored"
                    ));
                }
            }
            _ => warnings.push(format!("MachServices entry '{name}' has an unrecognized shape and was skipped")),
        }
        sources.push(Source::Mach(source));
    }
    sources
}

fn apply_inetd_compatibility(object: &serde_json::Map<String, Value>, sources: &mut [Source]) {
    let Some(Value::Object(dict)) = object.get("inetdCompatibility") else { return };
    let wait = dict.get("Wait").and_then(Value::as_bool).unwrap_or(false);
    for source in sources.iter_mut() {
        if let Source::Socket(group) = source {
            group.inetd_wait = wait;
        }
    }
}

#[cfg(test)]
#[path = "submission_tests.rs"]
mod tests;
