use super::*;
use serde_json::json;

#[test]
fn rejects_empty_label() {
    let tree = json!({"Label": "", "ProgramArguments": ["/bin/true"]});
    let err = import(&tree, None).expect_err("empty label");
    assert_eq!(err.code(), ErrorCode::NotPrivileged);
}

#[test]
fn rejects_reserved_prefix_label() {
    let tree = json!({"Label": format!("{RESERVED_LABEL_PREFIX}reaper"), "ProgramArguments": ["/bin/true"]});
    assert!(import(&tree, None).is_err());
}

#[test]
fn rejects_all_numeric_label() {
    let tree = json!({"Label": "12345", "ProgramArguments": ["/bin/true"]});
    assert!(import(&tree, None).is_err());
}

#[test]
fn s2_keep_alive_bool_sets_continuous_run() {
    let tree = json!({"Label": "com.example.keepalive", "ProgramArguments": ["/bin/true"], "KeepAlive": true});
    let parsed = import(&tree, None).expect("import");
    assert!(!parsed.job.flags.on_demand);
}

#[test]
fn s3_run_at_load_with_keep_alive_false_is_one_shot() {
    let tree =
        json!({"Label": "com.example.oneshot", "ProgramArguments": ["/bin/true"], "RunAtLoad": true, "KeepAlive": false});
    let parsed = import(&tree, None).expect("import");
    assert!(parsed.job.flags.run_at_load);
    assert!(parsed.job.flags.on_demand);
}

#[test]
fn s4_calendar_interval_parses_into_calendar_source() {
    let tree = json!({
        "Label": "com.example.calendar",
        "ProgramArguments": ["/bin/true"],
        "StartCalendarInterval": {"Minute": 0, "Hour": 3},
    });
    let parsed = import(&tree, None).expect("import");
    assert_eq!(parsed.job.sources.len(), 1);
    match &parsed.job.sources[0] {
        Source::Calendar(source) => {
            assert_eq!(source.interval.minute, Some(0));
            assert_eq!(source.interval.hour, Some(3));
            assert_eq!(source.interval.mday, None);
        }
        other => panic!("expected calendar source, got {other:?}"),
    }
}

#[test]
fn s1_socket_activation_parses_descriptor_and_respects_inetd_wait() {
    let tree = json!({
        "Label": "com.example.socket",
        "ProgramArguments": ["/usr/bin/inetd-worker"],
        "OnDemand": true,
        "Sockets": {"Listener": 42},
        "inetdCompatibility": {"Wait": true},
    });
    let parsed = import(&tree, None).expect("import");
    match &parsed.job.sources[0] {
        Source::Socket(group) => {
            assert_eq!(group.descriptors, vec![42]);
            assert!(group.inetd_wait);
        }
        other => panic!("expected socket source, got {other:?}"),
    }
}

#[test]
fn unrecognized_keys_collect_as_warnings_not_errors() {
    let tree = json!({"Label": "com.example.warn", "ProgramArguments": ["/bin/true"], "TotallyMadeUpKey": 1});
    let parsed = import(&tree, None).expect("import");
    assert_eq!(parsed.warnings.len(), 1);
}

#[test]
fn resource_limits_merge_soft_and_hard_into_one_item() {
    let tree = json!({
        "Label": "com.example.limits",
        "ProgramArguments": ["/bin/true"],
        "SoftResourceLimits": {"NumberOfFiles": 256},
        "HardResourceLimits": {"NumberOfFiles": 1024},
    });
    let parsed = import(&tree, None).expect("import");
    assert_eq!(parsed.job.limits.len(), 1);
    assert_eq!(parsed.job.limits[0].soft, Some(256));
    assert_eq!(parsed.job.limits[0].hard, Some(1024));
}

#[test]
fn environment_variables_split_private_and_contributed() {
    let tree = json!({
        "Label": "com.example.env",
        "ProgramArguments": ["/bin/true"],
        "EnvironmentVariables": {"A": "1"},
        "UserEnvironmentVariables": {"B": "2"},
    });
    let parsed = import(&tree, None).expect("import");
    assert_eq!(parsed.job.environment.private.get("A"), Some(&"1".to_string()));
    assert_eq!(parsed.job.environment.contributed.get("B"), Some(&"2".to_string()));
}

#[test]
fn program_falls_back_to_first_program_argument_when_absent() {
    let tree = json!({"Label": "com.example.noprogram", "ProgramArguments": ["/bin/echo", "hi"]});
    let parsed = import(&tree, None).expect("import");
    assert_eq!(parsed.job.program, Some(PathBuf::from("/bin/echo")));
    assert!(parsed.job.is_launchable());
}

#[test]
fn service_only_job_with_mach_services_is_not_launchable() {
    let tree = json!({
        "Label": "com.example.serviceonly",
        "MachServices": {"com.example.port": true},
    });
    let parsed = import(&tree, None).expect("import");
    assert!(!parsed.job.is_launchable());
    assert_eq!(parsed.job.sources.len(), 1);
}
