use super::*;
use serial_test::serial;
use std::path::PathBuf;
use supervisor_core::{Job, LimitItem, ResourceId};

#[test]
fn resolve_argv_falls_back_to_program_path_with_no_arguments() {
    let job = Job::builder().program(PathBuf::from("/bin/true")).build();
    let argv = resolve_argv(&job, &PathBuf::from("/bin/true"));
    assert_eq!(argv.len(), 1);
    assert_eq!(argv[0].to_str().unwrap(), "/bin/true");
}

#[test]
fn resolve_argv_uses_program_arguments_verbatim_without_globbing() {
    let job = Job::builder()
        .program(PathBuf::from("/bin/echo"))
        .program_arguments(vec!["/bin/echo".to_string(), "*.rs".to_string()])
        .build();
    let argv = resolve_argv(&job, &PathBuf::from("/bin/echo"));
    let rendered: Vec<&str> = argv.iter().map(|s| s.to_str().unwrap()).collect();
    assert_eq!(rendered, vec!["/bin/echo", "*.rs"]);
}

#[test]
fn resolve_argv_falls_back_to_program_path_when_program_arguments_is_only_the_program_itself() {
    let job = Job::builder()
        .program(PathBuf::from("/bin/sleep"))
        .program_arguments(vec!["/bin/sleep".to_string()])
        .build();
    let argv = resolve_argv(&job, &PathBuf::from("/bin/sleep"));
    assert_eq!(argv.len(), 1);
    assert_eq!(argv[0].to_str().unwrap(), "/bin/sleep");
}

#[test]
fn resolved_program_falls_back_to_first_program_argument() {
    let job = Job::builder().program_arguments(vec!["/bin/echo".to_string(), "hi".to_string()]).build();
    assert_eq!(resolved_program(&job), Some(PathBuf::from("/bin/echo")));
}

#[test]
fn glob_argument_passes_through_literal_with_no_match() {
    let expanded = glob_argument("/no/such/path/*.nonexistent-ext");
    assert_eq!(expanded, vec!["/no/such/path/*.nonexistent-ext".to_string()]);
}

#[test]
fn resource_for_maps_every_resource_id() {
    assert_eq!(resource_for(ResourceId::NumberOfFiles), Some(Resource::RLIMIT_NOFILE));
    assert_eq!(resource_for(ResourceId::Cpu), Some(Resource::RLIMIT_CPU));
    assert_eq!(resource_for(ResourceId::StackSize), Some(Resource::RLIMIT_STACK));
}

#[test]
#[serial]
fn spawn_and_reap_a_real_child() {
    let job = Job::builder().program(PathBuf::from("/bin/true")).build();
    let spawned = spawn(&job, false, &[]).expect("spawn");
    release(&spawned.start_barrier).expect("release");

    let status = nix::sys::wait::waitpid(spawned.pid, None).expect("waitpid");
    assert!(matches!(status, nix::sys::wait::WaitStatus::Exited(_, 0)));
    let exec_error = read_exec_error(&spawned.exec_error_pipe).expect("read exec error");
    assert_eq!(exec_error, None);
}

#[test]
#[serial]
fn exec_failure_is_reported_on_the_error_pipe() {
    let job = Job::builder().program(PathBuf::from("/no/such/executable-binary")).build();
    let spawned = spawn(&job, false, &[]).expect("spawn");
    release(&spawned.start_barrier).expect("release");

    let _status = nix::sys::wait::waitpid(spawned.pid, None).expect("waitpid");
    let exec_error = read_exec_error(&spawned.exec_error_pipe).expect("read exec error");
    assert!(exec_error.is_some());
}

#[test]
#[serial]
fn limits_with_a_generous_soft_value_apply_to_the_current_process() {
    // Raising or leaving NOFILE's soft value well above any fd count this
    // test binary could be holding avoids disturbing other tests that
    // happen to run in the same process before this one is reaped.
    let job = Job::builder()
        .program(PathBuf::from("/bin/true"))
        .limits(vec![LimitItem { resource: ResourceId::NumberOfFiles, soft: Some(4096), hard: None }])
        .build();
    assert!(apply_rlimits(&job).is_ok());
}
