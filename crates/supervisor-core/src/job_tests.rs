use super::*;

#[test]
fn service_only_job_is_not_launchable() {
    let job = Job::builder().build();
    assert!(!job.is_launchable());
}

#[test]
fn job_with_program_arguments_is_launchable() {
    let job = Job::builder().program_arguments(vec!["/bin/true".to_string()]).build();
    assert!(job.is_launchable());
}

#[test]
fn record_start_then_record_exit_round_trips_pid_and_timestamps() {
    let mut job = Job::builder().build();
    job.record_start(4242, 1_000);
    assert_eq!(job.pid, Some(4242));
    assert!(job.is_running());

    job.record_exit(0, 1_500);
    assert_eq!(job.pid, None);
    assert_eq!(job.last_exit, LastExit::Success);
    assert_eq!(job.failed_exits, 0);
}

#[test]
fn record_exit_with_nonzero_status_increments_failed_exits() {
    let mut job = Job::builder().build();
    job.record_start(1, 0);
    job.record_exit(1, 100);
    assert_eq!(job.failed_exits, 1);
    assert_eq!(job.last_exit, LastExit::Failed);
}

#[test]
fn record_exit_short_of_reward_duration_keeps_accumulating_failed_exits() {
    let mut job = Job::builder().failed_exits(3).build();
    job.record_start(1, 0);
    job.record_exit(1, crate::constants::MIN_RUN_SECONDS * 1000);
    assert_eq!(job.failed_exits, 4);
}

#[test]
fn record_exit_after_reward_duration_resets_failed_exits_even_on_failure() {
    let mut job = Job::builder().failed_exits(7).build();
    job.record_start(1, 0);
    job.record_exit(1, crate::constants::REWARD_RUN_SECONDS * 1000);
    assert_eq!(job.failed_exits, 0);
}

#[test]
fn record_start_resets_checked_in() {
    let mut job = Job::builder().build();
    job.checked_in = true;
    job.record_start(1, 0);
    assert!(!job.checked_in);
    job.mark_checked_in();
    assert!(job.checked_in);
}

#[test]
fn record_exit_terminated_by_sigterm_does_not_count_as_a_failure() {
    let mut job = Job::builder().failed_exits(3).build();
    job.record_start(1, 0);
    job.record_exit(-15, 100);
    assert_eq!(job.failed_exits, 0);
    assert_eq!(job.last_exit, LastExit::Failed);
}

#[test]
fn record_exit_terminated_by_sigkill_does_not_count_as_a_failure() {
    let mut job = Job::builder().failed_exits(3).build();
    job.record_start(1, 0);
    job.record_exit(-9, 100);
    assert_eq!(job.failed_exits, 0);
}

#[test]
fn record_exit_terminated_by_other_signal_still_counts_as_a_failure() {
    let mut job = Job::builder().build();
    job.record_start(1, 0);
    job.record_exit(-11, 100);
    assert_eq!(job.failed_exits, 1);
}

#[test]
fn record_exit_on_a_legacy_job_never_increments_failed_exits() {
    let mut job = Job::builder().flags(JobFlags { legacy_mach_job: true, ..Default::default() }).build();
    job.record_start(1, 0);
    job.record_exit(1, 100);
    assert_eq!(job.failed_exits, 0);
    assert_eq!(job.last_exit, LastExit::Failed);
}

#[test]
fn has_armed_source_reflects_any_armed_member() {
    let mut job = Job::builder().sources(vec![Source::Interval(crate::source::StartInterval::new(30))]).build();
    assert!(!job.has_armed_source());
    job.sources[0].mark_armed();
    assert!(job.has_armed_source());
}
