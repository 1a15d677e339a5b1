use super::*;
use crate::job::JobFlags;
use crate::keepalive::KeepAlivePredicate;

struct TestCtx {
    network_up: bool,
}

impl PredicateContext for TestCtx {
    fn network_up(&self) -> bool {
        self.network_up
    }
    fn path_exists(&self, _path: &std::path::Path) -> bool {
        false
    }
}

fn no_queue(_: &str) -> bool {
    false
}

#[test]
fn useless_when_unload_at_exit_and_already_exited() {
    let mut job = Job::builder().flags(JobFlags { unload_at_exit: true, ..Default::default() }).build();
    assert!(!useless(&job, false));
    job.last_exit = LastExit::Success;
    assert!(useless(&job, false));
}

#[test]
fn useless_when_shutting_down() {
    let job = Job::builder().build();
    assert!(useless(&job, true));
}

#[test]
fn useless_when_failed_exits_at_threshold() {
    let job = Job::builder().failed_exits(crate::constants::FAILED_EXITS_THRESHOLD).build();
    assert!(useless(&job, false));
}

#[test]
fn useless_when_sources_never_checked_in_after_exit() {
    let mut job =
        Job::builder().sources(vec![Source::Interval(crate::source::StartInterval::new(30))]).build();
    job.last_exit = LastExit::Success;
    job.checked_in = false;
    assert!(useless(&job, false));
    job.checked_in = true;
    assert!(!useless(&job, false));
}

#[test]
fn keepalive_true_on_run_at_load_before_first_start() {
    let job = Job::builder().flags(JobFlags { run_at_load: true, on_demand: true, ..Default::default() }).build();
    let ctx = TestCtx { network_up: false };
    assert!(keepalive(&job, &ctx, &no_queue));
}

#[test]
fn keepalive_true_when_not_on_demand() {
    let job = Job::builder().flags(JobFlags { on_demand: false, ..Default::default() }).build();
    let ctx = TestCtx { network_up: false };
    assert!(keepalive(&job, &ctx, &no_queue));
}

#[test]
fn keepalive_false_when_on_demand_and_no_predicate_satisfied() {
    let job = Job::builder().flags(JobFlags { on_demand: true, ..Default::default() }).build();
    let ctx = TestCtx { network_up: false };
    assert!(!keepalive(&job, &ctx, &no_queue));
}

#[test]
fn keepalive_true_when_network_predicate_satisfied() {
    let job = Job::builder()
        .flags(JobFlags { on_demand: true, ..Default::default() })
        .keep_alive(vec![KeepAlivePredicate::NetworkUp])
        .build();
    let ctx = TestCtx { network_up: true };
    assert!(keepalive(&job, &ctx, &no_queue));
}

#[test]
fn dispatch_prefers_already_active_over_everything_else() {
    let mut job = Job::builder().failed_exits(crate::constants::FAILED_EXITS_THRESHOLD).build();
    job.dispatch = DispatchState::Running;
    job.pid = Some(123);
    let ctx = TestCtx { network_up: false };
    assert_eq!(dispatch(&job, false, &ctx, &no_queue), DispatchAction::AlreadyActive);
}

#[test]
fn dispatch_removes_useless_before_considering_keepalive() {
    let job = Job::builder().failed_exits(crate::constants::FAILED_EXITS_THRESHOLD).build();
    let ctx = TestCtx { network_up: false };
    assert_eq!(dispatch(&job, false, &ctx, &no_queue), DispatchAction::Remove);
}

#[test]
fn dispatch_starts_when_keepalive_true() {
    let job = Job::builder().flags(JobFlags { on_demand: false, ..Default::default() }).build();
    let ctx = TestCtx { network_up: false };
    assert_eq!(dispatch(&job, false, &ctx, &no_queue), DispatchAction::Start);
}

#[test]
fn dispatch_stops_a_running_job_once_shutting_down() {
    let mut job = Job::builder().flags(JobFlags { keep_alive_always: true, on_demand: false, ..Default::default() }).build();
    job.dispatch = DispatchState::Running;
    job.pid = Some(123);
    let ctx = TestCtx { network_up: false };
    assert_eq!(dispatch(&job, true, &ctx, &no_queue), DispatchAction::Stop);
}

#[test]
fn dispatch_arms_sources_otherwise() {
    let job = Job::builder().flags(JobFlags { on_demand: true, ..Default::default() }).build();
    let ctx = TestCtx { network_up: false };
    assert_eq!(dispatch(&job, false, &ctx, &no_queue), DispatchAction::ArmSources);
}
