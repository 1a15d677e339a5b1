// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios exercising the job model, dispatch policy, and
//! service broker together, the way a single submission would actually
//! be driven through the daemon's event loop. Real fork/exec is used
//! where the behavior under test is the process lifecycle itself
//! (S2, S3); everything else is exercised at the state/policy layer
//! since that's where the decisions actually get made.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde_json::json;
use serial_test::serial;

use supervisor_core::source::{ArmState, SocketFamily, SocketGroup, SocketKind};
use supervisor_core::{
    dispatch, CalendarSource, DispatchAction, Job, JobArena, JobId, PredicateContext, ServiceBroker, Source,
};
use supervisor_daemon::execpipeline;

struct AlwaysUpContext;

impl PredicateContext for AlwaysUpContext {
    fn network_up(&self) -> bool {
        true
    }

    fn path_exists(&self, _path: &std::path::Path) -> bool {
        false
    }
}

fn no_queue(_service: &str) -> bool {
    false
}

/// S1: a socket-activated, on-demand job arms its source instead of
/// starting, starts exactly once a connection arrives, disarms while
/// running, and on a clean exit returns to idle with the source
/// re-armed.
#[test]
fn socket_activation_arms_starts_once_and_rearms_on_exit() {
    let tree = json!({
        "Label": "com.example.socket-activated",
        "Program": "/usr/libexec/echo-server",
        "OnDemand": true,
        "Sockets": { "Listener": 42 },
    });
    let parsed = supervisor_core::import(&tree, None).expect("import");
    let mut arena = JobArena::new();
    let id = arena.insert(parsed.job);

    let ctx = AlwaysUpContext;
    let action = dispatch(arena.get(id).unwrap(), false, &ctx, &no_queue);
    assert_eq!(action, DispatchAction::ArmSources, "no connection yet, nothing armed");

    {
        let job = arena.get_mut(id).unwrap();
        for source in &mut job.sources {
            source.mark_armed();
        }
        assert!(job.has_armed_source());
    }

    // A connection arrives on the armed socket: the event loop disarms
    // the source and starts the job.
    {
        let job = arena.get_mut(id).unwrap();
        for source in &mut job.sources {
            source.mark_unarmed();
        }
        job.record_start(4242, 1_000);
        job.mark_checked_in();
    }
    assert_eq!(dispatch(arena.get(id).unwrap(), false, &ctx, &no_queue), DispatchAction::AlreadyActive);
    assert!(!arena.get(id).unwrap().has_armed_source(), "source stays disarmed while running");

    // The job exits cleanly; reap releases it back to idle and the
    // source is re-armed for the next connection.
    {
        let job = arena.get_mut(id).unwrap();
        job.record_exit(0, 11_000);
        for source in &mut job.sources {
            source.mark_armed();
        }
    }
    let job = arena.get(id).unwrap();
    assert_eq!(job.last_exit_status, Some(0));
    assert_eq!(dispatch(job, false, &ctx, &no_queue), DispatchAction::ArmSources);
    assert!(job.has_armed_source());
}

/// S2: an always-restart job that exits too quickly, over and over,
/// gets torn down once it accumulates ten failed exits in a row.
#[test]
#[serial]
fn keep_alive_job_is_removed_after_repeated_fast_failures() {
    let tree = json!({
        "Label": "com.example.flaky",
        "Program": "/bin/false",
        "KeepAlive": true,
    });
    let parsed = supervisor_core::import(&tree, None).expect("import");
    assert!(parsed.job.flags.keep_alive_always);
    assert!(!parsed.job.flags.on_demand);

    let mut arena = JobArena::new();
    let id = arena.insert(parsed.job);
    let ctx = AlwaysUpContext;

    for attempt in 0..10 {
        assert_eq!(
            dispatch(arena.get(id).unwrap(), false, &ctx, &no_queue),
            DispatchAction::Start,
            "attempt {attempt} should still want to run"
        );

        let job = arena.get(id).unwrap().clone();
        let spawned = execpipeline::spawn(&job, false, &[]).expect("spawn");
        execpipeline::release(&spawned.start_barrier).expect("release");
        let status = nix::sys::wait::waitpid(spawned.pid, None).expect("waitpid");
        let exit_code = match status {
            nix::sys::wait::WaitStatus::Exited(_, code) => code,
            other => panic!("unexpected wait status: {other:?}"),
        };
        assert_eq!(exit_code, 1, "/bin/false always exits 1");

        let job = arena.get_mut(id).unwrap();
        job.record_start(spawned.pid.as_raw() as u32, 0);
        let outcome = supervisor_daemon::reap::reap(job, exit_code, 100, false, &ctx, &no_queue);

        if attempt < 9 {
            assert_ne!(outcome, supervisor_daemon::reap::ReapOutcome::Remove, "attempt {attempt}");
        } else {
            assert_eq!(outcome, supervisor_daemon::reap::ReapOutcome::Remove, "tenth failure should remove the job");
        }
    }

    assert_eq!(arena.get(id).unwrap().failed_exits, 10);
}

/// S3: `RunAtLoad` with `KeepAlive: false` starts exactly once and
/// never restarts, regardless of what the child exits with.
#[test]
#[serial]
fn run_at_load_one_shot_starts_once_and_stays_idle() {
    let tree = json!({
        "Label": "com.example.one-shot",
        "Program": "/bin/true",
        "RunAtLoad": true,
        "KeepAlive": false,
    });
    let parsed = supervisor_core::import(&tree, None).expect("import");
    let mut arena = JobArena::new();
    let id = arena.insert(parsed.job);
    let ctx = AlwaysUpContext;

    assert_eq!(dispatch(arena.get(id).unwrap(), false, &ctx, &no_queue), DispatchAction::Start);

    let job = arena.get(id).unwrap().clone();
    let spawned = execpipeline::spawn(&job, false, &[]).expect("spawn");
    execpipeline::release(&spawned.start_barrier).expect("release");
    let status = nix::sys::wait::waitpid(spawned.pid, None).expect("waitpid");
    assert!(matches!(status, nix::sys::wait::WaitStatus::Exited(_, 0)));

    let job = arena.get_mut(id).unwrap();
    job.record_start(spawned.pid.as_raw() as u32, 0);
    job.record_exit(0, 20_000);
    job.dispatch = supervisor_core::dispatch::DispatchState::Idle;

    let job = arena.get(id).unwrap();
    assert_eq!(job.last_exit_status, Some(0));
    assert_eq!(
        dispatch(job, false, &ctx, &no_queue),
        DispatchAction::ArmSources,
        "RunAtLoad only fires once; never_started is false the second time around"
    );
}

/// S4: a `StartCalendarInterval` armed at 02:59:30 fires at 03:00:00,
/// fires exactly once, and its next occurrence lands the following day
/// at the same time.
#[test]
fn calendar_source_fires_once_a_day_at_the_configured_time() {
    let interval = supervisor_core::CalendarInterval { minute: Some(0), hour: Some(3), mday: None, weekday: None, month: None };
    let mut source = CalendarSource::new(interval);

    let armed_at = NaiveDate::from_ymd_opt(2026, 7, 26).unwrap().and_hms_opt(2, 59, 30).unwrap();
    let fire = source.recompute(armed_at).expect("a daily 03:00 schedule always has a next fire");
    assert_eq!(fire, NaiveDate::from_ymd_opt(2026, 7, 26).unwrap().and_hms_opt(3, 0, 0).unwrap());
    assert!(!source.is_due(armed_at));
    assert!(source.is_due(fire));

    let next = source.recompute(fire).expect("next occurrence exists");
    assert_eq!(next, NaiveDate::from_ymd_opt(2026, 7, 27).unwrap().and_hms_opt(3, 0, 0).unwrap());
}

/// S5: a service registered in a child bootstrap context is not visible
/// from the root, and the root's own services are not visible by name
/// collision from the child (lookup only walks up, never down or
/// sideways).
#[test]
fn service_lookup_only_walks_toward_the_root() {
    let root_owner = JobId::new();
    let mut broker = ServiceBroker::new(root_owner);
    let root = broker.root();

    broker.create_service(root, "s1", root_owner).expect("create s1 on root");

    let child_owner = JobId::new();
    let requestor = supervisor_core::RequestorToken(1);
    let child = broker.subset(root, child_owner, requestor).expect("subset");
    broker.create_service(child, "s2", child_owner).expect("create s2 on child");

    let found = broker.look_up(child, "s1").expect("child sees root's service");
    assert_eq!(found.context, root);

    assert!(broker.look_up(root, "s2").is_none(), "root must not see the child's service");
}

/// S6: when a subset context's requestor dies, the whole subset
/// collapses and anything registered in it becomes unreachable from
/// anywhere, including the root.
#[test]
fn dead_requestor_collapses_its_subset_and_hides_its_services() {
    let root_owner = JobId::new();
    let mut broker = ServiceBroker::new(root_owner);
    let root = broker.root();

    let child_owner = JobId::new();
    let requestor = supervisor_core::RequestorToken(7);
    let child = broker.subset(root, child_owner, requestor).expect("subset");
    broker.create_service(child, "s", child_owner).expect("create s on child");
    assert!(broker.look_up(child, "s").is_some());

    let collapsed = broker.on_dead_name(requestor);
    assert_eq!(collapsed, vec![child]);

    assert!(broker.context(child).is_none(), "subset context itself is gone");
    assert!(broker.look_up(root, "s").is_none(), "its service is invisible from anywhere now");
}

/// A job with no activation sources and neither `RunAtLoad` nor
/// `KeepAlive` just sits idle forever; dispatch should never invent a
/// reason to start it.
#[test]
fn a_purely_on_demand_job_with_no_sources_never_starts_itself() {
    let job = Job::builder().program(PathBuf::from("/bin/true")).build();
    let ctx = AlwaysUpContext;
    assert_eq!(dispatch(&job, false, &ctx, &no_queue), DispatchAction::ArmSources);
}

/// Sanity check that a freshly constructed socket source starts
/// unarmed — the event loop is responsible for arming it once it has
/// actually bound or inherited the descriptor.
#[test]
fn a_freshly_parsed_socket_source_starts_unarmed() {
    let group = SocketGroup::new("Listener", SocketFamily::Unix, SocketKind::Stream);
    assert_eq!(group.arm_state, ArmState::Unarmed);
    assert_eq!(Source::Socket(group).kind(), "socket");
}
