// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The unified event loop: one task owns [`SupervisorState`] outright
//! (§5 — "single-threaded, cooperative, event-loop driven... all state
//! is owned by the loop thread"). Socket connections are accepted and
//! parsed on their own tasks, but every request that would touch
//! `SupervisorState` crosses back over an [`mpsc`] channel and is
//! handled serially here. The three suspension points the design allows
//! beyond the main wait — fork, exec-error reads, path `stat` calls —
//! are pushed onto `spawn_blocking` tasks that report back the same way
//! a socket connection does, so the loop itself never blocks.

use std::collections::HashMap;
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};
use std::path::{Path, PathBuf};

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use supervisor_core::{ArmState, DispatchAction, JobId, Source};
use tokio::net::UnixListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::config::DaemonConfig;
use crate::error::DaemonError;
use crate::execpipeline::{self, SpawnedChild};
use crate::reap::ReapOutcome;
use crate::supervisor::SupervisorState;

/// A request crossing from a connection-handling task into the loop.
pub enum Command {
    Submit { tree: serde_json::Value, parent: Option<JobId>, respond: oneshot::Sender<Result<(JobId, Vec<String>), DaemonError>> },
    /// Send the termination signal to a running job, and if `unload` is
    /// set, remove it outright instead of letting the dispatch policy
    /// consider it for restart once it exits.
    Stop { label: String, unload: bool, respond: oneshot::Sender<Result<(), DaemonError>> },
    Shutdown,
}

/// Reported back from the blocking task reading a child's exec-error
/// pipe: `errno = None` means the child execed successfully.
struct ExecOutcome {
    job_id: JobId,
    errno: Option<i32>,
}

/// Reported back from the SIGCHLD-driven reap sweep.
struct ChildExit {
    pid: Pid,
    exit_code: i32,
}

/// Where a job being stopped sits in the SIGTERM -> SIGKILL escalation.
enum StopPhase {
    TermSent(u64),
    KillSent,
}

pub struct EventLoop {
    state: SupervisorState,
    config: DaemonConfig,
    command_rx: mpsc::Receiver<Command>,
    exec_outcome_rx: mpsc::Receiver<ExecOutcome>,
    exec_outcome_tx: mpsc::Sender<ExecOutcome>,
    /// Children whose start barrier has been released but whose PID
    /// mapping is still needed by the SIGCHLD sweep.
    active_children: HashMap<Pid, JobId>,
    /// Jobs currently being torn down, and how far along the escalation
    /// from SIGTERM to SIGKILL they are.
    stopping: HashMap<JobId, StopPhase>,
    /// Filesystem watcher backing `WatchPaths`/`QueueDirectories`
    /// sources. `None` if the watcher couldn't be created; those
    /// sources then simply never fire.
    watcher: Option<RecommendedWatcher>,
    /// Reverse index from a watched path to the jobs armed on it, so a
    /// single filesystem event can be fanned out and the watcher can be
    /// told to stop watching once the last job referencing a path is
    /// gone.
    watched_paths: HashMap<PathBuf, Vec<JobId>>,
    watch_event_rx: mpsc::Receiver<PathBuf>,
}

impl EventLoop {
    pub fn new(state: SupervisorState, config: DaemonConfig, command_rx: mpsc::Receiver<Command>) -> Self {
        let (exec_outcome_tx, exec_outcome_rx) = mpsc::channel(64);
        let (watch_event_tx, watch_event_rx) = mpsc::channel(64);
        let watcher = build_watcher(watch_event_tx);
        Self {
            state,
            config,
            command_rx,
            exec_outcome_rx,
            exec_outcome_tx,
            active_children: HashMap::new(),
            stopping: HashMap::new(),
            watcher,
            watched_paths: HashMap::new(),
            watch_event_rx,
        }
    }

    pub async fn run(mut self) -> Result<(), DaemonError> {
        let mut tick = tokio::time::interval(self.config.timer_poll_interval);
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .map_err(|err| DaemonError::io("installing SIGTERM handler", err))?;
        let mut sigchld = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::child())
            .map_err(|err| DaemonError::io("installing SIGCHLD handler", err))?;
        let (child_exit_tx, mut child_exit_rx) = mpsc::channel::<ChildExit>(64);

        loop {
            if self.state.is_shutting_down() && self.active_children.is_empty() {
                info!("shutdown complete, no children remain");
                return Ok(());
            }

            tokio::select! {
                Some(command) = self.command_rx.recv() => {
                    self.handle_command(command);
                }
                Some(outcome) = self.exec_outcome_rx.recv() => {
                    self.handle_exec_outcome(outcome);
                }
                Some(exit) = child_exit_rx.recv() => {
                    self.handle_child_exit(exit);
                }
                Some(path) = self.watch_event_rx.recv() => {
                    self.handle_watch_event(&path);
                }
                _ = sigchld.recv() => {
                    self.drain_sigchld(&child_exit_tx);
                }
                _ = sigterm.recv() => {
                    info!("SIGTERM received, beginning graceful shutdown");
                    self.state.begin_shutdown();
                    self.run_dispatch_cycle();
                }
                _ = tick.tick() => {
                    self.check_socket_sources();
                    self.check_timer_sources();
                    self.check_stop_escalation();
                    self.run_dispatch_cycle();
                }
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit { tree, parent, respond } => {
                let result = self.state.submit(&tree, parent);
                if let Err(err) = &result {
                    warn!(error = %err, "submission rejected");
                }
                let _ = respond.send(result);
            }
            Command::Stop { label, unload, respond } => {
                let result = self.request_stop(&label, unload);
                let _ = respond.send(result);
            }
            Command::Shutdown => {
                self.state.begin_shutdown();
            }
        }
    }

    /// Operator-initiated stop: look the job up by label, deliver
    /// SIGTERM if it's running, and either let the dispatch policy
    /// reconsider it or, with `unload`, remove it outright once idle.
    fn request_stop(&mut self, label: &str, unload: bool) -> Result<(), DaemonError> {
        let Some(job_id) = self.state.arena.find_by_label(label).map(|job| job.id) else {
            return Err(DaemonError::UnknownJob { label: label.to_string() });
        };
        if unload {
            if let Some(job) = self.state.arena.get_mut(job_id) {
                job.flags.unload_at_exit = true;
            }
        }
        let is_running = self.state.arena.get(job_id).is_some_and(|job| job.is_running());
        if is_running {
            self.signal_stop(job_id, Signal::SIGTERM);
        } else if unload {
            self.state.arena.mark_for_removal(job_id);
            self.sweep_and_log();
        }
        Ok(())
    }

    /// Send `signal` to a job's child, recording it as mid-stop so the
    /// tick handler knows to escalate if it outlives the exit timeout.
    /// A no-op if the job isn't running or is already past this phase.
    fn signal_stop(&mut self, job_id: JobId, signal: Signal) {
        if matches!(self.stopping.get(&job_id), Some(StopPhase::KillSent)) {
            return;
        }
        let Some(pid) = self.state.arena.get(job_id).and_then(|job| job.pid) else { return };
        match kill(Pid::from_raw(pid as i32), signal) {
            Ok(()) => {
                let phase = if signal == Signal::SIGKILL {
                    StopPhase::KillSent
                } else {
                    StopPhase::TermSent(current_time_epoch_ms())
                };
                self.stopping.insert(job_id, phase);
            }
            Err(err) => {
                error!(job = %job_id, pid, ?signal, error = %err, "failed to signal job");
            }
        }
    }

    /// Escalate any job that's been sitting at SIGTERM longer than the
    /// configured exit timeout.
    fn check_stop_escalation(&mut self) {
        let timeout_ms = self.config.default_exit_timeout.as_millis() as u64;
        let now = current_time_epoch_ms();
        let due: Vec<JobId> = self
            .stopping
            .iter()
            .filter_map(|(job_id, phase)| match phase {
                StopPhase::TermSent(sent_at) if now.saturating_sub(*sent_at) >= timeout_ms => Some(*job_id),
                _ => None,
            })
            .collect();
        for job_id in due {
            warn!(job = %job_id, "exit timeout elapsed, escalating to SIGKILL");
            self.signal_stop(job_id, Signal::SIGKILL);
        }
    }

    fn drain_sigchld(&self, child_exit_tx: &mpsc::Sender<ChildExit>) {
        loop {
            match waitpid(None, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) | Ok(WaitStatus::Continued(_)) => break,
                Ok(WaitStatus::Exited(pid, code)) => {
                    let _ = child_exit_tx.try_send(ChildExit { pid, exit_code: code });
                }
                Ok(WaitStatus::Signaled(pid, signal, _)) => {
                    let _ = child_exit_tx.try_send(ChildExit { pid, exit_code: -(signal as i32) });
                }
                Ok(_) => continue,
                Err(nix::errno::Errno::ECHILD) => break,
                Err(err) => {
                    error!(error = %err, "waitpid failed");
                    break;
                }
            }
        }
    }

    fn handle_child_exit(&mut self, exit: ChildExit) {
        let Some(job_id) = self.active_children.remove(&exit.pid) else {
            return;
        };
        self.stopping.remove(&job_id);
        self.disarm_sources(job_id);
        self.notify_mach_no_senders(job_id);
        let now = current_time_epoch_ms();
        if let Some(outcome) = self.state.reap(job_id, exit.exit_code, now) {
            self.apply_reap_outcome(job_id, outcome);
        }
        self.sweep_and_log();
    }

    fn handle_exec_outcome(&mut self, outcome: ExecOutcome) {
        if let Some(errno) = outcome.errno {
            error!(job = %outcome.job_id, errno, "exec failed, removing job");
            self.state.arena.mark_for_removal(outcome.job_id);
            self.sweep_and_log();
        }
    }

    fn apply_reap_outcome(&mut self, job_id: JobId, outcome: ReapOutcome) {
        match outcome {
            ReapOutcome::Remove => {}
            ReapOutcome::Throttled { .. } => {}
            ReapOutcome::Dispatch(DispatchAction::Start) => self.start_job(job_id),
            ReapOutcome::Dispatch(_) => {}
        }
    }

    fn run_dispatch_cycle(&mut self) {
        let actions = self.state.dispatch_all();
        for (job_id, action) in actions {
            match action {
                DispatchAction::Start => self.start_job(job_id),
                DispatchAction::Remove => {
                    self.disarm_sources(job_id);
                    self.state.arena.mark_for_removal(job_id);
                }
                DispatchAction::ArmSources => self.arm_sources(job_id),
                DispatchAction::Stop => self.signal_stop(job_id, Signal::SIGTERM),
                DispatchAction::AlreadyActive => {}
            }
        }
        self.sweep_and_log();
    }

    /// Register every unarmed activation source a job owns with the
    /// event loop, so the next tick (or filesystem event) can turn it
    /// into a `Start`.
    fn arm_sources(&mut self, job_id: JobId) {
        let now_dt = current_naive_datetime();
        let watch_paths: Vec<PathBuf> = {
            let Some(job) = self.state.arena.get_mut(job_id) else { return };
            let mut paths = Vec::new();
            for source in &mut job.sources {
                if source.arm_state() == ArmState::Armed {
                    continue;
                }
                if let Source::Calendar(calendar) = source {
                    calendar.recompute(now_dt);
                }
                if let Source::Watch(watch) = source {
                    paths.push(watch.path().to_path_buf());
                }
                source.mark_armed();
            }
            paths
        };
        for path in watch_paths {
            self.watch_path(job_id, path);
        }
    }

    /// Unregister a job's sources (called once it starts running, or is
    /// removed) so a sibling's fs watch isn't kept alive on its behalf
    /// forever and stale entries don't pile up in `watched_paths`.
    fn disarm_sources(&mut self, job_id: JobId) {
        let watch_paths: Vec<PathBuf> = {
            let Some(job) = self.state.arena.get_mut(job_id) else { return };
            let mut paths = Vec::new();
            for source in &mut job.sources {
                if let Source::Watch(watch) = source {
                    paths.push(watch.path().to_path_buf());
                }
                source.mark_unarmed();
            }
            paths
        };
        for path in watch_paths {
            self.unwatch_path(job_id, &path);
        }
    }

    fn watch_path(&mut self, job_id: JobId, path: PathBuf) {
        let first_watcher = !self.watched_paths.contains_key(&path);
        self.watched_paths.entry(path.clone()).or_default().push(job_id);
        if first_watcher {
            if let Some(watcher) = &mut self.watcher {
                if let Err(err) = watcher.watch(&path, RecursiveMode::NonRecursive) {
                    warn!(path = %path.display(), error = %err, "failed to watch path");
                }
            }
        }
    }

    fn unwatch_path(&mut self, job_id: JobId, path: &Path) {
        let Some(jobs) = self.watched_paths.get_mut(path) else { return };
        jobs.retain(|id| *id != job_id);
        if jobs.is_empty() {
            self.watched_paths.remove(path);
            if let Some(watcher) = &mut self.watcher {
                let _ = watcher.unwatch(path);
            }
        }
    }

    /// A filesystem event fired on an armed `WatchPaths`/`QueueDirectories`
    /// source: start whichever jobs registered this exact path, and
    /// re-dispatch every job whose `KeepAlive.PathState` predicate
    /// watches it so a restart on one side of the predicate doesn't
    /// starve a sibling waiting on the opposite condition.
    fn handle_watch_event(&mut self, path: &Path) {
        if self.state.is_shutting_down() {
            return;
        }
        let predicate_targets = self.state.jobs_watching_path(path);
        if !predicate_targets.is_empty() {
            info!(path = %path.display(), affected = predicate_targets.len(), "path predicate re-dispatch triggered");
        }
        if let Some(job_ids) = self.watched_paths.get(path).cloned() {
            for job_id in job_ids {
                if self.state.arena.get(job_id).is_some_and(|job| !job.is_running()) {
                    info!(job = %job_id, path = %path.display(), "watch path activation fired");
                    self.start_job(job_id);
                }
            }
        }
        self.run_dispatch_cycle();
    }

    /// Non-blocking readability check over every armed `Sockets`
    /// descriptor. A job with at least one ready descriptor is started;
    /// the child inherits the listening descriptors and is responsible
    /// for accepting on them itself.
    fn check_socket_sources(&mut self) {
        if self.state.is_shutting_down() {
            return;
        }
        let mut owners: Vec<JobId> = Vec::new();
        let mut poll_fds: Vec<PollFd<'_>> = Vec::new();
        for job in self.state.arena.iter() {
            if job.is_running() {
                continue;
            }
            for source in &job.sources {
                let Source::Socket(group) = source else { continue };
                if group.arm_state != ArmState::Armed {
                    continue;
                }
                for &fd in &group.descriptors {
                    // SAFETY: `fd` is a descriptor owned by this job's
                    // `SocketGroup` for as long as the job exists; the
                    // arena borrow above outlives this poll call.
                    let borrowed: BorrowedFd<'_> = unsafe { BorrowedFd::borrow_raw(fd as RawFd) };
                    poll_fds.push(PollFd::new(borrowed, PollFlags::POLLIN));
                    owners.push(job.id);
                }
            }
        }
        if poll_fds.is_empty() {
            return;
        }
        match poll(&mut poll_fds, PollTimeout::from(0u16)) {
            Ok(0) => {}
            Ok(_) => {
                let mut ready: Vec<JobId> = Vec::new();
                for (index, pfd) in poll_fds.iter().enumerate() {
                    let is_ready = pfd.revents().is_some_and(|events| events.contains(PollFlags::POLLIN));
                    if is_ready && !ready.contains(&owners[index]) {
                        ready.push(owners[index]);
                    }
                }
                for job_id in ready {
                    info!(job = %job_id, "socket activation fired");
                    self.start_job(job_id);
                }
            }
            Err(err) => warn!(error = %err, "poll on armed socket descriptors failed"),
        }
    }

    /// Due-check every armed `StartCalendarInterval`/`StartInterval`
    /// source and start the jobs that fired.
    fn check_timer_sources(&mut self) {
        if self.state.is_shutting_down() {
            return;
        }
        let now_ms = current_time_epoch_ms();
        let now_dt = current_naive_datetime();
        let due: Vec<JobId> = self
            .state
            .arena
            .iter()
            .filter(|job| !job.is_running())
            .filter(|job| {
                job.sources.iter().any(|source| match source {
                    Source::Calendar(calendar) => calendar.arm_state == ArmState::Armed && calendar.is_due(now_dt),
                    Source::Interval(interval) => interval.arm_state == ArmState::Armed && interval.is_due(now_ms),
                    _ => false,
                })
            })
            .map(|job| job.id)
            .collect();

        for job_id in &due {
            if let Some(job) = self.state.arena.get_mut(*job_id) {
                for source in &mut job.sources {
                    match source {
                        Source::Calendar(calendar) if calendar.is_due(now_dt) => {
                            calendar.recompute(now_dt);
                        }
                        Source::Interval(interval) if interval.is_due(now_ms) => {
                            interval.record_fire(now_ms);
                        }
                        _ => {}
                    }
                }
            }
        }
        for job_id in due {
            info!(job = %job_id, "timer activation fired");
            self.start_job(job_id);
        }
    }

    /// At child exit, tell the broker that every `MachServices` name
    /// this job owned just lost its last (in-process) sender, and
    /// re-dispatch if any of them reports the owning job should run
    /// again. This only covers services registered directly in the
    /// root bootstrap context; no submission path builds subset
    /// contexts for running jobs today.
    fn notify_mach_no_senders(&mut self, job_id: JobId) {
        let mach_names: Vec<String> = self
            .state
            .arena
            .get(job_id)
            .map(|job| {
                job.sources
                    .iter()
                    .filter_map(|s| if let Source::Mach(m) = s { Some(m.name.clone()) } else { None })
                    .collect()
            })
            .unwrap_or_default();
        if mach_names.is_empty() {
            return;
        }
        let root = self.state.broker.root();
        let mut should_redispatch = false;
        for name in mach_names {
            if self.state.broker.on_no_senders(root, &name) {
                should_redispatch = true;
            }
        }
        if should_redispatch {
            self.run_dispatch_cycle();
        }
    }

    fn start_job(&mut self, job_id: JobId) {
        self.disarm_sources(job_id);
        let Some(job) = self.state.arena.get(job_id).cloned() else { return };
        let wants_ipc = job.is_launchable() && !job.sources.is_empty();
        let peer_contributed = self.state.peer_contributed_environment(job_id);

        let spawned = match execpipeline::spawn(&job, wants_ipc, &peer_contributed) {
            Ok(spawned) => spawned,
            Err(err) => {
                error!(job = %job_id, error = %err, "fork failed, job stays idle with sources re-armed");
                return;
            }
        };

        self.active_children.insert(spawned.pid, job_id);
        if let Some(target) = self.state.arena.get_mut(job_id) {
            target.record_start(spawned.pid.as_raw() as u32, current_time_epoch_ms());
        }

        self.watch_exec_pipe(job_id, &spawned);

        // `stall_before_exec` intentionally withholds the barrier byte;
        // an operator-facing "uncork" command (outside this loop's
        // scope today) would call `execpipeline::release` later using
        // the same fd. Since nothing retains it in that case, the child
        // stays parked until this process exits and closes the pipe.
        if !job.flags.stall_before_exec {
            if let Err(err) = execpipeline::release(&spawned.start_barrier) {
                error!(job = %job_id, error = %err, "failed to release start barrier");
            }
        }
    }

    fn watch_exec_pipe(&self, job_id: JobId, spawned: &SpawnedChild) {
        let pipe_fd = spawned.exec_error_pipe.as_raw_fd();
        let tx = self.exec_outcome_tx.clone();
        // SAFETY: `pipe_fd` stays valid for the duration of the blocking
        // read below; the owning `OwnedFd` is kept alive in `start_job`
        // via `SpawnedChild` until this task observes EOF or an error.
        let duplicated = unsafe { OwnedFd::from_raw_fd(nix::unistd::dup(pipe_fd).unwrap_or(-1)) };
        tokio::task::spawn_blocking(move || {
            if duplicated.as_raw_fd() < 0 {
                return;
            }
            let errno = execpipeline::read_exec_error(&duplicated).unwrap_or(None);
            let _ = tx.blocking_send(ExecOutcome { job_id, errno });
        });
    }

    fn sweep_and_log(&mut self) {
        let removed = self.state.sweep();
        for job in &removed {
            info!(job = %job.id, label = %job.label, "job removed");
        }
    }
}

/// Build the filesystem watcher and a bridging thread that forwards
/// events onto the Tokio side: `notify`'s callback runs on a thread of
/// its own choosing, which can't touch the event loop's channel
/// directly, so a small relay thread owns the std-mpsc receiving end
/// and blocking-sends each changed path across.
fn build_watcher(tokio_tx: mpsc::Sender<PathBuf>) -> Option<RecommendedWatcher> {
    let (std_tx, std_rx) = std::sync::mpsc::channel::<notify::Result<notify::Event>>();
    let watcher = match notify::recommended_watcher(move |res| {
        let _ = std_tx.send(res);
    }) {
        Ok(watcher) => watcher,
        Err(err) => {
            warn!(error = %err, "failed to create filesystem watcher; WatchPaths sources are disabled");
            return None;
        }
    };
    std::thread::spawn(move || {
        for result in std_rx {
            let Ok(event) = result else { continue };
            if !matches!(
                event.kind,
                notify::EventKind::Create(_) | notify::EventKind::Modify(_) | notify::EventKind::Remove(_)
            ) {
                continue;
            }
            for path in event.paths {
                if tokio_tx.blocking_send(path).is_err() {
                    return;
                }
            }
        }
    });
    Some(watcher)
}

fn current_time_epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn current_naive_datetime() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

pub async fn bind_control_socket(config: &DaemonConfig) -> Result<UnixListener, DaemonError> {
    if config.control_socket.exists() {
        std::fs::remove_file(&config.control_socket)
            .map_err(|err| DaemonError::io("removing stale control socket", err))?;
    }
    if let Some(parent) = config.control_socket.parent() {
        std::fs::create_dir_all(parent).map_err(|err| DaemonError::StateDirCreate { path: parent.to_path_buf(), source: err })?;
    }
    UnixListener::bind(&config.control_socket).map_err(|err| DaemonError::io("binding control socket", err))
}

/// Accept loop for the control socket: each connection reads a single
/// JSON request, forwards it into the loop as a [`Command`], and writes
/// the result back. Runs on its own task; never touches `SupervisorState`
/// directly.
pub async fn accept_loop(listener: UnixListener, command_tx: mpsc::Sender<Command>) {
    loop {
        let (stream, _addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                error!(error = %err, "control socket accept failed");
                continue;
            }
        };
        let command_tx = command_tx.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, command_tx).await {
                warn!(error = %err, "connection handling failed");
            }
        });
    }
}

/// The wire contract is a single JSON object per connection. An `"op"`
/// field selects a non-submission command (today, only `"stop"`);
/// anything else — including every earlier submission payload, which
/// never carried an envelope — is treated as a bare submission tree.
async fn handle_connection(stream: tokio::net::UnixStream, command_tx: mpsc::Sender<Command>) -> Result<(), DaemonError> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    let mut stream = stream;
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.map_err(|err| DaemonError::io("reading submission", err))?;
    let request: serde_json::Value =
        serde_json::from_slice(&buf).map_err(|err| DaemonError::MalformedPayload(err.to_string()))?;

    let payload = match request.get("op").and_then(serde_json::Value::as_str) {
        Some("stop") => handle_stop_request(&request, &command_tx).await?,
        _ => handle_submit_request(request, &command_tx).await?,
    };

    let bytes = serde_json::to_vec(&payload).map_err(|err| DaemonError::MalformedPayload(err.to_string()))?;
    stream.write_all(&bytes).await.map_err(|err| DaemonError::io("writing response", err))?;
    Ok(())
}

async fn handle_submit_request(
    tree: serde_json::Value,
    command_tx: &mpsc::Sender<Command>,
) -> Result<serde_json::Value, DaemonError> {
    let (respond, response) = oneshot::channel();
    command_tx
        .send(Command::Submit { tree, parent: None, respond })
        .await
        .map_err(|_| DaemonError::MalformedPayload("event loop is no longer accepting submissions".into()))?;
    let result = response.await.map_err(|_| DaemonError::MalformedPayload("event loop dropped the response".into()))?;

    Ok(match result {
        Ok((job_id, warnings)) => serde_json::json!({"ok": true, "job_id": job_id.to_string(), "warnings": warnings}),
        Err(err) => serde_json::json!({"ok": false, "error": err.to_string()}),
    })
}

async fn handle_stop_request(
    request: &serde_json::Value,
    command_tx: &mpsc::Sender<Command>,
) -> Result<serde_json::Value, DaemonError> {
    let label = request
        .get("label")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| DaemonError::MalformedPayload("stop request missing 'label'".into()))?
        .to_string();
    let unload = request.get("unload").and_then(serde_json::Value::as_bool).unwrap_or(false);

    let (respond, response) = oneshot::channel();
    command_tx
        .send(Command::Stop { label, unload, respond })
        .await
        .map_err(|_| DaemonError::MalformedPayload("event loop is no longer accepting commands".into()))?;
    let result = response.await.map_err(|_| DaemonError::MalformedPayload("event loop dropped the response".into()))?;

    Ok(match result {
        Ok(()) => serde_json::json!({"ok": true}),
        Err(err) => serde_json::json!({"ok": false, "error": err.to_string()}),
    })
}

#[cfg(test)]
#[path = "event_loop_tests.rs"]
mod tests;
