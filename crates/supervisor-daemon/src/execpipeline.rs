// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fork/exec pipeline: turns a launchable [`Job`] into a running child,
//! with the three handshakes the reap path and the "stall before exec"
//! debugger story both depend on.
//!
//! The child-side setup order is load-bearing, not cosmetic: each step
//! can observe the effect of the one before it (`setuid` after
//! `initgroups`, `chdir` before `umask`, stdio redirection before the
//! environment is repopulated so error output from a failed `execve`
//! still lands on the configured stderr). See [`apply_child_setup`].

use std::ffi::CString;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Command;

use nix::errno::Errno;
use nix::sys::resource::{setrlimit, Resource};
use nix::sys::socket::{socketpair, AddressFamily, SockFlag, SockType};
use nix::unistd::{Gid, Group, Pid, User};
use supervisor_core::Job;

use crate::error::DaemonError;

/// A spawned child's handshake handles, owned by the parent.
pub struct SpawnedChild {
    pub pid: Pid,
    /// Parent's end of the exec-error pipe. Readable once the child
    /// either execs successfully (EOF, the fd closes on exec) or fails
    /// (one `i32` errno is written before the child exits).
    pub exec_error_pipe: OwnedFd,
    /// Parent's end of the start barrier. Write one byte to release the
    /// child once the exit watcher is installed.
    pub start_barrier: OwnedFd,
    /// Child's end of an optional IPC socketpair, handed to the child via
    /// environment variable, when the job owns sockets or services.
    pub ipc_socket: Option<OwnedFd>,
}

/// Fork and prepare a child for `job`, but do not yet release it to
/// exec. The caller (the event loop) must install a process-exit watcher
/// and a readability watcher on `exec_error_pipe`, then write to
/// `start_barrier` — unless `job.flags.stall_before_exec` is set, in
/// which case the barrier byte is withheld until an explicit uncork.
pub fn spawn(
    job: &Job,
    wants_ipc_socket: bool,
    peer_contributed: &[std::collections::BTreeMap<String, String>],
) -> Result<SpawnedChild, DaemonError> {
    let (error_read, error_write) = make_pipe()?;
    let (barrier_read, barrier_write) = make_pipe()?;
    let ipc_pair = if wants_ipc_socket {
        Some(
            socketpair(AddressFamily::Unix, SockType::Stream, None, SockFlag::empty())
                .map_err(DaemonError::Fork)?,
        )
    } else {
        None
    };

    // SAFETY: the parent only reaches this point from the single-threaded
    // event loop (§5); the child performs only the async-signal-safe
    // setup in `apply_child_setup` before exec.
    let fork_result = unsafe { nix::unistd::fork() }.map_err(DaemonError::Fork)?;

    match fork_result {
        nix::unistd::ForkResult::Parent { child } => {
            drop(error_write);
            drop(barrier_read);
            let ipc_socket = ipc_pair.map(|(parent_fd, _child_fd)| parent_fd);
            Ok(SpawnedChild { pid: child, exec_error_pipe: error_read, start_barrier: barrier_write, ipc_socket })
        }
        nix::unistd::ForkResult::Child => {
            drop(error_read);
            drop(barrier_write);
            let child_ipc = ipc_pair.map(|(_parent_fd, child_fd)| child_fd);
            // Never returns: either exec succeeds or the child reports
            // the failure on `error_write` and exits non-zero.
            exec_child(job, barrier_read, error_write, child_ipc, peer_contributed);
        }
    }
}

/// Release a stalled child: write the start-barrier byte.
pub fn release(start_barrier: &OwnedFd) -> Result<(), DaemonError> {
    write_byte(start_barrier.as_raw_fd())
}

/// Read the exec-error pipe after it becomes readable. `Ok(None)` means
/// EOF (the child's end closed on a successful `execve`, nothing was
/// written); `Ok(Some(errno))` means the child reported a failed step.
pub fn read_exec_error(pipe: &OwnedFd) -> Result<Option<i32>, DaemonError> {
    let mut buf = [0u8; 4];
    let fd = pipe.as_raw_fd();
    loop {
        match nix::unistd::read(fd, &mut buf) {
            Ok(0) => return Ok(None),
            Ok(4) => return Ok(Some(i32::from_ne_bytes(buf))),
            Ok(_) => return Err(DaemonError::MalformedPayload("short read on exec-error pipe".into())),
            Err(Errno::EINTR) => continue,
            Err(err) => return Err(DaemonError::Fork(err)),
        }
    }
}

fn make_pipe() -> Result<(OwnedFd, OwnedFd), DaemonError> {
    nix::unistd::pipe().map_err(DaemonError::Fork)
}

fn write_byte(fd: RawFd) -> Result<(), DaemonError> {
    let borrowed = unsafe { std::os::fd::BorrowedFd::borrow_raw(fd) };
    loop {
        match nix::unistd::write(borrowed, &[0u8]) {
            Ok(_) => return Ok(()),
            Err(Errno::EINTR) => continue,
            Err(err) => return Err(DaemonError::Fork(err)),
        }
    }
}

/// Runs entirely in the forked child. Never returns.
fn exec_child(
    job: &Job,
    start_barrier: OwnedFd,
    error_pipe: OwnedFd,
    _ipc_socket: Option<OwnedFd>,
    peer_contributed: &[std::collections::BTreeMap<String, String>],
) -> ! {
    if let Err(errno) = apply_child_setup(job, &start_barrier) {
        report_and_die(error_pipe, errno as i32);
    }

    let Some(program) = resolved_program(job) else {
        report_and_die(error_pipe, Errno::ENOEXEC as i32);
    };
    let argv = resolve_argv(job, &program);
    let Some(argv0) = argv.first() else {
        report_and_die(error_pipe, Errno::ENOEXEC as i32);
    };

    // Environment is re-populated just before exec so a failure in an
    // earlier step (e.g. chdir) still reports through the unmodified
    // inherited environment, matching the prescribed setup order.
    let mut command = Command::new(argv0.to_string_lossy().into_owned());
    for arg in &argv[1..] {
        command.arg(arg.to_string_lossy().into_owned());
    }
    command.env_clear();
    for (key, value) in job.environment.resolve(peer_contributed) {
        command.env(key, value);
    }

    // Best-effort: a process that is already a session leader (e.g. the
    // handful of test harnesses that spawn us directly) gets EPERM here,
    // which is not a reason to refuse to exec.
    let _ = nix::unistd::setsid();

    // `Command::exec` never returns on success; on failure it returns
    // the io::Error so we can still report it on the error pipe.
    let err = command.exec();
    report_and_die(error_pipe, err.raw_os_error().unwrap_or(-1));
}

/// `Program`, falling back to the first element of `ProgramArguments`
/// when absent.
fn resolved_program(job: &Job) -> Option<std::path::PathBuf> {
    job.program.clone().or_else(|| job.program_arguments.first().map(std::path::PathBuf::from))
}

fn apply_child_setup(job: &Job, start_barrier: &OwnedFd) -> Result<(), Errno> {
    block_until_released(start_barrier)?;

    if let Some(nice) = job.nice {
        set_priority(nice)?;
    }
    apply_rlimits(job)?;
    // `SessionCreate` maps to a login-session API with no portable POSIX
    // equivalent; the unconditional `setsid()` right before exec (see
    // `exec_child`) is the separate, always-applied step.
    // Low-priority I/O has no portable POSIX equivalent; best-effort only
    // via the nice value already applied above.
    if let Some(root) = &job.root_directory {
        nix::unistd::chroot(root.as_path())?;
    }
    if let Some(group) = &job.group {
        let gid = resolve_gid(group)?;
        nix::unistd::setgid(gid)?;
    }
    if job.flags.init_groups {
        if let Some(user) = &job.user {
            let gid = match &job.group {
                Some(group) => resolve_gid(group)?,
                None => resolve_user(user)?.gid,
            };
            let cname = CString::new(user.as_bytes()).map_err(|_| Errno::EINVAL)?;
            nix::unistd::initgroups(&cname, gid)?;
        }
    }
    if let Some(user) = &job.user {
        let uid = resolve_user(user)?.uid;
        nix::unistd::setuid(uid)?;
    }
    if let Some(dir) = &job.working_directory {
        nix::unistd::chdir(dir.as_path())?;
    }
    if let Some(mask) = job.umask {
        nix::sys::stat::umask(nix::sys::stat::Mode::from_bits_truncate(mask));
    }
    redirect_stdio(job)?;
    Ok(())
}

fn block_until_released(start_barrier: &OwnedFd) -> Result<(), Errno> {
    let mut buf = [0u8; 1];
    loop {
        match nix::unistd::read(start_barrier.as_raw_fd(), &mut buf) {
            Ok(_) => return Ok(()),
            Err(Errno::EINTR) => continue,
            Err(err) => return Err(err),
        }
    }
}

fn resolve_user(name: &str) -> Result<User, Errno> {
    User::from_name(name)?.ok_or(Errno::ENOENT)
}

fn resolve_gid(name: &str) -> Result<Gid, Errno> {
    Ok(Group::from_name(name)?.ok_or(Errno::ENOENT)?.gid)
}

fn set_priority(nice: i32) -> Result<(), Errno> {
    Errno::result(unsafe { nix::libc::setpriority(nix::libc::PRIO_PROCESS, 0, nice) }).map(|_| ())
}

fn apply_rlimits(job: &Job) -> Result<(), Errno> {
    for item in &job.limits {
        let resource = match resource_for(item.resource) {
            Some(resource) => resource,
            None => continue,
        };
        let soft = item.soft.unwrap_or(nix::libc::RLIM_INFINITY);
        let hard = item.hard.unwrap_or(nix::libc::RLIM_INFINITY);
        setrlimit(resource, soft, hard)?;
    }
    Ok(())
}

fn resource_for(id: supervisor_core::ResourceId) -> Option<Resource> {
    use supervisor_core::ResourceId;
    match id {
        ResourceId::NumberOfFiles => Some(Resource::RLIMIT_NOFILE),
        ResourceId::NumberOfProcesses => Some(Resource::RLIMIT_NPROC),
        ResourceId::CoreSize => Some(Resource::RLIMIT_CORE),
        ResourceId::Cpu => Some(Resource::RLIMIT_CPU),
        ResourceId::Data => Some(Resource::RLIMIT_DATA),
        ResourceId::FileSize => Some(Resource::RLIMIT_FSIZE),
        ResourceId::MemoryLock => Some(Resource::RLIMIT_MEMLOCK),
        ResourceId::ResidentSetSize => Some(Resource::RLIMIT_RSS),
        ResourceId::StackSize => Some(Resource::RLIMIT_STACK),
    }
}

fn redirect_stdio(job: &Job) -> Result<(), Errno> {
    if let Some(path) = &job.stdout_path {
        redirect_to(path, 1)?;
    }
    if let Some(path) = &job.stderr_path {
        redirect_to(path, 2)?;
    }
    Ok(())
}

fn redirect_to(path: &Path, target_fd: RawFd) -> Result<(), Errno> {
    use nix::fcntl::{open, OFlag};
    use nix::sys::stat::Mode;
    let fd = open(path, OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND, Mode::from_bits_truncate(0o640))?;
    nix::unistd::dup2(fd.as_raw_fd(), target_fd)?;
    Ok(())
}

/// `argv` is `ProgramArguments` verbatim (its own first element already
/// names the program) when given, or the bare program path otherwise.
/// `Program` and `ProgramArguments` are never both present in argv.
fn resolve_argv(job: &Job, program: &Path) -> Vec<CString> {
    let args: Vec<String> = if job.program_arguments.is_empty() {
        vec![program.to_string_lossy().into_owned()]
    } else if job.flags.enable_globbing {
        job.program_arguments.iter().flat_map(|raw| glob_argument(raw)).collect()
    } else {
        job.program_arguments.clone()
    };
    args.into_iter().filter_map(|arg| CString::new(arg).ok()).collect()
}

fn glob_argument(raw: &str) -> Vec<String> {
    match glob::glob(raw) {
        Ok(paths) => {
            let matches: Vec<String> =
                paths.filter_map(Result::ok).map(|path| path.to_string_lossy().into_owned()).collect();
            if matches.is_empty() {
                vec![raw.to_string()]
            } else {
                matches
            }
        }
        Err(_) => vec![raw.to_string()],
    }
}

fn report_and_die(error_pipe: OwnedFd, errno: i32) -> ! {
    let bytes = errno.to_ne_bytes();
    let _ = nix::unistd::write(&error_pipe, &bytes);
    drop(error_pipe);
    std::process::exit(127);
}

#[cfg(test)]
#[path = "execpipeline_tests.rs"]
mod tests;
