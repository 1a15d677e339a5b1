// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `svctl`: submits job descriptions to a running `superviserd` over its
//! control socket, either built from flags or read whole from a JSON file.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod payload;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use payload::SubmitArgs;
use supervisor_daemon::DaemonConfig;

#[derive(Parser)]
#[command(name = "svctl", version, about = "Submit and inspect jobs on a running superviserd")]
struct Cli {
    /// Path to the daemon's control socket. Defaults to the same
    /// resolution superviserd itself uses (SUPERVISORD_STATE_DIR, then
    /// XDG state dir, then ~/.local/state/supervisord).
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a job built from flags.
    Submit(SubmitCliArgs),
    /// Submit a job described by a JSON file.
    Load {
        /// Path to a JSON submission tree.
        path: PathBuf,
    },
    /// Stop a running job.
    Stop {
        /// Label of the job to stop.
        label: String,
        /// Remove the job instead of leaving it eligible for restart.
        #[arg(long)]
        unload: bool,
    },
}

#[derive(Args)]
struct SubmitCliArgs {
    /// Unique label for the job.
    label: String,

    /// Program to exec. Defaults to the first `ProgramArguments` entry
    /// when omitted.
    #[arg(long)]
    program: Option<String>,

    /// Arguments passed to the program, in order. Repeat to add more.
    #[arg(long = "arg")]
    program_arguments: Vec<String>,

    #[arg(long)]
    working_directory: Option<String>,
    #[arg(long)]
    root_directory: Option<String>,
    #[arg(long)]
    user: Option<String>,
    #[arg(long)]
    group: Option<String>,
    #[arg(long)]
    stdout_path: Option<String>,
    #[arg(long)]
    stderr_path: Option<String>,

    /// Only run in response to an activation source (the default).
    #[arg(long, conflicts_with = "keep_alive")]
    on_demand: bool,
    /// Restart unconditionally on every exit.
    #[arg(long)]
    keep_alive: bool,
    /// Start once as soon as the daemon admits the job.
    #[arg(long)]
    run_at_load: bool,
    /// Expand glob patterns in `ProgramArguments` before exec.
    #[arg(long)]
    enable_globbing: bool,
    /// Withhold the exec barrier for debugger attach.
    #[arg(long)]
    stall_before_exec: bool,

    #[arg(long)]
    nice: Option<i32>,
    #[arg(long)]
    start_interval_seconds: Option<u64>,

    /// Path to watch for changes; repeat for more than one.
    #[arg(long = "watch-path")]
    watch_paths: Vec<String>,

    /// `KEY=VALUE` environment entry contributed to the job; repeat.
    #[arg(long = "env", value_parser = parse_key_value)]
    env: Vec<(String, String)>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))
}

impl From<SubmitCliArgs> for SubmitArgs {
    fn from(args: SubmitCliArgs) -> Self {
        SubmitArgs {
            label: args.label,
            program: args.program,
            program_arguments: args.program_arguments,
            working_directory: args.working_directory,
            root_directory: args.root_directory,
            user: args.user,
            group: args.group,
            stdout_path: args.stdout_path,
            stderr_path: args.stderr_path,
            on_demand: !args.keep_alive,
            keep_alive: args.keep_alive,
            run_at_load: args.run_at_load,
            enable_globbing: args.enable_globbing,
            stall_before_exec: args.stall_before_exec,
            nice: args.nice,
            start_interval_seconds: args.start_interval_seconds,
            watch_paths: args.watch_paths,
            env: args.env,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("svctl: {err}");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let socket_path = match cli.socket {
        Some(path) => path,
        None => DaemonConfig::resolve()?.control_socket,
    };

    let tree = match cli.command {
        Command::Submit(args) => payload::build_tree(&SubmitArgs::from(args)),
        Command::Load { path } => {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        }
        Command::Stop { label, unload } => {
            client::stop(&socket_path, &label, unload).await?;
            println!("{} {label}", if unload { "unloaded" } else { "stopped" });
            return Ok(());
        }
    };

    let outcome = client::submit(&socket_path, &tree).await?;
    println!("submitted {}", outcome.job_id);
    for warning in outcome.warnings {
        eprintln!("warning: {warning}");
    }
    Ok(())
}
