#![forbid(unsafe_code)]

use anyhow::{bail, Context, Result};
use autogit::cli::{self, CliCommand};
use autogit::config::ConfigChanges;
use autogit::control;
use autogit::daemon::{self, ProcessSupervisor};
use autogit::git::repo_name;
use autogit::output;
use autogit::store::StateStore;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Poll period for `logs --follow`
const FOLLOW_POLL: Duration = Duration::from_millis(500);

fn main() -> Result<()> {
    let args = cli::parse_args()?;
    let store = StateStore::resolve(args.config_dir);

    match args.command {
        CliCommand::Init => run_init(&store),
        CliCommand::Status => run_status(&store),
        CliCommand::Pause => run_pause(&store),
        CliCommand::ConfigShow => run_config_show(&store),
        CliCommand::ConfigSet(changes) => run_config_set(&store, &changes),
        CliCommand::Logs {
            repo,
            lines,
            follow,
        } => run_logs(&store, repo, lines, follow),
        CliCommand::StartDaemon { root } => run_daemon(store, root),
    }
}

fn run_init(store: &StateStore) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let descriptor = control::init(store, &ProcessSupervisor::new(), &cwd)?;

    let interval = store.load_effective_config()?.poll_interval();
    println!("{}", output::format_started(&descriptor, interval.as_secs() / 60));
    Ok(())
}

fn run_status(store: &StateStore) -> Result<()> {
    let report = control::status(store, &ProcessSupervisor::new())?;
    println!("{}", output::format_status(&report));
    Ok(())
}

fn run_pause(store: &StateStore) -> Result<()> {
    let descriptor = control::pause(store, &ProcessSupervisor::new())?;
    println!("{}", output::format_stopped(&descriptor));
    Ok(())
}

fn run_config_show(store: &StateStore) -> Result<()> {
    let config = store.load_config()?;
    println!("{}", output::format_config(&config, &store.config_path()));
    Ok(())
}

fn run_config_set(store: &StateStore, changes: &ConfigChanges) -> Result<()> {
    let config = control::reconfigure(store, changes)?;
    println!("{}", output::format_config(&config, &store.config_path()));

    if let Ok(autogit::models::DaemonReport::Alive(_)) =
        control::status(store, &ProcessSupervisor::new())
    {
        println!("Note: the running daemon keeps its old settings until restarted (autogit pause && autogit init).");
    }
    Ok(())
}

fn run_logs(store: &StateStore, repo: Option<String>, lines: usize, follow: bool) -> Result<()> {
    let name = match repo {
        Some(name) => name,
        None => match store.load_config()?.root_path {
            Some(root) => repo_name(&root),
            None => bail!("No repository has been initialized. Pass --repo NAME"),
        },
    };

    let path = store.log_path(&name);
    if !path.exists() {
        bail!("No log file for '{}' at {}", name, path.display());
    }

    for line in output::tail_lines(&path, lines)? {
        println!("{}", output::format_log_line(&line));
    }

    if follow {
        follow_log(&path)?;
    }
    Ok(())
}

fn follow_log(path: &std::path::Path) -> Result<()> {
    // Set up interrupt handling
    let interrupted = Arc::new(AtomicBool::new(false));
    let _ = signal_hook::flag::register(signal_hook::consts::SIGINT, interrupted.clone());
    let _ = signal_hook::flag::register(signal_hook::consts::SIGTERM, interrupted.clone());

    let mut file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    file.seek(SeekFrom::End(0))?;
    let mut reader = BufReader::new(file);
    let mut pending = String::new();

    while !interrupted.load(Ordering::Relaxed) {
        if reader.read_line(&mut pending)? == 0 {
            std::thread::sleep(FOLLOW_POLL);
            continue;
        }
        // Hold partial records until the daemon finishes writing them
        if pending.ends_with('\n') {
            println!("{}", output::format_log_line(pending.trim_end()));
            pending.clear();
        }
    }
    Ok(())
}

fn run_daemon(store: StateStore, root: PathBuf) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(daemon::run_daemon_process(store, root))
}
