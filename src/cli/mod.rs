//! CLI argument parsing and validation module
//!
//! Handles command-line interface using clap, including:
//! - Daemon control commands (init, status, pause)
//! - Configuration display and updates
//! - Log viewing
//! - The hidden entry point the spawned daemon runs

use crate::backend::Provider;
use crate::config::ConfigChanges;
use crate::constants::{APP_NAME, DAEMON_RUN_SUBCOMMAND};
use anyhow::{bail, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

/// Default number of log lines shown by `autogit logs`
pub const DEFAULT_LOG_LINES: usize = 50;

/// Parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    /// Explicit configuration directory (`--config-dir`)
    pub config_dir: Option<PathBuf>,
    pub command: CliCommand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Init,
    Status,
    Pause,
    ConfigShow,
    ConfigSet(ConfigChanges),
    Logs {
        repo: Option<String>,
        lines: usize,
        follow: bool,
    },
    StartDaemon {
        root: PathBuf,
    },
}

fn long_version() -> &'static str {
    concat!(env!("AUTOGIT_VERSION"), " (", env!("GIT_HASH"), ")")
}

/// Build the clap command tree
pub fn build_cli() -> Command {
    Command::new(APP_NAME)
        .version(env!("AUTOGIT_VERSION"))
        .long_version(long_version())
        .about("Commit and push working-tree changes with AI-generated messages")
        .long_about(
            "autogit watches a Git repository from a background daemon. On a fixed \
             interval it asks an AI provider to describe the uncommitted diff, then \
             stages, commits and pushes the changes. A failed push pauses the daemon \
             until you fix the repository and restart it.",
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config-dir")
                .long("config-dir")
                .value_name("DIR")
                .help("Configuration directory (default: $AUTOGIT_CONFIG_DIR, then the platform config dir)")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .subcommand(
            Command::new("init")
                .about("Start the daemon for the Git repository in the current directory"),
        )
        .subcommand(Command::new("status").about("Show whether the daemon is running"))
        .subcommand(
            Command::new("pause")
                .visible_alias("stop")
                .about("Stop the running daemon"),
        )
        .subcommand(
            Command::new("config")
                .about("Show or change the configuration")
                .subcommand_required(true)
                .subcommand(Command::new("show").about("Print the configuration (API key masked)"))
                .subcommand(
                    Command::new("set")
                        .about("Update configuration fields")
                        .arg(
                            Arg::new("provider")
                                .long("provider")
                                .value_name("PROVIDER")
                                .help("AI provider: gemini, openai, openrouter or anthropic")
                                .value_parser(|s: &str| s.parse::<Provider>().map_err(|e| e.to_string())),
                        )
                        .arg(
                            Arg::new("api-key")
                                .long("api-key")
                                .value_name("KEY")
                                .help("API key for the provider"),
                        )
                        .arg(
                            Arg::new("base-url")
                                .long("base-url")
                                .value_name("URL")
                                .help("Endpoint override; empty string clears it"),
                        )
                        .arg(
                            Arg::new("model")
                                .long("model")
                                .value_name("MODEL")
                                .help("Model override; empty string clears it"),
                        )
                        .arg(
                            Arg::new("interval")
                                .long("interval")
                                .value_name("MINUTES")
                                .help("Check interval in minutes")
                                .allow_negative_numbers(true)
                                .value_parser(value_parser!(i64)),
                        ),
                ),
        )
        .subcommand(
            Command::new("logs")
                .about("Show the daemon log for a repository")
                .arg(
                    Arg::new("repo")
                        .long("repo")
                        .value_name("NAME")
                        .help("Repository name (default: last initialized repository)"),
                )
                .arg(
                    Arg::new("lines")
                        .short('n')
                        .long("lines")
                        .value_name("N")
                        .help("Number of lines to show")
                        .default_value("50")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("follow")
                        .short('f')
                        .long("follow")
                        .help("Keep printing new records until interrupted")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new(DAEMON_RUN_SUBCOMMAND)
                .hide(true)
                .about("Run the daemon loop in the foreground")
                .arg(
                    Arg::new("root")
                        .value_name("ROOT")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    from_matches(&build_cli().get_matches())
}

/// Parse an explicit argument list (first element is the program name)
pub fn parse_from<I, T>(args: I) -> Result<CliArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    from_matches(&build_cli().try_get_matches_from(args)?)
}

fn from_matches(matches: &ArgMatches) -> Result<CliArgs> {
    let config_dir = matches.get_one::<PathBuf>("config-dir").cloned();

    let command = match matches.subcommand() {
        Some(("init", _)) => CliCommand::Init,
        Some(("status", _)) => CliCommand::Status,
        Some(("pause", _)) => CliCommand::Pause,
        Some(("config", sub)) => match sub.subcommand() {
            Some(("show", _)) => CliCommand::ConfigShow,
            Some(("set", set)) => {
                let changes = ConfigChanges {
                    provider: set.get_one::<Provider>("provider").copied(),
                    api_key: set.get_one::<String>("api-key").cloned(),
                    base_url: set.get_one::<String>("base-url").cloned(),
                    model: set.get_one::<String>("model").cloned(),
                    check_interval_minutes: set.get_one::<i64>("interval").copied(),
                };
                if changes.is_empty() {
                    bail!("Nothing to change. Pass at least one of --provider, --api-key, --base-url, --model, --interval");
                }
                CliCommand::ConfigSet(changes)
            }
            _ => bail!("Unknown config command"),
        },
        Some(("logs", logs)) => CliCommand::Logs {
            repo: logs.get_one::<String>("repo").cloned(),
            lines: logs
                .get_one::<usize>("lines")
                .copied()
                .unwrap_or(DEFAULT_LOG_LINES),
            follow: logs.get_flag("follow"),
        },
        Some((DAEMON_RUN_SUBCOMMAND, run)) => match run.get_one::<PathBuf>("root") {
            Some(root) => CliCommand::StartDaemon { root: root.clone() },
            None => bail!("Missing repository root"),
        },
        _ => bail!("No command given. Run 'autogit --help' for usage"),
    };

    Ok(CliArgs {
        config_dir,
        command,
    })
}
