#![forbid(unsafe_code)]

//! playback — agent playground session viewer.
//!
//! CLI entry point: parses arguments, dispatches subcommands, renders output.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use playback::client::HttpPlaygroundApi;
use playback::error::NO_MESSAGES_FOUND;
use playback::loader::SessionLoader;
use playback::model::{
    CanonicalMessage, MessageRole, RawSessionRecord, SessionSummary, epoch_secs,
};
use playback::normalize::{classify, normalize_record, now_epoch_secs};
use playback::notify::{NoticeKind, Notifier};
use playback::store::MemoryStore;

/// Load and normalize agent playground session history.
///
/// Fetches sessions from a playground service (or reads a saved session
/// record) and prints them as a flat user/agent conversation.
#[derive(Parser, Debug)]
#[command(name = "playback", version, about, long_about = None)]
struct Cli {
    /// Show detailed loading progress.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show everything including per-record normalization details.
    #[arg(long, global = true)]
    trace: bool,

    /// Output as JSON for machine consumption.
    #[arg(long, global = true)]
    json: bool,

    /// Playground base URL.
    #[arg(
        long,
        global = true,
        env = "PLAYGROUND_ENDPOINT",
        default_value = "http://localhost:7777"
    )]
    endpoint: String,

    /// HTTP request timeout in seconds.
    #[arg(long, global = true, env = "PLAYGROUND_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// List the sessions stored for an agent.
    Sessions {
        /// Agent identifier.
        agent_id: String,
    },

    /// Load one session and print its messages.
    Session {
        /// Agent identifier.
        agent_id: String,
        /// Session identifier.
        session_id: String,
    },

    /// Normalize a saved session record without contacting the service.
    Normalize {
        /// Path to a session JSON document, or `-` for stdin.
        input: PathBuf,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: clap_complete::Shell,
    },
}

/// Initialize the tracing subscriber based on CLI flags.
///
/// Priority: `--trace` > `--verbose` > `RUST_LOG` env var > default (warn).
fn init_tracing(cli: &Cli) {
    let filter = if cli.trace {
        EnvFilter::new("playback=trace")
    } else if cli.verbose {
        EnvFilter::new("playback=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Prints notices to stderr.
struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        let prefix = match kind {
            NoticeKind::Error => "error:".red().bold(),
            NoticeKind::Info => "info:".cyan().bold(),
        };
        eprintln!("{prefix} {message}");
    }
}

fn loader(cli: &Cli) -> anyhow::Result<(SessionLoader, Arc<MemoryStore>)> {
    let api = HttpPlaygroundApi::new(Duration::from_secs(cli.timeout_secs))?;
    let store = Arc::new(MemoryStore::new(Some(cli.endpoint.clone())));
    let loader = SessionLoader::new(Arc::new(api), store.clone(), Arc::new(StderrNotifier));
    Ok((loader, store))
}

fn format_timestamp(secs: Option<i64>) -> String {
    secs.and_then(|s| chrono::DateTime::from_timestamp(s, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn print_sessions(sessions: &[SessionSummary]) {
    for session in sessions {
        println!(
            "{}  {}  {}",
            session.session_id.bold(),
            format_timestamp(session.created_at).dimmed(),
            session.title.as_deref().unwrap_or("(untitled)")
        );
    }
}

fn print_messages(messages: &[CanonicalMessage]) {
    for msg in messages {
        let role = match msg.role {
            MessageRole::User => msg.role.as_str().green().bold(),
            MessageRole::Agent => msg.role.as_str().blue().bold(),
        };
        println!(
            "{role} {}: {}",
            format!("[{}]", format_timestamp(msg.created_at.as_ref().and_then(epoch_secs))).dimmed(),
            msg.content
        );
        for call in msg.tool_calls.iter().flatten() {
            let status = if call.tool_call_error() {
                " (error)".red().to_string()
            } else {
                String::new()
            };
            println!("  {} {}{status}", "⚙".yellow(), call.tool_name());
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_record(input: &Path) -> anyhow::Result<RawSessionRecord> {
    let text = if input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading session record from stdin")?;
        buf
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("reading session record {}", input.display()))?
    };
    serde_json::from_str(&text)
        .with_context(|| format!("parsing session record {}", input.display()))
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    match &cli.command {
        Command::Sessions { agent_id } => {
            let (loader, _store) = loader(cli)?;
            let Some(sessions) = loader.get_sessions(agent_id) else {
                return Ok(ExitCode::FAILURE);
            };
            if sessions.is_empty() {
                StderrNotifier.notify(
                    NoticeKind::Info,
                    &format!("No sessions found for agent {agent_id}"),
                );
            }
            if cli.json {
                print_json(&sessions)?;
            } else {
                print_sessions(&sessions);
            }
        }
        Command::Session {
            agent_id,
            session_id,
        } => {
            let (loader, store) = loader(cli)?;
            if loader.get_session(session_id, agent_id).is_none() {
                return Ok(ExitCode::FAILURE);
            }
            let messages = store.messages();
            if cli.json {
                print_json(&messages)?;
            } else {
                print_messages(&messages);
            }
        }
        Command::Normalize { input } => {
            let record = read_record(input)?;
            let shape = classify(&record);
            tracing::info!(
                shape = shape.name(),
                runs = shape.runs().len(),
                "normalizing saved record"
            );
            let messages = normalize_record(&record, now_epoch_secs());
            if messages.is_empty() {
                StderrNotifier.error(NO_MESSAGES_FOUND);
                return Ok(ExitCode::FAILURE);
            }
            if cli.json {
                print_json(&messages)?;
            } else {
                println!(
                    "{}",
                    format!("shape: {} ({} runs)", shape.name(), shape.runs().len()).dimmed()
                );
                print_messages(&messages);
            }
        }
        Command::Completions { shell } => {
            clap_complete::generate(
                *shell,
                &mut Cli::command(),
                "playback",
                &mut std::io::stdout(),
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
