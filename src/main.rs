//! # Offerwatch CLI
//!
//! Watches a candidate sheet for transitions into the target status and
//! sends each candidate their offer email exactly once, recording every
//! attempt in the ledger.
//!
//! Usage:
//!   offerwatch run                    # Watch the source and dispatch on change
//!   offerwatch cycle                  # One manual load → detect → dispatch
//!   offerwatch eligible               # Preview who would be notified
//!   offerwatch ledger --limit 50     # Recent dispatch history

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use offerwatch_core::Transport;
use offerwatch_core::config::TransportKind;
use offerwatch_core::OfferwatchConfig;
use offerwatch_engine::{Engine, Ledger, trigger_channel, watcher};
use offerwatch_transport::{OutboxTransport, SmtpTransport};

#[derive(Parser)]
#[command(
    name = "offerwatch",
    version,
    about = "✉️ Offerwatch — offer email automation for candidate sheets"
)]
struct Cli {
    /// Config file path (default: ~/.offerwatch/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Use the file outbox instead of SMTP — no mail leaves the machine
    #[arg(long)]
    dry_run: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch the candidate file and dispatch on every change
    Run,
    /// Run one load → detect → dispatch cycle and exit
    Cycle,
    /// Show who would be notified, without sending anything
    Eligible,
    /// Show recent ledger entries
    Ledger {
        /// Number of entries to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "offerwatch=debug,offerwatch_engine=debug,offerwatch_transport=debug"
    } else {
        "offerwatch=info,offerwatch_engine=info,offerwatch_transport=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => OfferwatchConfig::load_from(Path::new(&expand_path(path)))?,
        None => OfferwatchConfig::load()?,
    };

    // Expand ~ in every configured path once, up front.
    config.source.path = expand_path(&config.source.path);
    config.templates.path = expand_path(&config.templates.path);
    config.ledger.db_path = expand_path(&config.ledger.db_path);
    config.ledger.export_dir = expand_path(&config.ledger.export_dir);
    config.transport.outbox_dir = expand_path(&config.transport.outbox_dir);

    let ledger = Ledger::open(Path::new(&config.ledger.db_path))?;

    let smtp = &config.transport.smtp;
    let transport: Arc<dyn Transport> =
        if cli.dry_run || config.transport.kind == TransportKind::Outbox {
            Arc::new(OutboxTransport::new(
                Path::new(&config.transport.outbox_dir),
                smtp.sender(),
                smtp.display_name.as_deref(),
            )?)
        } else {
            Arc::new(SmtpTransport::new(smtp)?)
        };
    tracing::info!("🚚 Transport: {}", transport.name());

    let source = config.source.clone();
    let mut engine = Engine::new(config, ledger, transport)?;

    match cli.command {
        Command::Run => {
            let engine = Arc::new(Mutex::new(engine));
            let (handle, runner) = trigger_channel(engine);
            let triggers = watcher::spawn_triggers(handle, source);
            tokio::select! {
                _ = runner.run() => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("👋 Shutting down");
                }
            }
            triggers.abort();
        }
        Command::Cycle => {
            let summary = engine.run_cycle().await?;
            println!(
                "Cycle {}: {} eligible, {} sent, {} failed, {} row(s) skipped",
                summary.run_id, summary.eligible, summary.sent, summary.failed, summary.skipped_rows
            );
        }
        Command::Eligible => {
            engine.load_snapshot()?;
            let eligible = engine.eligible();
            if eligible.is_empty() {
                println!("No candidates awaiting notification.");
            }
            for record in &eligible {
                println!(
                    "row {:>4}  {}  <{}>  {}",
                    record.row, record.name, record.email, record.role
                );
            }
            for (row, reason) in &engine.snapshot().skipped {
                println!("row {row:>4}  skipped: {reason}");
            }
        }
        Command::Ledger { limit } => {
            for entry in engine.recent_ledger(limit)? {
                println!(
                    "{}  {}  <{}>  {}  {}",
                    entry.sent_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.name,
                    entry.email,
                    entry.role,
                    entry.outcome.status_text()
                );
            }
        }
    }

    Ok(())
}
