//! Spine CLI.
//!
//! Thin operator surface over the intent lifecycle, the governance gate,
//! the theory operator, and capsule replay. Exit status reflects the
//! verdict: 0 for success or PASS, 1 for FAIL or HOLD, 2 for errors.

#![deny(unsafe_code)]

pub mod commands;
pub mod config;
pub mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::{fingerprint, gate, intent, replay, theory, Context, Outcome};
use config::{LoggingConfig, SpineConfig};
use output::OutputFormat;

/// Spine CLI application
#[derive(Parser)]
#[command(name = "spine")]
#[command(about = "Spine - fail-closed write-intent governance", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SPINE_CONFIG")]
    pub config: Option<String>,

    /// Intent store file (overrides configuration)
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage write intents
    Intent {
        #[command(subcommand)]
        command: intent::IntentCommands,
    },

    /// Run the governance gate
    Gate {
        #[command(subcommand)]
        command: gate::GateCommands,
    },

    /// Evaluate theory change
    Theory {
        #[command(subcommand)]
        command: theory::TheoryCommands,
    },

    /// Verify run capsules
    Replay {
        #[command(subcommand)]
        command: replay::ReplayCommands,
    },

    /// Deterministic fingerprints
    Fingerprint {
        #[command(subcommand)]
        command: fingerprint::FingerprintCommands,
    },

    /// Show the effective configuration
    Config,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::Failure => ExitCode::from(1),
        }
    }
}

/// Exit status for errors.
pub const EXIT_ERROR: u8 = 2;

/// Load configuration and apply command-line overrides.
pub fn resolve_config(cli: &Cli) -> anyhow::Result<SpineConfig> {
    let mut config = SpineConfig::load(cli.config.as_deref())?;
    if let Some(store) = &cli.store {
        config.store_path = store.clone();
    }
    Ok(config)
}

/// Install the global tracing subscriber.
pub fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let fallback = if verbose { "debug" } else { logging.level.as_str() };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    if logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
            .init();
    }
}

/// Execute a parsed command.
pub async fn run(cli: Cli, config: SpineConfig) -> anyhow::Result<Outcome> {
    let ctx = Context {
        config,
        format: cli.output,
    };

    match cli.command {
        Commands::Intent { command } => intent::execute(command, &ctx).await,
        Commands::Gate { command } => gate::execute(command, &ctx).await,
        Commands::Theory { command } => theory::execute(command, &ctx).await,
        Commands::Replay { command } => replay::execute(command, &ctx).await,
        Commands::Fingerprint { command } => fingerprint::execute(command, &ctx).await,
        Commands::Config => {
            output::print_json(&ctx.config)?;
            Ok(Outcome::Success)
        }
    }
}
