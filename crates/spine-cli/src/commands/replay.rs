//! Capsule replay commands

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Subcommand;
use colored::*;
use spine_replay::{CapsuleReplayVerifier, InMemoryLedger, ReplayStatus, RunCapsule};

use super::{Context, Outcome};
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum ReplayCommands {
    /// Verify a sealed capsule against a ledger snapshot
    Verify {
        /// Capsule JSON file
        #[arg(long)]
        capsule: PathBuf,

        /// Ledger snapshot JSON file
        #[arg(long)]
        ledger: PathBuf,

        /// Require this tenant to own the capsule
        #[arg(long)]
        tenant: Option<String>,
    },
}

pub async fn execute(command: ReplayCommands, ctx: &Context) -> anyhow::Result<Outcome> {
    match command {
        ReplayCommands::Verify {
            capsule,
            ledger,
            tenant,
        } => {
            let capsule = RunCapsule::load(&capsule)
                .with_context(|| format!("loading capsule {}", capsule.display()))?;
            let ledger = InMemoryLedger::load(&ledger)
                .with_context(|| format!("loading ledger {}", ledger.display()))?;

            let verifier = CapsuleReplayVerifier::new(Arc::new(ledger))
                .with_config(ctx.config.replay.clone());
            let verdict = verifier.verify(&capsule, tenant.as_deref()).await;

            match ctx.format {
                OutputFormat::Json => output::print_json(&verdict)?,
                OutputFormat::Table => {
                    let status = match verdict.status {
                        ReplayStatus::Pass => verdict.status.as_str().green(),
                        ReplayStatus::Fail => verdict.status.as_str().red(),
                    };
                    println!(
                        "{} {} ({})",
                        status.bold(),
                        capsule.capsule_id,
                        verdict.details.hash_integrity.manifest_version
                    );
                    for reason in &verdict.reasons {
                        println!("  - {reason}");
                    }
                }
            }

            Ok(if verdict.passed() {
                Outcome::Success
            } else {
                Outcome::Failure
            })
        }
    }
}
