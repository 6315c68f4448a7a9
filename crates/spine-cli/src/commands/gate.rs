//! Governance gate commands

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Subcommand;
use colored::*;
use spine_governance::{GateInput, GovernanceGate};

use super::{read_json_file, Context, Outcome};
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum GateCommands {
    /// Evaluate a session outcome against the intent store
    Check {
        /// Gate input JSON file
        #[arg(long)]
        input: PathBuf,
    },
}

pub async fn execute(command: GateCommands, ctx: &Context) -> anyhow::Result<Outcome> {
    match command {
        GateCommands::Check { input } => {
            let raw = read_json_file(&input)?;
            let input: GateInput = serde_json::from_value(raw)
                .with_context(|| format!("parsing gate input {}", input.display()))?;

            let gate = GovernanceGate::new(ctx.store().await?, ctx.config.gate.clone());
            let summary = gate.evaluate(&input).await;

            match ctx.format {
                OutputFormat::Json => output::print_json(&summary)?,
                OutputFormat::Table => {
                    if summary.is_staged() {
                        println!("{} {}", "STAGED".green().bold(), summary.gate_code);
                    } else {
                        println!("{} {}", "HOLD".red().bold(), summary.gate_code);
                    }
                    if let Some(reason) = &summary.hold_reason {
                        println!("  {reason}");
                    }
                    if let Some(granted) = &summary.policy_override {
                        output::print_warning(granted.reason());
                    }
                }
            }

            Ok(if summary.is_staged() {
                Outcome::Success
            } else {
                Outcome::Failure
            })
        }
    }
}
