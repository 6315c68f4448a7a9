//! Fingerprint commands

use clap::Subcommand;
use serde_json::json;
use spine_fingerprint::make_channel_evidence_id;
use spine_types::EvidenceChannel;

use super::{Context, Outcome};
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum FingerprintCommands {
    /// Print the hash of the configured theory policy
    PolicyHash,

    /// Derive a deterministic evidence id
    EvidenceId {
        #[arg(long)]
        session: String,

        #[arg(long)]
        claim: String,

        #[arg(long)]
        execution: String,

        #[arg(long)]
        template: String,

        /// Derive a negative-channel id
        #[arg(long)]
        negative: bool,
    },
}

pub async fn execute(command: FingerprintCommands, ctx: &Context) -> anyhow::Result<Outcome> {
    let value = match command {
        FingerprintCommands::PolicyHash => {
            ctx.config.theory.validate()?;
            ctx.config.theory.policy_hash()
        }
        FingerprintCommands::EvidenceId {
            session,
            claim,
            execution,
            template,
            negative,
        } => {
            let channel = if negative {
                EvidenceChannel::Negative
            } else {
                EvidenceChannel::Validation
            };
            make_channel_evidence_id(channel, &session, &claim, &execution, &template)
        }
    };
    match ctx.format {
        OutputFormat::Json => output::print_json(&json!({ "value": value }))?,
        OutputFormat::Table => println!("{value}"),
    }
    Ok(Outcome::Success)
}
