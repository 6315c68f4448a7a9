//! Theory-change commands

use std::path::PathBuf;

use anyhow::{bail, Context as _};
use clap::Subcommand;
use colored::*;
use serde_json::Value;
use spine_theory::{ClassifiedEvidence, TheoryOperator};
use spine_types::EvidenceChannel;

use super::{read_json_file, Context, Outcome};
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum TheoryCommands {
    /// Evaluate evidence for a claim and print the resulting proposal
    Evaluate {
        #[arg(long)]
        claim: String,

        #[arg(long)]
        session: String,

        /// JSON array of validation-channel evidence rows
        #[arg(long)]
        evidence: PathBuf,

        /// JSON array of negative-channel evidence rows
        #[arg(long)]
        negative: Option<PathBuf>,
    },
}

fn load_rows(path: &PathBuf, channel: EvidenceChannel) -> anyhow::Result<Vec<ClassifiedEvidence>> {
    let rows = match read_json_file(path)? {
        Value::Array(rows) => rows,
        _ => bail!("{} must contain a JSON array of evidence rows", path.display()),
    };
    ClassifiedEvidence::from_values(&rows, channel)
        .with_context(|| format!("canonicalizing {}", path.display()))
}

pub async fn execute(command: TheoryCommands, ctx: &Context) -> anyhow::Result<Outcome> {
    match command {
        TheoryCommands::Evaluate {
            claim,
            session,
            evidence,
            negative,
        } => {
            let mut rows = load_rows(&evidence, EvidenceChannel::Validation)?;
            if let Some(path) = negative {
                rows.extend(load_rows(&path, EvidenceChannel::Negative)?);
            }

            let operator = TheoryOperator::new(ctx.config.theory.clone())?;
            let proposal = operator.generate_proposal(&session, &claim, &rows)?;

            match ctx.format {
                OutputFormat::Json => output::print_json(&proposal)?,
                OutputFormat::Table => {
                    println!("{} {}", "Action:".bold(), proposal.action);
                    println!("{} {}", "Proposal:".bold(), proposal.proposal_id());
                    println!("{} {:.3}", "Conflict:".bold(), proposal.conflict_score);
                    println!("{} {:.3}", "Entropy:".bold(), proposal.entropy);
                    println!("{} {}", "Rationale:".bold(), proposal.rationale);
                    println!("{} {}", "Evidence:".bold(), proposal.evidence_ids.join(", "));
                }
            }
        }
    }
    Ok(Outcome::Success)
}
