//! Write-intent commands

use anyhow::{bail, Context as _};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use serde::Serialize;
use spine_intent::{IntentFilter, IntentStatus, IntentStatusEvent, StageRequest, WriteIntent};
use spine_types::{IntentId, Lane};
use tabled::Tabled;

use super::{read_json, Context, Outcome};
use crate::output::{self, or_dash, print_success, print_warning, OutputFormat};

#[derive(Subcommand)]
pub enum IntentCommands {
    /// List intents
    List {
        /// Filter by status
        #[arg(long)]
        status: Option<IntentStatus>,

        /// Filter by intent type
        #[arg(long = "type")]
        intent_type: Option<String>,
    },

    /// Show an intent and its audit history
    Show { intent_id: String },

    /// Stage a new intent
    Stage {
        /// Registered intent type
        #[arg(long = "type")]
        intent_type: String,

        #[arg(long, default_value = "grounded")]
        lane: Lane,

        /// Payload as JSON, or @path to a JSON file
        #[arg(long)]
        payload: String,

        #[arg(long)]
        scope_lock: Option<String>,

        #[arg(long)]
        proposal: Option<String>,

        #[arg(long)]
        impact_score: Option<f64>,
    },

    /// Submit a staged intent for human review
    Submit {
        intent_id: String,

        #[arg(long, default_value = "spine-cli")]
        actor: String,
    },

    /// Approve an intent awaiting review
    Approve {
        intent_id: String,

        #[arg(long)]
        actor: String,

        #[arg(long, default_value = "Approved")]
        rationale: String,
    },

    /// Reject an intent awaiting review
    Reject {
        intent_id: String,

        #[arg(long)]
        actor: String,

        #[arg(long)]
        rationale: String,
    },

    /// Defer an intent awaiting review
    Defer {
        intent_id: String,

        #[arg(long)]
        actor: String,

        /// RFC 3339 timestamp after which the intent returns to review
        #[arg(long)]
        until: DateTime<Utc>,

        #[arg(long, default_value = "Deferred")]
        rationale: String,
    },

    /// Cancel a staged or awaiting intent
    Cancel {
        intent_id: String,

        #[arg(long)]
        actor: String,

        #[arg(long, default_value = "Cancelled")]
        rationale: String,
    },

    /// Execute approved intents as one batch
    Execute {
        #[arg(required = true)]
        intent_ids: Vec<String>,

        #[arg(long)]
        execution_id: String,
    },

    /// Expire every intent past its deadline
    ExpireStale,

    /// Return deferred intents whose hold has elapsed to review
    Reactivate,
}

#[derive(Debug, Serialize, Tabled)]
struct IntentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "TYPE")]
    intent_type: String,
    #[tabled(rename = "LANE")]
    lane: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "SCOPE LOCK")]
    scope_lock: String,
    #[tabled(rename = "EXPIRES")]
    expires: String,
}

impl From<&WriteIntent> for IntentRow {
    fn from(intent: &WriteIntent) -> Self {
        Self {
            id: intent.intent_id.to_string(),
            intent_type: intent.intent_type.clone(),
            lane: intent.lane.to_string(),
            status: intent.status.to_string(),
            scope_lock: or_dash(intent.scope_lock_id.as_ref()),
            expires: intent.expires_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct EventRow {
    #[tabled(rename = "SEQ")]
    sequence: u64,
    #[tabled(rename = "FROM")]
    from: String,
    #[tabled(rename = "TO")]
    to: String,
    #[tabled(rename = "ACTOR")]
    actor: String,
    #[tabled(rename = "RATIONALE")]
    rationale: String,
    #[tabled(rename = "AT")]
    at: String,
}

impl From<&IntentStatusEvent> for EventRow {
    fn from(event: &IntentStatusEvent) -> Self {
        Self {
            sequence: event.sequence,
            from: event.from_status.to_string(),
            to: event.to_status.to_string(),
            actor: event.actor_id.clone(),
            rationale: or_dash(event.rationale.as_ref()),
            at: event.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

#[derive(Serialize)]
struct IntentDetail<'a> {
    intent: &'a WriteIntent,
    history: &'a [IntentStatusEvent],
}

fn print_intent(intent: &WriteIntent, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => output::print_json(intent),
        OutputFormat::Table => output::print_output(vec![IntentRow::from(intent)], format),
    }
}

fn print_ids(label: &str, ids: &[IntentId], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => output::print_json(&ids),
        OutputFormat::Table => {
            print_success(&format!("{label}: {}", ids.len()));
            for id in ids {
                println!("  {id}");
            }
            Ok(())
        }
    }
}

pub async fn execute(command: IntentCommands, ctx: &Context) -> anyhow::Result<Outcome> {
    let lifecycle = ctx.lifecycle().await?;
    let format = ctx.format;

    match command {
        IntentCommands::List {
            status,
            intent_type,
        } => {
            let mut filter = IntentFilter::new();
            if let Some(status) = status {
                filter = filter.with_status(status);
            }
            if let Some(t) = intent_type {
                filter = filter.with_type(t);
            }
            let intents = lifecycle.list(&filter).await?;
            if intents.is_empty() && format == OutputFormat::Table {
                output::print_info("No intents match");
            } else {
                output::print_output(intents.iter().map(IntentRow::from).collect(), format)?;
            }
        }

        IntentCommands::Show { intent_id } => {
            let id = IntentId::from(intent_id);
            let intent = lifecycle.get(&id).await?;
            let history = lifecycle.history(&id).await?;
            match format {
                OutputFormat::Json => output::print_json(&IntentDetail {
                    intent: &intent,
                    history: &history,
                })?,
                OutputFormat::Table => {
                    print_intent(&intent, format)?;
                    println!("{}", serde_json::to_string_pretty(&intent.payload)?);
                    output::print_output(history.iter().map(EventRow::from).collect(), format)?;
                }
            }
        }

        IntentCommands::Stage {
            intent_type,
            lane,
            payload,
            scope_lock,
            proposal,
            impact_score,
        } => {
            let payload = match read_json(&payload)? {
                serde_json::Value::Object(map) => map,
                _ => bail!("payload must be a JSON object"),
            };
            let mut request = StageRequest::new(intent_type, lane, payload);
            if let Some(s) = scope_lock {
                request = request.with_scope_lock(s);
            }
            if let Some(p) = proposal {
                request = request.with_proposal(p);
            }
            if let Some(score) = impact_score {
                request = request.with_impact_score(score);
            }
            let intent = lifecycle.stage(request).await.context("staging intent")?;
            print_intent(&intent, format)?;
        }

        IntentCommands::Submit { intent_id, actor } => {
            let intent = lifecycle
                .submit_for_review(&IntentId::from(intent_id), &actor)
                .await?;
            print_intent(&intent, format)?;
        }

        IntentCommands::Approve {
            intent_id,
            actor,
            rationale,
        } => {
            let intent = lifecycle
                .approve(&IntentId::from(intent_id), &actor, rationale)
                .await?;
            print_intent(&intent, format)?;
        }

        IntentCommands::Reject {
            intent_id,
            actor,
            rationale,
        } => {
            let intent = lifecycle
                .reject(&IntentId::from(intent_id), &actor, rationale)
                .await?;
            print_intent(&intent, format)?;
        }

        IntentCommands::Defer {
            intent_id,
            actor,
            until,
            rationale,
        } => {
            let intent = lifecycle
                .defer(&IntentId::from(intent_id), &actor, until, rationale)
                .await?;
            print_intent(&intent, format)?;
        }

        IntentCommands::Cancel {
            intent_id,
            actor,
            rationale,
        } => {
            let intent = lifecycle
                .cancel(&IntentId::from(intent_id), &actor, rationale)
                .await?;
            print_intent(&intent, format)?;
        }

        IntentCommands::Execute {
            intent_ids,
            execution_id,
        } => {
            let ids: Vec<IntentId> = intent_ids.into_iter().map(IntentId::from).collect();
            let outcome = lifecycle.execute_batch(&ids, &execution_id).await?;
            match format {
                OutputFormat::Json => output::print_json(&outcome)?,
                OutputFormat::Table => {
                    if outcome.is_held() {
                        print_warning(&format!(
                            "Batch held: {} intent(s) deferred across {} scope locks",
                            outcome.held.len(),
                            outcome.scope_locks.len()
                        ));
                    } else {
                        print_success(&format!("Executed {} intent(s)", outcome.executed.len()));
                    }
                    for failure in &outcome.failed {
                        output::print_error(&format!("{}: {}", failure.intent_id, failure.error));
                    }
                }
            }
            if outcome.is_held() || !outcome.failed.is_empty() {
                return Ok(Outcome::Failure);
            }
        }

        IntentCommands::ExpireStale => {
            let expired = lifecycle.expire_stale().await?;
            print_ids("Expired", &expired, format)?;
        }

        IntentCommands::Reactivate => {
            let reactivated = lifecycle.reactivate_deferred().await?;
            print_ids("Reactivated", &reactivated, format)?;
        }
    }
    Ok(Outcome::Success)
}
