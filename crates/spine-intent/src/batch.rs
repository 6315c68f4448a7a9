//! Batch execution under a scope-lock homogeneity policy.
//!
//! A batch executes only when every member shares one scope lock (absence
//! counts as one value). Otherwise every member is held in DEFERRED, even
//! members that look safe on their own: the underlying mutations cannot be
//! rolled back, so a mixed batch never partially commits.

use std::collections::{BTreeSet, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use spine_types::{IntentId, ScopeLockId};
use tracing::{info, warn};

use crate::capability::MutationWriter;
use crate::error::{LifecycleResult, TransitionDenial};
use crate::lifecycle::{event, refuse, IntentLifecycle};
use crate::model::{ActorType, IntentStatus, WriteIntent};

pub(crate) const BATCH_EXECUTOR: &str = "batch_executor";

/// Per-member failure after the batch decision was made.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub intent_id: IntentId,
    pub error: String,
}

/// What happened to each member of a batch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub executed: Vec<IntentId>,
    pub held: Vec<IntentId>,
    pub failed: Vec<BatchFailure>,
    /// Distinct scope locks observed across the batch.
    pub scope_locks: Vec<Option<ScopeLockId>>,
}

impl BatchOutcome {
    pub fn is_held(&self) -> bool {
        !self.held.is_empty()
    }
}

impl IntentLifecycle {
    /// Execute `intent_ids` as one batch, without applying mutations.
    pub async fn execute_batch(
        &self,
        intent_ids: &[IntentId],
        execution_id: &str,
    ) -> LifecycleResult<BatchOutcome> {
        self.run_batch(intent_ids, execution_id, None).await
    }

    /// Execute `intent_ids` as one batch, applying each through `writer`.
    pub async fn execute_batch_with(
        &self,
        intent_ids: &[IntentId],
        execution_id: &str,
        writer: &dyn MutationWriter,
    ) -> LifecycleResult<BatchOutcome> {
        self.run_batch(intent_ids, execution_id, Some(writer)).await
    }

    async fn run_batch(
        &self,
        intent_ids: &[IntentId],
        execution_id: &str,
        writer: Option<&dyn MutationWriter>,
    ) -> LifecycleResult<BatchOutcome> {
        let mut seen = HashSet::new();
        let mut members: Vec<WriteIntent> = Vec::with_capacity(intent_ids.len());
        for id in intent_ids {
            if seen.insert(id.clone()) {
                members.push(self.load(id).await?);
            }
        }

        // Every member must be executable before any member transitions.
        for intent in &members {
            self.authorize_execution(intent).await?;
        }

        let scope_locks: BTreeSet<Option<ScopeLockId>> =
            members.iter().map(|i| i.scope_lock_id.clone()).collect();
        let mut outcome = BatchOutcome {
            scope_locks: scope_locks.iter().cloned().collect(),
            ..BatchOutcome::default()
        };

        if scope_locks.len() <= 1 {
            for intent in &members {
                match self.execute_authorized(intent, execution_id, writer).await {
                    Ok(_) => outcome.executed.push(intent.intent_id.clone()),
                    Err(err) => outcome.failed.push(BatchFailure {
                        intent_id: intent.intent_id.clone(),
                        error: err.to_string(),
                    }),
                }
            }
            info!(
                execution_id,
                executed = outcome.executed.len(),
                failed = outcome.failed.len(),
                "batch executed"
            );
            return Ok(outcome);
        }

        let described = scope_locks
            .iter()
            .map(|s| s.as_ref().map_or("<none>", |s| s.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        let rationale = format!(
            "HOLD: batch spans {} distinct scope locks ({described}); no member executed",
            scope_locks.len()
        );
        warn!(
            execution_id,
            members = members.len(),
            scope_locks = %described,
            "mixed-scope batch held"
        );

        let defer_until = Utc::now() + self.config().batch_hold();
        for intent in &members {
            let result = if intent.status.allows_batch_hold() {
                self.commit(
                    intent,
                    event(intent, IntentStatus::Deferred, ActorType::System, BATCH_EXECUTOR)
                        .with_rationale(rationale.clone())
                        .with_defer_until(defer_until)
                        .with_execution_id(execution_id),
                )
                .await
            } else {
                Err(refuse(intent, IntentStatus::Deferred, TransitionDenial::NotAllowed))
            };
            match result {
                Ok(_) => outcome.held.push(intent.intent_id.clone()),
                Err(err) => outcome.failed.push(BatchFailure {
                    intent_id: intent.intent_id.clone(),
                    error: err.to_string(),
                }),
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LifecycleError;
    use crate::model::StageRequest;
    use crate::store::InMemoryIntentStore;
    use serde_json::json;
    use spine_types::Lane;
    use std::sync::Arc;

    fn lifecycle() -> IntentLifecycle {
        IntentLifecycle::new(Arc::new(InMemoryIntentStore::new()))
    }

    /// An approved trace_append intent; scope lock is optional for that type.
    async fn approved(lc: &IntentLifecycle, scope: Option<&str>) -> IntentId {
        let payload = json!({"trace_id": "t1", "event": "step"})
            .as_object()
            .cloned()
            .unwrap();
        let mut req = StageRequest::new("trace_append", Lane::Grounded, payload);
        if let Some(s) = scope {
            req = req.with_scope_lock(s);
        }
        let intent = lc.stage(req).await.unwrap();
        assert_eq!(intent.status, IntentStatus::Approved);
        intent.intent_id
    }

    #[tokio::test]
    async fn uniform_scope_executes_every_member() {
        let lc = lifecycle();
        let i1 = approved(&lc, Some("A")).await;
        let i2 = approved(&lc, Some("A")).await;

        let out = lc.execute_batch(&[i1.clone(), i2.clone()], "exec-1").await.unwrap();
        assert_eq!(out.executed, vec![i1.clone(), i2.clone()]);
        assert!(out.held.is_empty());
        for id in [i1, i2] {
            assert_eq!(lc.get(&id).await.unwrap().status, IntentStatus::Executed);
        }
    }

    #[tokio::test]
    async fn all_none_scope_counts_as_uniform() {
        let lc = lifecycle();
        let i1 = approved(&lc, None).await;
        let i2 = approved(&lc, None).await;
        let out = lc.execute_batch(&[i1, i2], "exec-1").await.unwrap();
        assert_eq!(out.executed.len(), 2);
        assert_eq!(out.scope_locks, vec![None]);
    }

    #[tokio::test]
    async fn mixed_scope_holds_every_member() {
        let lc = lifecycle();
        let i1 = approved(&lc, Some("A")).await;
        let i2 = approved(&lc, Some("B")).await;

        let out = lc.execute_batch(&[i1.clone(), i2.clone()], "exec-2").await.unwrap();
        assert!(out.executed.is_empty());
        assert_eq!(out.held, vec![i1.clone(), i2.clone()]);

        for id in [i1, i2] {
            assert_eq!(lc.get(&id).await.unwrap().status, IntentStatus::Deferred);
            let last = lc.history(&id).await.unwrap().pop().unwrap();
            assert_eq!(last.from_status, IntentStatus::Approved);
            assert_eq!(last.to_status, IntentStatus::Deferred);
            assert_eq!(last.actor_id, BATCH_EXECUTOR);
            assert!(last.rationale.as_deref().unwrap().contains("HOLD"));
            assert!(last.defer_until.is_some());
        }
    }

    #[tokio::test]
    async fn scope_and_none_mix_is_heterogeneous() {
        let lc = lifecycle();
        let i1 = approved(&lc, Some("A")).await;
        let i2 = approved(&lc, None).await;
        let out = lc.execute_batch(&[i1, i2], "exec-3").await.unwrap();
        assert_eq!(out.held.len(), 2);
        assert!(out.executed.is_empty());
    }

    #[tokio::test]
    async fn unapproved_member_aborts_before_any_transition() {
        let lc = lifecycle();
        let ok = approved(&lc, Some("A")).await;
        let payload = json!({"claim_id": "c1", "content": "x"}).as_object().cloned().unwrap();
        let pending = lc
            .stage(StageRequest::new("create_proposition", Lane::Grounded, payload).with_scope_lock("A"))
            .await
            .unwrap();

        let err = lc
            .execute_batch(&[ok.clone(), pending.intent_id.clone()], "exec-4")
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Transition(_)));
        assert_eq!(lc.get(&ok).await.unwrap().status, IntentStatus::Approved);
    }

    #[tokio::test]
    async fn held_members_return_to_review_after_hold_window() {
        let lc = lifecycle();
        let i1 = approved(&lc, Some("A")).await;
        let i2 = approved(&lc, Some("B")).await;
        lc.execute_batch(&[i1.clone(), i2], "exec-5").await.unwrap();

        let later = Utc::now() + lc.config().batch_hold() + chrono::Duration::minutes(1);
        let back = lc.reactivate_deferred_at(later).await.unwrap();
        assert!(back.contains(&i1));
        assert_eq!(lc.get(&i1).await.unwrap().status, IntentStatus::AwaitingHitl);
    }

    #[tokio::test]
    async fn duplicate_ids_execute_once() {
        let lc = lifecycle();
        let i1 = approved(&lc, Some("A")).await;
        let out = lc.execute_batch(&[i1.clone(), i1.clone()], "exec-6").await.unwrap();
        assert_eq!(out.executed, vec![i1]);
        assert!(out.failed.is_empty());
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let lc = lifecycle();
        let out = lc.execute_batch(&[], "exec-7").await.unwrap();
        assert_eq!(out, BatchOutcome::default());
    }
}
