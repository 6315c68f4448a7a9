//! The write-intent state machine.
//!
//! Every transition appends exactly one [`IntentStatusEvent`] through the
//! store's atomic `record_transition`. Illegal transitions are refused and
//! never retried here; the caller decides whether to hold its session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use spine_types::IntentId;
use tracing::{debug, info, warn};

use crate::capability::{MutationWriter, WriteCapability};
use crate::config::LifecycleConfig;
use crate::error::{
    IntentTransitionError, LifecycleError, LifecycleResult, StoreError, TransitionDenial,
    ValidationError,
};
use crate::model::{ActorType, IntentStatus, IntentStatusEvent, StageRequest, WriteIntent};
use crate::registry::{ApprovalPolicy, IntentRegistry, ScopeLockPolicy};
use crate::store::{IntentFilter, IntentStore};

pub(crate) const APPROVAL_ROUTER: &str = "approval_router";
pub(crate) const EXPIRY_SERVICE: &str = "expiry_service";
pub(crate) const EXECUTOR: &str = "executor";
pub(crate) const DEFER_SERVICE: &str = "defer_service";

/// Result of a successful execution.
#[derive(Clone, Debug)]
pub struct ExecutionReceipt {
    pub intent: WriteIntent,
    pub mutation_ids: Vec<String>,
}

/// Write-intent lifecycle service over an injected store.
pub struct IntentLifecycle {
    store: Arc<dyn IntentStore>,
    registry: IntentRegistry,
    config: LifecycleConfig,
}

impl IntentLifecycle {
    pub fn new(store: Arc<dyn IntentStore>) -> Self {
        Self {
            store,
            registry: IntentRegistry::builtin(),
            config: LifecycleConfig::default(),
        }
    }

    pub fn with_registry(mut self, registry: IntentRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<dyn IntentStore> {
        &self.store
    }

    pub fn registry(&self) -> &IntentRegistry {
        &self.registry
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    // -----------------------------------------------------------------
    // Staging
    // -----------------------------------------------------------------

    /// Validate and persist a new intent.
    ///
    /// Nothing is persisted unless validation passes. Intent types whose
    /// approval policy is `Auto` for the lane are routed straight through
    /// review to `Approved`, one audited event per step; `Hitl` intents stay
    /// `Staged` until submitted for review.
    pub async fn stage(&self, request: StageRequest) -> LifecycleResult<WriteIntent> {
        let approval = self.check_stage(&request).inspect_err(|err| {
            warn!(
                intent_type = %request.intent_type,
                lane = %request.lane,
                error = %err,
                "stage rejected"
            );
        })?;

        let now = Utc::now();
        let intent = WriteIntent {
            intent_id: IntentId::generate(),
            intent_type: request.intent_type,
            lane: request.lane,
            payload: request.payload,
            status: IntentStatus::Staged,
            scope_lock_id: request.scope_lock_id.filter(|s| !s.is_blank()),
            proposal_id: request.proposal_id,
            impact_score: request.impact_score,
            created_at: now,
            expires_at: request
                .expires_at
                .unwrap_or_else(|| now + self.config.default_expiry()),
            supersedes_intent_id: request.supersedes_intent_id,
        };

        self.store.insert_intent(intent.clone()).await?;
        info!(
            intent_id = %intent.intent_id,
            intent_type = %intent.intent_type,
            lane = %intent.lane,
            scope_lock_id = ?intent.scope_lock_id,
            "intent staged"
        );

        if approval == ApprovalPolicy::Auto {
            let submitted = self
                .transition(
                    &intent,
                    event(&intent, IntentStatus::AwaitingHitl, ActorType::System, APPROVAL_ROUTER)
                        .with_rationale("Submitted for automatic approval"),
                )
                .await?;
            let rationale = format!(
                "Auto-approved by registry policy for {} in lane {}",
                submitted.intent_type, submitted.lane
            );
            return self
                .transition(
                    &submitted,
                    event(&submitted, IntentStatus::Approved, ActorType::System, APPROVAL_ROUTER)
                        .with_rationale(rationale),
                )
                .await;
        }

        Ok(intent)
    }

    fn check_stage(&self, request: &StageRequest) -> Result<ApprovalPolicy, ValidationError> {
        let spec =
            self.registry
                .validate_payload(&request.intent_type, &request.payload, request.lane)?;

        let has_scope_lock = request
            .scope_lock_id
            .as_ref()
            .is_some_and(|s| !s.is_blank());
        match spec.scope_lock_policy(request.lane) {
            ScopeLockPolicy::Required if !has_scope_lock => {
                return Err(ValidationError::ScopeLockRequired {
                    intent_type: request.intent_type.clone(),
                    lane: request.lane,
                });
            }
            ScopeLockPolicy::Forbidden if has_scope_lock => {
                return Err(ValidationError::ScopeLockForbidden {
                    intent_type: request.intent_type.clone(),
                    lane: request.lane,
                });
            }
            _ => {}
        }

        let approval = spec.approval_policy(request.lane);
        if approval == ApprovalPolicy::Deny {
            return Err(ValidationError::ApprovalDenied {
                intent_type: request.intent_type.clone(),
                lane: request.lane,
            });
        }

        if let Some(score) = request.impact_score {
            if !score.is_finite() || !(0.0..=1.0).contains(&score) {
                return Err(ValidationError::InvalidImpactScore(score));
            }
        }

        Ok(approval)
    }

    // -----------------------------------------------------------------
    // Review and decision
    // -----------------------------------------------------------------

    /// STAGED -> AWAITING_HITL
    pub async fn submit_for_review(
        &self,
        intent_id: &IntentId,
        actor_id: &str,
    ) -> LifecycleResult<WriteIntent> {
        let intent = self.load(intent_id).await?;
        self.transition(
            &intent,
            event(&intent, IntentStatus::AwaitingHitl, ActorType::System, actor_id)
                .with_rationale("Submitted for human review"),
        )
        .await
    }

    /// AWAITING_HITL -> APPROVED
    pub async fn approve(
        &self,
        intent_id: &IntentId,
        actor_id: &str,
        rationale: impl Into<String>,
    ) -> LifecycleResult<WriteIntent> {
        let intent = self.load(intent_id).await?;
        self.transition(
            &intent,
            event(&intent, IntentStatus::Approved, ActorType::Human, actor_id)
                .with_rationale(rationale),
        )
        .await
    }

    /// AWAITING_HITL -> REJECTED
    pub async fn reject(
        &self,
        intent_id: &IntentId,
        actor_id: &str,
        rationale: impl Into<String>,
    ) -> LifecycleResult<WriteIntent> {
        let intent = self.load(intent_id).await?;
        self.transition(
            &intent,
            event(&intent, IntentStatus::Rejected, ActorType::Human, actor_id)
                .with_rationale(rationale),
        )
        .await
    }

    /// AWAITING_HITL -> DEFERRED until `defer_until`.
    pub async fn defer(
        &self,
        intent_id: &IntentId,
        actor_id: &str,
        defer_until: DateTime<Utc>,
        rationale: impl Into<String>,
    ) -> LifecycleResult<WriteIntent> {
        let intent = self.load(intent_id).await?;
        self.transition(
            &intent,
            event(&intent, IntentStatus::Deferred, ActorType::Human, actor_id)
                .with_rationale(rationale)
                .with_defer_until(defer_until),
        )
        .await
    }

    /// STAGED | AWAITING_HITL -> CANCELLED
    pub async fn cancel(
        &self,
        intent_id: &IntentId,
        actor_id: &str,
        rationale: impl Into<String>,
    ) -> LifecycleResult<WriteIntent> {
        let intent = self.load(intent_id).await?;
        self.transition(
            &intent,
            event(&intent, IntentStatus::Cancelled, ActorType::Human, actor_id)
                .with_rationale(rationale),
        )
        .await
    }

    // -----------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------

    /// APPROVED -> EXECUTED, without applying a mutation.
    pub async fn execute(
        &self,
        intent_id: &IntentId,
        execution_id: &str,
    ) -> LifecycleResult<WriteIntent> {
        let intent = self.load(intent_id).await?;
        self.authorize_execution(&intent).await?;
        self.execute_authorized(&intent, execution_id, None)
            .await
            .map(|receipt| receipt.intent)
    }

    /// APPROVED -> EXECUTED, applying the mutation through `writer`.
    ///
    /// A writer failure moves the intent to FAILED with the error recorded.
    pub async fn execute_with(
        &self,
        intent_id: &IntentId,
        execution_id: &str,
        writer: &dyn MutationWriter,
    ) -> LifecycleResult<ExecutionReceipt> {
        let intent = self.load(intent_id).await?;
        self.authorize_execution(&intent).await?;
        self.execute_authorized(&intent, execution_id, Some(writer))
            .await
    }

    /// Checks that must hold before any execution, in order: the status
    /// admits EXECUTED, the history holds a literal approved event, and a
    /// required scope lock is present.
    pub(crate) async fn authorize_execution(&self, intent: &WriteIntent) -> LifecycleResult<()> {
        if !intent.status.can_transition_to(IntentStatus::Executed) {
            return Err(refuse(intent, IntentStatus::Executed, TransitionDenial::NotAllowed));
        }

        let approved = self
            .store
            .has_event_with_status(&intent.intent_id, IntentStatus::Approved)
            .await?;
        if !approved {
            warn!(
                intent_id = %intent.intent_id,
                status = %intent.status,
                "execution refused: no approved event in history"
            );
            return Err(refuse(
                intent,
                IntentStatus::Executed,
                TransitionDenial::MissingApproval,
            ));
        }

        let spec = self.registry.spec(&intent.intent_type)?;
        if spec.scope_lock_policy(intent.lane) == ScopeLockPolicy::Required
            && intent.scope_lock_id.is_none()
        {
            return Err(ValidationError::ScopeLockRequired {
                intent_type: intent.intent_type.clone(),
                lane: intent.lane,
            }
            .into());
        }

        Ok(())
    }

    pub(crate) async fn execute_authorized(
        &self,
        intent: &WriteIntent,
        execution_id: &str,
        writer: Option<&dyn MutationWriter>,
    ) -> LifecycleResult<ExecutionReceipt> {
        let mutation_ids = match writer {
            Some(writer) => {
                let capability = WriteCapability::mint(intent, execution_id);
                match writer.apply(capability, intent).await {
                    Ok(ids) => ids,
                    Err(error) => {
                        warn!(
                            intent_id = %intent.intent_id,
                            execution_id,
                            error = %error,
                            "mutation writer failed"
                        );
                        self.transition(
                            intent,
                            event(intent, IntentStatus::Failed, ActorType::System, EXECUTOR)
                                .with_execution_id(execution_id)
                                .with_error(error.clone()),
                        )
                        .await?;
                        return Err(LifecycleError::Mutation(error));
                    }
                }
            }
            None => Vec::new(),
        };

        let executed = self
            .transition(
                intent,
                event(intent, IntentStatus::Executed, ActorType::System, EXECUTOR)
                    .with_execution_id(execution_id)
                    .with_mutation_ids(mutation_ids.clone()),
            )
            .await?;
        Ok(ExecutionReceipt {
            intent: executed,
            mutation_ids,
        })
    }

    /// APPROVED -> FAILED
    pub async fn fail(&self, intent_id: &IntentId, error: &str) -> LifecycleResult<WriteIntent> {
        let intent = self.load(intent_id).await?;
        self.transition(
            &intent,
            event(&intent, IntentStatus::Failed, ActorType::System, EXECUTOR).with_error(error),
        )
        .await
    }

    // -----------------------------------------------------------------
    // Expiry and reactivation
    // -----------------------------------------------------------------

    /// AWAITING_HITL | DEFERRED -> EXPIRED
    pub async fn expire(&self, intent_id: &IntentId) -> LifecycleResult<WriteIntent> {
        let intent = self.load(intent_id).await?;
        self.expire_loaded(&intent).await
    }

    async fn expire_loaded(&self, intent: &WriteIntent) -> LifecycleResult<WriteIntent> {
        let rationale = format!("Expired at {}", intent.expires_at.to_rfc3339());
        self.transition(
            intent,
            event(intent, IntentStatus::Expired, ActorType::System, EXPIRY_SERVICE)
                .with_rationale(rationale),
        )
        .await
    }

    /// Expire every non-terminal intent past its `expires_at`.
    pub async fn expire_stale(&self) -> LifecycleResult<Vec<IntentId>> {
        self.expire_stale_at(Utc::now()).await
    }

    /// [`Self::expire_stale`] against an explicit clock reading.
    ///
    /// Intents whose status cannot expire (STAGED, APPROVED) are skipped.
    pub async fn expire_stale_at(&self, now: DateTime<Utc>) -> LifecycleResult<Vec<IntentId>> {
        let mut expired = Vec::new();
        for intent in self.store.list_expirable(now).await? {
            if !intent.status.can_transition_to(IntentStatus::Expired) {
                debug!(intent_id = %intent.intent_id, status = %intent.status, "stale intent cannot expire");
                continue;
            }
            match self.expire_loaded(&intent).await {
                Ok(_) => expired.push(intent.intent_id),
                Err(LifecycleError::Transition(err)) => {
                    debug!(error = %err, "skipping intent that moved during sweep");
                }
                Err(err) => return Err(err),
            }
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "expired stale intents");
        }
        Ok(expired)
    }

    /// Return deferred intents whose `defer_until` has passed to review.
    pub async fn reactivate_deferred(&self) -> LifecycleResult<Vec<IntentId>> {
        self.reactivate_deferred_at(Utc::now()).await
    }

    /// [`Self::reactivate_deferred`] against an explicit clock reading.
    ///
    /// Uses the most recent deferral's `defer_until`; intents deferred
    /// without one stay deferred.
    pub async fn reactivate_deferred_at(
        &self,
        now: DateTime<Utc>,
    ) -> LifecycleResult<Vec<IntentId>> {
        let deferred = self
            .store
            .list_intents(&IntentFilter::new().with_status(IntentStatus::Deferred))
            .await?;

        let mut reactivated = Vec::new();
        for intent in deferred {
            let history = self.store.events(&intent.intent_id).await?;
            let Some(until) = history
                .iter()
                .rev()
                .find(|e| e.to_status == IntentStatus::Deferred)
                .and_then(|e| e.defer_until)
            else {
                continue;
            };
            if now < until {
                continue;
            }

            let rationale = format!("Reactivated after defer_until={}", until.to_rfc3339());
            let result = self
                .transition(
                    &intent,
                    event(&intent, IntentStatus::AwaitingHitl, ActorType::System, DEFER_SERVICE)
                        .with_rationale(rationale),
                )
                .await;
            match result {
                Ok(_) => reactivated.push(intent.intent_id),
                Err(LifecycleError::Transition(err)) => {
                    debug!(error = %err, "skipping intent that moved during reactivation");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(reactivated)
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    pub async fn get(&self, intent_id: &IntentId) -> LifecycleResult<WriteIntent> {
        self.load(intent_id).await
    }

    pub async fn history(&self, intent_id: &IntentId) -> LifecycleResult<Vec<IntentStatusEvent>> {
        self.load(intent_id).await?;
        Ok(self.store.events(intent_id).await?)
    }

    pub async fn list(&self, filter: &IntentFilter) -> LifecycleResult<Vec<WriteIntent>> {
        Ok(self.store.list_intents(filter).await?)
    }

    /// Intents waiting on a human decision.
    pub async fn pending_review(&self) -> LifecycleResult<Vec<WriteIntent>> {
        self.list(&IntentFilter::new().with_status(IntentStatus::AwaitingHitl))
            .await
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    pub(crate) async fn load(&self, intent_id: &IntentId) -> LifecycleResult<WriteIntent> {
        self.store
            .get_intent(intent_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(intent_id.clone()))
    }

    /// Apply a state-machine edge.
    async fn transition(
        &self,
        intent: &WriteIntent,
        event: IntentStatusEvent,
    ) -> LifecycleResult<WriteIntent> {
        if !intent.status.can_transition_to(event.to_status) {
            return Err(refuse(intent, event.to_status, TransitionDenial::NotAllowed));
        }
        self.commit(intent, event).await
    }

    /// Record `event` against the store's compare-and-set.
    pub(crate) async fn commit(
        &self,
        intent: &WriteIntent,
        event: IntentStatusEvent,
    ) -> LifecycleResult<WriteIntent> {
        let from = intent.status;
        let to = event.to_status;
        match self
            .store
            .record_transition(&intent.intent_id, from, event)
            .await
        {
            Ok(recorded) => {
                info!(
                    intent_id = %intent.intent_id,
                    from = %from,
                    to = %to,
                    actor_type = %recorded.actor_type,
                    actor_id = %recorded.actor_id,
                    sequence = recorded.sequence,
                    "intent transitioned"
                );
                let mut updated = intent.clone();
                updated.status = to;
                Ok(updated)
            }
            Err(StoreError::Conflict(_)) => {
                let actual = self
                    .store
                    .get_intent(&intent.intent_id)
                    .await?
                    .map(|i| i.status)
                    .unwrap_or(from);
                Err(refuse(intent, to, TransitionDenial::StatusChanged { actual }))
            }
            Err(err) => Err(err.into()),
        }
    }
}

pub(crate) fn event(
    intent: &WriteIntent,
    to: IntentStatus,
    actor_type: ActorType,
    actor_id: &str,
) -> IntentStatusEvent {
    IntentStatusEvent::new(intent.intent_id.clone(), intent.status, to, actor_type, actor_id)
}

pub(crate) fn refuse(
    intent: &WriteIntent,
    to: IntentStatus,
    reason: TransitionDenial,
) -> LifecycleError {
    IntentTransitionError {
        intent_id: intent.intent_id.clone(),
        from: intent.status,
        to,
        reason,
    }
    .into()
}
