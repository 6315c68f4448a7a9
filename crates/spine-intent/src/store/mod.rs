//! Intent persistence.
//!
//! Intents are keyed by `intent_id`; events are append-only and keyed by
//! `(intent_id, sequence)`. Backends must make [`IntentStore::record_transition`]
//! atomic: the status compare-and-set and the event append land together
//! or not at all.

mod file;
mod memory;
mod state;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use spine_types::{IntentId, ProposalId};

use crate::error::StoreResult;
use crate::model::{IntentStatus, IntentStatusEvent, WriteIntent};

pub use file::FileIntentStore;
pub use memory::InMemoryIntentStore;

/// Filter for intent listings.
#[derive(Clone, Debug, Default)]
pub struct IntentFilter {
    pub status: Option<IntentStatus>,
    pub intent_type: Option<String>,
}

impl IntentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: IntentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_type(mut self, intent_type: impl Into<String>) -> Self {
        self.intent_type = Some(intent_type.into());
        self
    }

    /// Whether `intent` passes every field set on this filter.
    pub fn matches(&self, intent: &WriteIntent) -> bool {
        if let Some(status) = self.status {
            if intent.status != status {
                return false;
            }
        }
        if let Some(ref t) = self.intent_type {
            if &intent.intent_type != t {
                return false;
            }
        }
        true
    }
}

/// Storage seam for intents and their append-only event history.
#[async_trait]
pub trait IntentStore: Send + Sync {
    /// Persist a new intent. Fails with `Conflict` if the id exists.
    async fn insert_intent(&self, intent: WriteIntent) -> StoreResult<()>;

    /// Load an intent by id. `Ok(None)` when it was never staged.
    async fn get_intent(&self, intent_id: &IntentId) -> StoreResult<Option<WriteIntent>>;

    /// Most recently created intent carrying `proposal_id`.
    async fn get_by_proposal_id(&self, proposal_id: &ProposalId)
        -> StoreResult<Option<WriteIntent>>;

    /// Set status to `to` only if it is still `expected_from`.
    ///
    /// Appends no event. Lifecycle code goes through
    /// [`IntentStore::record_transition`] instead.
    async fn update_status(
        &self,
        intent_id: &IntentId,
        expected_from: IntentStatus,
        to: IntentStatus,
    ) -> StoreResult<()>;

    /// Append an event without touching status. Returns the assigned sequence.
    async fn append_event(&self, event: IntentStatusEvent) -> StoreResult<u64>;

    /// Atomically move `intent_id` from `expected_from` to `event.to_status`
    /// and append `event`. Returns the event with its sequence assigned.
    async fn record_transition(
        &self,
        intent_id: &IntentId,
        expected_from: IntentStatus,
        event: IntentStatusEvent,
    ) -> StoreResult<IntentStatusEvent>;

    /// Full event history of `intent_id`, ordered by sequence. Empty when
    /// the intent is unknown.
    async fn events(&self, intent_id: &IntentId) -> StoreResult<Vec<IntentStatusEvent>>;

    /// Whether any event in the history moved the intent into `status`.
    async fn has_event_with_status(
        &self,
        intent_id: &IntentId,
        status: IntentStatus,
    ) -> StoreResult<bool>;

    /// Intents matching every field set on `filter`, oldest first.
    async fn list_intents(&self, filter: &IntentFilter) -> StoreResult<Vec<WriteIntent>>;

    /// Non-terminal intents whose `expires_at` is before `cutoff`, oldest first.
    async fn list_expirable(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<WriteIntent>>;
}
