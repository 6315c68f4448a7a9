use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use spine_types::{IntentId, ProposalId};

use crate::error::{StoreError, StoreResult};
use crate::model::{IntentStatus, IntentStatusEvent, WriteIntent};
use crate::store::state::StoreState;
use crate::store::{IntentFilter, IntentStore};

/// In-process intent store. Deterministic and test-friendly.
#[derive(Default)]
pub struct InMemoryIntentStore {
    state: RwLock<StoreState>,
}

impl InMemoryIntentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&StoreState) -> T) -> StoreResult<T> {
        let guard = self
            .state
            .read()
            .map_err(|_| StoreError::Backend("intent store lock poisoned".to_string()))?;
        Ok(f(&guard))
    }

    fn write<T>(&self, f: impl FnOnce(&mut StoreState) -> StoreResult<T>) -> StoreResult<T> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| StoreError::Backend("intent store lock poisoned".to_string()))?;
        f(&mut guard)
    }
}

#[async_trait]
impl IntentStore for InMemoryIntentStore {
    async fn insert_intent(&self, intent: WriteIntent) -> StoreResult<()> {
        self.write(|s| s.insert(intent))
    }

    async fn get_intent(&self, intent_id: &IntentId) -> StoreResult<Option<WriteIntent>> {
        self.read(|s| s.get(intent_id))
    }

    async fn get_by_proposal_id(
        &self,
        proposal_id: &ProposalId,
    ) -> StoreResult<Option<WriteIntent>> {
        self.read(|s| s.get_by_proposal(proposal_id))
    }

    async fn update_status(
        &self,
        intent_id: &IntentId,
        expected_from: IntentStatus,
        to: IntentStatus,
    ) -> StoreResult<()> {
        self.write(|s| s.compare_and_set(intent_id, expected_from, to))
    }

    async fn append_event(&self, event: IntentStatusEvent) -> StoreResult<u64> {
        self.write(|s| s.append(event).map(|e| e.sequence))
    }

    async fn record_transition(
        &self,
        intent_id: &IntentId,
        expected_from: IntentStatus,
        event: IntentStatusEvent,
    ) -> StoreResult<IntentStatusEvent> {
        self.write(|s| s.record_transition(intent_id, expected_from, event))
    }

    async fn events(&self, intent_id: &IntentId) -> StoreResult<Vec<IntentStatusEvent>> {
        self.read(|s| s.events(intent_id))
    }

    async fn has_event_with_status(
        &self,
        intent_id: &IntentId,
        status: IntentStatus,
    ) -> StoreResult<bool> {
        self.read(|s| s.has_event_with_status(intent_id, status))
    }

    async fn list_intents(&self, filter: &IntentFilter) -> StoreResult<Vec<WriteIntent>> {
        self.read(|s| s.list(filter))
    }

    async fn list_expirable(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<WriteIntent>> {
        self.read(|s| s.list_expirable(cutoff))
    }
}
