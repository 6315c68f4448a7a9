use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spine_types::{IntentId, ProposalId};

use crate::error::{StoreError, StoreResult};
use crate::model::{IntentStatus, IntentStatusEvent, WriteIntent};
use crate::store::IntentFilter;

/// Backend-agnostic store contents. Every operation is a single critical
/// section for whichever lock the backend wraps it in.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct StoreState {
    #[serde(default)]
    intents: BTreeMap<IntentId, WriteIntent>,
    #[serde(default)]
    events: BTreeMap<IntentId, Vec<IntentStatusEvent>>,
}

impl StoreState {
    pub(crate) fn insert(&mut self, intent: WriteIntent) -> StoreResult<()> {
        if self.intents.contains_key(&intent.intent_id) {
            return Err(StoreError::Conflict(format!(
                "intent {} already exists",
                intent.intent_id
            )));
        }
        self.events.entry(intent.intent_id.clone()).or_default();
        self.intents.insert(intent.intent_id.clone(), intent);
        Ok(())
    }

    pub(crate) fn get(&self, intent_id: &IntentId) -> Option<WriteIntent> {
        self.intents.get(intent_id).cloned()
    }

    pub(crate) fn get_by_proposal(&self, proposal_id: &ProposalId) -> Option<WriteIntent> {
        self.intents
            .values()
            .filter(|i| i.proposal_id.as_ref() == Some(proposal_id))
            .max_by_key(|i| i.created_at)
            .cloned()
    }

    pub(crate) fn compare_and_set(
        &mut self,
        intent_id: &IntentId,
        expected_from: IntentStatus,
        to: IntentStatus,
    ) -> StoreResult<()> {
        let intent = self
            .intents
            .get_mut(intent_id)
            .ok_or_else(|| StoreError::NotFound(format!("intent {intent_id} not found")))?;
        if intent.status != expected_from {
            return Err(StoreError::Conflict(format!(
                "intent {intent_id}: expected status {expected_from}, found {}",
                intent.status
            )));
        }
        intent.status = to;
        Ok(())
    }

    pub(crate) fn append(&mut self, mut event: IntentStatusEvent) -> StoreResult<IntentStatusEvent> {
        if !self.intents.contains_key(&event.intent_id) {
            return Err(StoreError::NotFound(format!(
                "intent {} not found",
                event.intent_id
            )));
        }
        let history = self.events.entry(event.intent_id.clone()).or_default();
        event.sequence = history.len() as u64 + 1;
        history.push(event.clone());
        Ok(event)
    }

    pub(crate) fn record_transition(
        &mut self,
        intent_id: &IntentId,
        expected_from: IntentStatus,
        event: IntentStatusEvent,
    ) -> StoreResult<IntentStatusEvent> {
        if &event.intent_id != intent_id {
            return Err(StoreError::InvalidInput(format!(
                "event for {} recorded against {intent_id}",
                event.intent_id
            )));
        }
        if event.from_status != expected_from {
            return Err(StoreError::InvalidInput(format!(
                "event from_status {} does not match expected {expected_from}",
                event.from_status
            )));
        }
        self.compare_and_set(intent_id, expected_from, event.to_status)?;
        self.append(event)
    }

    pub(crate) fn events(&self, intent_id: &IntentId) -> Vec<IntentStatusEvent> {
        self.events.get(intent_id).cloned().unwrap_or_default()
    }

    pub(crate) fn has_event_with_status(&self, intent_id: &IntentId, status: IntentStatus) -> bool {
        self.events
            .get(intent_id)
            .is_some_and(|h| h.iter().any(|e| e.to_status == status))
    }

    pub(crate) fn list(&self, filter: &IntentFilter) -> Vec<WriteIntent> {
        let mut out: Vec<WriteIntent> = self
            .intents
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.intent_id.cmp(&b.intent_id)));
        out
    }

    pub(crate) fn list_expirable(&self, cutoff: DateTime<Utc>) -> Vec<WriteIntent> {
        let mut out: Vec<WriteIntent> = self
            .intents
            .values()
            .filter(|i| !i.is_terminal() && i.is_expired_at(cutoff))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.intent_id.cmp(&b.intent_id)));
        out
    }
}
