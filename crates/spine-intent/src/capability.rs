//! Raw write access to durable state.
//!
//! A [`WriteCapability`] can only be minted inside this crate, and only by
//! [`crate::IntentLifecycle::execute_with`] once an intent has passed the
//! approval check. Writers receive it by value, so holding one is proof that
//! the write was approved.

use async_trait::async_trait;
use spine_types::{IntentId, Lane, ScopeLockId};

use crate::model::WriteIntent;

/// Unforgeable, single-use authorization to apply one approved intent.
#[derive(Debug)]
pub struct WriteCapability {
    intent_id: IntentId,
    execution_id: String,
    lane: Lane,
    scope_lock_id: Option<ScopeLockId>,
}

impl WriteCapability {
    pub(crate) fn mint(intent: &WriteIntent, execution_id: &str) -> Self {
        Self {
            intent_id: intent.intent_id.clone(),
            execution_id: execution_id.to_string(),
            lane: intent.lane,
            scope_lock_id: intent.scope_lock_id.clone(),
        }
    }

    pub fn intent_id(&self) -> &IntentId {
        &self.intent_id
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn lane(&self) -> Lane {
        self.lane
    }

    pub fn scope_lock_id(&self) -> Option<&ScopeLockId> {
        self.scope_lock_id.as_ref()
    }
}

/// Applies an approved intent to durable state.
///
/// Returns the mutation ids it committed.
#[async_trait]
pub trait MutationWriter: Send + Sync {
    async fn apply(
        &self,
        capability: WriteCapability,
        intent: &WriteIntent,
    ) -> Result<Vec<String>, String>;
}
