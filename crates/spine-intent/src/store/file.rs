use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use spine_types::{IntentId, ProposalId};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::model::{IntentStatus, IntentStatusEvent, WriteIntent};
use crate::store::state::StoreState;
use crate::store::{IntentFilter, IntentStore};

/// Intent store persisted as a single JSON document.
///
/// Nothing is cached between calls. Reads hold a shared lock on a sibling
/// `.lock` file; every mutation holds the exclusive lock, re-reads the
/// document, applies the change, and renames a temp file over the original.
/// Handles in different processes therefore see each other's writes, and a
/// compare-and-set can never be applied against a stale snapshot.
pub struct FileIntentStore {
    path: PathBuf,
    lock_path: PathBuf,
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("intents"));
    name.push(suffix);
    path.with_file_name(name)
}

fn open_lock(lock_path: &Path) -> StoreResult<File> {
    if let Some(parent) = lock_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(lock_path)?)
}

fn load(path: &Path) -> StoreResult<StoreState> {
    match std::fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Ok(StoreState::default()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(StoreState::default()),
        Err(err) => Err(err.into()),
    }
}

fn save(path: &Path, state: &StoreState) -> StoreResult<()> {
    let bytes = serde_json::to_vec_pretty(state)?;
    let tmp = sibling(path, ".tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

impl FileIntentStore {
    /// Open `path`, starting empty if it does not exist yet.
    ///
    /// The document is parsed once here so a corrupt file fails at open.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let store = Self {
            lock_path: sibling(&path, ".lock"),
            path,
        };
        store.read(|_| ()).await?;
        debug!(path = %store.path.display(), "opened intent store");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read<T>(&self, f: impl FnOnce(&StoreState) -> T + Send + 'static) -> StoreResult<T>
    where
        T: Send + 'static,
    {
        let path = self.path.clone();
        let lock_path = self.lock_path.clone();
        tokio::task::spawn_blocking(move || {
            let lock = open_lock(&lock_path)?;
            FileExt::lock_shared(&lock)?;
            let state = load(&path)?;
            drop(lock);
            Ok(f(&state))
        })
        .await
        .map_err(|err| StoreError::Backend(format!("store task failed: {err}")))?
    }

    /// Apply `f` to the current document under the exclusive lock. Nothing
    /// is written when `f` fails.
    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut StoreState) -> StoreResult<T> + Send + 'static,
    ) -> StoreResult<T>
    where
        T: Send + 'static,
    {
        let path = self.path.clone();
        let lock_path = self.lock_path.clone();
        tokio::task::spawn_blocking(move || {
            let lock = open_lock(&lock_path)?;
            FileExt::lock_exclusive(&lock)?;
            let mut state = load(&path)?;
            let out = f(&mut state)?;
            save(&path, &state)?;
            drop(lock);
            Ok(out)
        })
        .await
        .map_err(|err| StoreError::Backend(format!("store task failed: {err}")))?
    }
}

#[async_trait]
impl IntentStore for FileIntentStore {
    async fn insert_intent(&self, intent: WriteIntent) -> StoreResult<()> {
        self.mutate(|s| s.insert(intent)).await
    }

    async fn get_intent(&self, intent_id: &IntentId) -> StoreResult<Option<WriteIntent>> {
        let id = intent_id.clone();
        self.read(move |s| s.get(&id)).await
    }

    async fn get_by_proposal_id(
        &self,
        proposal_id: &ProposalId,
    ) -> StoreResult<Option<WriteIntent>> {
        let id = proposal_id.clone();
        self.read(move |s| s.get_by_proposal(&id)).await
    }

    async fn update_status(
        &self,
        intent_id: &IntentId,
        expected_from: IntentStatus,
        to: IntentStatus,
    ) -> StoreResult<()> {
        let id = intent_id.clone();
        self.mutate(move |s| s.compare_and_set(&id, expected_from, to))
            .await
    }

    async fn append_event(&self, event: IntentStatusEvent) -> StoreResult<u64> {
        self.mutate(|s| s.append(event).map(|e| e.sequence)).await
    }

    async fn record_transition(
        &self,
        intent_id: &IntentId,
        expected_from: IntentStatus,
        event: IntentStatusEvent,
    ) -> StoreResult<IntentStatusEvent> {
        let id = intent_id.clone();
        self.mutate(move |s| s.record_transition(&id, expected_from, event))
            .await
    }

    async fn events(&self, intent_id: &IntentId) -> StoreResult<Vec<IntentStatusEvent>> {
        let id = intent_id.clone();
        self.read(move |s| s.events(&id)).await
    }

    async fn has_event_with_status(
        &self,
        intent_id: &IntentId,
        status: IntentStatus,
    ) -> StoreResult<bool> {
        let id = intent_id.clone();
        self.read(move |s| s.has_event_with_status(&id, status)).await
    }

    async fn list_intents(&self, filter: &IntentFilter) -> StoreResult<Vec<WriteIntent>> {
        let filter = filter.clone();
        self.read(move |s| s.list(&filter)).await
    }

    async fn list_expirable(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<WriteIntent>> {
        self.read(move |s| s.list_expirable(cutoff)).await
    }
}
