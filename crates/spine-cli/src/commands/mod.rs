pub mod fingerprint;
pub mod gate;
pub mod intent;
pub mod replay;
pub mod theory;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use serde_json::Value;
use spine_intent::{FileIntentStore, IntentLifecycle};

use crate::config::SpineConfig;
use crate::output::OutputFormat;

/// Whether a command's verdict was favourable. Errors are reported separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// FAIL or HOLD.
    Failure,
}

/// Shared state for command execution.
pub struct Context {
    pub config: SpineConfig,
    pub format: OutputFormat,
}

impl Context {
    pub async fn store(&self) -> anyhow::Result<Arc<FileIntentStore>> {
        let path = &self.config.store_path;
        let store = FileIntentStore::open(path)
            .await
            .with_context(|| format!("opening intent store {}", path.display()))?;
        Ok(Arc::new(store))
    }

    pub async fn lifecycle(&self) -> anyhow::Result<IntentLifecycle> {
        Ok(IntentLifecycle::new(self.store().await?).with_config(self.config.lifecycle.clone()))
    }
}

/// Parse `arg` as inline JSON, or read it from a file when prefixed with `@`.
pub fn read_json(arg: &str) -> anyhow::Result<Value> {
    match arg.strip_prefix('@') {
        Some(path) => read_json_file(Path::new(path)),
        None => serde_json::from_str(arg).context("parsing inline JSON"),
    }
}

pub fn read_json_file(path: &Path) -> anyhow::Result<Value> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_and_file_json() {
        assert_eq!(read_json("{\"a\":1}").unwrap()["a"], 1);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        std::fs::write(&path, "[1,2]").unwrap();
        let v = read_json(&format!("@{}", path.display())).unwrap();
        assert_eq!(v.as_array().unwrap().len(), 2);

        assert!(read_json("not json").is_err());
    }
}
