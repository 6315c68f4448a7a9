//! Layered configuration: defaults, then an optional file, then `SPINE_*`
//! environment variables (`__` separates nested keys, for example
//! `SPINE_LIFECYCLE__BATCH_HOLD_HOURS=48`).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use spine_governance::GateConfig;
use spine_intent::LifecycleConfig;
use spine_replay::ReplayConfig;
use spine_theory::TheoryPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpineConfig {
    /// JSON file backing the intent store.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    #[serde(default)]
    pub theory: TheoryPolicy,

    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default)]
    pub replay: ReplayConfig,
}

impl Default for SpineConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            logging: LoggingConfig::default(),
            lifecycle: LifecycleConfig::default(),
            theory: TheoryPolicy::default(),
            gate: GateConfig::default(),
            replay: ReplayConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable logs.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("spine-intents.json")
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl SpineConfig {
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&SpineConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("SPINE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SpineConfig::default();
        assert_eq!(config.store_path, PathBuf::from("spine-intents.json"));
        assert_eq!(config.lifecycle.batch_hold_hours, 24);
        assert_eq!(config.replay.lookup_chunk_size, 50);
        assert!(!config.gate.allow_local_override);
        assert_eq!(config.theory, TheoryPolicy::default());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spine.toml");
        std::fs::write(
            &path,
            "store_path = \"/tmp/intents.json\"\n\n[lifecycle]\nbatch_hold_hours = 48\n\n[theory]\nfork_threshold = 0.7\n",
        )
        .unwrap();

        let config = SpineConfig::load(path.to_str()).unwrap();
        assert_eq!(config.store_path, PathBuf::from("/tmp/intents.json"));
        assert_eq!(config.lifecycle.batch_hold_hours, 48);
        assert_eq!(config.lifecycle.default_expiry_days, 7);
        assert_eq!(config.theory.fork_threshold, 0.7);
    }
}
