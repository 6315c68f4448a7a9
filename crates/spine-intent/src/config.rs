use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Lifecycle tuning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Expiry applied by `stage()` when the request carries none.
    #[serde(default = "default_expiry_days")]
    pub default_expiry_days: i64,
    /// How long a held batch stays deferred before it may be reactivated.
    #[serde(default = "default_batch_hold_hours")]
    pub batch_hold_hours: i64,
}

fn default_expiry_days() -> i64 {
    7
}

fn default_batch_hold_hours() -> i64 {
    24
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            default_expiry_days: default_expiry_days(),
            batch_hold_hours: default_batch_hold_hours(),
        }
    }
}

impl LifecycleConfig {
    pub fn default_expiry(&self) -> Duration {
        Duration::days(self.default_expiry_days)
    }

    pub fn batch_hold(&self) -> Duration {
        Duration::hours(self.batch_hold_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: LifecycleConfig = serde_json::from_str(r#"{"batch_hold_hours": 2}"#).unwrap();
        assert_eq!(cfg.default_expiry_days, 7);
        assert_eq!(cfg.batch_hold(), Duration::hours(2));
    }
}
