//! Local-development override of a HOLD verdict.
//!
//! An override needs every key turned at once: the `unsafe-local-override`
//! cargo feature, [`GateConfig::allow_local_override`], the
//! `SPINE_UNSAFE_BYPASS_GOVERNANCE=true` flag, a development environment
//! name, and a local ledger host. Any CI marker denies it outright.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::code::HoldCode;
use crate::config::GateConfig;
use crate::error::{GovernanceError, GovernanceResult};

pub const BYPASS_FLAG_VAR: &str = "SPINE_UNSAFE_BYPASS_GOVERNANCE";
pub const ENVIRONMENT_VAR: &str = "SPINE_ENVIRONMENT";
pub const LEDGER_HOST_VAR: &str = "SPINE_LEDGER_HOST";

/// Variables whose presence marks a CI run.
pub const CI_MARKERS: &[&str] = &["CI", "GITHUB_ACTIONS", "GITLAB_CI", "BUILDKITE", "JENKINS_URL"];

const DEV_ENVIRONMENTS: &[&str] = &["dev", "development", "local"];
const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1"];

/// Snapshot of the process environment relevant to overrides.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OverrideEnvironment {
    pub bypass_requested: bool,
    /// CI markers found set.
    pub ci_markers: Vec<String>,
    pub environment: Option<String>,
    pub ledger_host: Option<String>,
}

impl OverrideEnvironment {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let ci_markers = CI_MARKERS
            .iter()
            .filter(|key| lookup(key).is_some_and(|v| is_truthy_marker(&v)))
            .map(|key| key.to_string())
            .collect();
        Self {
            bypass_requested: lookup(BYPASS_FLAG_VAR)
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("true")),
            ci_markers,
            environment: lookup(ENVIRONMENT_VAR).map(|v| v.trim().to_ascii_lowercase()),
            ledger_host: lookup(LEDGER_HOST_VAR).map(|v| v.trim().to_ascii_lowercase()),
        }
    }

    pub fn is_ci(&self) -> bool {
        !self.ci_markers.is_empty()
    }

    fn is_dev(&self) -> bool {
        self.environment
            .as_deref()
            .is_some_and(|e| DEV_ENVIRONMENTS.contains(&e))
    }

    fn is_local_ledger(&self) -> bool {
        self.ledger_host
            .as_deref()
            .is_some_and(|h| LOCAL_HOSTS.contains(&h))
    }
}

fn is_truthy_marker(value: &str) -> bool {
    let v = value.trim();
    !v.is_empty() && !v.eq_ignore_ascii_case("false") && v != "0"
}

/// Audit record of a granted override.
///
/// Only [`evaluate_override`] creates one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyOverride {
    reason: String,
    overridden_code: HoldCode,
    granted_at: DateTime<Utc>,
}

impl PolicyOverride {
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// The code the gate would have held with.
    pub fn overridden_code(&self) -> HoldCode {
        self.overridden_code
    }

    pub fn granted_at(&self) -> DateTime<Utc> {
        self.granted_at
    }
}

/// Decide whether a HOLD with `code` may be forced to STAGED.
pub fn evaluate_override(
    config: &GateConfig,
    env: &OverrideEnvironment,
    code: HoldCode,
) -> GovernanceResult<PolicyOverride> {
    if env.is_ci() {
        return Err(GovernanceError::OverrideDenied(format!(
            "CI environment detected ({})",
            env.ci_markers.join(", ")
        )));
    }
    if !cfg!(feature = "unsafe-local-override") {
        return Err(GovernanceError::OverrideDenied(
            "override support is not compiled into this build".into(),
        ));
    }
    if !config.allow_local_override {
        return Err(GovernanceError::OverrideDenied(
            "allow_local_override is disabled".into(),
        ));
    }
    if !env.bypass_requested {
        return Err(GovernanceError::OverrideDenied(format!("{BYPASS_FLAG_VAR} is not true")));
    }
    if !env.is_dev() {
        return Err(GovernanceError::OverrideDenied(format!(
            "{ENVIRONMENT_VAR} is not a development environment"
        )));
    }
    if !env.is_local_ledger() {
        return Err(GovernanceError::OverrideDenied(format!(
            "{LEDGER_HOST_VAR} is not a local host"
        )));
    }

    let reason = format!(
        "Local development override of {code} (environment={}, ledger_host={})",
        env.environment.as_deref().unwrap_or_default(),
        env.ledger_host.as_deref().unwrap_or_default()
    );
    warn!(hold_code = %code, reason = %reason, "governance HOLD overridden");
    Ok(PolicyOverride {
        reason,
        overridden_code: code,
        granted_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> OverrideEnvironment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        OverrideEnvironment::from_lookup(|k| map.get(k).cloned())
    }

    fn dev_env() -> Vec<(&'static str, &'static str)> {
        vec![
            (BYPASS_FLAG_VAR, "true"),
            (ENVIRONMENT_VAR, "Development"),
            (LEDGER_HOST_VAR, "localhost"),
        ]
    }

    fn enabled() -> GateConfig {
        GateConfig {
            allow_local_override: true,
        }
    }

    #[test]
    fn ci_always_denies() {
        for marker in CI_MARKERS {
            let mut vars = dev_env();
            vars.push((marker, "1"));
            let err = evaluate_override(&enabled(), &env(&vars), HoldCode::NoEvidencePersisted)
                .unwrap_err();
            assert!(err.to_string().contains("CI environment"), "{marker}");
        }
    }

    #[test]
    fn false_ci_marker_is_not_ci() {
        let e = env(&[("CI", "false")]);
        assert!(!e.is_ci());
    }

    #[test]
    fn config_flag_is_required() {
        let err = evaluate_override(&GateConfig::default(), &env(&dev_env()), HoldCode::NoIntentStaged);
        assert!(err.is_err());
    }

    #[test]
    fn environment_parsing() {
        let e = env(&dev_env());
        assert!(e.bypass_requested);
        assert!(e.is_dev());
        assert!(e.is_local_ledger());
        assert!(!env(&[(BYPASS_FLAG_VAR, "yes")]).bypass_requested);
        assert!(!env(&[(ENVIRONMENT_VAR, "production")]).is_dev());
        assert!(!env(&[(LEDGER_HOST_VAR, "ledger.internal")]).is_local_ledger());
    }

    #[cfg(not(feature = "unsafe-local-override"))]
    #[test]
    fn compiled_out_build_denies_everything() {
        let err = evaluate_override(&enabled(), &env(&dev_env()), HoldCode::NoEvidencePersisted)
            .unwrap_err();
        assert!(err.to_string().contains("not compiled"));
    }

    #[cfg(feature = "unsafe-local-override")]
    #[test]
    fn all_keys_grant_an_audited_override() {
        let o = evaluate_override(&enabled(), &env(&dev_env()), HoldCode::EvidenceSetMismatch)
            .unwrap();
        assert_eq!(o.overridden_code(), HoldCode::EvidenceSetMismatch);
        assert!(o.reason().contains("EVIDENCE_SET_MISMATCH"));
    }

    #[cfg(feature = "unsafe-local-override")]
    #[test]
    fn each_missing_key_denies() {
        let full = dev_env();
        for skip in 0..full.len() {
            let vars: Vec<_> = full
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != skip)
                .map(|(_, kv)| *kv)
                .collect();
            assert!(
                evaluate_override(&enabled(), &env(&vars), HoldCode::NoIntentStaged).is_err(),
                "missing {}",
                full[skip].0
            );
        }
    }
}
