//! Adversarial: the local override never fires under CI.

use std::sync::Arc;

use spine_governance::{GateConfig, GateInput, GateStatus, GovernanceGate, OverrideEnvironment};
use spine_intent::InMemoryIntentStore;
use spine_tests::SESSION;

#[tokio::test]
async fn every_key_turned_but_ci_still_holds() {
    for marker in spine_governance::CI_MARKERS {
        let env = OverrideEnvironment::from_lookup(|key| match key {
            "SPINE_UNSAFE_BYPASS_GOVERNANCE" => Some("true".into()),
            "SPINE_ENVIRONMENT" => Some("dev".into()),
            "SPINE_LEDGER_HOST" => Some("localhost".into()),
            k if k == *marker => Some("true".into()),
            _ => None,
        });
        let gate = GovernanceGate::new(
            Arc::new(InMemoryIntentStore::new()),
            GateConfig {
                allow_local_override: true,
            },
        )
        .with_environment(env);

        let summary = gate.evaluate(&GateInput::new(SESSION)).await;
        assert_eq!(summary.status, GateStatus::Hold, "{marker}");
        assert!(summary.policy_override.is_none());
    }
}
