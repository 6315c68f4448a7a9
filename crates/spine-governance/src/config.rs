use serde::{Deserialize, Serialize};

/// Gate settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Second key of the local-development override. Has no effect unless
    /// the crate is built with `unsafe-local-override`.
    pub allow_local_override: bool,
}
