use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::digest::sha256_canonical;

const V1_KEYS: &[&str] = &[
    "session_id",
    "query_hash",
    "scope_lock_id",
    "intent_id",
    "proposal_id",
    "evidence_ids",
];
const V2_KEYS: &[&str] = &["mutation_ids"];
const V3_KEYS: &[&str] = &["tenant_id"];

/// Versioned subset of capsule manifest fields covered by the capsule hash.
///
/// Older capsules predate mutation snapshots (v1) and tenant attribution
/// (v2). The version is chosen from which fields are present, so a capsule
/// sealed by an older release keeps verifying.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestVersion {
    V1,
    V2,
    V3,
}

impl ManifestVersion {
    /// Select the version for a manifest by field presence.
    pub fn detect(manifest: &Map<String, Value>) -> Self {
        if manifest.contains_key("tenant_id") {
            ManifestVersion::V3
        } else if manifest.contains_key("mutation_ids") {
            ManifestVersion::V2
        } else {
            ManifestVersion::V1
        }
    }

    /// Keys this version hashes.
    pub fn allowed_keys(&self) -> Vec<&'static str> {
        let mut keys = V1_KEYS.to_vec();
        if *self >= ManifestVersion::V2 {
            keys.extend_from_slice(V2_KEYS);
        }
        if *self >= ManifestVersion::V3 {
            keys.extend_from_slice(V3_KEYS);
        }
        keys
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestVersion::V1 => "v1",
            ManifestVersion::V2 => "v2",
            ManifestVersion::V3 => "v3",
        }
    }
}

impl fmt::Display for ManifestVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full 64-char SHA-256 over `capsule_id` and the `version` subset of `manifest`.
///
/// Keys outside the version's allowed set never reach the hash.
pub fn make_capsule_manifest_hash(
    capsule_id: &str,
    manifest: &Map<String, Value>,
    version: ManifestVersion,
) -> String {
    let mut canonical = Map::new();
    canonical.insert("capsule_id".into(), Value::String(capsule_id.to_string()));
    for key in version.allowed_keys() {
        if let Some(value) = manifest.get(key) {
            canonical.insert(key.to_string(), value.clone());
        }
    }
    sha256_canonical(&Value::Object(canonical))
}
