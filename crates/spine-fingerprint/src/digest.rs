use serde_json::Value;
use sha2::{Digest, Sha256};
use spine_types::canonical_json;

/// Full lowercase hex SHA-256 of the canonical encoding of `payload`.
pub fn sha256_canonical(payload: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(payload).as_bytes());
    hex::encode(hasher.finalize())
}

/// `prefix` followed by the first `len` hex chars of the canonical digest.
pub fn prefixed(prefix: &str, payload: &Value, len: usize) -> String {
    let digest = sha256_canonical(payload);
    format!("{prefix}{}", &digest[..len.min(digest.len())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn digest_ignores_key_insertion_order() {
        let a = json!({"x": 1, "y": 2});
        let mut map = serde_json::Map::new();
        map.insert("y".into(), json!(2));
        map.insert("x".into(), json!(1));
        assert_eq!(sha256_canonical(&a), sha256_canonical(&Value::Object(map)));
    }

    #[test]
    fn known_vector() {
        // sha256("{}")
        assert_eq!(
            sha256_canonical(&json!({})),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }
}
