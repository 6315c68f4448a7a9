use serde::{Deserialize, Serialize};

/// Declares a string-backed identifier newtype.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True when the identifier is empty or whitespace only.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Write-intent identifier, `intent_<12 hex>`.
    IntentId
);
string_id!(
    /// Status-event identifier, `evt_<12 hex>`.
    EventId
);
string_id!(
    /// Deterministic theory-change proposal identifier.
    ProposalId
);
string_id!(
    /// Scope lock binding a batch of work to an agreed hypothesis scope.
    ScopeLockId
);
string_id!(SessionId);
string_id!(ClaimId);

fn short_uuid() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    hex[..12].to_string()
}

impl IntentId {
    pub fn generate() -> Self {
        Self(format!("intent_{}", short_uuid()))
    }
}

impl EventId {
    pub fn generate() -> Self {
        Self(format!("evt_{}", short_uuid()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_prefixed_and_unique() {
        let a = IntentId::generate();
        let b = IntentId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("intent_"));
        assert_eq!(a.as_str().len(), "intent_".len() + 12);

        let e = EventId::generate();
        assert!(e.as_str().starts_with("evt_"));
    }

    #[test]
    fn serializes_transparently() {
        let id = ScopeLockId::from("sl-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"sl-1\"");
        let back: ScopeLockId = serde_json::from_str("\"sl-1\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn blank_detection() {
        assert!(ClaimId::from("   ").is_blank());
        assert!(!ClaimId::from("c1").is_blank());
    }
}
