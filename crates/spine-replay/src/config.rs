use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Ids per ledger lookup.
    #[serde(default = "default_lookup_chunk_size")]
    pub lookup_chunk_size: usize,
}

fn default_lookup_chunk_size() -> usize {
    50
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            lookup_chunk_size: default_lookup_chunk_size(),
        }
    }
}

impl ReplayConfig {
    /// Chunk size, never zero.
    pub fn chunk_size(&self) -> usize {
        self.lookup_chunk_size.max(1)
    }
}
