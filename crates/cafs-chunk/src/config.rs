use serde::{Deserialize, Serialize};

use crate::error::{ChunkError, ChunkResult};

/// Default leaf size: 2 MiB.
pub const DEFAULT_LEAF_SIZE: u32 = 2 * 1024 * 1024;

/// Default bound on concurrent leaf uploads per writer.
pub const DEFAULT_MAX_CONCURRENT_UPLOADS: usize = 8;

/// Settings shared by every writer and reader a [`ChunkStore`](crate::ChunkStore) hands out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkStoreConfig {
    /// Size in bytes of every leaf except the last.
    pub leaf_size: u32,
    /// Prepended to the hex key to form a store path.
    pub prefix: String,
    /// Upper bound on leaf uploads in flight for one writer.
    pub max_concurrent_uploads: usize,
}

impl Default for ChunkStoreConfig {
    fn default() -> Self {
        Self {
            leaf_size: DEFAULT_LEAF_SIZE,
            prefix: String::new(),
            max_concurrent_uploads: DEFAULT_MAX_CONCURRENT_UPLOADS,
        }
    }
}

impl ChunkStoreConfig {
    pub fn with_leaf_size(mut self, leaf_size: u32) -> Self {
        self.leaf_size = leaf_size;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_max_concurrent_uploads(mut self, max: usize) -> Self {
        self.max_concurrent_uploads = max;
        self
    }

    /// Parse from a TOML fragment. Missing fields take their defaults.
    pub fn from_toml_str(s: &str) -> ChunkResult<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| ChunkError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ChunkResult<()> {
        if self.leaf_size == 0 {
            return Err(ChunkError::InvalidConfig("leaf_size must be positive".into()));
        }
        if self.max_concurrent_uploads == 0 {
            return Err(ChunkError::InvalidConfig(
                "max_concurrent_uploads must be positive".into(),
            ));
        }
        Ok(())
    }
}
