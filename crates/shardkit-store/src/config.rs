use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Configuration for an [`InMemoryDeployment`](crate::InMemoryDeployment).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Undrained chunks a stream may hold before pushes are refused.
    pub max_stream_chunks: usize,
    /// Largest blob payload an instance accepts, in bytes.
    pub max_blob_bytes: usize,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            max_stream_chunks: 1024,
            max_blob_bytes: 64 * 1024 * 1024,
        }
    }
}

impl DeploymentConfig {
    /// Parse from TOML; keys left out keep their defaults.
    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        toml::from_str(s).map_err(|e| StoreError::Config(e.to_string()))
    }
}
