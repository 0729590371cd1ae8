use serde::{Deserialize, Serialize};

use crate::error::{BuilderError, Result};

/// Policy knobs shared by the partition and global builders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Reject a global build whose partition count differs from
    /// `rows * columns`. Off by default: readers reconcile partial objects.
    pub enforce_partition_count: bool,
    /// Delete the column objects already created when a later column of the
    /// same partition fails to build.
    pub rollback_on_failure: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            enforce_partition_count: false,
            rollback_on_failure: true,
        }
    }
}

impl BuilderConfig {
    /// Default policy plus partition-count enforcement.
    pub fn strict() -> Self {
        Self {
            enforce_partition_count: true,
            ..Default::default()
        }
    }

    /// Parse from TOML; keys left out keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| BuilderError::Config(e.to_string()))
    }
}
