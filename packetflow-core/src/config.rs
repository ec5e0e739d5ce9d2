//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Default for [`EngineConfig::max_depth`].
pub const DEFAULT_MAX_DEPTH: usize = 1 << 20;

/// Tunables for evaluation passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Longest producer chain a pass will follow before aborting with
    /// `DepthExceeded`.
    ///
    /// Passes walk producers on a heap-allocated work stack, so this only
    /// bounds that stack's length. The default is far beyond any graph an
    /// editor holds.
    pub max_depth: usize,
}

impl EngineConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}
