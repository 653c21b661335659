//! Configuration
//!
//! Loaded from a JSON file; every field is optional and falls back to its
//! default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LayercraftError, Result};

/// Entry feature count of a fresh graph (a flattened 28x28 image)
pub const DEFAULT_INPUT_DIMENSION: usize = 784;

/// Class name of the generated `nn.Module`
pub const DEFAULT_CLASS_NAME: &str = "GeneratedModel";

/// Default maximum number of undo levels to keep
pub const DEFAULT_MAX_UNDO_LEVELS: usize = 50;

/// Default number of generated sources a session keeps memoized
pub const DEFAULT_SOURCE_CACHE_ENTRIES: usize = 16;

/// Environment variable naming a config file
pub const CONFIG_ENV_VAR: &str = "LAYERCRAFT_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CraftConfig {
    /// Input dimension for newly created graphs
    pub input_dimension: usize,
    /// Class name used by the source generator
    pub class_name: String,
    /// Reject settings keys the layer kind does not declare
    pub strict_settings: bool,
    pub max_undo_levels: usize,
    /// Generated sources kept in the session's memo
    pub source_cache_entries: usize,
}

impl Default for CraftConfig {
    fn default() -> Self {
        Self {
            input_dimension: DEFAULT_INPUT_DIMENSION,
            class_name: DEFAULT_CLASS_NAME.to_string(),
            strict_settings: false,
            max_undo_levels: DEFAULT_MAX_UNDO_LEVELS,
            source_cache_entries: DEFAULT_SOURCE_CACHE_ENTRIES,
        }
    }
}

impl CraftConfig {
    /// Load a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| LayercraftError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Resolve the effective config: an explicit path wins, then the
    /// `LAYERCRAFT_CONFIG` environment variable, then defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

        match path {
            Some(path) => {
                log::debug!("Loading config from {}", path.display());
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }
}
