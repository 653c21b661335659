//! Model IR
//!
//! Canonical JSON description of a layer chain. Ids and placement data are
//! dropped; settings are copied verbatim, `Auto` included (as `null`).
//! Key order is fixed by field order here and by settings insertion order,
//! so identical graphs always serialize to identical bytes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::Settings;
use crate::error::{LayercraftError, Result};
use crate::graph::LayerGraph;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelIr {
    pub input_dimension: usize,
    pub layers: Vec<LayerIr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerIr {
    /// Kind name; kept as text so IR files naming unknown kinds still load
    pub kind: String,
    pub settings: Settings,
}

/// Project a graph snapshot into the IR
pub fn to_ir(graph: &LayerGraph) -> ModelIr {
    ModelIr {
        input_dimension: graph.input_dimension(),
        layers: graph
            .layers()
            .map(|layer| LayerIr {
                kind: layer.kind.to_string(),
                settings: layer.settings.clone(),
            })
            .collect(),
    }
}

impl ModelIr {
    /// Compact JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read an IR file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| LayercraftError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&content)
    }
}
