//! Layer instances

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{self, LayerKind, LayerTypeDescriptor, Settings};

/// Largest id a graph issues or accepts on load. Ids stay exactly
/// representable for front ends that read JSON numbers as doubles.
pub const MAX_LAYER_ID: u64 = (1 << 53) - 1;

/// Opaque, stable layer identity. Never reused within a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single layer in the chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerInstance {
    pub id: LayerId,
    pub kind: LayerKind,
    pub settings: Settings,
    /// Presentation data owned by the editor front end; stored, never read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Value>,
}

impl LayerInstance {
    pub fn new(id: LayerId, kind: LayerKind, settings: Settings) -> Self {
        Self {
            id,
            kind,
            settings,
            placement: None,
        }
    }

    pub fn descriptor(&self) -> &'static LayerTypeDescriptor {
        catalog::describe(self.kind)
    }
}
