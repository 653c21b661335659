//! Layer Graph
//!
//! An ordered chain of layer instances plus the network's entry feature
//! count. Every mutation takes `&self` and returns a new snapshot; layer
//! instances are shared between snapshots through `Arc` and copied only
//! when the layer itself changes.
//!
//! Input-style fields are inferred once, at append time. Editing, removing
//! or changing the input dimension never re-runs inference; `repropagate`
//! does so only when called explicitly.

use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::layer::{LayerId, LayerInstance, MAX_LAYER_ID};
use super::shape::{self, Shape};
use crate::catalog::{self, LayerKind, Settings};
use crate::config::DEFAULT_INPUT_DIMENSION;
use crate::error::{LayercraftError, Result};

/// Immutable snapshot of a sequential model under construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GraphRecord", into = "GraphRecord")]
pub struct LayerGraph {
    input_dimension: usize,
    layers: Vec<Arc<LayerInstance>>,
    next_id: u64,
}

impl LayerGraph {
    /// Create an empty graph
    pub fn new(input_dimension: usize) -> Self {
        Self {
            input_dimension,
            layers: Vec::new(),
            next_id: 1,
        }
    }

    /// Append a layer of `kind` with catalog defaults and an inferred input
    /// field.
    ///
    /// # Returns
    /// The new snapshot and the id assigned to the layer
    pub fn append(&self, kind: LayerKind) -> (Self, LayerId) {
        let incoming = self.output_shape();
        let patch = shape::derive_auto_field(kind, incoming);

        let mut settings = catalog::describe(kind).default_settings();
        settings.merge(&patch);

        let id = LayerId(self.next_id);
        let mut next = self.clone();
        next.layers
            .push(Arc::new(LayerInstance::new(id, kind, settings)));
        // Loaded counters are at most MAX_LAYER_ID, far below saturation
        next.next_id = next.next_id.saturating_add(1);

        debug!(
            "Appended {} as layer {} at position {} (incoming {})",
            kind,
            id,
            next.layers.len() - 1,
            incoming
        );
        (next, id)
    }

    /// Append by IR kind name
    ///
    /// # Errors
    /// `UnknownLayerKind` if `name` is not in the catalog
    pub fn append_named(&self, name: &str) -> Result<(Self, LayerId)> {
        let kind: LayerKind = name.parse()?;
        Ok(self.append(kind))
    }

    /// Merge `patch` into the addressed layer's settings.
    ///
    /// Keys the kind does not declare are stored verbatim.
    ///
    /// # Errors
    /// `LayerNotFound` if `id` is absent
    pub fn update_settings(&self, id: LayerId, patch: &Settings) -> Result<Self> {
        let index = self.index_of(id)?;
        let mut next = self.clone();
        Arc::make_mut(&mut next.layers[index])
            .settings
            .merge(patch);

        debug!("Updated {} setting(s) on layer {}", patch.len(), id);
        Ok(next)
    }

    /// Like `update_settings`, but rejects keys the kind does not declare.
    ///
    /// # Errors
    /// `LayerNotFound` if `id` is absent, `UnknownSetting` for the first
    /// undeclared key
    pub fn update_settings_strict(&self, id: LayerId, patch: &Settings) -> Result<Self> {
        let layer = self.get(id).ok_or(LayercraftError::LayerNotFound { id: id.0 })?;
        let descriptor = layer.descriptor();

        if let Some(key) = patch.keys().find(|key| !descriptor.is_known_field(key)) {
            return Err(LayercraftError::UnknownSetting {
                kind: layer.kind.to_string(),
                key: key.to_string(),
            });
        }

        self.update_settings(id, patch)
    }

    /// Remove the addressed layer. Other layers' settings are untouched.
    ///
    /// # Errors
    /// `LayerNotFound` if `id` is absent
    pub fn remove(&self, id: LayerId) -> Result<Self> {
        let index = self.index_of(id)?;
        let mut next = self.clone();
        let removed = next.layers.remove(index);

        debug!("Removed {} layer {} from position {}", removed.kind, id, index);
        Ok(next)
    }

    /// Replace the entry feature count. Existing layers are not re-inferred.
    pub fn set_input_dimension(&self, input_dimension: usize) -> Self {
        let mut next = self.clone();
        next.input_dimension = input_dimension;

        debug!(
            "Input dimension {} -> {}",
            self.input_dimension, input_dimension
        );
        next
    }

    /// Attach front-end placement data to a layer
    ///
    /// # Errors
    /// `LayerNotFound` if `id` is absent
    pub fn set_placement(&self, id: LayerId, placement: Value) -> Result<Self> {
        let index = self.index_of(id)?;
        let mut next = self.clone();
        Arc::make_mut(&mut next.layers[index]).placement = Some(placement);
        Ok(next)
    }

    /// Re-run auto-field inference over the whole chain.
    ///
    /// Only layers whose inferred field actually changes are copied.
    pub fn repropagate(&self) -> Self {
        let mut next = self.clone();
        let mut incoming = Shape::Scalar(next.input_dimension);
        let mut changed = 0;

        for slot in next.layers.iter_mut() {
            let patch = shape::derive_auto_field(slot.kind, incoming);
            let stale = patch
                .iter()
                .any(|(key, value)| slot.settings.get(key) != Some(value));
            if stale {
                Arc::make_mut(slot).settings.merge(&patch);
                changed += 1;
            }
            incoming = shape::output_shape(slot, incoming);
        }

        debug!("Repropagated {} layer(s), {} changed", next.layers.len(), changed);
        next
    }

    pub fn input_dimension(&self) -> usize {
        self.input_dimension
    }

    /// Layers in execution order
    pub fn layers(&self) -> impl Iterator<Item = &LayerInstance> {
        self.layers.iter().map(|layer| layer.as_ref())
    }

    pub fn get(&self, id: LayerId) -> Option<&LayerInstance> {
        self.layers().find(|layer| layer.id == id)
    }

    pub fn get_at(&self, index: usize) -> Option<&LayerInstance> {
        self.layers.get(index).map(|layer| layer.as_ref())
    }

    /// Zero-based sequence position of a layer
    pub fn position(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id == id)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Output shape of every layer, in order
    pub fn shapes(&self) -> Vec<Shape> {
        shape::chain_shapes(self.input_dimension, self.layers())
    }

    /// Shape leaving the last layer, or the input shape for an empty graph
    pub fn output_shape(&self) -> Shape {
        self.shapes()
            .last()
            .copied()
            .unwrap_or(Shape::Scalar(self.input_dimension))
    }

    fn index_of(&self, id: LayerId) -> Result<usize> {
        self.position(id)
            .ok_or(LayercraftError::LayerNotFound { id: id.0 })
    }
}

impl Default for LayerGraph {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_DIMENSION)
    }
}

/// Persisted form of a graph, including ids and the id counter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphRecord {
    input_dimension: usize,
    layers: Vec<LayerInstance>,
    #[serde(default)]
    next_id: u64,
}

impl TryFrom<GraphRecord> for LayerGraph {
    type Error = String;

    fn try_from(record: GraphRecord) -> std::result::Result<Self, Self::Error> {
        let mut seen = std::collections::HashSet::new();
        for layer in &record.layers {
            if !seen.insert(layer.id) {
                return Err(format!("duplicate layer id {}", layer.id));
            }
        }

        let high_water = record.layers.iter().map(|l| l.id.0).max().unwrap_or(0);
        if high_water > MAX_LAYER_ID {
            return Err(format!(
                "layer id {} is outside the id space (max {})",
                high_water, MAX_LAYER_ID
            ));
        }

        let next_id = record.next_id.max(high_water + 1);
        if next_id > MAX_LAYER_ID {
            return Err(format!("layer id space exhausted (next id {})", next_id));
        }

        Ok(Self {
            input_dimension: record.input_dimension,
            layers: record.layers.into_iter().map(Arc::new).collect(),
            next_id,
        })
    }
}

impl From<LayerGraph> for GraphRecord {
    fn from(graph: LayerGraph) -> Self {
        Self {
            input_dimension: graph.input_dimension,
            layers: graph
                .layers
                .into_iter()
                .map(|layer| Arc::try_unwrap(layer).unwrap_or_else(|shared| (*shared).clone()))
                .collect(),
            next_id: graph.next_id,
        }
    }
}

impl LayerGraph {
    /// Raise the id counter so ids issued by other snapshots are never reused
    pub(crate) fn with_next_id_at_least(&self, next_id: u64) -> Self {
        let mut next = self.clone();
        next.next_id = next.next_id.max(next_id);
        next
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.next_id
    }
}
