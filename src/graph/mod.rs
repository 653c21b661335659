//! Layer Graph Module
//!
//! The single-chain layer model and append-time dimension inference:
//! - `layer`: layer identity and instances
//! - `shape`: output shapes and auto-field derivation
//! - `model`: the copy-on-write graph snapshot

mod layer;
mod model;
pub mod shape;

pub use layer::{LayerId, LayerInstance, MAX_LAYER_ID};
pub use model::LayerGraph;
pub use shape::{derive_auto_field, is_shape_unmodeled, output_shape, Shape};
