//! Code Generation
//!
//! Two projections of a graph snapshot:
//! - `ir`: the canonical JSON model description
//! - `pytorch`: framework source text built from the IR
//!
//! Both are recomputed from scratch on every call; `cache` memoizes source
//! output by IR content hash.

mod cache;
mod ir;
mod pytorch;

pub use cache::{content_hash, SourceCache};
pub use ir::{to_ir, LayerIr, ModelIr};
pub use pytorch::{render_value, PyTorchGenerator};

use crate::error::Result;

/// A target-framework source generator
pub trait CodeGenerator {
    /// Generate source text for `ir`
    ///
    /// # Errors
    /// `UnsupportedLayerKind` if the IR names a kind with no template
    fn generate(&self, ir: &ModelIr) -> Result<String>;

    /// Identifies generator configuration for caching
    fn fingerprint(&self) -> String;
}

/// Generate source with the default PyTorch generator
pub fn to_source(ir: &ModelIr) -> Result<String> {
    PyTorchGenerator::default().generate(ir)
}
