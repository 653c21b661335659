//! Layercraft - Sequential Neural-Network Architecture Builder
//!
//! Layercraft models a single chain of typed layers and derives two
//! artifacts from it:
//! 1. A canonical JSON model description (the IR)
//! 2. PyTorch source for an equivalent `nn.Module`
//!
//! # Architecture
//!
//! - `catalog`: the fixed set of layer kinds and their default settings
//! - `graph`: copy-on-write graph snapshots and append-time shape inference
//! - `codegen`: IR projection and source generation
//! - `session`: current-snapshot holder with undo/redo for front ends
//!
//! Input-style fields are inferred once, when a layer is appended. Later
//! edits, removals and input-dimension changes leave them as they are
//! unless `repropagate` is called.

pub mod catalog;
pub mod cli;
pub mod codegen;
pub mod config;
pub mod error;
pub mod graph;
pub mod project;
pub mod session;

pub use catalog::{LayerKind, SettingValue, Settings};
pub use codegen::{to_ir, to_source, CodeGenerator, ModelIr, PyTorchGenerator};
pub use config::CraftConfig;
pub use error::{LayercraftError, Result};
pub use graph::{LayerGraph, LayerId, LayerInstance, Shape};
pub use session::Session;
