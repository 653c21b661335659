//! Error handling for Layercraft
//!
//! Every graph operation either returns a complete new snapshot or one of
//! these errors; the prior snapshot is never touched.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Layercraft operations
pub type Result<T> = std::result::Result<T, LayercraftError>;

/// Main error type for Layercraft operations
#[derive(Error, Debug)]
pub enum LayercraftError {
    // Catalog Errors
    #[error("Unknown layer kind: {kind}")]
    UnknownLayerKind { kind: String },

    // Graph Errors
    #[error("Layer not found: {id}")]
    LayerNotFound { id: u64 },

    #[error("Unknown setting '{key}' for layer kind {kind}")]
    UnknownSetting { kind: String, key: String },

    #[error("Invalid setting literal: {literal}")]
    InvalidSettingLiteral { literal: String },

    // Generation Errors
    #[error("Unsupported layer kind in IR: {kind}")]
    UnsupportedLayerKind { kind: String },

    #[error("Invalid activation name '{name}' on layer {index}")]
    InvalidActivation { name: String, index: usize },

    // History Errors
    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    // File Errors
    #[error("Failed to read file: {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}: {source}")]
    FileWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported project file version: {version}")]
    UnsupportedProjectVersion { version: u32 },

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LayercraftError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            LayercraftError::UnknownLayerKind { .. } => "UNKNOWN_LAYER_KIND",
            LayercraftError::LayerNotFound { .. } => "LAYER_NOT_FOUND",
            LayercraftError::UnknownSetting { .. } => "UNKNOWN_SETTING",
            LayercraftError::InvalidSettingLiteral { .. } => "INVALID_SETTING_LITERAL",
            LayercraftError::UnsupportedLayerKind { .. } => "UNSUPPORTED_LAYER_KIND",
            LayercraftError::InvalidActivation { .. } => "INVALID_ACTIVATION",
            LayercraftError::NothingToUndo => "NOTHING_TO_UNDO",
            LayercraftError::NothingToRedo => "NOTHING_TO_REDO",
            LayercraftError::FileReadError { .. } => "FILE_READ_ERROR",
            LayercraftError::FileWriteError { .. } => "FILE_WRITE_ERROR",
            LayercraftError::UnsupportedProjectVersion { .. } => "UNSUPPORTED_PROJECT_VERSION",
            LayercraftError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors leave the caller's snapshot intact and can be fixed
    /// by re-reading the current graph and retrying.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LayercraftError::LayerNotFound { .. }
                | LayercraftError::UnknownSetting { .. }
                | LayercraftError::InvalidSettingLiteral { .. }
                | LayercraftError::NothingToUndo
                | LayercraftError::NothingToRedo
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            LayercraftError::UnknownLayerKind { .. } => vec![
                "Run 'layercraft kinds' to list supported layer kinds",
                "Kind names are case-sensitive (e.g. Dense, SpatialConv)",
            ],
            LayercraftError::LayerNotFound { .. } => vec![
                "The layer may have been removed",
                "Run 'layercraft show <project>' to list current layer ids",
            ],
            LayercraftError::UnknownSetting { .. } => vec![
                "Check the setting name against the layer kind's fields",
                "Drop --strict to store the setting verbatim",
            ],
            LayercraftError::InvalidSettingLiteral { .. } => {
                vec!["Settings are written as key=value (e.g. outFeatures=256)"]
            }
            LayercraftError::UnsupportedLayerKind { .. } => vec![
                "The IR was produced by a newer tool or edited by hand",
                "Remove the layer or replace its kind with a supported one",
            ],
            LayercraftError::InvalidActivation { .. } => vec![
                "Activations name a torch.nn class (e.g. ReLU, Tanh, Softmax)",
                "Set activation=None to drop the activation",
            ],
            _ => vec![],
        }
    }
}
