//! Layer Catalog
//!
//! Static registry of the supported layer kinds. Each kind has a descriptor
//! holding its default settings template (in canonical field order), the
//! field that receives the inferred input size, and its shape-transfer rule.

mod settings;

pub use settings::{SettingValue, Settings};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LayercraftError, Result};

/// Flattened feature count reported for every `Flatten` layer.
///
/// The real value depends on the channel and spatial extent of the incoming
/// tensor, which is not tracked. Downstream layers receive this placeholder.
pub const FLATTEN_PLACEHOLDER_FEATURES: usize = 128;

/// Activation value meaning "no activation"
pub const NO_ACTIVATION: &str = "None";

/// Fixed enumeration of supported layer kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    Dense,
    SpatialConv,
    SpatialBatchNorm,
    Dropout,
    MultiHeadAttention,
    SpatialMaxPool,
    Flatten,
}

impl LayerKind {
    /// Every kind, in catalog order
    pub const ALL: [LayerKind; 7] = [
        LayerKind::Dense,
        LayerKind::SpatialConv,
        LayerKind::SpatialBatchNorm,
        LayerKind::Dropout,
        LayerKind::MultiHeadAttention,
        LayerKind::SpatialMaxPool,
        LayerKind::Flatten,
    ];

    /// Stable identifier used in the IR
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Dense => "Dense",
            LayerKind::SpatialConv => "SpatialConv",
            LayerKind::SpatialBatchNorm => "SpatialBatchNorm",
            LayerKind::Dropout => "Dropout",
            LayerKind::MultiHeadAttention => "MultiHeadAttention",
            LayerKind::SpatialMaxPool => "SpatialMaxPool",
            LayerKind::Flatten => "Flatten",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayerKind {
    type Err = LayercraftError;

    fn from_str(s: &str) -> Result<Self> {
        LayerKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| LayercraftError::UnknownLayerKind {
                kind: s.to_string(),
            })
    }
}

/// How a field participates in inference and code generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    /// Filled from the preceding layer's output shape at append time
    Auto,
    /// Chosen by the user
    User,
    /// Names an activation applied after the layer; not a constructor argument
    Activation,
}

/// Compile-time default for a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Choice(&'static str),
    Auto,
}

impl DefaultValue {
    pub fn to_value(self) -> SettingValue {
        match self {
            DefaultValue::Int(n) => SettingValue::Int(n),
            DefaultValue::Float(x) => SettingValue::Float(x),
            DefaultValue::Bool(b) => SettingValue::Bool(b),
            DefaultValue::Choice(s) => SettingValue::Choice(s.to_string()),
            DefaultValue::Auto => SettingValue::Auto,
        }
    }
}

/// One field of a layer's settings template
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Name used in settings and the IR
    pub name: &'static str,
    /// Keyword argument name in the generated constructor call
    pub arg: &'static str,
    pub default: DefaultValue,
    pub role: FieldRole,
}

const fn field(name: &'static str, arg: &'static str, default: DefaultValue) -> FieldSpec {
    FieldSpec {
        name,
        arg,
        default,
        role: FieldRole::User,
    }
}

const fn auto_field(name: &'static str, arg: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        arg,
        default: DefaultValue::Auto,
        role: FieldRole::Auto,
    }
}

const fn activation_field(default: &'static str) -> FieldSpec {
    FieldSpec {
        name: "activation",
        arg: "activation",
        default: DefaultValue::Choice(default),
        role: FieldRole::Activation,
    }
}

/// Rule computing a layer's output shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeTransfer {
    /// Scalar feature count read from the named field
    Scalar(&'static str),
    /// Channel count read from the named field
    Spatial(&'static str),
    /// Output shape equals the incoming shape
    Identity,
    /// Scalar with a fixed, unmodeled feature count
    Placeholder(usize),
}

/// Immutable description of one layer kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerTypeDescriptor {
    pub kind: LayerKind,
    /// Name prefix for generated components (`<prefix><index>`)
    pub prefix: &'static str,
    /// Settings template in canonical order
    pub fields: &'static [FieldSpec],
    pub transfer: ShapeTransfer,
}

impl LayerTypeDescriptor {
    /// Fresh settings built from the template
    pub fn default_settings(&self) -> Settings {
        self.fields
            .iter()
            .map(|f| (f.name, f.default.to_value()))
            .collect()
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_known_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// The field receiving the inferred input size, if the kind has one
    pub fn auto_field(&self) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|f| f.role == FieldRole::Auto)
            .map(|f| f.name)
    }

    /// Whether the kind carries an activation setting
    pub fn has_activation(&self) -> bool {
        self.fields.iter().any(|f| f.role == FieldRole::Activation)
    }
}

static DENSE: LayerTypeDescriptor = LayerTypeDescriptor {
    kind: LayerKind::Dense,
    prefix: "fc",
    fields: &[
        auto_field("inFeatures", "in_features"),
        field("outFeatures", "out_features", DefaultValue::Int(128)),
        field("bias", "bias", DefaultValue::Bool(true)),
        activation_field(NO_ACTIVATION),
    ],
    transfer: ShapeTransfer::Scalar("outFeatures"),
};

static SPATIAL_CONV: LayerTypeDescriptor = LayerTypeDescriptor {
    kind: LayerKind::SpatialConv,
    prefix: "conv",
    fields: &[
        auto_field("inChannels", "in_channels"),
        field("outChannels", "out_channels", DefaultValue::Int(32)),
        field("kernelSize", "kernel_size", DefaultValue::Int(3)),
        field("stride", "stride", DefaultValue::Int(1)),
        field("padding", "padding", DefaultValue::Int(0)),
        activation_field("ReLU"),
    ],
    transfer: ShapeTransfer::Spatial("outChannels"),
};

static SPATIAL_BATCH_NORM: LayerTypeDescriptor = LayerTypeDescriptor {
    kind: LayerKind::SpatialBatchNorm,
    prefix: "bn",
    fields: &[
        auto_field("numFeatures", "num_features"),
        field("eps", "eps", DefaultValue::Float(1e-5)),
        field("momentum", "momentum", DefaultValue::Float(0.1)),
        field("affine", "affine", DefaultValue::Bool(true)),
    ],
    transfer: ShapeTransfer::Identity,
};

static DROPOUT: LayerTypeDescriptor = LayerTypeDescriptor {
    kind: LayerKind::Dropout,
    prefix: "dropout",
    fields: &[
        field("p", "p", DefaultValue::Float(0.5)),
        field("inplace", "inplace", DefaultValue::Bool(false)),
    ],
    transfer: ShapeTransfer::Identity,
};

static MULTI_HEAD_ATTENTION: LayerTypeDescriptor = LayerTypeDescriptor {
    kind: LayerKind::MultiHeadAttention,
    prefix: "attn",
    fields: &[
        auto_field("embedDim", "embed_dim"),
        field("numHeads", "num_heads", DefaultValue::Int(8)),
        field("dropout", "dropout", DefaultValue::Float(0.0)),
        field("batchFirst", "batch_first", DefaultValue::Bool(true)),
    ],
    transfer: ShapeTransfer::Scalar("embedDim"),
};

static SPATIAL_MAX_POOL: LayerTypeDescriptor = LayerTypeDescriptor {
    kind: LayerKind::SpatialMaxPool,
    prefix: "pool",
    fields: &[
        field("kernelSize", "kernel_size", DefaultValue::Int(2)),
        field("stride", "stride", DefaultValue::Auto),
        field("padding", "padding", DefaultValue::Int(0)),
    ],
    transfer: ShapeTransfer::Identity,
};

static FLATTEN: LayerTypeDescriptor = LayerTypeDescriptor {
    kind: LayerKind::Flatten,
    prefix: "flatten",
    fields: &[
        field("startDim", "start_dim", DefaultValue::Int(1)),
        field("endDim", "end_dim", DefaultValue::Int(-1)),
    ],
    transfer: ShapeTransfer::Placeholder(FLATTEN_PLACEHOLDER_FEATURES),
};

/// Look up the descriptor for a kind
pub fn describe(kind: LayerKind) -> &'static LayerTypeDescriptor {
    match kind {
        LayerKind::Dense => &DENSE,
        LayerKind::SpatialConv => &SPATIAL_CONV,
        LayerKind::SpatialBatchNorm => &SPATIAL_BATCH_NORM,
        LayerKind::Dropout => &DROPOUT,
        LayerKind::MultiHeadAttention => &MULTI_HEAD_ATTENTION,
        LayerKind::SpatialMaxPool => &SPATIAL_MAX_POOL,
        LayerKind::Flatten => &FLATTEN,
    }
}

/// Look up a descriptor by its IR name
pub fn describe_named(name: &str) -> Result<&'static LayerTypeDescriptor> {
    let kind: LayerKind = name.parse()?;
    Ok(describe(kind))
}

/// All descriptors in catalog order
pub fn all() -> impl Iterator<Item = &'static LayerTypeDescriptor> {
    LayerKind::ALL.into_iter().map(describe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(LayerKind::Dense, Some("inFeatures"); "dense")]
    #[test_case(LayerKind::SpatialConv, Some("inChannels"); "conv")]
    #[test_case(LayerKind::SpatialBatchNorm, Some("numFeatures"); "batch norm")]
    #[test_case(LayerKind::Dropout, None; "dropout")]
    #[test_case(LayerKind::MultiHeadAttention, Some("embedDim"); "attention")]
    #[test_case(LayerKind::SpatialMaxPool, None; "max pool")]
    #[test_case(LayerKind::Flatten, None; "flatten")]
    fn test_auto_field(kind: LayerKind, expected: Option<&str>) {
        assert_eq!(describe(kind).auto_field(), expected);
    }

    #[test]
    fn test_descriptor_kind_matches() {
        for kind in LayerKind::ALL {
            assert_eq!(describe(kind).kind, kind);
        }
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in LayerKind::ALL {
            assert_eq!(kind.as_str().parse::<LayerKind>().unwrap(), kind);
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }

    #[test]
    fn test_unknown_kind() {
        let err = describe_named("Conv3d").unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_LAYER_KIND");
        assert!(describe_named("dense").is_err());
    }

    #[test]
    fn test_default_settings_order() {
        let settings = describe(LayerKind::Dense).default_settings();
        let keys: Vec<_> = settings.keys().collect();
        assert_eq!(keys, vec!["inFeatures", "outFeatures", "bias", "activation"]);
        assert!(settings.get("inFeatures").unwrap().is_auto());
        assert_eq!(settings.get_int("outFeatures"), Some(128));
        assert_eq!(
            settings.get("activation").and_then(SettingValue::as_choice),
            Some(NO_ACTIVATION)
        );
    }

    #[test]
    fn test_dropout_defaults() {
        let settings = describe(LayerKind::Dropout).default_settings();
        let json = serde_json::to_string(&settings).unwrap();
        assert_eq!(json, r#"{"p":0.5,"inplace":false}"#);
    }

    #[test]
    fn test_batch_norm_eps() {
        let settings = describe(LayerKind::SpatialBatchNorm).default_settings();
        match settings.get("eps") {
            Some(SettingValue::Float(eps)) => approx::assert_relative_eq!(*eps, 1e-5),
            other => panic!("unexpected eps: {:?}", other),
        }
    }

    #[test]
    fn test_activation_fields() {
        assert!(describe(LayerKind::Dense).has_activation());
        assert!(describe(LayerKind::SpatialConv).has_activation());
        assert!(!describe(LayerKind::Dropout).has_activation());
        assert!(!describe(LayerKind::MultiHeadAttention).has_activation());
    }
}
