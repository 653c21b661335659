//! Dimension propagation
//!
//! Computes each layer's output shape and derives the auto-filled input
//! field of the next layer. Spatial extent is never tracked: a `Spatial`
//! shape carries only its channel count.

use std::fmt;

use log::warn;

use super::layer::LayerInstance;
use crate::catalog::{self, LayerKind, SettingValue, Settings, ShapeTransfer};

/// Abstract output descriptor of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Feature count
    Scalar(usize),
    /// Channel count only
    Spatial { channels: usize },
}

impl Shape {
    /// The single integer carried by either variant
    pub fn size(&self) -> usize {
        match self {
            Shape::Scalar(n) => *n,
            Shape::Spatial { channels } => *channels,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Scalar(n) => write!(f, "Scalar({})", n),
            Shape::Spatial { channels } => write!(f, "Spatial(channels={})", channels),
        }
    }
}

/// Output shape of `layer` given the shape flowing into it.
///
/// Total over all kinds. A governing setting that is missing, `Auto`,
/// non-integral or negative leaves the incoming shape unchanged.
pub fn output_shape(layer: &LayerInstance, incoming: Shape) -> Shape {
    match catalog::describe(layer.kind).transfer {
        ShapeTransfer::Scalar(field) => match read_dimension(&layer.settings, field) {
            Some(n) => Shape::Scalar(n),
            None => incoming,
        },
        ShapeTransfer::Spatial(field) => match read_dimension(&layer.settings, field) {
            Some(channels) => Shape::Spatial { channels },
            None => incoming,
        },
        ShapeTransfer::Identity => incoming,
        ShapeTransfer::Placeholder(n) => Shape::Scalar(n),
    }
}

/// Whether the kind's output shape is a placeholder rather than computed
pub fn is_shape_unmodeled(kind: LayerKind) -> bool {
    matches!(
        catalog::describe(kind).transfer,
        ShapeTransfer::Placeholder(_)
    )
}

/// Settings patch filling `new_kind`'s auto field from `incoming`.
///
/// A `Spatial` shape feeding a scalar-expecting kind hands over its channel
/// count and loses everything else. Kinds with no auto field get an empty
/// patch.
pub fn derive_auto_field(new_kind: LayerKind, incoming: Shape) -> Settings {
    let Some(field) = catalog::describe(new_kind).auto_field() else {
        return Settings::new();
    };

    let size = match (new_kind, incoming) {
        (LayerKind::Dense | LayerKind::MultiHeadAttention, Shape::Spatial { channels }) => {
            warn!(
                "{} fed by a spatial shape; using channel count {} as {}",
                new_kind, channels, field
            );
            channels
        }
        (_, shape) => shape.size(),
    };

    // Settings hold i64; larger sizes clamp rather than wrap
    let size = i64::try_from(size).unwrap_or(i64::MAX);
    Settings::new().with(field, SettingValue::Int(size))
}

/// Fold output shapes over `layers`, starting from `Scalar(input_dimension)`
pub fn chain_shapes<'a, I>(input_dimension: usize, layers: I) -> Vec<Shape>
where
    I: IntoIterator<Item = &'a LayerInstance>,
{
    let mut current = Shape::Scalar(input_dimension);
    layers
        .into_iter()
        .map(|layer| {
            current = output_shape(layer, current);
            current
        })
        .collect()
}

fn read_dimension(settings: &Settings, field: &str) -> Option<usize> {
    settings
        .get_int(field)
        .and_then(|n| usize::try_from(n).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FLATTEN_PLACEHOLDER_FEATURES;
    use crate::graph::layer::LayerId;
    use test_case::test_case;

    fn layer(kind: LayerKind) -> LayerInstance {
        LayerInstance::new(LayerId(0), kind, catalog::describe(kind).default_settings())
    }

    #[test_case(LayerKind::Dense, Shape::Scalar(64), Shape::Scalar(128); "dense uses out features")]
    #[test_case(LayerKind::SpatialConv, Shape::Scalar(3), Shape::Spatial { channels: 32 }; "conv uses out channels")]
    #[test_case(LayerKind::SpatialBatchNorm, Shape::Spatial { channels: 16 }, Shape::Spatial { channels: 16 }; "batch norm is identity")]
    #[test_case(LayerKind::Dropout, Shape::Scalar(10), Shape::Scalar(10); "dropout is identity")]
    #[test_case(LayerKind::SpatialMaxPool, Shape::Spatial { channels: 8 }, Shape::Spatial { channels: 8 }; "pool keeps channels")]
    #[test_case(LayerKind::Flatten, Shape::Spatial { channels: 64 }, Shape::Scalar(FLATTEN_PLACEHOLDER_FEATURES); "flatten placeholder")]
    fn test_output_shape(kind: LayerKind, incoming: Shape, expected: Shape) {
        assert_eq!(output_shape(&layer(kind), incoming), expected);
    }

    #[test]
    fn test_attention_uses_embed_dim() {
        let mut attn = layer(LayerKind::MultiHeadAttention);
        attn.settings.insert("embedDim", SettingValue::Int(256));
        assert_eq!(output_shape(&attn, Shape::Scalar(10)), Shape::Scalar(256));
    }

    #[test]
    fn test_oversized_input_clamps_instead_of_wrapping() {
        let patch = derive_auto_field(LayerKind::Dense, Shape::Scalar(usize::MAX));
        assert_eq!(patch.get_int("inFeatures"), Some(i64::MAX));

        let patch = derive_auto_field(LayerKind::SpatialConv, Shape::Scalar(usize::MAX));
        assert_eq!(patch.get_int("inChannels"), Some(i64::MAX));
    }

    #[test]
    fn test_unset_dimension_passes_through() {
        let mut dense = layer(LayerKind::Dense);
        dense.settings.insert("outFeatures", SettingValue::Auto);
        assert_eq!(output_shape(&dense, Shape::Scalar(42)), Shape::Scalar(42));

        dense.settings.insert("outFeatures", SettingValue::Int(-3));
        assert_eq!(output_shape(&dense, Shape::Scalar(42)), Shape::Scalar(42));
    }

    #[test]
    fn test_flatten_placeholder_is_flagged() {
        assert!(is_shape_unmodeled(LayerKind::Flatten));
        for kind in LayerKind::ALL.into_iter().filter(|k| *k != LayerKind::Flatten) {
            assert!(!is_shape_unmodeled(kind), "{} should be modeled", kind);
        }

        let a = output_shape(&layer(LayerKind::Flatten), Shape::Spatial { channels: 3 });
        let b = output_shape(&layer(LayerKind::Flatten), Shape::Scalar(9999));
        assert_eq!(a, b);
        assert_eq!(a, Shape::Scalar(FLATTEN_PLACEHOLDER_FEATURES));
    }

    #[test]
    fn test_derive_spatial_into_dense() {
        let patch = derive_auto_field(LayerKind::Dense, Shape::Spatial { channels: 32 });
        assert_eq!(patch.get_int("inFeatures"), Some(32));
        assert_eq!(patch.len(), 1);
    }

    #[test]
    fn test_derive_spatial_into_attention() {
        let patch = derive_auto_field(
            LayerKind::MultiHeadAttention,
            Shape::Spatial { channels: 12 },
        );
        assert_eq!(patch.get_int("embedDim"), Some(12));
    }

    #[test]
    fn test_derive_scalar_into_conv() {
        let patch = derive_auto_field(LayerKind::SpatialConv, Shape::Scalar(3));
        assert_eq!(patch.get_int("inChannels"), Some(3));
    }

    #[test_case(LayerKind::Dropout; "dropout")]
    #[test_case(LayerKind::SpatialMaxPool; "max pool")]
    #[test_case(LayerKind::Flatten; "flatten")]
    fn test_derive_without_auto_field(kind: LayerKind) {
        assert!(derive_auto_field(kind, Shape::Scalar(10)).is_empty());
    }

    #[test]
    fn test_chain_shapes() {
        let layers = vec![
            layer(LayerKind::SpatialConv),
            layer(LayerKind::SpatialMaxPool),
            layer(LayerKind::Flatten),
            layer(LayerKind::Dense),
        ];
        let shapes = chain_shapes(3, &layers);
        assert_eq!(
            shapes,
            vec![
                Shape::Spatial { channels: 32 },
                Shape::Spatial { channels: 32 },
                Shape::Scalar(FLATTEN_PLACEHOLDER_FEATURES),
                Shape::Scalar(128),
            ]
        );
    }
}
