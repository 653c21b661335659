//! Integration Tests
//!
//! End-to-end checks of append-time inference, IR projection and source
//! generation through the public API.

use layercraft::catalog::FLATTEN_PLACEHOLDER_FEATURES;
use layercraft::graph::{derive_auto_field, output_shape};
use layercraft::{
    to_ir, to_source, LayerGraph, LayerKind, LayerId, Session, Settings, Shape,
};
use pretty_assertions::assert_eq;

/// Helper to build a graph by appending kinds in order
fn build(input: usize, kinds: &[LayerKind]) -> LayerGraph {
    kinds
        .iter()
        .fold(LayerGraph::new(input), |graph, kind| graph.append(*kind).0)
}

/// A few fixed sequences covering every kind and both shape variants
fn sequences() -> Vec<Vec<LayerKind>> {
    use LayerKind::*;
    vec![
        vec![Dense, Dropout, Dense],
        vec![SpatialConv, SpatialBatchNorm, SpatialMaxPool, Flatten, Dense],
        vec![SpatialConv, Dense, MultiHeadAttention, Dense],
        vec![MultiHeadAttention, Dropout, SpatialConv, SpatialBatchNorm],
        vec![Flatten, Flatten, SpatialMaxPool, Dense],
        LayerKind::ALL.to_vec(),
    ]
}

// === Scenarios ===

#[test]
fn test_mnist_dense_dropout_scenario() {
    let graph = build(784, &[LayerKind::Dense, LayerKind::Dropout]);

    let dense = graph.get_at(0).unwrap();
    assert_eq!(dense.settings.get_int("inFeatures"), Some(784));
    assert_eq!(graph.output_shape(), Shape::Scalar(128));

    let ir = to_ir(&graph).to_json().unwrap();
    assert_eq!(
        ir,
        concat!(
            r#"{"inputDimension":784,"layers":["#,
            r#"{"kind":"Dense","settings":{"inFeatures":784,"outFeatures":128,"bias":true,"activation":"None"}},"#,
            r#"{"kind":"Dropout","settings":{"p":0.5,"inplace":false}}"#,
            r#"]}"#
        )
    );

    let source = to_source(&to_ir(&graph)).unwrap();
    let fc = source.find("self.fc0 = nn.Linear(").unwrap();
    let dropout = source.find("self.dropout1 = nn.Dropout(").unwrap();
    assert!(fc < dropout);

    let forward: Vec<_> = source
        .lines()
        .skip_while(|line| !line.contains("def forward"))
        .skip(1)
        .take_while(|line| !line.trim().starts_with("return"))
        .map(str::trim)
        .collect();
    assert_eq!(
        forward,
        vec!["x = self.fc0(x)", "x = self.dropout1(x)"]
    );
}

#[test]
fn test_conv_then_dense_takes_channel_count() {
    let graph = build(3, &[LayerKind::SpatialConv, LayerKind::Dense]);
    assert_eq!(graph.shapes()[0], Shape::Spatial { channels: 32 });
    assert_eq!(graph.get_at(1).unwrap().settings.get_int("inFeatures"), Some(32));
}

// === Properties ===

#[test]
fn test_append_inference_matches_derivation() {
    for kinds in sequences() {
        let graph = build(50, &kinds);
        let mut incoming = Shape::Scalar(50);

        for layer in graph.layers() {
            let expected = derive_auto_field(layer.kind, incoming);
            for (key, value) in expected.iter() {
                assert_eq!(layer.settings.get(key), Some(value), "{:?}", kinds);
            }
            incoming = output_shape(layer, incoming);
        }
    }
}

#[test]
fn test_serialization_is_deterministic() {
    for kinds in sequences() {
        let a = build(20, &kinds);
        // Same content reached through a different id history
        let (b, scratch) = LayerGraph::new(20).append(LayerKind::Dense);
        let b = b.remove(scratch).unwrap();
        let b = kinds.iter().fold(b, |graph, kind| graph.append(*kind).0);

        assert_eq!(to_ir(&a).to_json().unwrap(), to_ir(&b).to_json().unwrap());
    }
}

#[test]
fn test_source_generation_is_stable() {
    for kinds in sequences() {
        let graph = build(8, &kinds);
        let first = to_source(&to_ir(&graph)).unwrap();
        let second = to_source(&to_ir(&graph)).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_remove_leaves_other_settings_identical() {
    let kinds = sequences().pop().unwrap();
    let graph = build(16, &kinds);

    for position in 0..graph.len() {
        let target = graph.get_at(position).unwrap().id;
        let before: Vec<_> = graph
            .layers()
            .filter(|l| l.id != target)
            .map(|l| serde_json::to_string(&l.settings).unwrap())
            .collect();

        let after: Vec<_> = graph
            .remove(target)
            .unwrap()
            .layers()
            .map(|l| serde_json::to_string(&l.settings).unwrap())
            .collect();
        assert_eq!(after, before);
    }
}

#[test]
fn test_declaration_suffix_is_position() {
    for kinds in sequences() {
        let graph = build(8, &kinds);
        let source = to_source(&to_ir(&graph)).unwrap();

        for (position, layer) in graph.layers().enumerate() {
            let name = format!("self.{}{} = ", layer.descriptor().prefix, position);
            assert!(source.contains(&name), "missing {} in\n{}", name, source);
        }
    }
}

#[test]
fn test_flatten_placeholder_feeds_dense() {
    let graph = build(
        1,
        &[LayerKind::SpatialConv, LayerKind::Flatten, LayerKind::Dense],
    );
    assert_eq!(
        graph.get_at(2).unwrap().settings.get_int("inFeatures"),
        Some(FLATTEN_PLACEHOLDER_FEATURES as i64)
    );
}

// === Limitations kept as documented ===

#[test]
fn test_edit_leaves_downstream_stale_until_repropagate() {
    let graph = build(784, &[LayerKind::Dense, LayerKind::Dense]);
    let first = graph.get_at(0).unwrap().id;
    let edited = graph
        .update_settings(first, &Settings::new().with("outFeatures", 256_i64))
        .unwrap();

    assert_eq!(edited.get_at(1).unwrap().settings.get_int("inFeatures"), Some(128));
    assert_eq!(
        edited.repropagate().get_at(1).unwrap().settings.get_int("inFeatures"),
        Some(256)
    );
}

#[test]
fn test_unknown_keys_accepted_and_kept_in_ir() {
    let (graph, id) = LayerGraph::new(4).append(LayerKind::Dense);
    let graph = graph
        .update_settings(id, &Settings::new().with("initializer", "xavier"))
        .unwrap();

    let json = to_ir(&graph).to_json().unwrap();
    assert!(json.contains(r#""initializer":"xavier""#));
    assert!(!to_source(&to_ir(&graph)).unwrap().contains("initializer"));
}

#[test]
fn test_stale_id_errors_leave_graph_unchanged() {
    let graph = build(4, &[LayerKind::Dense]);
    assert!(graph.update_settings(LayerId(77), &Settings::new()).is_err());
    assert!(graph.remove(LayerId(77)).is_err());
    assert_eq!(graph.len(), 1);
}

// === Session ===

#[test]
fn test_session_round() {
    let mut session = Session::default();
    let conv = session.append(LayerKind::SpatialConv);
    session.append(LayerKind::Flatten);
    session.append(LayerKind::Dense);
    session.remove(conv).unwrap();
    assert_eq!(session.graph().len(), 2);

    session.undo().unwrap();
    assert_eq!(session.graph().len(), 3);
    assert_eq!(session.graph().position(conv), Some(0));

    let source = session.source().unwrap();
    assert!(source.contains("self.conv0 = nn.Conv2d(in_channels=784,"));
}
