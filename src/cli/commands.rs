//! CLI Command Implementations
//!
//! Each mutating command loads the project, applies one session operation
//! and saves the result.

use std::fs;
use std::io;
use std::path::Path;

use log::{info, warn};

use crate::catalog::{self, SettingValue, Settings};
use crate::codegen::{CodeGenerator, ModelIr, PyTorchGenerator};
use crate::config::CraftConfig;
use crate::error::{LayercraftError, Result};
use crate::graph::{self, LayerGraph, LayerId};
use crate::project::ProjectFile;
use crate::session::Session;

/// List the catalog.
pub fn list_kinds() -> Result<()> {
    for descriptor in catalog::all() {
        let defaults = descriptor.default_settings();
        let fields: Vec<_> = defaults
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        println!(
            "{:<20} {:<8} {}",
            descriptor.kind,
            descriptor.prefix,
            fields.join(" ")
        );
    }
    Ok(())
}

/// Create a new project file.
pub fn init(path: &Path, input_dim: Option<usize>, force: bool, config: &CraftConfig) -> Result<()> {
    info!("Creating project at: {}", path.display());

    if path.exists() && !force {
        return Err(LayercraftError::FileWriteError {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::AlreadyExists, "project already exists"),
        });
    }

    let graph = LayerGraph::new(input_dim.unwrap_or(config.input_dimension));
    ProjectFile::new(graph).save(path)?;

    println!("Project created: {}", path.display());
    Ok(())
}

/// Append a layer.
pub fn add(path: &Path, kind: &str, config: &CraftConfig) -> Result<()> {
    let mut session = open_session(path, config)?;
    let id = session.append_named(kind)?;
    let position = session.graph().position(id).unwrap_or_default();
    save_session(path, session)?;

    println!("Added {} as layer {} at position {}", kind, id, position);
    Ok(())
}

/// Update settings on a layer.
pub fn set(
    path: &Path,
    id: u64,
    assignments: &[String],
    strict: bool,
    config: &CraftConfig,
) -> Result<()> {
    let patch = assignments
        .iter()
        .map(|a| parse_assignment(a))
        .collect::<Result<Settings>>()?;

    let config = CraftConfig {
        strict_settings: config.strict_settings || strict,
        ..config.clone()
    };
    let mut session = open_session(path, &config)?;
    session.update_settings(LayerId(id), &patch)?;
    save_session(path, session)?;

    println!("Updated layer {}", id);
    Ok(())
}

/// Remove a layer.
pub fn remove(path: &Path, id: u64, config: &CraftConfig) -> Result<()> {
    let mut session = open_session(path, config)?;
    session.remove(LayerId(id))?;
    save_session(path, session)?;

    println!("Removed layer {}", id);
    println!("Note: later layers keep their inferred input sizes; run 'repropagate' to refresh them");
    Ok(())
}

/// Change the input dimension.
pub fn input_dim(path: &Path, value: usize, config: &CraftConfig) -> Result<()> {
    let mut session = open_session(path, config)?;
    session.set_input_dimension(value);
    save_session(path, session)?;

    println!("Input dimension set to {}", value);
    Ok(())
}

/// Re-run dimension inference over the chain.
pub fn repropagate(path: &Path, config: &CraftConfig) -> Result<()> {
    let mut session = open_session(path, config)?;
    session.repropagate();
    save_session(path, session)?;

    println!("Dimensions repropagated");
    Ok(())
}

/// Print the chain.
pub fn show(path: &Path) -> Result<()> {
    let project = ProjectFile::load(path)?;
    let graph = &project.graph;

    println!("Input dimension: {}", graph.input_dimension());
    if graph.is_empty() {
        println!("No layers.");
        return Ok(());
    }

    println!("{:-<72}", "");
    for (position, (layer, shape)) in graph.layers().zip(graph.shapes()).enumerate() {
        let marker = if graph::is_shape_unmodeled(layer.kind) {
            " (placeholder)"
        } else {
            ""
        };
        let settings: Vec<_> = layer
            .settings
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        println!(
            "{:>3}  id {:<4} {:<20} -> {}{}",
            position, layer.id, layer.kind, shape, marker
        );
        println!("     {}", settings.join(" "));
    }
    println!("{:-<72}", "");

    Ok(())
}

/// Export the IR.
pub fn export_ir(path: &Path, output: Option<&Path>, config: &CraftConfig) -> Result<()> {
    let session = open_session(path, config)?;
    let json = session.ir().to_json_pretty()?;
    write_output(&json, output)
}

/// Export generated source.
pub fn export_source(path: &Path, output: Option<&Path>, config: &CraftConfig) -> Result<()> {
    let mut session = open_session(path, config)?;
    let source = session.source()?;
    write_output(&source, output)
}

/// Generate source straight from an IR file.
pub fn generate(ir_path: &Path, output: Option<&Path>, config: &CraftConfig) -> Result<()> {
    info!("Generating source from IR: {}", ir_path.display());

    let ir = ModelIr::load(ir_path)?;
    let generator = PyTorchGenerator::new(config.class_name.clone());
    let source = generator.generate(&ir)?;
    write_output(&source, output)
}

/// Parse a `key=value` assignment.
pub fn parse_assignment(assignment: &str) -> Result<(String, SettingValue)> {
    let (key, value) = assignment
        .split_once('=')
        .filter(|(key, _)| !key.trim().is_empty())
        .ok_or_else(|| LayercraftError::InvalidSettingLiteral {
            literal: assignment.to_string(),
        })?;
    Ok((key.trim().to_string(), SettingValue::parse_literal(value)?))
}

fn open_session(path: &Path, config: &CraftConfig) -> Result<Session> {
    let project = ProjectFile::load(path)?;
    Ok(Session::with_graph(project.graph, config))
}

fn save_session(path: &Path, session: Session) -> Result<()> {
    ProjectFile::new(session.into_graph()).save(path)
}

fn write_output(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text).map_err(|e| LayercraftError::FileWriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
            info!("Wrote {}", path.display());
        }
        None => {
            if text.is_empty() {
                warn!("Nothing to write");
            }
            print!("{}", text);
            if !text.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}
