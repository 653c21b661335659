//! Project File
//!
//! Persists a complete graph snapshot (ids, id counter and placement data
//! included) between CLI invocations. The IR is exported separately.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LayercraftError, Result};
use crate::graph::LayerGraph;

/// Current project file format version
pub const PROJECT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub version: u32,
    pub graph: LayerGraph,
}

impl ProjectFile {
    pub fn new(graph: LayerGraph) -> Self {
        Self {
            version: PROJECT_VERSION,
            graph,
        }
    }

    /// Load a project file
    ///
    /// # Errors
    /// `FileReadError` if it cannot be opened, `Serialization` if it is not a
    /// valid project, `UnsupportedProjectVersion` for other format versions
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| LayercraftError::FileReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let project: ProjectFile = serde_json::from_reader(BufReader::new(file))?;

        if project.version != PROJECT_VERSION {
            return Err(LayercraftError::UnsupportedProjectVersion {
                version: project.version,
            });
        }

        Ok(project)
    }

    /// Write the project file, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| LayercraftError::FileWriteError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let file = File::create(path).map_err(|e| LayercraftError::FileWriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush().map_err(|e| LayercraftError::FileWriteError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
