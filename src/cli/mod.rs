//! CLI Module
//!
//! Command-line front end: edits a project file one mutation at a time and
//! exports the IR or generated source.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Layercraft - sequential neural-network architecture builder
#[derive(Parser, Debug)]
#[command(name = "layercraft")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to $LAYERCRAFT_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List supported layer kinds and their default settings
    #[command(name = "kinds")]
    Kinds,

    /// Create a new, empty project file
    #[command(name = "init")]
    Init {
        /// Path for the project file
        path: PathBuf,

        /// Network input feature count
        #[arg(long)]
        input_dim: Option<usize>,

        /// Overwrite an existing project file
        #[arg(long)]
        force: bool,
    },

    /// Append a layer to the end of the chain
    #[command(name = "add")]
    Add {
        /// Path to the project file
        path: PathBuf,

        /// Layer kind (e.g. Dense, SpatialConv)
        kind: String,
    },

    /// Update settings on a layer
    #[command(name = "set")]
    Set {
        /// Path to the project file
        path: PathBuf,

        /// Layer id (see `show`)
        id: u64,

        /// Settings as key=value
        #[arg(required = true)]
        assignments: Vec<String>,

        /// Reject settings the layer kind does not declare
        #[arg(long)]
        strict: bool,
    },

    /// Remove a layer
    #[command(name = "remove")]
    Remove {
        /// Path to the project file
        path: PathBuf,

        /// Layer id (see `show`)
        id: u64,
    },

    /// Change the network input feature count
    #[command(name = "input-dim")]
    InputDim {
        /// Path to the project file
        path: PathBuf,

        /// New input feature count
        value: usize,
    },

    /// Re-infer every layer's input field from the current chain
    #[command(name = "repropagate")]
    Repropagate {
        /// Path to the project file
        path: PathBuf,
    },

    /// Print the layer chain with ids and shapes
    #[command(name = "show")]
    Show {
        /// Path to the project file
        path: PathBuf,
    },

    /// Export the model IR as JSON
    #[command(name = "ir")]
    Ir {
        /// Path to the project file
        path: PathBuf,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export generated PyTorch source
    #[command(name = "source")]
    Source {
        /// Path to the project file
        path: PathBuf,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate PyTorch source from an IR file
    #[command(name = "generate")]
    Generate {
        /// Path to the IR JSON file
        ir: PathBuf,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}
