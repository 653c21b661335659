//! Layercraft CLI - Sequential Architecture Builder
//!
//! Command-line interface for building layer chains and exporting them.

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::debug;

use layercraft::cli::{commands, Cli, Commands};
use layercraft::CraftConfig;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    debug!("Layercraft v{}", env!("CARGO_PKG_VERSION"));

    let config = CraftConfig::resolve(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        Some(cmd) => handle_command(cmd, &config),
        None => {
            println!("Layercraft v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands, config: &CraftConfig) -> anyhow::Result<()> {
    let result = match cmd {
        Commands::Kinds => commands::list_kinds(),
        Commands::Init {
            path,
            input_dim,
            force,
        } => commands::init(&path, input_dim, force, config),
        Commands::Add { path, kind } => commands::add(&path, &kind, config),
        Commands::Set {
            path,
            id,
            assignments,
            strict,
        } => commands::set(&path, id, &assignments, strict, config),
        Commands::Remove { path, id } => commands::remove(&path, id, config),
        Commands::InputDim { path, value } => commands::input_dim(&path, value, config),
        Commands::Repropagate { path } => commands::repropagate(&path, config),
        Commands::Show { path } => commands::show(&path),
        Commands::Ir { path, output } => commands::export_ir(&path, output.as_deref(), config),
        Commands::Source { path, output } => {
            commands::export_source(&path, output.as_deref(), config)
        }
        Commands::Generate { ir, output } => commands::generate(&ir, output.as_deref(), config),
    };

    if let Err(err) = &result {
        for suggestion in err.recovery_suggestions() {
            eprintln!("hint: {}", suggestion);
        }
    }

    result.map_err(|err| anyhow::anyhow!("[{}] {}", err.error_code(), err))
}
