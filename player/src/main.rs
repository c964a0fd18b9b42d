//! Blockbridge CLI - play and render WASM synthesis engines
//!
//! # Commands
//!
//! - `blockbridge play <engine.wasm>` - Stream an engine to the default audio device
//! - `blockbridge render <engine.wasm> <out.wav>` - Render an engine offline
//! - `blockbridge info <engine.wasm>` - Print engine geometry and channel mapping

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Blockbridge - stream block-based synthesis engines through host audio callbacks
#[derive(Parser)]
#[command(name = "blockbridge")]
#[command(about = "Play and render WASM synthesis engines")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream an engine to the default audio device
    Play(commands::play::PlayArgs),

    /// Render an engine offline to a WAV file
    Render(commands::render::RenderArgs),

    /// Print engine geometry and the channel mapping the host layout would use
    Info(commands::info::InfoArgs),
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play(args) => commands::play::execute(args),
        Commands::Render(args) => commands::render::execute(args),
        Commands::Info(args) => commands::info::execute(args),
    }
}
