//! Info command - print engine geometry

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use blockbridge_core::{OutputMapping, SynthesisEngine};
use blockbridge_player::load_engine;

use super::HostArgs;

/// Arguments for the info command
#[derive(Args)]
pub struct InfoArgs {
    /// Engine module (.wasm or .wat)
    pub module: PathBuf,

    #[command(flatten)]
    pub host: HostArgs,
}

/// Execute the info command
pub fn execute(args: InfoArgs) -> Result<()> {
    let config = args.host.resolve()?;
    let engine = load_engine(&args.module, &config.engine)?;
    let mapping = OutputMapping::new(engine.output_channels(), config.audio.output_channels);

    println!("Engine:          {}", args.module.display());
    println!("Block size:      {} frames", engine.block_size());
    println!("Output channels: {}", engine.output_channels());
    println!("Input channels:  {}", engine.input_channels());
    println!("0dBFS:           {}", engine.reference_level());
    println!("Memory:          {} bytes", engine.memory_size());
    println!("Output mapping:  {}", mapping);
    if !mapping.is_supported() {
        println!(
            "                 (host output would be silent; try --channels {})",
            engine.output_channels()
        );
    }
    Ok(())
}
