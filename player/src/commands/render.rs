//! Render command - offline rendering to WAV

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use blockbridge_core::StreamBridge;
use blockbridge_player::{load_engine, render_to_wav};

use super::HostArgs;

/// Arguments for the render command
#[derive(Args)]
pub struct RenderArgs {
    /// Engine module (.wasm or .wat)
    pub module: PathBuf,

    /// Output WAV file
    pub output: PathBuf,

    /// Length to render; rendering stops earlier if the engine ends
    #[arg(long, default_value = "10")]
    pub seconds: f64,

    #[command(flatten)]
    pub host: HostArgs,
}

/// Execute the render command
pub fn execute(args: RenderArgs) -> Result<()> {
    anyhow::ensure!(
        args.seconds.is_finite() && args.seconds >= 0.0,
        "--seconds must be a non-negative number"
    );
    let config = args.host.resolve()?;

    let engine = load_engine(&args.module, &config.engine)?;
    let mut bridge = StreamBridge::with_engine(engine, 0, config.audio.output_channels);
    bridge.start()?;

    let frames = (args.seconds * f64::from(config.audio.sample_rate)).round() as u64;
    let written = render_to_wav(
        &mut bridge,
        &args.output,
        frames,
        config.audio.buffer_frames,
        config.audio.sample_rate,
    )?;

    println!(
        "Wrote {} frames ({:.2}s) to {}",
        written,
        written as f64 / f64::from(config.audio.sample_rate),
        args.output.display()
    );
    Ok(())
}
