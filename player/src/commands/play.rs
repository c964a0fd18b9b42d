//! Play command - stream an engine to the default audio device

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

use blockbridge_core::{PlayState, StreamBridge};
use blockbridge_player::{AudioEndpoint, load_engine};

use super::HostArgs;

/// How often the main thread checks the play state
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Arguments for the play command
#[derive(Args)]
pub struct PlayArgs {
    /// Engine module (.wasm or .wat)
    pub module: PathBuf,

    /// Stop after this many seconds (default: play until the engine ends)
    #[arg(long)]
    pub seconds: Option<f64>,

    /// Feed the default input device to the engine
    #[arg(long)]
    pub input: bool,

    #[command(flatten)]
    pub host: HostArgs,
}

/// Execute the play command
pub fn execute(args: PlayArgs) -> Result<()> {
    let mut config = args.host.resolve()?;
    if args.input {
        config.audio.enable_input = true;
    }

    let engine = load_engine(&args.module, &config.engine)?;
    let mut bridge = StreamBridge::with_engine(
        engine,
        config.audio.host_input_channels(),
        config.audio.output_channels,
    );
    let mut events = bridge.subscribe(16);
    bridge.start()?;

    let endpoint = AudioEndpoint::open(bridge, &config.audio)?;
    info!(
        "Playing {} at {} Hz",
        args.module.display(),
        endpoint.sample_rate()
    );

    let deadline = args
        .seconds
        .map(|seconds| Instant::now() + Duration::from_secs_f64(seconds.max(0.0)));

    loop {
        for state in events.drain() {
            info!("Play state: {}", state);
        }
        if endpoint.watch().get() == PlayState::Ended {
            info!("Engine finished");
            break;
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            info!("Stopping after {:.1} seconds", args.seconds.unwrap_or_default());
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    Ok(())
}
