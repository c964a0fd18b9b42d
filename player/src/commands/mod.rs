//! Subcommand implementations

pub mod info;
pub mod play;
pub mod render;

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use blockbridge_player::{PlayerConfig, config};

/// Config file and host layout overrides shared by every command
#[derive(Args)]
pub struct HostArgs {
    /// Config file to use instead of the platform config.toml
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output sample rate in Hz
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Host output channels
    #[arg(long)]
    pub channels: Option<usize>,

    /// Frames per host callback
    #[arg(long)]
    pub buffer_frames: Option<usize>,
}

impl HostArgs {
    /// Load the config and apply command-line overrides
    pub fn resolve(&self) -> Result<PlayerConfig> {
        let mut config = config::load(self.config.as_deref())?;
        if let Some(sample_rate) = self.sample_rate {
            config.audio.sample_rate = sample_rate;
        }
        if let Some(channels) = self.channels {
            config.audio.output_channels = channels;
        }
        if let Some(buffer_frames) = self.buffer_frames {
            config.audio.buffer_frames = buffer_frames;
        }
        Ok(config)
    }
}
