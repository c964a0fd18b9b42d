//! Offline rendering to WAV
//!
//! Drives the bridge the same way a host audio callback would, one fixed-size
//! buffer at a time, with no input device attached.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use blockbridge_core::{InputBuffer, OutputBuffer, PlayState, StreamBridge, SynthesisEngine};

/// Render up to `frames` frames from a started bridge into a 32-bit float WAV
///
/// Rendering stops after the buffer in which the play state reaches Ended.
/// That buffer is written whole, so the file ends with the silence the bridge
/// produced after the engine finished. Returns the number of frames written.
pub fn render_to_wav<E: SynthesisEngine>(
    bridge: &mut StreamBridge<E>,
    path: &Path,
    frames: u64,
    buffer_frames: usize,
    sample_rate: u32,
) -> Result<u64> {
    anyhow::ensure!(
        bridge.play_state() == PlayState::Running,
        "Bridge must be started before rendering (state is {})",
        bridge.play_state()
    );

    let channels = bridge.host_output_channels();
    let wav_channels = u16::try_from(channels)
        .ok()
        .filter(|&c| c > 0)
        .with_context(|| format!("Cannot write a WAV file with {} channels", channels))?;

    let spec = hound::WavSpec {
        channels: wav_channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let buffer_frames = buffer_frames.max(1);
    let mut buffer = vec![0.0f32; buffer_frames * channels];
    let input = InputBuffer::empty();
    let mut written = 0u64;

    while written < frames {
        let chunk = (frames - written).min(buffer_frames as u64) as usize;
        let samples = &mut buffer[..chunk * channels];
        bridge.process_callback(&input, &mut OutputBuffer::new(samples, channels));

        for &sample in samples.iter() {
            writer.write_sample(sample)?;
        }
        written += chunk as u64;

        if bridge.play_state() == PlayState::Ended {
            debug!("engine ended after {} frames", written);
            break;
        }
    }

    writer
        .finalize()
        .with_context(|| format!("Failed to finish {}", path.display()))?;
    info!("Rendered {} frames to {}", written, path.display());
    Ok(written)
}
