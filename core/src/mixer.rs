//! Channel mixing between engine blocks and host frames
//!
//! Output mixing follows the Web Audio "speakers" up/down-mix rules for the
//! mono and stereo layouts:
//!
//! | engine | host | rule                              |
//! |--------|------|-----------------------------------|
//! | N      | N    | copy each channel                 |
//! | 2      | 1    | `0.5 * (L + R)`                   |
//! | 1      | 2    | duplicate the engine channel      |
//! | other  |      | unsupported, frame is silence     |
//!
//! Every output sample is divided by the engine's reference level (0dBFS) so
//! the host sees a unit-normalized signal. Input samples are multiplied by it.

use std::fmt;

/// Output channel mapping for one engine/host channel-count pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMapping {
    /// Same channel count on both sides
    Direct { channels: usize },
    /// Stereo engine into a mono host
    StereoToMono,
    /// Mono engine into a stereo host
    MonoToStereo,
    /// No mixing rule covers this pair
    Unsupported { engine: usize, host: usize },
}

impl OutputMapping {
    /// Pick the mapping for `engine_channels` -> `host_channels`
    pub fn new(engine_channels: usize, host_channels: usize) -> Self {
        match (engine_channels, host_channels) {
            (e, h) if e == h => OutputMapping::Direct { channels: e },
            (2, 1) => OutputMapping::StereoToMono,
            (1, 2) => OutputMapping::MonoToStereo,
            (engine, host) => OutputMapping::Unsupported { engine, host },
        }
    }

    /// Returns false if the mapping only ever produces silence
    pub fn is_supported(&self) -> bool {
        !matches!(self, OutputMapping::Unsupported { .. })
    }
}

impl fmt::Display for OutputMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMapping::Direct { channels } => write!(f, "{channels} -> {channels} (direct)"),
            OutputMapping::StereoToMono => f.write_str("2 -> 1 (downmix)"),
            OutputMapping::MonoToStereo => f.write_str("1 -> 2 (upmix)"),
            OutputMapping::Unsupported { engine, host } => {
                write!(f, "{engine} -> {host} (unsupported)")
            }
        }
    }
}

/// Mix one engine frame into one host frame
///
/// `engine_sample(ch)` returns the engine's sample for channel `ch` of the
/// current frame. `out` is the host frame and is always fully written.
#[inline]
pub fn mix_output_frame<F>(
    mapping: OutputMapping,
    reference_level: f64,
    engine_sample: F,
    out: &mut [f32],
) where
    F: Fn(usize) -> f64,
{
    match mapping {
        OutputMapping::Direct { .. } => {
            for (ch, sample) in out.iter_mut().enumerate() {
                *sample = (engine_sample(ch) / reference_level) as f32;
            }
        }
        OutputMapping::StereoToMono => {
            let left = engine_sample(0) / reference_level;
            let right = engine_sample(1) / reference_level;
            let mixed = (0.5 * (left + right)) as f32;
            out.fill(mixed);
        }
        OutputMapping::MonoToStereo => {
            let value = (engine_sample(0) / reference_level) as f32;
            out.fill(value);
        }
        OutputMapping::Unsupported { .. } => out.fill(0.0),
    }
}

/// Mix one host frame into the engine's input block
///
/// Only the first `min(host, engine)` channels are transferred. Extra host
/// channels are dropped and extra engine channels keep whatever they held.
#[inline]
pub fn mix_input_frame<F>(
    host_frame: &[f32],
    engine_channels: usize,
    reference_level: f64,
    mut write: F,
) where
    F: FnMut(usize, f64),
{
    for (ch, &sample) in host_frame.iter().take(engine_channels).enumerate() {
        write(ch, f64::from(sample) * reference_level);
    }
}
