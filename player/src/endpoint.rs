//! Host audio endpoint using cpal
//!
//! The bridge is moved into the output stream callback and runs on the
//! device's real-time thread. Captured input reaches that thread through a
//! ring buffer filled by the input stream callback. The ring only ever gains
//! or loses whole frames, so channels stay aligned across callbacks. Missing
//! input frames are simply not written into the engine's input block.

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use ringbuf::{
    HeapCons, HeapProd, HeapRb,
    traits::{Consumer, Observer, Producer, Split},
};
use tracing::{debug, error};

use blockbridge_core::{InputBuffer, OutputBuffer, PlayStateWatch, StreamBridge, SynthesisEngine};

use crate::config::AudioConfig;

/// Host buffers of captured input the ring can hold before dropping samples
const INPUT_RING_BUFFERS: usize = 4;

/// Live audio streams driving a bridge
pub struct AudioEndpoint {
    /// The cpal output stream (kept alive for the duration)
    _output: cpal::Stream,
    /// The cpal input stream, when input is enabled
    _input: Option<cpal::Stream>,
    watch: PlayStateWatch,
    sample_rate: u32,
}

impl AudioEndpoint {
    /// Open the default devices and start streaming `bridge`
    ///
    /// The bridge's host channel layout must match `config`. Start the bridge
    /// before or after opening; a stopped bridge streams silence.
    pub fn open<E>(bridge: StreamBridge<E>, config: &AudioConfig) -> Result<Self>
    where
        E: SynthesisEngine + Send + 'static,
    {
        anyhow::ensure!(
            bridge.host_output_channels() == config.output_channels
                && bridge.host_input_channels() == config.host_input_channels(),
            "Bridge was built for {}/{} host channels (out/in), config asks for {}/{}",
            bridge.host_output_channels(),
            bridge.host_input_channels(),
            config.output_channels,
            config.host_input_channels()
        );

        let host = cpal::default_host();
        let watch = bridge.watch();

        let (input, consumer) = if config.enable_input {
            let (stream, consumer) = open_input(&host, config)?;
            (Some(stream), Some(consumer))
        } else {
            (None, None)
        };

        let device = host
            .default_output_device()
            .context("No audio output device available")?;
        let format = device
            .default_output_config()
            .context("Failed to get default output config")?
            .sample_format();
        let stream_config = stream_config(config.output_channels, config)?;

        let callback = BridgeCallback::new(bridge, consumer, config);
        let output = match format {
            cpal::SampleFormat::F32 => build_output::<f32, E>(&device, &stream_config, callback)?,
            cpal::SampleFormat::I16 => build_output::<i16, E>(&device, &stream_config, callback)?,
            cpal::SampleFormat::U16 => build_output::<u16, E>(&device, &stream_config, callback)?,
            other => anyhow::bail!("Unsupported sample format: {:?}", other),
        };

        output.play().context("Failed to play audio stream")?;
        if let Some(stream) = input.as_ref() {
            stream.play().context("Failed to start audio input stream")?;
        }

        debug!(
            "Audio stream started: {} Hz, {} frames per buffer, output format {:?}",
            config.sample_rate, config.buffer_frames, format
        );

        Ok(Self {
            _output: output,
            _input: input,
            watch,
            sample_rate: config.sample_rate,
        })
    }

    /// Play state of the bridge running inside the output stream
    pub fn watch(&self) -> &PlayStateWatch {
        &self.watch
    }

    /// Get the output sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// State moved into the output stream callback
struct BridgeCallback<E: SynthesisEngine> {
    bridge: StreamBridge<E>,
    input: Option<HeapCons<f32>>,
    input_channels: usize,
    output_channels: usize,
    /// Pre-allocated scratch buffers, grown only if the device asks for more
    /// frames than configured
    input_scratch: Vec<f32>,
    output_scratch: Vec<f32>,
}

impl<E: SynthesisEngine> BridgeCallback<E> {
    fn new(bridge: StreamBridge<E>, input: Option<HeapCons<f32>>, config: &AudioConfig) -> Self {
        let input_channels = bridge.host_input_channels();
        let output_channels = bridge.host_output_channels();
        Self {
            bridge,
            input,
            input_channels,
            output_channels,
            input_scratch: vec![0.0; config.buffer_frames * input_channels],
            output_scratch: vec![0.0; config.buffer_frames * output_channels],
        }
    }

    fn fill<T: Sample + FromSample<f32>>(&mut self, data: &mut [T]) {
        if self.output_scratch.len() < data.len() {
            self.output_scratch.resize(data.len(), 0.0);
        }
        let frames = data.len().checked_div(self.output_channels).unwrap_or(0);

        let input = match self.input.as_mut() {
            Some(consumer) => {
                let popped =
                    pop_frames(consumer, &mut self.input_scratch, self.input_channels, frames);
                InputBuffer::new(&self.input_scratch[..popped], self.input_channels)
            }
            None => InputBuffer::empty(),
        };

        let scratch = &mut self.output_scratch[..data.len()];
        self.bridge
            .process_callback(&input, &mut OutputBuffer::new(scratch, self.output_channels));

        for (out, &sample) in data.iter_mut().zip(scratch.iter()) {
            *out = T::from_sample(sample);
        }
    }
}

/// Pop up to `frames` whole frames into `scratch`, returning the sample count
///
/// A partial frame stays queued for the next callback.
fn pop_frames(
    consumer: &mut HeapCons<f32>,
    scratch: &mut Vec<f32>,
    channels: usize,
    frames: usize,
) -> usize {
    let queued = consumer.occupied_len().checked_div(channels).unwrap_or(0);
    let wanted = queued.min(frames) * channels;
    if scratch.len() < wanted {
        scratch.resize(wanted, 0.0);
    }
    consumer.pop_slice(&mut scratch[..wanted])
}

fn stream_config(channels: usize, config: &AudioConfig) -> Result<cpal::StreamConfig> {
    let channels = u16::try_from(channels)
        .ok()
        .filter(|&c| c > 0)
        .with_context(|| format!("Unsupported host channel count {}", channels))?;
    let buffer_frames = u32::try_from(config.buffer_frames)
        .with_context(|| format!("Unsupported buffer size {}", config.buffer_frames))?;

    Ok(cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Fixed(buffer_frames),
    })
}

fn build_output<T, E>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut callback: BridgeCallback<E>,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
    E: SynthesisEngine + Send + 'static,
{
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| callback.fill(data),
            |err| error!("Audio stream error: {}", err),
            None,
        )
        .context("Failed to build audio stream")
}

fn open_input(host: &cpal::Host, config: &AudioConfig) -> Result<(cpal::Stream, HeapCons<f32>)> {
    let device = host
        .default_input_device()
        .context("No audio input device available")?;
    let format = device
        .default_input_config()
        .context("Failed to get default input config")?
        .sample_format();
    let stream_config = stream_config(config.input_channels, config)?;

    let ring = HeapRb::<f32>::new(
        (config.buffer_frames * config.input_channels * INPUT_RING_BUFFERS).max(1),
    );
    let (producer, consumer) = ring.split();

    let stream = match format {
        cpal::SampleFormat::F32 => build_input::<f32>(&device, &stream_config, producer)?,
        cpal::SampleFormat::I16 => build_input::<i16>(&device, &stream_config, producer)?,
        cpal::SampleFormat::U16 => build_input::<u16>(&device, &stream_config, producer)?,
        other => anyhow::bail!("Unsupported input sample format: {:?}", other),
    };
    Ok((stream, consumer))
}

fn build_input<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    producer: HeapProd<f32>,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let mut writer = FrameWriter::new(producer, usize::from(config.channels));
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                writer.push(data.iter().map(|&sample| f32::from_sample(sample)), data.len());
            },
            |err| error!("Audio input stream error: {}", err),
            None,
        )
        .context("Failed to build audio input stream")
}

/// Pushes captured samples into the input ring a whole frame at a time
struct FrameWriter {
    producer: HeapProd<f32>,
    channels: usize,
}

impl FrameWriter {
    fn new(producer: HeapProd<f32>, channels: usize) -> Self {
        Self { producer, channels }
    }

    /// Push the whole frames of `samples` (`len` long) that fit
    ///
    /// Overflow drops the newest frames; the output side catches up. Returns
    /// the number of samples pushed.
    fn push(&mut self, samples: impl Iterator<Item = f32>, len: usize) -> usize {
        let Some(room) = self.producer.vacant_len().checked_div(self.channels) else {
            return 0;
        };
        let whole = room.min(len / self.channels) * self.channels;
        self.producer.push_iter(samples.take(whole))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(capacity: usize, channels: usize) -> (FrameWriter, HeapCons<f32>) {
        let (producer, consumer) = HeapRb::<f32>::new(capacity).split();
        (FrameWriter::new(producer, channels), consumer)
    }

    #[test]
    fn test_overflow_drops_whole_frames() {
        let (mut writer, mut consumer) = ring(5, 2);
        let captured = [1.0, -1.0, 2.0, -2.0, 3.0, -3.0];

        assert_eq!(writer.push(captured.iter().copied(), captured.len()), 4);
        assert_eq!(consumer.occupied_len(), 4);

        let mut frames = [0.0; 4];
        consumer.pop_slice(&mut frames);
        assert_eq!(frames, [1.0, -1.0, 2.0, -2.0]);
    }

    #[test]
    fn test_trailing_partial_frame_not_pushed() {
        let (mut writer, consumer) = ring(16, 2);
        let captured = [0.5, -0.5, 0.25];
        assert_eq!(writer.push(captured.iter().copied(), captured.len()), 2);
        assert_eq!(consumer.occupied_len(), 2);
    }

    #[test]
    fn test_partial_frame_stays_queued_for_next_callback() {
        let (mut writer, mut consumer) = ring(16, 1);
        let mut scratch = Vec::new();

        // Three samples of stereo input: one frame plus the next left sample
        writer.push([0.1, 0.2, 0.3].into_iter(), 3);
        assert_eq!(pop_frames(&mut consumer, &mut scratch, 2, 8), 2);
        assert_eq!(&scratch[..2], &[0.1, 0.2]);
        assert_eq!(consumer.occupied_len(), 1);

        writer.push([0.4].into_iter(), 1);
        assert_eq!(pop_frames(&mut consumer, &mut scratch, 2, 8), 2);
        assert_eq!(&scratch[..2], &[0.3, 0.4]);
    }

    #[test]
    fn test_pop_frames_limited_to_callback() {
        let (mut writer, mut consumer) = ring(16, 2);
        writer.push([1.0; 8].into_iter(), 8);

        let mut scratch = Vec::new();
        assert_eq!(pop_frames(&mut consumer, &mut scratch, 2, 3), 6);
        assert_eq!(consumer.occupied_len(), 2);
    }

    #[test]
    fn test_pop_frames_without_channels() {
        let (mut writer, mut consumer) = ring(4, 1);
        writer.push([1.0].into_iter(), 1);
        assert_eq!(pop_frames(&mut consumer, &mut Vec::new(), 0, 4), 0);
    }
}
