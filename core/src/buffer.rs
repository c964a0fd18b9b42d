//! Host-side interleaved audio buffers

/// Interleaved frames captured by the host
#[derive(Debug, Clone, Copy)]
pub struct InputBuffer<'a> {
    samples: &'a [f32],
    channels: usize,
}

impl<'a> InputBuffer<'a> {
    /// Wrap interleaved `samples` with `channels` samples per frame
    ///
    /// A trailing partial frame is ignored.
    pub fn new(samples: &'a [f32], channels: usize) -> Self {
        Self { samples, channels }
    }

    /// Buffer with no frames (output-only hosts)
    pub fn empty() -> Self {
        Self {
            samples: &[],
            channels: 0,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of whole frames available
    pub fn frames(&self) -> usize {
        self.samples.len().checked_div(self.channels).unwrap_or(0)
    }

    /// Samples of frame `index`, one per channel
    #[inline]
    pub fn frame(&self, index: usize) -> &'a [f32] {
        let start = index * self.channels;
        &self.samples[start..start + self.channels]
    }
}

/// Interleaved frames the host will play
#[derive(Debug)]
pub struct OutputBuffer<'a> {
    samples: &'a mut [f32],
    channels: usize,
}

impl<'a> OutputBuffer<'a> {
    /// Wrap interleaved `samples` with `channels` samples per frame
    pub fn new(samples: &'a mut [f32], channels: usize) -> Self {
        Self { samples, channels }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of whole frames requested
    pub fn frames(&self) -> usize {
        self.samples.len().checked_div(self.channels).unwrap_or(0)
    }

    /// Samples of frame `index`, one per channel
    #[inline]
    pub fn frame_mut(&mut self, index: usize) -> &mut [f32] {
        let start = index * self.channels;
        &mut self.samples[start..start + self.channels]
    }

    /// Write silence to every sample, including any trailing partial frame
    pub fn fill_silence(&mut self) {
        self.samples.fill(0.0);
    }

    /// Write silence from frame `start` to the end of the buffer
    pub fn fill_silence_from(&mut self, start: usize) {
        let offset = (start * self.channels).min(self.samples.len());
        self.samples[offset..].fill(0.0);
    }

    /// Underlying interleaved samples
    pub fn samples(&self) -> &[f32] {
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_frames() {
        let samples = [0.1, 0.2, 0.3, 0.4, 0.5];
        let input = InputBuffer::new(&samples, 2);
        assert_eq!(input.frames(), 2);
        assert_eq!(input.frame(1), &[0.3, 0.4]);
    }

    #[test]
    fn test_empty_input() {
        let input = InputBuffer::empty();
        assert_eq!(input.frames(), 0);
        assert_eq!(input.channels(), 0);
    }

    #[test]
    fn test_output_frames_and_silence() {
        let mut samples = [1.0f32; 6];
        let mut output = OutputBuffer::new(&mut samples, 2);
        assert_eq!(output.frames(), 3);

        output.frame_mut(0).copy_from_slice(&[0.5, -0.5]);
        output.fill_silence_from(1);
        assert_eq!(output.samples(), &[0.5, -0.5, 0.0, 0.0, 0.0, 0.0]);

        output.fill_silence();
        assert!(output.samples().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_zero_channel_output_has_no_frames() {
        let mut samples = [1.0f32; 4];
        let output = OutputBuffer::new(&mut samples, 0);
        assert_eq!(output.frames(), 0);
    }
}
