//! Synthesis engine handle
//!
//! The bridge only needs a narrow view of the engine: its block geometry, the
//! block-compute entry point, and the location of its two audio blocks inside
//! a linear memory that any call to [`SynthesisEngine::compute_block`] may
//! reallocate.
//!
//! Engine lifecycle (creation, option setup, reset, destruction) belongs to
//! whoever constructs the handle. The bridge never creates or destroys one.

use std::fmt;

/// Bytes per engine sample (little-endian `f64`)
pub const SAMPLE_BYTES: usize = 8;

/// Outcome of a block compute
///
/// Zero means the engine produced a block. Any other value means it has no
/// more audio to give until it is reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Status(pub i32);

impl Status {
    /// Block computed successfully
    pub const OK: Status = Status(0);

    /// Returns true if the engine produced a block
    #[inline]
    pub fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// Raw status code as reported by the engine
    pub fn code(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which of the engine's audio blocks a region or view refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Samples the engine produced for the host
    Output,
    /// Samples the host supplies to the engine
    Input,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockKind::Output => f.write_str("output"),
            BlockKind::Input => f.write_str("input"),
        }
    }
}

/// Location of an audio block inside engine memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockRegion {
    /// Byte offset of the first sample
    pub base: usize,
    /// Length in samples (frames * channels)
    pub len: usize,
}

impl BlockRegion {
    /// Region that holds nothing (reported when the engine can't answer)
    pub const EMPTY: BlockRegion = BlockRegion { base: 0, len: 0 };

    /// One past the last byte covered by the region
    pub fn end(&self) -> Option<usize> {
        self.len
            .checked_mul(SAMPLE_BYTES)
            .and_then(|bytes| self.base.checked_add(bytes))
    }
}

/// Handle onto a block-based synthesis engine
///
/// Blocks are frame-interleaved: sample `(frame, channel)` lives at index
/// `frame * channels + channel` of the block.
///
/// # Memory relocation
///
/// `compute_block` may grow or move the engine's linear memory. When that
/// happens the implementation must bump [`memory_generation`], which marks
/// every previously resolved [`MemoryView`](crate::MemoryView) stale.
///
/// [`memory_generation`]: SynthesisEngine::memory_generation
pub trait SynthesisEngine {
    /// Frames per control block (`K`)
    fn block_size(&self) -> usize;

    /// Number of channels in the output block
    fn output_channels(&self) -> usize;

    /// Number of channels in the input block
    fn input_channels(&self) -> usize;

    /// Full-scale amplitude of engine samples (0dBFS)
    fn reference_level(&self) -> f64;

    /// Compute the next block of samples
    fn compute_block(&mut self) -> Status;

    /// Current location of the output block
    fn output_block(&mut self) -> BlockRegion;

    /// Current location of the input block
    fn input_block(&mut self) -> BlockRegion;

    /// The engine's linear memory
    fn memory(&self) -> &[u8];

    /// The engine's linear memory, writable
    fn memory_mut(&mut self) -> &mut [u8];

    /// Counter bumped whenever the linear memory is reallocated
    fn memory_generation(&self) -> u64;

    /// Location of the given block
    fn block(&mut self, kind: BlockKind) -> BlockRegion {
        match kind {
            BlockKind::Output => self.output_block(),
            BlockKind::Input => self.input_block(),
        }
    }

    /// Channel count of the given block
    fn channels(&self, kind: BlockKind) -> usize {
        match kind {
            BlockKind::Output => self.output_channels(),
            BlockKind::Input => self.input_channels(),
        }
    }
}

macro_rules! forward_engine {
    () => {
        fn block_size(&self) -> usize {
            (**self).block_size()
        }
        fn output_channels(&self) -> usize {
            (**self).output_channels()
        }
        fn input_channels(&self) -> usize {
            (**self).input_channels()
        }
        fn reference_level(&self) -> f64 {
            (**self).reference_level()
        }
        fn compute_block(&mut self) -> Status {
            (**self).compute_block()
        }
        fn output_block(&mut self) -> BlockRegion {
            (**self).output_block()
        }
        fn input_block(&mut self) -> BlockRegion {
            (**self).input_block()
        }
        fn memory(&self) -> &[u8] {
            (**self).memory()
        }
        fn memory_mut(&mut self) -> &mut [u8] {
            (**self).memory_mut()
        }
        fn memory_generation(&self) -> u64 {
            (**self).memory_generation()
        }
    };
}

// Lets a bridge borrow an engine owned elsewhere.
impl<T: SynthesisEngine + ?Sized> SynthesisEngine for &mut T {
    forward_engine!();
}

impl<T: SynthesisEngine + ?Sized> SynthesisEngine for Box<T> {
    forward_engine!();
}
