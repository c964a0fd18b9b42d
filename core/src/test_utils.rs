//! Shared test utilities
//!
//! [`ScriptedEngine`] is an in-memory synthesis engine whose output is
//! computed by a closure, and which can be told to fail or to reallocate its
//! backing store on a chosen block.

use crate::engine::{BlockRegion, SAMPLE_BYTES, Status, SynthesisEngine};

/// Padding between blocks so a stale offset never lands on valid samples
const PAD: usize = 64;

/// How far a relocation moves the blocks
const RELOCATION_SHIFT: usize = 256;

type Generator = Box<dyn FnMut(usize, usize, usize) -> f64 + Send>;

/// Scripted engine for bridge tests
pub struct ScriptedEngine {
    block_size: usize,
    output_channels: usize,
    input_channels: usize,
    reference_level: f64,
    memory: Vec<u8>,
    output_base: usize,
    input_base: usize,
    generation: u64,
    computed: usize,
    fail_on_block: Option<usize>,
    fail_code: i32,
    relocate_on_block: Option<usize>,
    /// `(block, frame, channel) -> sample`, block numbers start at 1
    generator: Generator,
    /// Input block contents seen by each compute, in order
    input_history: Vec<Vec<f64>>,
}

impl ScriptedEngine {
    pub fn new(block_size: usize, output_channels: usize, input_channels: usize) -> Self {
        let output_base = PAD;
        let input_base = output_base + block_size * output_channels * SAMPLE_BYTES + PAD;
        let len = input_base + block_size * input_channels * SAMPLE_BYTES + PAD;

        Self {
            block_size,
            output_channels,
            input_channels,
            reference_level: 1.0,
            memory: vec![0; len],
            output_base,
            input_base,
            generation: 0,
            computed: 0,
            fail_on_block: None,
            fail_code: 1,
            relocate_on_block: None,
            generator: Box::new(|_, _, _| 0.0),
            input_history: Vec::new(),
        }
    }

    pub fn with_reference_level(mut self, level: f64) -> Self {
        self.reference_level = level;
        self
    }

    pub fn with_generator(
        mut self,
        generator: impl FnMut(usize, usize, usize) -> f64 + Send + 'static,
    ) -> Self {
        self.generator = Box::new(generator);
        self
    }

    /// Every output sample of every block is `value`
    pub fn constant(self, value: f64) -> Self {
        self.with_generator(move |_, _, _| value)
    }

    /// Block `block` (1-based) and every later block fail
    pub fn fail_on_block(mut self, block: usize) -> Self {
        self.fail_on_block = Some(block);
        self
    }

    /// Reallocate memory while computing block `block` (1-based)
    pub fn relocate_on_block(mut self, block: usize) -> Self {
        self.relocate_on_block = Some(block);
        self
    }

    /// Number of `compute_block` calls so far
    pub fn blocks_computed(&self) -> usize {
        self.computed
    }

    pub fn output_base(&self) -> usize {
        self.output_base
    }

    pub fn set_output_base(&mut self, base: usize) {
        self.output_base = base;
    }

    /// Input block contents seen by each compute
    pub fn input_history(&self) -> &[Vec<f64>] {
        &self.input_history
    }

    /// Overwrite the whole input block with `value`
    pub fn fill_input(&mut self, value: f64) {
        let len = self.block_size * self.input_channels;
        for i in 0..len {
            let at = self.input_base + i * SAMPLE_BYTES;
            self.memory[at..at + SAMPLE_BYTES].copy_from_slice(&value.to_le_bytes());
        }
    }

    /// Move both blocks into a larger, freshly allocated store
    pub fn relocate(&mut self) {
        let mut grown = vec![0u8; self.memory.len() + RELOCATION_SHIFT + 4096];
        grown[RELOCATION_SHIFT..RELOCATION_SHIFT + self.memory.len()]
            .copy_from_slice(&self.memory);
        self.memory = grown;
        self.output_base += RELOCATION_SHIFT;
        self.input_base += RELOCATION_SHIFT;
        self.generation += 1;
    }

    fn read_input_block(&self) -> Vec<f64> {
        (0..self.block_size * self.input_channels)
            .map(|i| {
                let at = self.input_base + i * SAMPLE_BYTES;
                let mut bytes = [0u8; SAMPLE_BYTES];
                bytes.copy_from_slice(&self.memory[at..at + SAMPLE_BYTES]);
                f64::from_le_bytes(bytes)
            })
            .collect()
    }
}

impl SynthesisEngine for ScriptedEngine {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn output_channels(&self) -> usize {
        self.output_channels
    }

    fn input_channels(&self) -> usize {
        self.input_channels
    }

    fn reference_level(&self) -> f64 {
        self.reference_level
    }

    fn compute_block(&mut self) -> Status {
        self.computed += 1;
        let block = self.computed;
        let snapshot = self.read_input_block();
        self.input_history.push(snapshot);

        if self.relocate_on_block == Some(block) {
            self.relocate();
        }

        if self.fail_on_block.is_some_and(|n| block >= n) {
            return Status(self.fail_code);
        }

        for frame in 0..self.block_size {
            for ch in 0..self.output_channels {
                let value = (self.generator)(block, frame, ch);
                let at = self.output_base + (frame * self.output_channels + ch) * SAMPLE_BYTES;
                self.memory[at..at + SAMPLE_BYTES].copy_from_slice(&value.to_le_bytes());
            }
        }
        Status::OK
    }

    fn output_block(&mut self) -> BlockRegion {
        BlockRegion {
            base: self.output_base,
            len: self.block_size * self.output_channels,
        }
    }

    fn input_block(&mut self) -> BlockRegion {
        BlockRegion {
            base: self.input_base,
            len: self.block_size * self.input_channels,
        }
    }

    fn memory(&self) -> &[u8] {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    fn memory_generation(&self) -> u64 {
        self.generation
    }
}
