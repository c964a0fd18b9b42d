//! Synthesis engine instance backed by a WASM module
//!
//! The module exports its linear memory plus a handful of plain functions:
//!
//! | export            | signature    | meaning                                  |
//! |-------------------|--------------|------------------------------------------|
//! | `memory`          | memory       | linear memory holding both audio blocks  |
//! | `block_size`      | `() -> i32`  | frames per block                         |
//! | `output_channels` | `() -> i32`  | channels in the output block             |
//! | `input_channels`  | `() -> i32`  | channels in the input block              |
//! | `reference_level` | `() -> f64`  | sample value of full scale (0dBFS)       |
//! | `compute_block`   | `() -> i32`  | compute one block, 0 on success          |
//! | `output_buffer`   | `() -> i32`  | byte address of the output block         |
//! | `input_buffer`    | `() -> i32`  | byte address of the input block          |
//!
//! Samples are little-endian `f64`, interleaved by frame.
//!
//! `memory.grow` inside `compute_block` may move or resize the backing store.
//! After every call into the module the handle compares the memory's size and
//! host base address with the values it saw last; any difference bumps the
//! memory generation.

use anyhow::{Context, Result};
use tracing::{debug, warn};
use wasmtime::{
    Instance, Linker, Memory, Module, Store, StoreLimits, StoreLimitsBuilder, TypedFunc,
    WasmParams, WasmResults,
};

use super::engine::WasmEngine;
use crate::engine::{BlockRegion, Status, SynthesisEngine};

/// Store data: only the resource limits
struct SynthContext {
    limits: StoreLimits,
}

/// An instantiated engine module
pub struct WasmSynthEngine {
    store: Store<SynthContext>,
    memory: Memory,
    compute_fn: TypedFunc<(), i32>,
    output_fn: TypedFunc<(), i32>,
    input_fn: TypedFunc<(), i32>,
    block_size: usize,
    output_channels: usize,
    input_channels: usize,
    reference_level: f64,
    /// Memory byte size at the last observation
    observed_size: usize,
    /// Host address of memory byte 0 at the last observation
    observed_base: usize,
    generation: u64,
}

impl WasmSynthEngine {
    /// Instantiate `module`, capping its linear memory at `memory_limit` bytes
    ///
    /// Reads and caches the block geometry. Fails if an export is missing or
    /// has the wrong type, or if the module reports a negative geometry.
    pub fn new(engine: &WasmEngine, module: &Module, memory_limit: usize) -> Result<Self> {
        let limits = StoreLimitsBuilder::new()
            .memory_size(memory_limit)
            .instances(1)
            .build();
        let mut store = Store::new(engine.engine(), SynthContext { limits });

        // Enable resource limiter to enforce memory constraints
        store.limiter(|ctx| &mut ctx.limits);

        let linker = Linker::new(engine.engine());
        let instance = linker
            .instantiate(&mut store, module)
            .context("Failed to instantiate engine module")?;

        let memory = instance
            .get_memory(&mut store, "memory")
            .context("Engine module does not export 'memory'")?;

        let block_size = query_count(&instance, &mut store, "block_size")?;
        let output_channels = query_count(&instance, &mut store, "output_channels")?;
        let input_channels = query_count(&instance, &mut store, "input_channels")?;
        let reference_level = typed_export::<(), f64>(&instance, &mut store, "reference_level")?
            .call(&mut store, ())
            .context("Engine export 'reference_level' trapped")?;

        let compute_fn = typed_export(&instance, &mut store, "compute_block")?;
        let output_fn = typed_export(&instance, &mut store, "output_buffer")?;
        let input_fn = typed_export(&instance, &mut store, "input_buffer")?;

        let observed_size = memory.data_size(&store);
        let observed_base = memory.data_ptr(&store) as usize;

        debug!(
            "engine module instantiated: block_size={}, out/in={}/{}, 0dBFS={}, memory={} bytes",
            block_size, output_channels, input_channels, reference_level, observed_size
        );

        Ok(Self {
            store,
            memory,
            compute_fn,
            output_fn,
            input_fn,
            block_size,
            output_channels,
            input_channels,
            reference_level,
            observed_size,
            observed_base,
            generation: 0,
        })
    }

    /// Current linear memory size in bytes
    pub fn memory_size(&self) -> usize {
        self.memory.data_size(&self.store)
    }

    /// Bump the generation if the memory moved or changed size
    fn observe_memory(&mut self) {
        let size = self.memory.data_size(&self.store);
        let base = self.memory.data_ptr(&self.store) as usize;
        if size != self.observed_size || base != self.observed_base {
            self.observed_size = size;
            self.observed_base = base;
            self.generation += 1;
            debug!(
                "engine memory is now {} bytes (generation {})",
                size, self.generation
            );
        }
    }

    /// Call an address export, mapping a trap to an empty block
    fn query_block(&mut self, output: bool, len: usize) -> BlockRegion {
        let func = if output { &self.output_fn } else { &self.input_fn };
        let result = func.call(&mut self.store, ());
        self.observe_memory();

        match result {
            Ok(address) => BlockRegion {
                base: address as u32 as usize,
                len,
            },
            Err(e) => {
                warn!("engine block address query trapped: {:#}", e);
                BlockRegion::EMPTY
            }
        }
    }
}

impl SynthesisEngine for WasmSynthEngine {
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
        let result = self.compute_fn.call(&mut self.store, ());
        self.observe_memory();

        match result {
            Ok(code) => Status(code),
            Err(e) => {
                warn!("engine compute_block trapped: {:#}", e);
                Status(-1)
            }
        }
    }

    fn output_block(&mut self) -> BlockRegion {
        self.query_block(true, self.block_size * self.output_channels)
    }

    fn input_block(&mut self) -> BlockRegion {
        self.query_block(false, self.block_size * self.input_channels)
    }

    fn memory(&self) -> &[u8] {
        self.memory.data(&self.store)
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        self.memory.data_mut(&mut self.store)
    }

    fn memory_generation(&self) -> u64 {
        self.generation
    }
}

fn typed_export<P: WasmParams, R: WasmResults>(
    instance: &Instance,
    store: &mut Store<SynthContext>,
    name: &str,
) -> Result<TypedFunc<P, R>> {
    instance
        .get_typed_func::<P, R>(&mut *store, name)
        .with_context(|| format!("Engine export '{}' is missing or has the wrong signature", name))
}

/// Call an `() -> i32` geometry export and check it is non-negative
fn query_count(instance: &Instance, store: &mut Store<SynthContext>, name: &str) -> Result<usize> {
    let value = typed_export::<(), i32>(instance, store, name)?
        .call(&mut *store, ())
        .with_context(|| format!("Engine export '{}' trapped", name))?;
    usize::try_from(value).with_context(|| format!("Engine export '{}' returned {}", name, value))
}
