//! WASM runtime wrapper
//!
//! Runs synthesis engines compiled to WebAssembly behind the
//! [`SynthesisEngine`](crate::SynthesisEngine) handle.
//!
//! # Key Types
//!
//! - [`WasmEngine`] - Shared wasmtime engine (one per application)
//! - [`WasmSynthEngine`] - Instantiated engine module with generation-tracked memory

mod engine;
mod synth;

pub use engine::{DEFAULT_MEMORY_LIMIT, WASM_PAGE_SIZE, WasmEngine};
pub use synth::WasmSynthEngine;
