//! Blockbridge Core - host callback to synthesis engine adapter
//!
//! Host audio APIs pull a fixed number of frames per callback, while block
//! based synthesis engines only produce a fresh block every `block_size`
//! frames. This crate reconciles the two timing models.
//!
//! # Architecture
//!
//! - [`SynthesisEngine`] - Narrow handle onto an engine and its linear memory
//! - [`MemoryView`] - Generation-checked window onto an engine audio block
//! - [`mixer`] - Per-frame channel up/down-mixing between engine and host
//! - [`BlockCursor`] - Position inside the current block, block-boundary decisions
//! - [`PlayStateMachine`] - Stopped / Running / Ended gating
//! - [`StreamBridge`] - Per-callback streaming loop tying the above together
//! - [`wasm`] - Engine handle backed by a wasmtime instance

pub mod bridge;
pub mod buffer;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod memory;
pub mod mixer;
pub mod play_state;
#[cfg(test)]
pub mod test_utils;
#[cfg(feature = "wasm")]
pub mod wasm;

pub use bridge::{BridgeStats, StreamBridge};
pub use buffer::{InputBuffer, OutputBuffer};
pub use cursor::BlockCursor;
pub use engine::{BlockKind, BlockRegion, SAMPLE_BYTES, Status, SynthesisEngine};
pub use error::BridgeError;
pub use memory::MemoryView;
pub use mixer::OutputMapping;
pub use play_state::{PlayEvent, PlayState, PlayStateEvents, PlayStateMachine, PlayStateWatch};

#[cfg(feature = "wasm")]
pub use wasm::{WasmEngine, WasmSynthEngine};
