//! Bridge error types
//!
//! Only operations that run outside the audio callback return errors.
//! Failures that happen while streaming (a failing block compute, an
//! unsupported channel layout, a relocated memory block) are absorbed by
//! [`StreamBridge::process_callback`](crate::StreamBridge::process_callback)
//! and turn into silence plus a play-state change or log event.

use crate::engine::BlockKind;

/// Error returned by bridge setup operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    /// Start requested before an engine handle was bound
    #[error("no engine instance is bound to the bridge")]
    EngineNotReady,

    /// Engine reports a block size the bridge can't stream
    #[error("engine reports an invalid block size of {0} frames")]
    InvalidBlockSize(usize),

    /// Engine reports a reference level that can't normalize samples
    #[error("engine reports an invalid reference level ({0})")]
    InvalidReferenceLevel(f64),

    /// Engine reports an audio block that doesn't fit its own memory
    #[error(
        "{kind} block at byte {base} holds {len} samples but {required} are required \
         (engine memory is {memory_len} bytes)"
    )]
    MalformedRegion {
        kind: BlockKind,
        base: usize,
        len: usize,
        required: usize,
        memory_len: usize,
    },
}
