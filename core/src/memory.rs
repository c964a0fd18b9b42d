//! Generation-checked views onto engine audio blocks
//!
//! A [`MemoryView`] stores a byte offset into the engine's linear memory plus
//! the memory generation it was resolved against. It never holds a pointer,
//! so a reallocated backing store can't be read through a dangling address:
//! once the engine bumps its generation the view reports a length of zero and
//! must be re-resolved with [`MemoryView::resolve`].

use tracing::trace;

use crate::engine::{BlockKind, SAMPLE_BYTES, SynthesisEngine};
use crate::error::BridgeError;

/// Window onto the engine's output or input block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryView {
    kind: BlockKind,
    /// Byte offset of sample 0
    base: usize,
    /// Length in samples
    len: usize,
    /// Memory generation this view was resolved against
    generation: u64,
}

impl MemoryView {
    /// Re-read the location of `kind` from the engine and build a fresh view
    ///
    /// `required` is the number of samples the caller will address
    /// (`block_size * channels`). The engine may report a longer block, never
    /// a shorter one.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::MalformedRegion`] if the reported block is too
    /// short or extends past the end of engine memory.
    pub fn resolve<E: SynthesisEngine + ?Sized>(
        engine: &mut E,
        kind: BlockKind,
        required: usize,
    ) -> Result<Self, BridgeError> {
        let region = engine.block(kind);
        let memory_len = engine.memory().len();

        let fits = region.end().is_some_and(|end| end <= memory_len);
        if region.len < required || !fits {
            return Err(BridgeError::MalformedRegion {
                kind,
                base: region.base,
                len: region.len,
                required,
                memory_len,
            });
        }

        let generation = engine.memory_generation();
        trace!(
            "resolved {} view at byte {} ({} samples, generation {})",
            kind, region.base, region.len, generation
        );

        Ok(Self {
            kind,
            base: region.base,
            len: region.len,
            generation,
        })
    }

    /// Which block this view covers
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Byte offset of sample 0 inside engine memory
    pub fn base(&self) -> usize {
        self.base
    }

    /// Generation the view was resolved against
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True once the engine has reallocated its memory since resolution
    #[inline]
    pub fn is_stale<E: SynthesisEngine + ?Sized>(&self, engine: &E) -> bool {
        self.generation != engine.memory_generation()
    }

    /// Length in samples, or 0 if the view went stale
    pub fn len<E: SynthesisEngine + ?Sized>(&self, engine: &E) -> usize {
        if self.is_stale(engine) { 0 } else { self.len }
    }

    /// Read sample `index` from `memory`
    ///
    /// Indices outside the view read as silence.
    #[inline]
    pub fn read(&self, memory: &[u8], index: usize) -> f64 {
        self.byte_range(index)
            .and_then(|range| memory.get(range))
            .and_then(|bytes| <[u8; SAMPLE_BYTES]>::try_from(bytes).ok())
            .map(f64::from_le_bytes)
            .unwrap_or(0.0)
    }

    /// Write sample `index` into `memory`
    ///
    /// Writes outside the view are dropped.
    #[inline]
    pub fn write(&self, memory: &mut [u8], index: usize, value: f64) {
        if let Some(bytes) = self
            .byte_range(index)
            .and_then(|range| memory.get_mut(range))
        {
            bytes.copy_from_slice(&value.to_le_bytes());
        }
    }

    #[inline]
    fn byte_range(&self, index: usize) -> Option<std::ops::Range<usize>> {
        if index >= self.len {
            return None;
        }
        let start = self.base + index * SAMPLE_BYTES;
        Some(start..start + SAMPLE_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedEngine;

    #[test]
    fn test_resolve_reads_engine_region() {
        let mut engine = ScriptedEngine::new(4, 2, 1);
        let view = MemoryView::resolve(&mut engine, BlockKind::Output, 8).unwrap();
        assert_eq!(view.kind(), BlockKind::Output);
        assert_eq!(view.base(), engine.output_base());
        assert_eq!(view.len(&engine), 8);
        assert!(!view.is_stale(&engine));
    }

    #[test]
    fn test_view_goes_stale_after_relocation() {
        let mut engine = ScriptedEngine::new(4, 2, 1);
        let view = MemoryView::resolve(&mut engine, BlockKind::Output, 8).unwrap();

        engine.relocate();

        assert!(view.is_stale(&engine));
        assert_eq!(view.len(&engine), 0);

        let fresh = MemoryView::resolve(&mut engine, BlockKind::Output, 8).unwrap();
        assert_eq!(fresh.len(&engine), 8);
        assert_ne!(fresh.base(), view.base());
    }

    #[test]
    fn test_resolve_rejects_short_region() {
        let mut engine = ScriptedEngine::new(4, 2, 1);
        let err = MemoryView::resolve(&mut engine, BlockKind::Output, 9).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::MalformedRegion {
                kind: BlockKind::Output,
                len: 8,
                required: 9,
                ..
            }
        ));
    }

    #[test]
    fn test_resolve_rejects_region_past_memory_end() {
        let mut engine = ScriptedEngine::new(4, 2, 1);
        engine.set_output_base(engine.memory().len() - SAMPLE_BYTES);
        let err = MemoryView::resolve(&mut engine, BlockKind::Output, 8).unwrap_err();
        assert!(matches!(err, BridgeError::MalformedRegion { .. }));
    }

    #[test]
    fn test_read_write_round_trip() {
        let mut engine = ScriptedEngine::new(4, 1, 1);
        let view = MemoryView::resolve(&mut engine, BlockKind::Input, 4).unwrap();

        view.write(engine.memory_mut(), 2, -0.25);
        assert_eq!(view.read(engine.memory(), 2), -0.25);
        assert_eq!(view.read(engine.memory(), 1), 0.0);
    }

    #[test]
    fn test_out_of_range_access_is_ignored() {
        let mut engine = ScriptedEngine::new(4, 1, 1);
        let view = MemoryView::resolve(&mut engine, BlockKind::Input, 4).unwrap();
        let before = engine.memory().to_vec();

        view.write(engine.memory_mut(), 4, 1.0);
        assert_eq!(engine.memory(), &before[..]);
        assert_eq!(view.read(engine.memory(), 4), 0.0);
    }
}
