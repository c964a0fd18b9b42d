//! Streaming bridge between a host audio callback and a synthesis engine
//!
//! # Per-frame protocol
//!
//! For every host frame, in order:
//!
//! 1. If the current block is used up and the last compute succeeded, compute
//!    a new block and rewind to row 0. A failing compute moves the play state
//!    to Ended; it is never retried.
//! 2. If either memory view went stale (engine memory was reallocated),
//!    re-resolve both.
//! 3. Write the host input frame into the engine's input block at the current
//!    row.
//! 4. Mix the engine's output block row into the host output frame, or write
//!    silence if the last compute failed.
//! 5. Advance the row.
//!
//! The callback never fails and never allocates. Anything that goes wrong
//! while streaming degrades to silence.

use tracing::{debug, error, info, warn};

use crate::buffer::{InputBuffer, OutputBuffer};
use crate::cursor::BlockCursor;
use crate::engine::{BlockKind, SynthesisEngine};
use crate::error::BridgeError;
use crate::memory::MemoryView;
use crate::mixer::{OutputMapping, mix_input_frame, mix_output_frame};
use crate::play_state::{
    PlayEvent, PlayState, PlayStateEvents, PlayStatePublisher, PlayStateWatch,
};


/// Counters describing what the bridge has done since construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Host callbacks handled (including silent ones)
    pub callbacks: u64,
    /// Host frames streamed while running
    pub frames: u64,
    /// Successful block computes
    pub blocks_computed: u64,
    /// Times the memory views were re-resolved after a reallocation
    pub relocations: u64,
}

/// Engine geometry captured at start
#[derive(Debug, Clone, Copy)]
struct EngineLayout {
    block_size: usize,
    output_channels: usize,
    input_channels: usize,
    reference_level: f64,
    mapping: OutputMapping,
}

impl EngineLayout {
    fn read<E: SynthesisEngine + ?Sized>(
        engine: &E,
        host_output_channels: usize,
    ) -> Result<Self, BridgeError> {
        let block_size = engine.block_size();
        if block_size == 0 {
            return Err(BridgeError::InvalidBlockSize(block_size));
        }

        let reference_level = engine.reference_level();
        if !reference_level.is_finite() || reference_level <= 0.0 {
            return Err(BridgeError::InvalidReferenceLevel(reference_level));
        }

        let output_channels = engine.output_channels();
        Ok(Self {
            block_size,
            output_channels,
            input_channels: engine.input_channels(),
            reference_level,
            mapping: OutputMapping::new(output_channels, host_output_channels),
        })
    }

    fn required(&self, kind: BlockKind) -> usize {
        match kind {
            BlockKind::Output => self.block_size * self.output_channels,
            BlockKind::Input => self.block_size * self.input_channels,
        }
    }
}

/// Both engine block views, resolved together
#[derive(Debug, Clone, Copy)]
struct Views {
    output: MemoryView,
    input: MemoryView,
}

impl Views {
    fn resolve<E: SynthesisEngine + ?Sized>(
        engine: &mut E,
        layout: &EngineLayout,
    ) -> Result<Self, BridgeError> {
        let output = MemoryView::resolve(
            engine,
            BlockKind::Output,
            layout.required(BlockKind::Output),
        )?;
        let input =
            MemoryView::resolve(engine, BlockKind::Input, layout.required(BlockKind::Input))?;
        Ok(Self { output, input })
    }

    /// A stale view reads as zero-length until re-resolved
    fn is_stale<E: SynthesisEngine + ?Sized>(&self, engine: &E) -> bool {
        self.output.is_stale(engine) || self.input.is_stale(engine)
    }
}

/// Adapter that runs inside the host's audio callback
///
/// Generic over the engine handle so it can own one (`Box<dyn ...>`, a
/// concrete engine) or borrow one owned elsewhere (`&mut E`).
pub struct StreamBridge<E: SynthesisEngine> {
    engine: Option<E>,
    host_input_channels: usize,
    host_output_channels: usize,
    play: PlayStatePublisher,
    cursor: BlockCursor,
    layout: Option<EngineLayout>,
    views: Option<Views>,
    /// Unsupported-mapping diagnostic already emitted since the last start
    mapping_warned: bool,
    /// Host buffer layout diagnostic already emitted since the last start
    layout_warned: bool,
    stats: BridgeStats,
}

impl<E: SynthesisEngine> StreamBridge<E> {
    /// Create a bridge for a host with a fixed channel layout
    pub fn new(host_input_channels: usize, host_output_channels: usize) -> Self {
        Self {
            engine: None,
            host_input_channels,
            host_output_channels,
            play: PlayStatePublisher::new(),
            cursor: BlockCursor::default(),
            layout: None,
            views: None,
            mapping_warned: false,
            layout_warned: false,
            stats: BridgeStats::default(),
        }
    }

    /// Create a bridge with an engine already bound
    pub fn with_engine(engine: E, host_input_channels: usize, host_output_channels: usize) -> Self {
        let mut bridge = Self::new(host_input_channels, host_output_channels);
        bridge.bind_engine(engine);
        bridge
    }

    /// Attach an engine handle, replacing (and returning) any previous one
    ///
    /// A bridge that was streaming the previous engine is reset first.
    pub fn bind_engine(&mut self, engine: E) -> Option<E> {
        let previous = self.unbind_engine();
        self.engine = Some(engine);
        previous
    }

    /// Detach the engine handle, stopping the bridge
    pub fn unbind_engine(&mut self) -> Option<E> {
        if self.engine.is_some() {
            self.reset();
        }
        self.engine.take()
    }

    /// Bound engine, if any
    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    /// Bound engine, if any
    pub fn engine_mut(&mut self) -> Option<&mut E> {
        self.engine.as_mut()
    }

    /// Host input channel count fixed at construction
    pub fn host_input_channels(&self) -> usize {
        self.host_input_channels
    }

    /// Host output channel count fixed at construction
    pub fn host_output_channels(&self) -> usize {
        self.host_output_channels
    }

    /// Current play state
    pub fn play_state(&self) -> PlayState {
        self.play.state()
    }

    /// Cloneable, thread-safe snapshot of the play state
    pub fn watch(&self) -> PlayStateWatch {
        self.play.watch()
    }

    /// Receive every future play-state transition
    ///
    /// Replaces any earlier subscription. At most `capacity` undelivered
    /// transitions are kept; later ones are dropped until the queue drains.
    pub fn subscribe(&mut self, capacity: usize) -> PlayStateEvents {
        self.play.subscribe(capacity)
    }

    /// Block cursor state
    pub fn cursor(&self) -> &BlockCursor {
        &self.cursor
    }

    /// Output mapping chosen at the last start
    pub fn output_mapping(&self) -> Option<OutputMapping> {
        self.layout.map(|layout| layout.mapping)
    }

    /// Counters since construction
    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    /// Start streaming the bound engine
    ///
    /// From Stopped or Ended this re-reads the engine geometry, resolves both
    /// memory views and primes the cursor so the first frame computes a
    /// block. Calling it while Running does nothing.
    ///
    /// A failed compute is remembered until [`reset`](StreamBridge::reset):
    /// starting from Ended without one streams silence and returns to Ended
    /// on the first frame, without calling the engine.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::EngineNotReady`] if no engine is bound
    /// - [`BridgeError::InvalidBlockSize`] / [`BridgeError::InvalidReferenceLevel`]
    ///   if the engine geometry is unusable
    /// - [`BridgeError::MalformedRegion`] if an audio block doesn't fit engine memory
    ///
    /// On error the play state is left unchanged.
    pub fn start(&mut self) -> Result<(), BridgeError> {
        let Some(engine) = self.engine.as_mut() else {
            error!("starting bridge failed because no engine instance is bound");
            return Err(BridgeError::EngineNotReady);
        };

        if self.play.state() == PlayState::Running {
            return Ok(());
        }

        let layout = EngineLayout::read(&*engine, self.host_output_channels)
            .inspect_err(|e| error!("starting bridge failed: {}", e))?;
        let views = Views::resolve(engine, &layout)
            .inspect_err(|e| error!("starting bridge failed: {}", e))?;

        self.cursor = self.cursor.restarted(layout.block_size);
        self.layout = Some(layout);
        self.views = Some(views);
        self.layout_warned = false;
        self.mapping_warned = !layout.mapping.is_supported();
        if self.mapping_warned {
            warn!(
                "unsupported channel mapping {}: output will be silent",
                layout.mapping
            );
        }

        debug!(
            "bridge started: block_size={}, engine out/in={}/{}, host out/in={}/{}, 0dBFS={}",
            layout.block_size,
            layout.output_channels,
            layout.input_channels,
            self.host_output_channels,
            self.host_input_channels,
            layout.reference_level
        );
        self.play.apply(PlayEvent::Start);
        Ok(())
    }

    /// Return to Stopped, dropping cursor and view state
    ///
    /// Called by whoever resets the engine itself. A following [`start`]
    /// streams from a fresh block.
    ///
    /// [`start`]: StreamBridge::start
    pub fn reset(&mut self) {
        self.play.apply(PlayEvent::Reset);
        self.cursor = BlockCursor::default();
        self.layout = None;
        self.views = None;
        self.mapping_warned = false;
        self.layout_warned = false;
    }

    /// Pausing is left to the host; accepted for API symmetry
    pub fn pause(&mut self) {}

    /// Resuming is left to the host; accepted for API symmetry
    pub fn resume(&mut self) {}

    /// Fill `output` for one host callback, consuming `input`
    ///
    /// Every output sample is written. Frames beyond the end of `input` leave
    /// the engine's input block untouched.
    pub fn process_callback(&mut self, input: &InputBuffer<'_>, output: &mut OutputBuffer<'_>) {
        self.stats.callbacks += 1;

        if self.play.state() != PlayState::Running {
            output.fill_silence();
            return;
        }

        let (Some(engine), Some(layout), Some(mut views)) =
            (self.engine.as_mut(), self.layout, self.views)
        else {
            output.fill_silence();
            return;
        };

        if output.channels() != self.host_output_channels {
            if !self.layout_warned {
                self.layout_warned = true;
                warn!(
                    "host output buffer has {} channels, bridge was built for {}: output will be silent",
                    output.channels(),
                    self.host_output_channels
                );
            }
            output.fill_silence();
            return;
        }

        let frames = output.frames();
        let input_frames = input.frames();

        for frame in 0..frames {
            if self.cursor.needs_compute() {
                let status = engine.compute_block();
                self.cursor.begin_block(status);
                if status.is_ok() {
                    self.stats.blocks_computed += 1;
                } else if self.play.apply(PlayEvent::SynthesisFailed).is_some() {
                    info!("engine finished with status {}: performance ended", status);
                }
            } else if !self.cursor.status().is_ok()
                && self.play.apply(PlayEvent::SynthesisFailed).is_some()
            {
                info!(
                    "engine not reset since it failed with status {}: performance ended",
                    self.cursor.status()
                );
            }

            if views.is_stale(&*engine) {
                match Views::resolve(engine, &layout) {
                    Ok(fresh) => {
                        views = fresh;
                        self.stats.relocations += 1;
                        debug!(
                            "engine memory reallocated, views re-resolved at generation {}",
                            engine.memory_generation()
                        );
                    }
                    Err(e) => {
                        error!("engine memory unusable after reallocation: {}", e);
                        self.views = None;
                        self.play.apply(PlayEvent::SynthesisFailed);
                        output.fill_silence_from(frame);
                        return;
                    }
                }
            }

            let row = self.cursor.position();
            if row < layout.block_size && frame < input_frames {
                let offset = row * layout.input_channels;
                let memory = engine.memory_mut();
                mix_input_frame(
                    input.frame(frame),
                    layout.input_channels,
                    layout.reference_level,
                    |ch, value| views.input.write(memory, offset + ch, value),
                );
            }

            let out_frame = output.frame_mut(frame);
            if self.cursor.is_readable() {
                let offset = row * layout.output_channels;
                let memory = engine.memory();
                mix_output_frame(
                    layout.mapping,
                    layout.reference_level,
                    |ch| views.output.read(memory, offset + ch),
                    out_frame,
                );
            } else {
                out_frame.fill(0.0);
            }

            self.cursor.advance();
        }

        output.fill_silence_from(frames);
        self.views = Some(views);
        self.stats.frames += frames as u64;
    }
}
