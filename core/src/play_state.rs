//! Play-state machine and its observers
//!
//! ```text
//!            start              synthesis failure
//! Stopped ─────────► Running ─────────────────────► Ended
//!    ▲                  │                             │
//!    └──── reset ───────┴───────── reset ─────────────┘
//! ```
//!
//! `start` from Ended is a fresh start of the adapter and also lands in
//! Running. Pause/resume are not modeled.
//!
//! Transitions are published two ways, both safe to use from the audio
//! thread: a [`PlayStateWatch`] holding the latest state in an atomic, and an
//! optional [`PlayStateEvents`] ring that receives every transition.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use ringbuf::{
    HeapCons, HeapProd, HeapRb,
    traits::{Consumer, Producer, Split},
};

/// Whether the bridge passes audio through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum PlayState {
    /// Initial state, output is silence
    #[default]
    Stopped = 0,
    /// Streaming engine audio
    Running = 1,
    /// Engine reported it has no more audio, output is silence
    Ended = 2,
}

impl PlayState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => PlayState::Running,
            2 => PlayState::Ended,
            _ => PlayState::Stopped,
        }
    }
}

impl fmt::Display for PlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayState::Stopped => f.write_str("stopped"),
            PlayState::Running => f.write_str("running"),
            PlayState::Ended => f.write_str("ended"),
        }
    }
}

/// Input to the play-state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayEvent {
    /// Explicit start with an engine bound
    Start,
    /// Block compute returned a non-zero status
    SynthesisFailed,
    /// External reset of the engine and adapter
    Reset,
}

/// Single transition function over [`PlayState`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayStateMachine {
    state: PlayState,
}

impl PlayStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> PlayState {
        self.state
    }

    /// Apply `event`, returning the new state if it changed
    pub fn transition(&mut self, event: PlayEvent) -> Option<PlayState> {
        let next = match (self.state, event) {
            (PlayState::Stopped | PlayState::Ended, PlayEvent::Start) => PlayState::Running,
            (PlayState::Running, PlayEvent::SynthesisFailed) => PlayState::Ended,
            (PlayState::Running | PlayState::Ended, PlayEvent::Reset) => PlayState::Stopped,
            _ => return None,
        };
        self.state = next;
        Some(next)
    }
}

/// Latest play state, readable from any thread
#[derive(Debug, Clone, Default)]
pub struct PlayStateWatch {
    state: Arc<AtomicU8>,
}

impl PlayStateWatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest published state
    pub fn get(&self) -> PlayState {
        PlayState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: PlayState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Receiving end of the play-state transition queue
pub struct PlayStateEvents {
    consumer: HeapCons<PlayState>,
}

impl PlayStateEvents {
    /// Create a queue holding up to `capacity` undelivered transitions
    pub(crate) fn channel(capacity: usize) -> (HeapProd<PlayState>, Self) {
        let ring = HeapRb::<PlayState>::new(capacity.max(1));
        let (producer, consumer) = ring.split();
        (producer, Self { consumer })
    }

    /// Next undelivered transition, if any
    pub fn try_recv(&mut self) -> Option<PlayState> {
        self.consumer.try_pop()
    }

    /// All undelivered transitions, oldest first
    pub fn drain(&mut self) -> impl Iterator<Item = PlayState> + '_ {
        std::iter::from_fn(move || self.try_recv())
    }
}

/// State machine plus its observers, owned by the bridge
pub(crate) struct PlayStatePublisher {
    machine: PlayStateMachine,
    watch: PlayStateWatch,
    events: Option<HeapProd<PlayState>>,
}

impl PlayStatePublisher {
    pub(crate) fn new() -> Self {
        Self {
            machine: PlayStateMachine::new(),
            watch: PlayStateWatch::new(),
            events: None,
        }
    }

    pub(crate) fn state(&self) -> PlayState {
        self.machine.state()
    }

    pub(crate) fn watch(&self) -> PlayStateWatch {
        self.watch.clone()
    }

    pub(crate) fn subscribe(&mut self, capacity: usize) -> PlayStateEvents {
        let (producer, events) = PlayStateEvents::channel(capacity);
        self.events = Some(producer);
        events
    }

    /// Apply `event` and publish the new state if it changed
    ///
    /// Never blocks: a full event queue drops the transition, the watch
    /// still reflects it.
    pub(crate) fn apply(&mut self, event: PlayEvent) -> Option<PlayState> {
        let next = self.machine.transition(event)?;
        self.watch.set(next);
        if let Some(events) = self.events.as_mut() {
            let _ = events.try_push(next);
        }
        Some(next)
    }
}
