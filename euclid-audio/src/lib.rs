//! # euclid-audio
//!
//! Real-time core of the euclid sequencer: clock resolution, Euclidean
//! patterns, arpeggiation, per-lane scheduling, the bass glide voice and the
//! event stager. `sequencer_pair` builds a control handle and the engine that
//! runs on the audio thread.

pub mod arpeggiator;
pub mod clock;
pub mod commands;
pub mod engine;
pub mod euclidean;
pub mod glide;
pub mod handle;
pub mod lane;
pub mod stager;
pub mod triple_buffer;

pub use commands::{EngineCommand, EngineSettings};
pub use engine::{BlockContext, HostTransport, SequencerEngine};
pub use handle::{sequencer_pair, SequencerHandle};
