//! # euclid-types
//!
//! Shared type definitions for the euclid sequencer.
//! This crate holds the configuration snapshot handed to the real-time engine
//! and the MIDI event types it emits. Everything here is plain `Copy` data
//! that the audio thread can hold without allocating.

pub mod midi;
pub mod state;

pub use midi::*;
pub use state::*;

/// Number of independent rhythm lanes.
pub const LANE_COUNT: usize = 6;

/// Lane driven through the monophonic glide voice.
pub const BASS_LANE: usize = 5;

/// Longest supported Euclidean pattern.
pub const MAX_STEPS: usize = 32;

/// Upper bound on notes cycled by one arpeggiator.
pub const MAX_ARP_NOTES: usize = 7;
