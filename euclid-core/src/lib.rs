//! # euclid-core
//!
//! Control-side support for the euclid sequencer: configuration loading and
//! the MIDI byte codec used to talk to real ports.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use euclid_core::config::Config;
//! use euclid_audio::{sequencer_pair, BlockContext};
//!
//! // 1. Build the engine snapshot from embedded defaults + user config
//! let config = Config::load();
//! let (mut handle, mut engine) = sequencer_pair(config.engine_config(), config.engine_settings());
//!
//! // 2. Start the transport and render a block on the audio side
//! handle.set_playing(true);
//! let mut events = Vec::new();
//! engine.process_block(&BlockContext::new(config.sample_rate(), 512), &[], &mut events);
//!
//! // 3. Turn events into wire bytes
//! for event in &events {
//!     let (bytes, len) = euclid_core::midi::encode(&event.message);
//!     // send &bytes[..len] to the port named by event.route
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`config`]: TOML configuration loading (embedded defaults + user override)
//! - [`midi`]: encoding engine messages to bytes, decoding incoming bytes

pub mod config;
pub mod midi;
