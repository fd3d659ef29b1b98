#![allow(dead_code)]
//! Test harness utilities for euclid-audio integration tests.

use euclid_audio::{
    sequencer_pair, BlockContext, EngineSettings, HostTransport, SequencerEngine, SequencerHandle,
};
use euclid_types::{
    ClockMessage, ClockSource, EngineConfig, LaneConfig, MidiEvent, MidiMessage, NoteSource,
    TimedClockMessage,
};

pub const SAMPLE_RATE: f64 = 48_000.0;
pub const BLOCK: usize = 512;
/// Step length at 120 bpm and 48 kHz
pub const STEP: u64 = 6_000;

/// A lane sounding every step of a four-step pattern.
pub fn four_on_the_floor(note: u8) -> LaneConfig {
    LaneConfig {
        steps: 4,
        pulses: 4,
        note_source: NoteSource::Single(note),
        ..Default::default()
    }
}

/// Internal clock at 120 bpm, playing, with only the given lanes active.
pub fn internal_config(lanes: &[(usize, LaneConfig)]) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.clock.source = ClockSource::Internal;
    config.clock.bpm = 120.0;
    config.global_play = true;
    for lane in config.lanes.iter_mut() {
        lane.active = false;
    }
    for &(index, lane) in lanes {
        config.lanes[index] = lane;
    }
    config
}

/// An event placed on the absolute sample timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stamped {
    pub sample: u64,
    pub block: usize,
    pub event: MidiEvent,
}

/// Drives an engine block by block and keeps every event it emits.
pub struct Rig {
    pub handle: SequencerHandle,
    pub engine: SequencerEngine,
    pub host: HostTransport,
    pub block_len: usize,
    pub position: u64,
    pub blocks: usize,
    pub events: Vec<Stamped>,
    scratch: Vec<MidiEvent>,
}

impl Rig {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_settings(config, EngineSettings::default())
    }

    pub fn with_settings(config: EngineConfig, settings: EngineSettings) -> Self {
        let (handle, engine) = sequencer_pair(config, settings);
        Self {
            handle,
            engine,
            host: HostTransport::default(),
            block_len: BLOCK,
            position: 0,
            blocks: 0,
            events: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Render one block with clock messages stamped at absolute samples.
    pub fn block_with_clock(&mut self, clock: &[(u64, ClockMessage)]) -> Vec<MidiEvent> {
        let end = self.position + self.block_len as u64;
        let clock_in: Vec<TimedClockMessage> = clock
            .iter()
            .filter(|(at, _)| *at >= self.position && *at < end)
            .map(|&(at, kind)| TimedClockMessage::new((at - self.position) as u32, kind))
            .collect();
        let ctx = BlockContext::new(SAMPLE_RATE, self.block_len).with_host(self.host);
        self.scratch.clear();
        self.engine.process_block(&ctx, &clock_in, &mut self.scratch);
        for event in &self.scratch {
            self.events.push(Stamped {
                sample: self.position + event.offset as u64,
                block: self.blocks,
                event: *event,
            });
        }
        self.position = end;
        self.blocks += 1;
        self.scratch.clone()
    }

    pub fn block(&mut self) -> Vec<MidiEvent> {
        self.block_with_clock(&[])
    }

    /// Render blocks until at least `samples` samples have passed.
    pub fn run_until(&mut self, samples: u64) {
        while self.position < samples {
            self.block();
        }
    }

    pub fn run_until_with_clock(&mut self, samples: u64, clock: &[(u64, ClockMessage)]) {
        while self.position < samples {
            self.block_with_clock(clock);
        }
    }

    /// (sample, lane, note) of every note-on so far.
    pub fn note_ons(&self) -> Vec<(u64, Option<u8>, u8)> {
        self.events
            .iter()
            .filter_map(|s| match s.event.message {
                MidiMessage::NoteOn { note, .. } => Some((s.sample, s.event.lane, note)),
                _ => None,
            })
            .collect()
    }

    /// (sample, lane, note) of every note-off so far.
    pub fn note_offs(&self) -> Vec<(u64, Option<u8>, u8)> {
        self.events
            .iter()
            .filter_map(|s| match s.event.message {
                MidiMessage::NoteOff { note, .. } => Some((s.sample, s.event.lane, note)),
                _ => None,
            })
            .collect()
    }

    pub fn note_on_samples(&self) -> Vec<u64> {
        self.note_ons().iter().map(|(s, _, _)| *s).collect()
    }

    /// (sample, value) of every pitch bend so far.
    pub fn bends(&self) -> Vec<(u64, u16)> {
        self.events
            .iter()
            .filter_map(|s| match s.event.message {
                MidiMessage::PitchBend { value, .. } => Some((s.sample, value)),
                _ => None,
            })
            .collect()
    }

    /// (sample, kind) of every clock message emitted so far.
    pub fn clock_out(&self) -> Vec<(u64, ClockMessage)> {
        self.events
            .iter()
            .filter_map(|s| match s.event.message {
                MidiMessage::Clock(kind) => Some((s.sample, kind)),
                _ => None,
            })
            .collect()
    }

    pub fn events_since(&self, sample: u64) -> Vec<Stamped> {
        self.events.iter().filter(|s| s.sample >= sample).copied().collect()
    }
}
