//! The per-block sequencing pipeline.
//!
//! Each block: take the newest configuration snapshot, drain one-shot
//! commands, resolve the timebase, then walk the block sample by sample.
//! Per sample the order is fixed: due note-offs, the glide voice, master
//! clock output, lanes 0..5, then any bass release that no trigger tied over.
//! Everything is staged and flushed once at the end of the block. Nothing on
//! this path logs.

use crossbeam_channel::Receiver;
use euclid_types::{
    ClockMessage, EngineConfig, MidiEvent, MidiMessage, TimedClockMessage, BASS_LANE, LANE_COUNT,
};

use crate::clock::{ClockEdge, ClockManager};
use crate::commands::{EngineCommand, EngineSettings};
use crate::glide::{GlideVoice, VoiceOutput};
use crate::lane::{advance_lane, LaneState, StepClock, Trigger};
use crate::stager::{EventStager, PendingNoteOff, PendingNoteOffs};
use crate::triple_buffer::SnapshotReader;

/// Transport state reported by the host for this block.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HostTransport {
    /// Host tempo, when it has one
    pub bpm: Option<f64>,
    pub playing: bool,
}

/// Everything the host tells the engine about the block being rendered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockContext {
    pub sample_rate: f64,
    pub block_len: usize,
    pub host: HostTransport,
}

impl BlockContext {
    pub fn new(sample_rate: f64, block_len: usize) -> Self {
        Self {
            sample_rate,
            block_len,
            host: HostTransport::default(),
        }
    }

    pub fn with_host(mut self, host: HostTransport) -> Self {
        self.host = host;
        self
    }
}

pub struct SequencerEngine {
    config: EngineConfig,
    snapshots: SnapshotReader<EngineConfig>,
    commands: Receiver<EngineCommand>,
    clock: ClockManager,
    lanes: [LaneState; LANE_COUNT],
    glide: GlideVoice,
    stager: EventStager,
    pending: PendingNoteOffs,
    /// Samples rendered while the transport was running
    global_sample: i64,
    running: bool,
    max_block_size: usize,
}

impl SequencerEngine {
    pub(crate) fn new(
        snapshots: SnapshotReader<EngineConfig>,
        commands: Receiver<EngineCommand>,
        settings: EngineSettings,
    ) -> Self {
        let settings = settings.sanitized();
        let mut engine = Self {
            config: EngineConfig::default(),
            clock: ClockManager::default(),
            lanes: std::array::from_fn(LaneState::new),
            glide: GlideVoice::default(),
            stager: EventStager::with_capacity(settings.staging_capacity()),
            pending: PendingNoteOffs::default(),
            global_sample: 0,
            running: false,
            max_block_size: settings.max_block_size,
            commands,
            snapshots,
        };
        let initial = engine.snapshots.current();
        engine.apply_config(initial);
        engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &ClockManager {
        &self.clock
    }

    pub fn lane(&self, index: usize) -> Option<&LaneState> {
        self.lanes.get(index)
    }

    pub fn glide(&self) -> &GlideVoice {
        &self.glide
    }

    pub fn pending_note_offs(&self) -> &PendingNoteOffs {
        &self.pending
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Samples rendered while running since construction.
    pub fn global_sample(&self) -> i64 {
        self.global_sample
    }

    /// Events lost to a full stage since construction.
    pub fn dropped_events(&self) -> u64 {
        self.stager.dropped()
    }

    /// Render one host block, appending its events to `out` in emission order.
    /// `clock_in` must be sorted by offset; messages at or past the block end
    /// are applied on the last sample.
    pub fn process_block(
        &mut self,
        ctx: &BlockContext,
        clock_in: &[TimedClockMessage],
        out: &mut Vec<MidiEvent>,
    ) {
        if let Some(config) = self.snapshots.latest() {
            self.apply_config(config);
        }
        self.clock.recompute_for_block(ctx.sample_rate, ctx.host.bpm);
        self.glide
            .configure(&self.config.bass, self.clock.sample_rate());
        self.drain_commands();

        let total = ctx.block_len;
        let mut next_message = 0;
        let mut start = 0;
        while start < total {
            let len = (total - start).min(self.max_block_size);
            self.render_span(start, len, total, clock_in, &mut next_message, ctx.host.playing);
            self.stager.flush(out);
            start += len;
        }
        if total == 0 {
            // Releases staged by commands still go out
            self.stager.flush(out);
        }
    }

    fn apply_config(&mut self, config: EngineConfig) {
        let config = config.sanitized();
        self.clock.set_source(config.clock.source);
        self.clock.set_role(config.clock.role);
        self.clock.set_bpm(config.clock.bpm);
        for (lane, lane_config) in self.lanes.iter_mut().zip(config.lanes.iter()) {
            lane.apply_config(lane_config);
        }
        self.config = config;
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                EngineCommand::ResetLane(index) if index < LANE_COUNT => self.reset_lane(index, 0),
                EngineCommand::ResetLane(_) => {}
                EngineCommand::ResetAll => {
                    for index in 0..LANE_COUNT {
                        self.reset_lane(index, 0);
                    }
                }
            }
        }
    }

    fn reset_lane(&mut self, index: usize, offset: u32) {
        self.lanes[index].reset(self.global_sample);
        if index == BASS_LANE {
            self.glide.release(&mut self.stager, offset);
        }
    }

    fn render_span(
        &mut self,
        base: usize,
        len: usize,
        total: usize,
        clock_in: &[TimedClockMessage],
        next_message: &mut usize,
        host_playing: bool,
    ) {
        self.update_transport(base as u32, host_playing);
        for s in base..base + len {
            let offset = s as u32;
            let last = s + 1 == total;
            while let Some(message) = clock_in.get(*next_message) {
                if message.offset as usize > s && !last {
                    break;
                }
                *next_message += 1;
                if let Some(edge) = self.clock.ingest_clock_message(message.kind) {
                    self.handle_clock_edge(edge, offset, host_playing);
                }
            }
            if self.running {
                self.render_sample(offset);
            }
        }
    }

    /// Follow the master switch and the host transport at span start.
    fn update_transport(&mut self, offset: u32, host_playing: bool) {
        let want = self
            .clock
            .transport_running(self.config.global_play, host_playing);
        if want && !self.running {
            self.start_transport(offset);
        } else if !want && self.running {
            self.stop_transport(offset);
        }
    }

    fn handle_clock_edge(&mut self, edge: ClockEdge, offset: u32, host_playing: bool) {
        let want = self
            .clock
            .transport_running(self.config.global_play, host_playing);
        match edge {
            ClockEdge::Start if want => self.start_transport(offset),
            ClockEdge::Continue if want && !self.running => self.continue_transport(offset),
            ClockEdge::Stop if self.running => self.stop_transport(offset),
            _ => {}
        }
    }

    fn start_transport(&mut self, offset: u32) {
        if self.running {
            self.cancel_sounding(offset);
        }
        self.running = true;
        self.clock.reset_phase();
        for lane in self.lanes.iter_mut() {
            lane.reset(self.global_sample);
        }
        self.stage_clock(ClockMessage::Start, offset);
    }

    fn continue_transport(&mut self, offset: u32) {
        self.running = true;
        for lane in self.lanes.iter_mut() {
            lane.reanchor(self.global_sample);
        }
        self.stage_clock(ClockMessage::Continue, offset);
    }

    fn stop_transport(&mut self, offset: u32) {
        self.running = false;
        self.cancel_sounding(offset);
        self.stage_clock(ClockMessage::Stop, offset);
    }

    /// Release everything still sounding at `offset`.
    fn cancel_sounding(&mut self, offset: u32) {
        self.pending.release_all(&mut self.stager, offset);
        self.glide.release(&mut self.stager, offset);
    }

    fn stage_clock(&mut self, message: ClockMessage, offset: u32) {
        if self.clock.drives_master_clock() {
            self.stager.stage(MidiEvent {
                offset,
                lane: None,
                route: 0,
                message: MidiMessage::Clock(message),
            });
        }
    }

    fn render_sample(&mut self, offset: u32) {
        self.pending.fire_due(&mut self.stager, offset);
        self.glide.render(&mut self.stager, offset);
        if self.clock.drives_master_clock() && self.clock.master_clock_sample() {
            self.stage_clock(ClockMessage::Tick, offset);
        }

        let samples_per_step = self.clock.samples_per_step();
        let step_clock = if self.clock.follows_external() {
            StepClock::External {
                boundary: self.clock.take_external_step(),
            }
        } else {
            StepClock::Sample
        };

        for index in 0..LANE_COUNT {
            let lane_config = &self.config.lanes[index];
            let trigger = advance_lane(
                &mut self.lanes[index],
                lane_config,
                samples_per_step,
                step_clock,
                self.global_sample,
            );
            if let Some(trigger) = trigger {
                if !self.config.lane_silenced(index) {
                    self.emit_trigger(index, trigger, offset);
                }
            }
        }
        self.glide.settle(&mut self.stager, offset);

        self.pending.tick();
        self.global_sample += 1;
    }

    fn emit_trigger(&mut self, index: usize, trigger: Trigger, offset: u32) {
        let lane_config = &self.config.lanes[index];
        let channel = lane_config.midi_channel;
        let route = lane_config.output_route;

        if index == BASS_LANE && self.config.bass.mono_legato {
            // Rounded up so a full-length note still reaches a fractional next step
            let hold = (lane_config.note_length as f64 * self.clock.samples_per_step()).ceil();
            let hold = if trigger.length == 0 { 0 } else { hold.clamp(1.0, u32::MAX as f64) as u32 };
            self.glide.trigger(
                trigger.note,
                trigger.velocity,
                hold,
                VoiceOutput { channel, route },
                &mut self.stager,
                offset,
            );
            return;
        }

        self.stager.stage(MidiEvent {
            offset,
            lane: Some(index as u8),
            route,
            message: MidiMessage::NoteOn {
                channel,
                note: trigger.note,
                velocity: trigger.velocity,
            },
        });
        let note_off = PendingNoteOff {
            lane: index as u8,
            route,
            channel,
            note: trigger.note,
            remaining_samples: trigger.length,
        };
        if trigger.length == 0 {
            self.stager.stage(note_off.event(offset));
        } else {
            self.pending.schedule(note_off, &mut self.stager, offset);
        }
    }
}
