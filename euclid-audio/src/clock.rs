//! Timebase resolution.
//!
//! `ClockManager` turns one of three clock sources into a single
//! "samples per step" figure (16th-note grid) and tracks the run state of the
//! external 24 PPQN clock. It also keeps the phase of the outgoing master
//! clock when the engine drives other devices.

use euclid_types::{
    sanitize_bpm, sanitize_sample_rate, ClockMessage, ClockRole, ClockSource, DEFAULT_BPM,
    DEFAULT_SAMPLE_RATE,
};

/// MIDI beat clock resolution.
pub const TICKS_PER_BEAT: f64 = 24.0;
/// Sequencer steps per beat (16th notes).
pub const STEPS_PER_BEAT: f64 = 4.0;
/// Smallest step length handed to consumers.
pub const MIN_SAMPLES_PER_STEP: f64 = 1e-3;
/// Slack when comparing the tick accumulator against a step.
const TICK_EPSILON: f64 = 1e-6;

/// Transport transition produced by an incoming clock message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEdge {
    Start,
    Continue,
    Stop,
}

#[derive(Debug, Clone)]
pub struct ClockManager {
    source: ClockSource,
    role: ClockRole,
    /// Configured tempo (Internal/External, Host fallback)
    bpm: f64,
    /// Tempo in effect for the current block
    effective_bpm: f64,
    sample_rate: f64,
    samples_per_step: f64,
    /// External clock run state, driven by Start/Stop/Continue
    external_running: bool,
    /// Samples of musical time received as ticks but not yet consumed by a step
    tick_accumulator: f64,
    /// Samples until the next outgoing master clock tick
    master_countdown: f64,
}

impl Default for ClockManager {
    fn default() -> Self {
        let mut clock = Self {
            source: ClockSource::default(),
            role: ClockRole::default(),
            bpm: DEFAULT_BPM,
            effective_bpm: DEFAULT_BPM,
            sample_rate: DEFAULT_SAMPLE_RATE,
            samples_per_step: 0.0,
            external_running: false,
            tick_accumulator: 0.0,
            master_countdown: 0.0,
        };
        clock.recompute_for_block(DEFAULT_SAMPLE_RATE, None);
        clock
    }
}

impl ClockManager {
    pub fn set_source(&mut self, source: ClockSource) {
        if self.source != source {
            self.source = source;
            self.tick_accumulator = 0.0;
        }
    }

    pub fn set_role(&mut self, role: ClockRole) {
        self.role = role;
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = sanitize_bpm(bpm);
    }

    pub fn source(&self) -> ClockSource {
        self.source
    }

    pub fn role(&self) -> ClockRole {
        self.role
    }

    pub fn bpm(&self) -> f64 {
        self.effective_bpm
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Recompute the timebase for the coming block. `host_bpm` is honoured
    /// only for the Host source.
    pub fn recompute_for_block(&mut self, sample_rate: f64, host_bpm: Option<f64>) -> f64 {
        self.sample_rate = sanitize_sample_rate(sample_rate);
        self.effective_bpm = match (self.source, host_bpm) {
            (ClockSource::Host, Some(bpm)) if bpm.is_finite() && bpm > 0.0 => sanitize_bpm(bpm),
            _ => self.bpm,
        };
        let step = self.samples_per_beat() / STEPS_PER_BEAT;
        self.samples_per_step = if step.is_finite() && step > 0.0 {
            step.max(MIN_SAMPLES_PER_STEP)
        } else {
            MIN_SAMPLES_PER_STEP
        };
        self.samples_per_step
    }

    pub fn samples_per_step(&self) -> f64 {
        self.samples_per_step
    }

    pub fn samples_per_beat(&self) -> f64 {
        (60.0 / self.effective_bpm) * self.sample_rate
    }

    pub fn samples_per_tick(&self) -> f64 {
        self.samples_per_beat() / TICKS_PER_BEAT
    }

    /// Whether incoming clock messages drive the transport.
    pub fn follows_external(&self) -> bool {
        self.source == ClockSource::External && self.role == ClockRole::Slave
    }

    /// Whether the engine should emit clock messages.
    pub fn drives_master_clock(&self) -> bool {
        self.role == ClockRole::Master && self.source != ClockSource::External
    }

    pub fn external_running(&self) -> bool {
        self.external_running
    }

    /// Resolve the run state for the block from the master switch and the source.
    pub fn transport_running(&self, global_play: bool, host_playing: bool) -> bool {
        global_play
            && match self.source {
                ClockSource::Host => host_playing,
                ClockSource::Internal => true,
                ClockSource::External => self.external_running,
            }
    }

    /// Apply one incoming clock message. Ticks received while stopped are
    /// ignored; Start clears the accumulator.
    pub fn ingest_clock_message(&mut self, kind: ClockMessage) -> Option<ClockEdge> {
        if !self.follows_external() {
            return None;
        }
        match kind {
            ClockMessage::Start => {
                self.external_running = true;
                self.tick_accumulator = 0.0;
                Some(ClockEdge::Start)
            }
            ClockMessage::Continue => {
                if self.external_running {
                    return None;
                }
                self.external_running = true;
                Some(ClockEdge::Continue)
            }
            ClockMessage::Stop => {
                if !self.external_running {
                    return None;
                }
                self.external_running = false;
                Some(ClockEdge::Stop)
            }
            ClockMessage::Tick => {
                if self.external_running {
                    self.tick_accumulator += self.samples_per_tick();
                }
                None
            }
        }
    }

    /// Consume one step from the tick accumulator if enough ticks arrived.
    /// The step length is subtracted so the residual phase carries over.
    pub fn take_external_step(&mut self) -> bool {
        if self.tick_accumulator + TICK_EPSILON >= self.samples_per_step {
            self.tick_accumulator -= self.samples_per_step;
            true
        } else {
            false
        }
    }

    pub fn tick_accumulator(&self) -> f64 {
        self.tick_accumulator
    }

    /// Restart the tick accumulator and the master clock phase.
    pub fn reset_phase(&mut self) {
        self.tick_accumulator = 0.0;
        self.master_countdown = 0.0;
    }

    /// Advance the master clock by one sample; true when a tick is due on it.
    pub fn master_clock_sample(&mut self) -> bool {
        let due = self.master_countdown <= TICK_EPSILON;
        if due {
            self.master_countdown += self.samples_per_tick().max(1.0);
        }
        self.master_countdown -= 1.0;
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn external_clock(bpm: f64, sample_rate: f64) -> ClockManager {
        let mut clock = ClockManager::default();
        clock.set_source(ClockSource::External);
        clock.set_role(ClockRole::Slave);
        clock.set_bpm(bpm);
        clock.recompute_for_block(sample_rate, None);
        clock
    }

    #[test]
    fn internal_step_is_a_sixteenth() {
        let mut clock = ClockManager::default();
        clock.set_source(ClockSource::Internal);
        clock.set_bpm(120.0);
        assert_eq!(clock.recompute_for_block(44_100.0, Some(90.0)), 5512.5);
    }

    #[test]
    fn host_tempo_overrides_configured_tempo() {
        let mut clock = ClockManager::default();
        clock.set_bpm(120.0);
        assert_eq!(clock.recompute_for_block(48_000.0, Some(60.0)), 12_000.0);
        assert_eq!(clock.recompute_for_block(48_000.0, Some(0.0)), 6_000.0);
        assert_eq!(clock.recompute_for_block(48_000.0, None), 6_000.0);
    }

    #[test]
    fn bad_rates_clamp_to_defaults() {
        let mut clock = ClockManager::default();
        clock.set_bpm(-1.0);
        assert_eq!(clock.recompute_for_block(0.0, None), 5512.5);
        assert!(clock.samples_per_step() > 0.0);
    }

    #[test]
    fn ticks_ignored_until_start() {
        let mut clock = external_clock(120.0, 44_100.0);
        for _ in 0..12 {
            clock.ingest_clock_message(ClockMessage::Tick);
        }
        assert_eq!(clock.tick_accumulator(), 0.0);
        assert!(!clock.take_external_step());
        assert_eq!(clock.ingest_clock_message(ClockMessage::Start), Some(ClockEdge::Start));
        assert!(clock.external_running());
    }

    #[test]
    fn six_ticks_make_one_step() {
        let mut clock = external_clock(120.0, 44_100.0);
        clock.ingest_clock_message(ClockMessage::Start);
        for _ in 0..5 {
            clock.ingest_clock_message(ClockMessage::Tick);
            assert!(!clock.take_external_step());
        }
        clock.ingest_clock_message(ClockMessage::Tick);
        assert!(clock.take_external_step());
        assert!(!clock.take_external_step());
        assert!(clock.tick_accumulator().abs() < 1e-6);
    }

    #[test]
    fn accumulator_does_not_drift() {
        // 132 bpm at 48 kHz gives a non-integer tick length
        let mut clock = external_clock(132.0, 48_000.0);
        clock.ingest_clock_message(ClockMessage::Start);
        let mut steps = 0;
        for _ in 0..6_000 {
            clock.ingest_clock_message(ClockMessage::Tick);
            if clock.take_external_step() {
                steps += 1;
            }
        }
        assert_eq!(steps, 1_000);
        assert!(clock.tick_accumulator().abs() < 1.0);
    }

    #[test]
    fn stop_and_continue_edges() {
        let mut clock = external_clock(120.0, 44_100.0);
        assert_eq!(clock.ingest_clock_message(ClockMessage::Stop), None);
        assert_eq!(clock.ingest_clock_message(ClockMessage::Continue), Some(ClockEdge::Continue));
        assert_eq!(clock.ingest_clock_message(ClockMessage::Continue), None);
        assert_eq!(clock.ingest_clock_message(ClockMessage::Stop), Some(ClockEdge::Stop));
        assert!(!clock.transport_running(true, true));
    }

    #[test]
    fn master_role_ignores_incoming_clock() {
        let mut clock = external_clock(120.0, 44_100.0);
        clock.set_role(ClockRole::Master);
        assert_eq!(clock.ingest_clock_message(ClockMessage::Start), None);
        assert!(!clock.drives_master_clock());
        clock.set_source(ClockSource::Internal);
        assert!(clock.drives_master_clock());
    }

    #[test]
    fn master_clock_ticks_every_tick_length() {
        let mut clock = ClockManager::default();
        clock.set_source(ClockSource::Internal);
        clock.set_role(ClockRole::Master);
        clock.set_bpm(125.0);
        clock.recompute_for_block(48_000.0, None);
        // 48000 * 60 / 125 / 24 = 960 samples per tick
        let due: Vec<usize> = (0..2_000).filter(|_| clock.master_clock_sample()).collect();
        assert_eq!(due.len(), 3);
        clock.reset_phase();
        let ticks: Vec<usize> = (0..2_000usize)
            .filter_map(|i| clock.master_clock_sample().then_some(i))
            .collect();
        assert_eq!(ticks, vec![0, 960, 1920]);
    }

    #[test]
    fn transport_running_per_source() {
        let mut clock = ClockManager::default();
        assert!(!clock.transport_running(true, false));
        assert!(clock.transport_running(true, true));
        assert!(!clock.transport_running(false, true));
        clock.set_source(ClockSource::Internal);
        assert!(clock.transport_running(true, false));
    }
}
