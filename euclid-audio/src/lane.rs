//! Per-lane scheduling.
//!
//! `LaneState` bundles everything one rhythm lane needs between samples: its
//! Euclidean pattern, its arpeggiator and its timing. `advance_lane` runs one
//! sample of the lane and reports a trigger when a sounding step begins.

use euclid_types::{arp_rate_multiplier, LaneConfig};

use crate::arpeggiator::Arpeggiator;
use crate::euclidean::EuclideanPattern;

/// Shortest interval between two steps of one lane.
const MIN_STEP_INTERVAL: f64 = 1.0;

/// A sounding step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub note: u8,
    pub velocity: u8,
    /// Note length in samples
    pub length: u32,
}

/// How the lane decides that a step boundary occurs on this sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepClock {
    /// Compare the global sample counter against the lane's next fire time
    Sample,
    /// External clock: the tick accumulator already decided for this sample
    External { boundary: bool },
}

#[derive(Debug, Clone)]
pub struct LaneState {
    pub pattern: EuclideanPattern,
    pub arp: Arpeggiator,
    /// Sample at which the next step begins
    pub next_fire_sample: i64,
    /// Fractional part of the next fire time
    fire_carry: f64,
    pub step_counter: i64,
    /// An arp sub-step boundary was crossed since the last step boundary
    arp_latch: bool,
    /// The lane was inactive and must re-anchor when it wakes up
    dormant: bool,
}

impl LaneState {
    pub fn new(index: usize) -> Self {
        Self {
            pattern: EuclideanPattern::default(),
            arp: Arpeggiator::with_seed(0x9e37_79b9_7f4a_7c15 ^ index as u64),
            next_fire_sample: 0,
            fire_carry: 0.0,
            step_counter: 0,
            arp_latch: true,
            dormant: false,
        }
    }

    /// Push a new configuration into the pattern and the arpeggiator.
    pub fn apply_config(&mut self, config: &LaneConfig) {
        self.pattern
            .set_pattern(config.steps as usize, config.pulses as usize);
        self.arp.set_notes(config.arp_notes().as_slice());
        self.arp.set_mode(config.arp_mode);
        self.arp.set_rate(arp_rate_multiplier(config.arp_rate_index));
    }

    /// Back to step 0, firing on `current_sample`.
    pub fn reset(&mut self, current_sample: i64) {
        self.pattern.reset();
        self.arp.reset();
        self.step_counter = 0;
        self.arp_latch = true;
        self.reanchor(current_sample);
    }

    /// Fire the next step on `current_sample` without moving any cursor.
    pub fn reanchor(&mut self, current_sample: i64) {
        self.next_fire_sample = current_sample;
        self.fire_carry = 0.0;
    }

    /// Move the next fire time forward by one step interval, including the
    /// swing and microtiming of the step being entered.
    fn schedule_next(&mut self, config: &LaneConfig, samples_per_step: f64) {
        let steps = (config.steps as i64).max(1);
        let index = self.step_counter.rem_euclid(steps) as usize;
        let swing = if self.step_counter % 2 == 1 {
            0.5 * samples_per_step * config.swing as f64
        } else {
            0.0
        };
        let micro = config.microtiming.get(index).copied().unwrap_or(0.0) as f64 * samples_per_step;
        let interval = (samples_per_step + swing + micro).max(MIN_STEP_INTERVAL);

        let next = self.next_fire_sample as f64 + self.fire_carry + interval;
        let whole = next.floor();
        self.next_fire_sample = whole as i64;
        self.fire_carry = next - whole;
    }
}

/// Run one sample of a lane. Pattern, arp and timing advance even when the
/// caller later suppresses the trigger for mute or solo.
pub fn advance_lane(
    lane: &mut LaneState,
    config: &LaneConfig,
    samples_per_step: f64,
    clock: StepClock,
    current_sample: i64,
) -> Option<Trigger> {
    if !config.active {
        lane.dormant = true;
        return None;
    }
    if lane.dormant {
        lane.dormant = false;
        lane.reanchor(current_sample);
    }

    if config.arp_active {
        let span = lane.arp.samples_per_arp_step(samples_per_step);
        if lane.arp.advance_samples(1.0, span) {
            lane.arp_latch = true;
        }
    }

    let boundary = match clock {
        StepClock::Sample => current_sample >= lane.next_fire_sample,
        StepClock::External { boundary } => boundary,
    };
    if !boundary {
        return None;
    }

    if clock == StepClock::Sample {
        lane.schedule_next(config, samples_per_step);
    }
    lane.step_counter += 1;
    let onset = lane.pattern.advance();
    let arp_crossed = std::mem::replace(&mut lane.arp_latch, false);

    if !onset {
        return None;
    }
    let note = if config.arp_active {
        if !arp_crossed {
            return None;
        }
        lane.arp.current_note()?
    } else {
        config.base_note()
    };

    let length = (config.note_length as f64 * samples_per_step).floor();
    Some(Trigger {
        note,
        velocity: config.velocity,
        length: length.clamp(0.0, u32::MAX as f64) as u32,
    })
}
