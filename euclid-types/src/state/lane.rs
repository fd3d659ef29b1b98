use serde::{Deserialize, Serialize};

use super::arpeggiator::{ArpMode, ARP_RATE_MULTIPLIERS};
use super::clamp_finite;
use super::music::{NoteSet, NoteSource};
use crate::{MAX_ARP_NOTES, MAX_STEPS};

/// Per-lane configuration, as published by the control thread.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaneConfig {
    /// Disabled lanes are frozen: no clock advance, no output
    pub active: bool,
    pub muted: bool,
    pub solo: bool,
    /// Pattern length (1..=32)
    pub steps: u8,
    /// Onsets per pattern (0..=steps)
    pub pulses: u8,
    /// Delay of odd steps as a fraction of half a step (0..=1)
    pub swing: f32,
    /// Per-step offsets as a fraction of a step (-0.5..=0.5); only the first `steps` are used
    pub microtiming: [f32; MAX_STEPS],
    /// Note-on velocity (1..=127)
    pub velocity: u8,
    /// Note length as a fraction of a step (0..=1)
    pub note_length: f32,
    pub arp_active: bool,
    pub arp_mode: ArpMode,
    /// Index into `ARP_RATE_MULTIPLIERS` (0..=7)
    pub arp_rate_index: u8,
    /// Bit i keeps note i of the source in the arp set
    pub arp_note_mask: u8,
    pub note_source: NoteSource,
    /// MIDI channel (1..=16)
    pub midi_channel: u8,
    /// Logical output port tag (0..=15)
    pub output_route: u8,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            active: true,
            muted: false,
            solo: false,
            steps: 16,
            pulses: 4,
            swing: 0.0,
            microtiming: [0.0; MAX_STEPS],
            velocity: 100,
            note_length: 0.5,
            arp_active: false,
            arp_mode: ArpMode::Up,
            arp_rate_index: 2,
            arp_note_mask: ALL_ARP_NOTES,
            note_source: NoteSource::default(),
            midi_channel: 1,
            output_route: 0,
        }
    }
}

/// Mask selecting every source note for the arpeggiator.
pub const ALL_ARP_NOTES: u8 = 0x7F;

pub const MAX_OUTPUT_ROUTE: u8 = 15;

impl LaneConfig {
    /// Clamp every field into its documented range.
    pub fn sanitized(&self) -> Self {
        let steps = self.steps.clamp(1, MAX_STEPS as u8);
        let mut microtiming = [0.0; MAX_STEPS];
        for (dst, src) in microtiming.iter_mut().zip(self.microtiming.iter()) {
            *dst = clamp_finite(*src, -0.5, 0.5, 0.0);
        }
        Self {
            active: self.active,
            muted: self.muted,
            solo: self.solo,
            steps,
            pulses: self.pulses.min(steps),
            swing: clamp_finite(self.swing, 0.0, 1.0, 0.0),
            microtiming,
            velocity: self.velocity.clamp(1, 127),
            note_length: clamp_finite(self.note_length, 0.0, 1.0, 0.5),
            arp_active: self.arp_active,
            arp_mode: self.arp_mode,
            arp_rate_index: self.arp_rate_index.min(ARP_RATE_MULTIPLIERS.len() as u8 - 1),
            arp_note_mask: self.arp_note_mask & ALL_ARP_NOTES,
            note_source: self.note_source,
            midi_channel: self.midi_channel.clamp(1, 16),
            output_route: self.output_route.min(MAX_OUTPUT_ROUTE),
        }
    }

    /// Notes the arpeggiator cycles: the masked source notes, at most seven.
    pub fn arp_notes(&self) -> NoteSet {
        let mut set = NoteSet::default();
        let source = self.note_source.notes();
        for (i, &note) in source.as_slice().iter().enumerate().take(MAX_ARP_NOTES) {
            if self.arp_note_mask & (1 << i) != 0 {
                set.push(note);
            }
        }
        set
    }

    /// Note sounded when the arpeggiator is off.
    pub fn base_note(&self) -> u8 {
        self.note_source.notes().first().unwrap_or(super::music::FALLBACK_NOTE)
    }
}
