//! Monophonic legato voice for the bass lane.
//!
//! The first trigger sounds a note; triggers that arrive while it is still
//! held become glide targets reached through pitch bend, so the lane never
//! emits overlapping note-on/note-off pairs.

use euclid_types::{BassSettings, MidiEvent, MidiMessage, BASS_LANE, PITCH_BEND_CENTER, PITCH_BEND_MAX};

use crate::stager::EventStager;

/// Where and how the voice sends its messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceOutput {
    pub channel: u8,
    pub route: u8,
}

#[derive(Debug, Clone)]
pub struct GlideVoice {
    /// Key physically held down on the receiver
    key: Option<u8>,
    output: VoiceOutput,
    /// Pitch reached by the last completed glide
    held_note: u8,
    /// Pitch the current glide started from (may be mid-way between keys)
    start_pitch: f64,
    target_note: u8,
    glide_active: bool,
    progress: f64,
    elapsed: u32,
    glide_samples: u32,
    /// Samples until the held key is released
    release_in: u32,
    /// Release fell due this sample; applied by `settle` unless a trigger ties over it
    release_pending: bool,
    glide_time: f64,
    curve: f64,
    bend_range: f64,
    sample_rate: f64,
    last_bend: u16,
}

impl Default for GlideVoice {
    fn default() -> Self {
        let settings = BassSettings::default();
        let mut voice = Self {
            key: None,
            output: VoiceOutput { channel: 1, route: 0 },
            held_note: 0,
            start_pitch: 0.0,
            target_note: 0,
            glide_active: false,
            progress: 0.0,
            elapsed: 0,
            glide_samples: 1,
            release_in: 0,
            release_pending: false,
            glide_time: 0.0,
            curve: 1.0,
            bend_range: 12.0,
            sample_rate: 44_100.0,
            last_bend: PITCH_BEND_CENTER,
        };
        voice.configure(&settings, 44_100.0);
        voice
    }
}

impl GlideVoice {
    /// Apply glide settings; takes effect from the next trigger.
    pub fn configure(&mut self, settings: &BassSettings, sample_rate: f64) {
        let settings = settings.sanitized();
        self.glide_time = settings.glide_time as f64;
        self.curve = settings.glide_curve as f64;
        self.bend_range = settings.pitch_bend_range as f64;
        if sample_rate.is_finite() && sample_rate > 0.0 {
            self.sample_rate = sample_rate;
        }
    }

    pub fn is_sounding(&self) -> bool {
        self.key.is_some()
    }

    pub fn glide_active(&self) -> bool {
        self.glide_active
    }

    pub fn held_note(&self) -> Option<u8> {
        self.key.map(|_| self.held_note)
    }

    pub fn target_note(&self) -> u8 {
        self.target_note
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Handle a lane trigger at `offset`. `length` is the note length in samples.
    pub fn trigger(
        &mut self,
        note: u8,
        velocity: u8,
        length: u32,
        output: VoiceOutput,
        stager: &mut EventStager,
        offset: u32,
    ) {
        if self.key.is_none() || output != self.output {
            self.release(stager, offset);
            self.output = output;
            if self.last_bend != PITCH_BEND_CENTER {
                self.emit_bend(PITCH_BEND_CENTER, stager, offset);
            }
            self.emit(MidiMessage::NoteOn { channel: output.channel, note, velocity }, stager, offset);
            self.key = Some(note);
            self.held_note = note;
            self.target_note = note;
            self.start_pitch = note as f64;
            self.glide_active = false;
            self.progress = 0.0;
        } else {
            self.start_pitch = self.current_pitch();
            self.target_note = note;
            self.glide_active = true;
            self.progress = 0.0;
            self.elapsed = 0;
            self.glide_samples = ((self.glide_time * self.sample_rate).round() as u32).max(1);
            let bend = self.bend_value(0.0);
            self.emit_bend(bend, stager, offset);
        }

        self.release_pending = false;
        if length == 0 {
            self.release(stager, offset);
        } else {
            self.release_in = length;
        }
    }

    /// Per-sample update, run before the sample's triggers: emits one
    /// pitch-bend value while gliding and counts down the release.
    pub fn render(&mut self, stager: &mut EventStager, offset: u32) {
        if self.key.is_none() {
            return;
        }
        if self.glide_active {
            self.elapsed += 1;
            self.progress = (self.elapsed as f64 / self.glide_samples as f64).clamp(0.0, 1.0);
            let t = self.progress.powf(self.curve);
            let bend = self.bend_value(t);
            self.emit_bend(bend, stager, offset);
            if self.elapsed >= self.glide_samples {
                self.glide_active = false;
                self.held_note = self.target_note;
                self.start_pitch = self.target_note as f64;
            }
        }
        if self.release_in > 0 {
            self.release_in -= 1;
            self.release_pending = self.release_in == 0;
        }
    }

    /// Run after the sample's triggers. A release due on this sample happens
    /// now unless a trigger on the same sample tied the note over.
    pub fn settle(&mut self, stager: &mut EventStager, offset: u32) {
        if self.release_pending {
            self.release(stager, offset);
        }
    }

    /// Release the held key now, recentring pitch bend. Clears all glide state.
    pub fn release(&mut self, stager: &mut EventStager, offset: u32) {
        if let Some(key) = self.key.take() {
            self.emit(MidiMessage::NoteOff { channel: self.output.channel, note: key }, stager, offset);
        }
        if self.last_bend != PITCH_BEND_CENTER {
            self.emit_bend(PITCH_BEND_CENTER, stager, offset);
        }
        self.glide_active = false;
        self.progress = 0.0;
        self.elapsed = 0;
        self.release_in = 0;
        self.release_pending = false;
    }

    fn current_pitch(&self) -> f64 {
        if self.glide_active {
            let t = self.progress.powf(self.curve);
            self.start_pitch + (self.target_note as f64 - self.start_pitch) * t
        } else {
            self.held_note as f64
        }
    }

    /// Bend for glide position `t`, relative to the held key.
    fn bend_value(&self, t: f64) -> u16 {
        let key = self.key.unwrap_or(self.held_note) as f64;
        let semitones = (self.start_pitch - key) + (self.target_note as f64 - self.start_pitch) * t;
        let value = PITCH_BEND_CENTER as f64 + (8192.0 * semitones / self.bend_range).round();
        value.clamp(0.0, PITCH_BEND_MAX as f64) as u16
    }

    fn emit_bend(&mut self, value: u16, stager: &mut EventStager, offset: u32) {
        self.last_bend = value;
        self.emit(MidiMessage::PitchBend { channel: self.output.channel, value }, stager, offset);
    }

    fn emit(&self, message: MidiMessage, stager: &mut EventStager, offset: u32) {
        stager.stage(MidiEvent {
            offset,
            lane: Some(BASS_LANE as u8),
            route: self.output.route,
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUT: VoiceOutput = VoiceOutput { channel: 2, route: 1 };

    fn voice(glide_time: f32, curve: f32, range: u8, sample_rate: f64) -> GlideVoice {
        let mut v = GlideVoice::default();
        let settings = BassSettings {
            glide_time,
            glide_curve: curve,
            pitch_bend_range: range,
            mono_legato: true,
        };
        v.configure(&settings, sample_rate);
        v
    }

    /// One full sample with no trigger.
    fn idle(v: &mut GlideVoice, stager: &mut EventStager, offset: u32) {
        v.render(stager, offset);
        v.settle(stager, offset);
    }

    fn bends(events: &[MidiEvent]) -> Vec<(u32, u16)> {
        events
            .iter()
            .filter_map(|e| match e.message {
                MidiMessage::PitchBend { value, .. } => Some((e.offset, value)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn first_trigger_is_plain_note_on() {
        let mut v = voice(0.1, 1.0, 12, 1_000.0);
        let mut stager = EventStager::with_capacity(16);
        v.trigger(48, 90, 100, OUT, &mut stager, 3);
        assert_eq!(
            stager.staged()[0].message,
            MidiMessage::NoteOn { channel: 2, note: 48, velocity: 90 }
        );
        assert_eq!(stager.staged()[0].route, 1);
        assert_eq!(stager.staged()[0].lane, Some(BASS_LANE as u8));
        assert_eq!(stager.len(), 1);
        assert_eq!(v.held_note(), Some(48));
    }

    #[test]
    fn legato_trigger_ramps_bend_to_target() {
        let sample_rate = 1_000.0;
        let mut v = voice(0.1, 1.0, 12, sample_rate);
        let mut stager = EventStager::with_capacity(1_024);
        v.trigger(60, 100, 10_000, OUT, &mut stager, 0);
        for s in 1..10 {
            idle(&mut v, &mut stager, s);
        }
        v.trigger(72, 100, 10_000, OUT, &mut stager, 10);
        assert!(v.glide_active());
        for s in 11..300 {
            idle(&mut v, &mut stager, s);
        }

        let events = stager.staged();
        assert_eq!(events.iter().filter(|e| e.message.is_note_on()).count(), 1);
        assert!(!events.iter().any(|e| e.message.is_note_off()));

        let ramp = bends(events);
        let glide_samples = (0.1 * sample_rate) as u32;
        assert_eq!(ramp.first(), Some(&(10, 8192)));
        assert_eq!(ramp.last(), Some(&(10 + glide_samples, 16383)));
        assert_eq!(ramp.len() as u32, glide_samples + 1);
        assert!(ramp.windows(2).all(|w| w[0].1 <= w[1].1));
        assert!(!v.glide_active());
        assert_eq!(v.held_note(), Some(72));
    }

    #[test]
    fn release_sends_note_off_for_held_key_and_recentres() {
        let mut v = voice(0.01, 1.0, 2, 1_000.0);
        let mut stager = EventStager::with_capacity(64);
        v.trigger(40, 100, 50, OUT, &mut stager, 0);
        v.trigger(41, 100, 20, OUT, &mut stager, 5);
        for s in 6..40 {
            idle(&mut v, &mut stager, s);
        }
        let offs: Vec<(u32, MidiMessage)> = stager
            .staged()
            .iter()
            .filter(|e| e.message.is_note_off())
            .map(|e| (e.offset, e.message))
            .collect();
        assert_eq!(offs, vec![(25, MidiMessage::NoteOff { channel: 2, note: 40 })]);
        assert_eq!(bends(stager.staged()).last(), Some(&(25, 8192)));
        assert!(!v.is_sounding());
    }

    #[test]
    fn next_note_after_release_starts_centred() {
        let mut v = voice(0.01, 1.0, 12, 1_000.0);
        let mut stager = EventStager::with_capacity(64);
        v.trigger(50, 100, 30, OUT, &mut stager, 0);
        v.trigger(55, 100, 30, OUT, &mut stager, 2);
        let mut discard = Vec::new();
        for s in 3..40 {
            idle(&mut v, &mut stager, s);
        }
        stager.flush(&mut discard);
        v.trigger(57, 100, 30, OUT, &mut stager, 41);
        assert_eq!(
            stager.staged()[0].message,
            MidiMessage::NoteOn { channel: 2, note: 57, velocity: 100 }
        );
    }

    #[test]
    fn curve_below_one_front_loads_the_glide() {
        let mut v = voice(0.1, 0.5, 12, 1_000.0);
        let mut stager = EventStager::with_capacity(256);
        v.trigger(60, 100, 10_000, OUT, &mut stager, 0);
        v.trigger(72, 100, 10_000, OUT, &mut stager, 1);
        for s in 2..=51 {
            v.render(&mut stager, s);
        }
        let ramp = bends(stager.staged());
        let (_, halfway) = ramp[50];
        // sqrt(0.5) of the way there
        assert!(halfway > 8192 + 4096);
    }

    #[test]
    fn trigger_on_release_sample_ties_into_glide() {
        let mut v = voice(0.05, 1.0, 12, 1_000.0);
        let mut stager = EventStager::with_capacity(256);
        v.trigger(60, 100, 10, OUT, &mut stager, 0);
        for s in 1..10 {
            idle(&mut v, &mut stager, s);
        }
        // Release falls due on sample 10, the same sample as the next trigger
        v.render(&mut stager, 10);
        v.trigger(67, 100, 10, OUT, &mut stager, 10);
        v.settle(&mut stager, 10);
        assert!(v.is_sounding());
        assert!(v.glide_active());
        assert!(!stager.staged().iter().any(|e| e.message.is_note_off()));

        // Without a tie the note ends on time
        for s in 11..20 {
            idle(&mut v, &mut stager, s);
        }
        v.render(&mut stager, 20);
        v.settle(&mut stager, 20);
        assert!(!v.is_sounding());
    }

    #[test]
    fn zero_length_trigger_releases_immediately() {
        let mut v = voice(0.05, 1.0, 12, 1_000.0);
        let mut stager = EventStager::with_capacity(8);
        v.trigger(60, 100, 0, OUT, &mut stager, 4);
        assert!(!v.is_sounding());
        assert!(stager.staged()[0].message.is_note_on());
        assert!(stager.staged()[1].message.is_note_off());
    }
}
