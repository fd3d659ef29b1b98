//! Per-block event staging and note-off carryover.
//!
//! Lanes stage events while the block is rendered sample by sample, so the
//! staging order is already offset-ascending. `flush` hands them to the output
//! once at block end. Note-offs live in `PendingNoteOffs`, a fixed-capacity
//! queue that counts down in samples and survives block boundaries.

use euclid_types::{MidiEvent, MidiMessage};

/// Slots in the pending note-off queue.
pub const PENDING_NOTE_OFF_CAPACITY: usize = 256;

pub struct EventStager {
    staged: Vec<MidiEvent>,
    dropped: u64,
}

impl EventStager {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            staged: Vec::with_capacity(capacity),
            dropped: 0,
        }
    }

    /// Stage an event. Events beyond the pre-sized capacity are dropped and
    /// counted instead of growing the buffer.
    pub fn stage(&mut self, event: MidiEvent) -> bool {
        if self.staged.len() >= self.staged.capacity() {
            self.dropped += 1;
            return false;
        }
        self.staged.push(event);
        true
    }

    /// Append staged events to `out` in staging order and clear the stage.
    pub fn flush(&mut self, out: &mut Vec<MidiEvent>) {
        out.extend(self.staged.drain(..));
    }

    pub fn staged(&self) -> &[MidiEvent] {
        &self.staged
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.staged.capacity()
    }

    /// Events lost to a full stage since construction.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// A note-off owed for a note that is still sounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingNoteOff {
    pub lane: u8,
    pub route: u8,
    pub channel: u8,
    pub note: u8,
    /// Samples until the note-off fires; 0 fires on the current sample
    pub remaining_samples: u32,
}

impl PendingNoteOff {
    /// The note-off message, stamped at `offset`.
    pub fn event(&self, offset: u32) -> MidiEvent {
        MidiEvent {
            offset,
            lane: Some(self.lane),
            route: self.route,
            message: MidiMessage::NoteOff {
                channel: self.channel,
                note: self.note,
            },
        }
    }
}

/// Fixed-capacity, order-preserving queue of note-off obligations.
pub struct PendingNoteOffs {
    slots: [Option<PendingNoteOff>; PENDING_NOTE_OFF_CAPACITY],
    len: usize,
}

impl Default for PendingNoteOffs {
    fn default() -> Self {
        Self {
            slots: [None; PENDING_NOTE_OFF_CAPACITY],
            len: 0,
        }
    }
}

impl PendingNoteOffs {
    /// Queue a note-off. When the queue is full the oldest obligation is
    /// released at `offset` to make room.
    pub fn schedule(&mut self, entry: PendingNoteOff, stager: &mut EventStager, offset: u32) {
        if self.len == PENDING_NOTE_OFF_CAPACITY {
            if let Some(oldest) = self.slots[0] {
                stager.stage(oldest.event(offset));
            }
            self.slots.copy_within(1..self.len, 0);
            self.len -= 1;
        }
        self.slots[self.len] = Some(entry);
        self.len += 1;
    }

    /// Stage every note-off due on this sample and drop it from the queue.
    pub fn fire_due(&mut self, stager: &mut EventStager, offset: u32) {
        let mut kept = 0;
        for i in 0..self.len {
            match self.slots[i] {
                Some(entry) if entry.remaining_samples == 0 => {
                    stager.stage(entry.event(offset));
                }
                other => {
                    self.slots[kept] = other;
                    kept += 1;
                }
            }
        }
        for slot in &mut self.slots[kept..self.len] {
            *slot = None;
        }
        self.len = kept;
    }

    /// Count one sample down on every obligation.
    pub fn tick(&mut self) {
        for entry in self.slots[..self.len].iter_mut().flatten() {
            entry.remaining_samples = entry.remaining_samples.saturating_sub(1);
        }
    }

    /// Stage every obligation at `offset` and empty the queue.
    pub fn release_all(&mut self, stager: &mut EventStager, offset: u32) {
        for entry in self.slots[..self.len].iter().flatten() {
            stager.stage(entry.event(offset));
        }
        self.clear();
    }

    pub fn clear(&mut self) {
        self.slots = [None; PENDING_NOTE_OFF_CAPACITY];
        self.len = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingNoteOff> {
        self.slots[..self.len].iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
