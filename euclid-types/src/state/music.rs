use serde::{Deserialize, Serialize};

/// Scale definition as intervals from root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scale {
    Major,
    Minor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Locrian,
}

impl Scale {
    pub const ALL: [Scale; 7] = [
        Scale::Major,
        Scale::Minor,
        Scale::Dorian,
        Scale::Phrygian,
        Scale::Lydian,
        Scale::Mixolydian,
        Scale::Locrian,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scale::Major => "Major",
            Scale::Minor => "Minor",
            Scale::Dorian => "Dorian",
            Scale::Phrygian => "Phrygian",
            Scale::Lydian => "Lydian",
            Scale::Mixolydian => "Mixolydian",
            Scale::Locrian => "Locrian",
        }
    }

    /// Semitone intervals from root for this scale
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            Scale::Major => &[0, 2, 4, 5, 7, 9, 11],
            Scale::Minor => &[0, 2, 3, 5, 7, 8, 10],
            Scale::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            Scale::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            Scale::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            Scale::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            Scale::Locrian => &[0, 1, 3, 5, 6, 8, 10],
        }
    }
}

/// Chord shapes as interval offsets from root in semitones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChordShape {
    Major,
    Minor,
    Seventh,
    MinorSeventh,
    MajorSeventh,
    Sus2,
    Sus4,
}

impl ChordShape {
    /// Returns semitone offsets including the root (0).
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            ChordShape::Major => &[0, 4, 7],
            ChordShape::Minor => &[0, 3, 7],
            ChordShape::Seventh => &[0, 4, 7, 10],
            ChordShape::MinorSeventh => &[0, 3, 7, 10],
            ChordShape::MajorSeventh => &[0, 4, 7, 11],
            ChordShape::Sus2 => &[0, 2, 7],
            ChordShape::Sus4 => &[0, 5, 7],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChordShape::Major => "Major",
            ChordShape::Minor => "Minor",
            ChordShape::Seventh => "7th",
            ChordShape::MinorSeventh => "m7",
            ChordShape::MajorSeventh => "maj7",
            ChordShape::Sus2 => "sus2",
            ChordShape::Sus4 => "sus4",
        }
    }
}

/// Scales selectable by id: (root note, scale).
pub const SCALE_CATALOG: [(u8, Scale); 6] = [
    (60, Scale::Major),
    (62, Scale::Dorian),
    (57, Scale::Minor),
    (64, Scale::Phrygian),
    (65, Scale::Lydian),
    (67, Scale::Mixolydian),
];

/// Chords selectable by id: (root note, shape).
pub const CHORD_CATALOG: [(u8, ChordShape); 6] = [
    (60, ChordShape::Major),
    (57, ChordShape::Minor),
    (55, ChordShape::Seventh),
    (62, ChordShape::MinorSeventh),
    (65, ChordShape::MajorSeventh),
    (60, ChordShape::Sus4),
];

/// Note used when a catalog id is unknown.
pub const FALLBACK_NOTE: u8 = 60;

/// Largest note set any source can produce (seven scale degrees plus the octave).
pub const MAX_SOURCE_NOTES: usize = 8;

/// Where a lane takes its pitches from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteSource {
    Single(u8),
    Scale(u8),
    Chord(u8),
}

impl Default for NoteSource {
    fn default() -> Self {
        NoteSource::Single(FALLBACK_NOTE)
    }
}

impl NoteSource {
    pub fn name(&self) -> &'static str {
        match self {
            NoteSource::Single(_) => "Single",
            NoteSource::Scale(_) => "Scale",
            NoteSource::Chord(_) => "Chord",
        }
    }

    /// Resolve to an ordered note set. Unknown catalog ids give the fallback note.
    pub fn notes(&self) -> NoteSet {
        match *self {
            NoteSource::Single(note) => NoteSet::from_slice(&[note.min(127)]),
            NoteSource::Scale(id) => match SCALE_CATALOG.get(id as usize) {
                Some(&(root, scale)) => {
                    let mut set = NoteSet::from_root(root, scale.intervals());
                    set.push(root.saturating_add(12));
                    set
                }
                None => NoteSet::from_slice(&[FALLBACK_NOTE]),
            },
            NoteSource::Chord(id) => match CHORD_CATALOG.get(id as usize) {
                Some(&(root, shape)) => NoteSet::from_root(root, shape.intervals()),
                None => NoteSet::from_slice(&[FALLBACK_NOTE]),
            },
        }
    }
}

/// Fixed-capacity ordered set of MIDI notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoteSet {
    notes: [u8; MAX_SOURCE_NOTES],
    len: usize,
}

impl NoteSet {
    pub fn from_slice(notes: &[u8]) -> Self {
        let mut set = Self::default();
        for &note in notes {
            set.push(note);
        }
        set
    }

    fn from_root(root: u8, intervals: &[u8]) -> Self {
        let mut set = Self::default();
        for &interval in intervals {
            set.push(root.saturating_add(interval));
        }
        set
    }

    /// Append a note, clamped to 0..=127. Ignored once full.
    pub fn push(&mut self, note: u8) {
        if self.len < MAX_SOURCE_NOTES {
            self.notes[self.len] = note.min(127);
            self.len += 1;
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.notes[..self.len]
    }

    pub fn first(&self) -> Option<u8> {
        self.as_slice().first().copied()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
