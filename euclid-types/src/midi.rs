use serde::{Deserialize, Serialize};

/// Centre (no bend) value of a 14-bit pitch-bend message.
pub const PITCH_BEND_CENTER: u16 = 8192;
/// Largest 14-bit pitch-bend value.
pub const PITCH_BEND_MAX: u16 = 16383;

/// MIDI real-time clock messages (24 PPQN).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClockMessage {
    Start,
    Stop,
    Continue,
    Tick,
}

impl ClockMessage {
    pub fn name(&self) -> &'static str {
        match self {
            ClockMessage::Start => "Start",
            ClockMessage::Stop => "Stop",
            ClockMessage::Continue => "Continue",
            ClockMessage::Tick => "Tick",
        }
    }
}

/// An incoming clock message stamped with its sample offset inside the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedClockMessage {
    pub offset: u32,
    pub kind: ClockMessage,
}

impl TimedClockMessage {
    pub fn new(offset: u32, kind: ClockMessage) -> Self {
        Self { offset, kind }
    }
}

/// Messages the engine can emit. Channels are 1-based (1..=16).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidiMessage {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    /// 14-bit value, 8192 = centre
    PitchBend { channel: u8, value: u16 },
    /// Master clock output
    Clock(ClockMessage),
}

impl MidiMessage {
    pub fn is_note_on(&self) -> bool {
        matches!(self, MidiMessage::NoteOn { .. })
    }

    pub fn is_note_off(&self) -> bool {
        matches!(self, MidiMessage::NoteOff { .. })
    }
}

/// A message stamped with its position inside the current block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiEvent {
    /// Sample offset from the start of the block
    pub offset: u32,
    /// Lane that produced the event (`None` for clock output)
    pub lane: Option<u8>,
    /// Logical output port tag
    pub route: u8,
    pub message: MidiMessage,
}
