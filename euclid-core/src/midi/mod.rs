//! Wire format for engine messages.
//!
//! Engine messages carry 1-based channels; on the wire the channel is the low
//! nibble of the status byte (0-based).

use euclid_types::{ClockMessage, MidiMessage, PITCH_BEND_MAX};

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const PITCH_BEND: u8 = 0xE0;
const CLOCK_TICK: u8 = 0xF8;
const CLOCK_START: u8 = 0xFA;
const CLOCK_CONTINUE: u8 = 0xFB;
const CLOCK_STOP: u8 = 0xFC;

fn status(kind: u8, channel: u8) -> u8 {
    kind | (channel.clamp(1, 16) - 1)
}

/// Encode one message. Returns the bytes and how many of them are used.
pub fn encode(message: &MidiMessage) -> ([u8; 3], usize) {
    match *message {
        MidiMessage::NoteOn { channel, note, velocity } => {
            ([status(NOTE_ON, channel), note & 0x7F, velocity & 0x7F], 3)
        }
        MidiMessage::NoteOff { channel, note } => ([status(NOTE_OFF, channel), note & 0x7F, 0], 3),
        MidiMessage::PitchBend { channel, value } => {
            let value = value.min(PITCH_BEND_MAX);
            let lsb = (value & 0x7F) as u8;
            let msb = (value >> 7) as u8;
            ([status(PITCH_BEND, channel), lsb, msb], 3)
        }
        MidiMessage::Clock(kind) => {
            let byte = match kind {
                ClockMessage::Tick => CLOCK_TICK,
                ClockMessage::Start => CLOCK_START,
                ClockMessage::Continue => CLOCK_CONTINUE,
                ClockMessage::Stop => CLOCK_STOP,
            };
            ([byte, 0, 0], 1)
        }
    }
}

/// Decode a single real-time clock byte.
pub fn parse_clock_byte(byte: u8) -> Option<ClockMessage> {
    match byte {
        CLOCK_TICK => Some(ClockMessage::Tick),
        CLOCK_START => Some(ClockMessage::Start),
        CLOCK_CONTINUE => Some(ClockMessage::Continue),
        CLOCK_STOP => Some(ClockMessage::Stop),
        _ => None,
    }
}

/// Pick the clock messages out of a byte stream. Real-time bytes may be
/// interleaved anywhere, including inside other messages.
pub fn parse_realtime(data: &[u8]) -> Vec<ClockMessage> {
    data.iter().filter_map(|&b| parse_clock_byte(b)).collect()
}

/// Decode a raw message into an engine message
pub fn parse_message(data: &[u8]) -> Option<MidiMessage> {
    let (&status, rest) = data.split_first()?;
    if let Some(clock) = parse_clock_byte(status) {
        return Some(MidiMessage::Clock(clock));
    }

    let channel = (status & 0x0F) + 1;
    match status & 0xF0 {
        NOTE_OFF if rest.len() >= 2 => Some(MidiMessage::NoteOff { channel, note: rest[0] }),
        NOTE_ON if rest.len() >= 2 => {
            // Note On (velocity 0 = note off)
            if rest[1] == 0 {
                Some(MidiMessage::NoteOff { channel, note: rest[0] })
            } else {
                Some(MidiMessage::NoteOn {
                    channel,
                    note: rest[0],
                    velocity: rest[1],
                })
            }
        }
        PITCH_BEND if rest.len() >= 2 => {
            let lsb = (rest[0] & 0x7F) as u16;
            let msb = (rest[1] & 0x7F) as u16;
            Some(MidiMessage::PitchBend {
                channel,
                value: (msb << 7) | lsb,
            })
        }
        _ => None,
    }
}
