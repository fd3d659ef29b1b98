use serde::{Deserialize, Serialize};

/// Order in which the arpeggiator walks its note set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ArpMode {
    #[default]
    Up,
    Down,
    UpDown,
    Random,
}

/// Arp sub-step length as a fraction of one sequencer step, by rate index.
pub const ARP_RATE_MULTIPLIERS: [f64; 8] = [
    1.0,
    0.5,
    0.25,
    0.125,
    0.0625,
    0.03125,
    1.0 / 6.0,
    0.375,
];

/// Multiplier for a rate index; out-of-range indices use the last entry.
pub fn arp_rate_multiplier(index: u8) -> f64 {
    let idx = (index as usize).min(ARP_RATE_MULTIPLIERS.len() - 1);
    ARP_RATE_MULTIPLIERS[idx]
}
