use euclid_types::LANE_COUNT;

use crate::stager::PENDING_NOTE_OFF_CAPACITY;

/// Most events one rendered sample can stage: a note-on and note-off per
/// lane, the glide voice's note and bend messages, and a master clock tick.
pub const EVENTS_PER_SAMPLE: usize = LANE_COUNT * 2 + 8 + 1;

/// Events a transport edge or reset can add once per span on top of that.
const EDGE_EVENTS: usize = 8;

/// One-shot requests from the control thread, drained at block start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCommand {
    /// Rewind one lane to step 0 on the next block
    ResetLane(usize),
    /// Rewind every lane
    ResetAll,
}

/// Block sizing and queue limits fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Longest span rendered between two flushes; longer host blocks are split
    pub max_block_size: usize,
    pub command_queue_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_block_size: 4096,
            command_queue_capacity: 64,
        }
    }
}

impl EngineSettings {
    pub fn sanitized(&self) -> Self {
        Self {
            max_block_size: self.max_block_size.clamp(16, 65_536),
            command_queue_capacity: self.command_queue_capacity.clamp(1, 4096),
        }
    }

    /// Staging capacity for the densest possible span of `max_block_size`
    /// samples. Note-offs already pending when the span starts are released
    /// at most once each, so the stage never fills.
    pub fn staging_capacity(&self) -> usize {
        self.max_block_size * EVENTS_PER_SAMPLE + PENDING_NOTE_OFF_CAPACITY + EDGE_EVENTS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_clamp_to_workable_sizes() {
        let settings = EngineSettings { max_block_size: 0, command_queue_capacity: 0 }.sanitized();
        assert_eq!(settings.max_block_size, 16);
        assert_eq!(settings.command_queue_capacity, 1);
    }

    #[test]
    fn staging_covers_a_full_span_plus_pending_note_offs() {
        let settings = EngineSettings::default();
        assert_eq!(settings.staging_capacity(), 4096 * 21 + 256 + 8);
    }
}
