use serde::{Deserialize, Serialize};

use super::bass::BassSettings;
use super::clock::ClockSettings;
use super::lane::LaneConfig;
use crate::LANE_COUNT;

/// Complete configuration snapshot read by the engine once per block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    pub clock: ClockSettings,
    pub bass: BassSettings,
    pub lanes: [LaneConfig; LANE_COUNT],
    /// Master play switch, combined with the clock source's own run state
    pub global_play: bool,
}

impl EngineConfig {
    /// Clamp every field into its documented range.
    pub fn sanitized(&self) -> Self {
        let mut lanes = self.lanes;
        for lane in lanes.iter_mut() {
            *lane = lane.sanitized();
        }
        Self {
            clock: self.clock.sanitized(),
            bass: self.bass.sanitized(),
            lanes,
            global_play: self.global_play,
        }
    }

    pub fn any_solo(&self) -> bool {
        self.lanes.iter().any(|l| l.solo)
    }

    /// Whether a lane's output is suppressed by mute or by another lane's solo.
    pub fn lane_silenced(&self, index: usize) -> bool {
        match self.lanes.get(index) {
            Some(lane) => {
                if self.any_solo() {
                    !lane.solo
                } else {
                    lane.muted
                }
            }
            None => true,
        }
    }
}
