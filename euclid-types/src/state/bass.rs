use serde::{Deserialize, Serialize};

use super::clamp_finite;

pub const MIN_GLIDE_TIME: f32 = 0.01;
pub const MAX_GLIDE_TIME: f32 = 0.5;
pub const MIN_GLIDE_CURVE: f32 = 0.2;
pub const MAX_GLIDE_CURVE: f32 = 2.0;

/// Settings for the monophonic glide voice on the bass lane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BassSettings {
    /// Glide duration in seconds (0.01..=0.5)
    pub glide_time: f32,
    /// Exponent applied to glide progress (0.2..=2.0, 1.0 = linear)
    pub glide_curve: f32,
    /// Receiver pitch-bend range in semitones (2 or 12)
    pub pitch_bend_range: u8,
    /// Route bass-lane triggers through the glide voice
    pub mono_legato: bool,
}

impl Default for BassSettings {
    fn default() -> Self {
        Self {
            glide_time: 0.08,
            glide_curve: 0.6,
            pitch_bend_range: 12,
            mono_legato: true,
        }
    }
}

impl BassSettings {
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        Self {
            glide_time: clamp_finite(
                self.glide_time,
                MIN_GLIDE_TIME,
                MAX_GLIDE_TIME,
                defaults.glide_time,
            ),
            glide_curve: clamp_finite(
                self.glide_curve,
                MIN_GLIDE_CURVE,
                MAX_GLIDE_CURVE,
                defaults.glide_curve,
            ),
            // Only 2 and 12 are supported; snap to the nearer one
            pitch_bend_range: if self.pitch_bend_range <= 7 { 2 } else { 12 },
            mono_legato: self.mono_legato,
        }
    }
}
