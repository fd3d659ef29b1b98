use serde::{Deserialize, Serialize};

/// Tempo used when the configured or host tempo is unusable.
pub const DEFAULT_BPM: f64 = 120.0;
/// Sample rate used when the host reports an unusable one.
pub const DEFAULT_SAMPLE_RATE: f64 = 44_100.0;
/// Tempo bounds accepted by the engine.
pub const MIN_BPM: f64 = 1.0;
pub const MAX_BPM: f64 = 999.0;

/// Where the engine takes its timebase from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ClockSource {
    /// Host transport (play state and optional tempo per block)
    #[default]
    Host,
    /// Free-running clock at the configured tempo
    Internal,
    /// Incoming 24 PPQN MIDI clock
    External,
}

impl ClockSource {
    pub fn name(&self) -> &'static str {
        match self {
            ClockSource::Host => "Host",
            ClockSource::Internal => "Internal",
            ClockSource::External => "External",
        }
    }
}

/// Whether the engine follows incoming clock or drives clock output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ClockRole {
    Master,
    #[default]
    Slave,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockSettings {
    pub source: ClockSource,
    pub role: ClockRole,
    /// Tempo for Internal/External sources, and Host when the host has none
    pub bpm: f64,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            source: ClockSource::default(),
            role: ClockRole::default(),
            bpm: DEFAULT_BPM,
        }
    }
}

/// Replace a non-positive or non-finite tempo with the default, then bound it.
pub fn sanitize_bpm(bpm: f64) -> f64 {
    if bpm.is_finite() && bpm > 0.0 {
        bpm.clamp(MIN_BPM, MAX_BPM)
    } else {
        DEFAULT_BPM
    }
}

/// Replace a non-positive or non-finite sample rate with the default.
pub fn sanitize_sample_rate(sample_rate: f64) -> f64 {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        sample_rate
    } else {
        DEFAULT_SAMPLE_RATE
    }
}

impl ClockSettings {
    pub fn sanitized(&self) -> Self {
        Self {
            bpm: sanitize_bpm(self.bpm),
            ..*self
        }
    }
}
