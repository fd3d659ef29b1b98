pub mod arpeggiator;
pub mod bass;
pub mod clock;
pub mod engine;
pub mod lane;
pub mod music;

pub use arpeggiator::*;
pub use bass::*;
pub use clock::*;
pub use engine::*;
pub use lane::*;
pub use music::*;

/// Clamp a float into `[lo, hi]`, replacing NaN and infinities with `fallback`.
pub(crate) fn clamp_finite(value: f32, lo: f32, hi: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(lo, hi)
    } else {
        fallback
    }
}
