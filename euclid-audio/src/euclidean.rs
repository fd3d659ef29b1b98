//! Euclidean onset patterns.
//!
//! Distributes `pulses` onsets across `steps` positions so that gaps between
//! consecutive onsets differ by at most one step. The pattern lives in a fixed
//! array, so recomputing it on the audio thread never allocates.

use euclid_types::MAX_STEPS;

/// Fill `out` with the maximally-even onset sequence for `(steps, pulses)`.
///
/// Position `i` is an onset when `(i * pulses) mod steps < pulses`, which
/// places the first onset on step 0. `pulses >= steps` yields all onsets.
pub fn euclidean_rhythm(steps: usize, pulses: usize, out: &mut [bool; MAX_STEPS]) {
    let steps = steps.clamp(1, MAX_STEPS);
    let pulses = pulses.min(steps);
    *out = [false; MAX_STEPS];
    for (i, slot) in out.iter_mut().enumerate().take(steps) {
        *slot = (i * pulses) % steps < pulses;
    }
}

/// Onset pattern plus a replayable cursor.
#[derive(Debug, Clone, Copy)]
pub struct EuclideanPattern {
    onsets: [bool; MAX_STEPS],
    steps: usize,
    pulses: usize,
    /// Index of the step entered by the next `advance()`
    cursor: usize,
}

impl Default for EuclideanPattern {
    fn default() -> Self {
        Self::new(16, 4)
    }
}

impl EuclideanPattern {
    pub fn new(steps: usize, pulses: usize) -> Self {
        let steps = steps.clamp(1, MAX_STEPS);
        let pulses = pulses.min(steps);
        let mut onsets = [false; MAX_STEPS];
        euclidean_rhythm(steps, pulses, &mut onsets);
        Self {
            onsets,
            steps,
            pulses,
            cursor: 0,
        }
    }

    /// Change the pattern. Identical arguments are a no-op; otherwise the
    /// cursor is kept modulo the new length.
    pub fn set_pattern(&mut self, steps: usize, pulses: usize) {
        let steps = steps.clamp(1, MAX_STEPS);
        let pulses = pulses.min(steps);
        if steps == self.steps && pulses == self.pulses {
            return;
        }
        euclidean_rhythm(steps, pulses, &mut self.onsets);
        self.steps = steps;
        self.pulses = pulses;
        self.cursor %= steps;
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Onset at the cursor, i.e. of the step the next `advance()` enters.
    pub fn current_onset(&self) -> bool {
        self.onsets[self.cursor]
    }

    /// Enter the step at the cursor and return whether it is an onset.
    pub fn advance(&mut self) -> bool {
        let onset = self.onsets[self.cursor];
        self.cursor = (self.cursor + 1) % self.steps;
        onset
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn pulses(&self) -> usize {
        self.pulses
    }

    pub fn onsets(&self) -> &[bool] {
        &self.onsets[..self.steps]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(steps: usize, pulses: usize) -> String {
        EuclideanPattern::new(steps, pulses)
            .onsets()
            .iter()
            .map(|&b| if b { '1' } else { '0' })
            .collect()
    }

    #[test]
    fn canonical_patterns() {
        assert_eq!(render(8, 3), "10010010");
        assert_eq!(render(4, 4), "1111");
        assert_eq!(render(5, 0), "00000");
        assert_eq!(render(16, 4), "1000100010001000");
    }

    #[test]
    fn pulses_beyond_steps_fill_everything() {
        assert_eq!(render(6, 9), "111111");
    }

    #[test]
    fn every_pattern_is_evenly_distributed() {
        for steps in 1..=MAX_STEPS {
            for pulses in 0..=steps {
                let pattern = EuclideanPattern::new(steps, pulses);
                let onsets = pattern.onsets();
                assert_eq!(onsets.iter().filter(|&&b| b).count(), pulses, "({steps},{pulses})");
                if pulses < 2 {
                    continue;
                }
                let positions: Vec<usize> = (0..steps).filter(|&i| onsets[i]).collect();
                let mut gaps: Vec<usize> = positions.windows(2).map(|w| w[1] - w[0]).collect();
                // Wrap-around gap back to the first onset
                gaps.push(steps - positions[positions.len() - 1] + positions[0]);
                let min = gaps.iter().min().copied().unwrap_or(0);
                let max = gaps.iter().max().copied().unwrap_or(0);
                assert!(max - min <= 1, "({steps},{pulses}) gaps {gaps:?}");
            }
        }
    }

    #[test]
    fn advance_walks_and_wraps() {
        let mut p = EuclideanPattern::new(8, 3);
        let seen: Vec<bool> = (0..10).map(|_| p.advance()).collect();
        assert_eq!(
            seen,
            vec![true, false, false, true, false, false, true, false, true, false]
        );
        assert_eq!(p.cursor(), 2);
    }

    #[test]
    fn set_pattern_is_idempotent() {
        let mut p = EuclideanPattern::new(8, 3);
        p.advance();
        p.advance();
        let before = p.onsets().to_vec();
        p.set_pattern(8, 3);
        p.set_pattern(8, 3);
        assert_eq!(p.cursor(), 2);
        assert_eq!(p.onsets(), before.as_slice());
    }

    #[test]
    fn set_pattern_keeps_cursor_modulo_length() {
        let mut p = EuclideanPattern::new(16, 4);
        for _ in 0..13 {
            p.advance();
        }
        p.set_pattern(8, 2);
        assert_eq!(p.cursor(), 5);
        p.reset();
        assert_eq!(p.cursor(), 0);
        assert!(p.current_onset());
    }
}
