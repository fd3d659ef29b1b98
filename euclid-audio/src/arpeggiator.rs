//! Arpeggiator state machine: a cursor over up to seven notes, stepped at a
//! sub-step rate by accumulating elapsed samples.

use euclid_types::{ArpMode, MAX_ARP_NOTES};

/// Upper bound on boundaries crossed by one `advance_samples` call.
const MAX_CROSSINGS_PER_ADVANCE: u32 = 64;

/// Arp sub-steps shorter than this are stretched to it.
pub const MIN_SAMPLES_PER_ARP_STEP: f64 = 1.0;

#[derive(Debug, Clone, Copy)]
pub struct Arpeggiator {
    notes: [u8; MAX_ARP_NOTES],
    len: usize,
    mode: ArpMode,
    /// Sub-step length as a fraction of a sequencer step
    rate: f64,
    cursor: usize,
    /// UpDown direction
    ascending: bool,
    /// Fraction of the current sub-step already elapsed, in [0, 1)
    progress: f64,
    rng_state: u64,
}

impl Default for Arpeggiator {
    fn default() -> Self {
        Self::with_seed(0x853c_49e6_748f_ea9b)
    }
}

impl Arpeggiator {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            notes: [0; MAX_ARP_NOTES],
            len: 0,
            mode: ArpMode::Up,
            rate: 0.25,
            cursor: 0,
            ascending: true,
            progress: 0.0,
            rng_state: seed,
        }
    }

    /// Replace the note set, keeping at most seven notes. The cursor is kept
    /// when still valid.
    pub fn set_notes(&mut self, notes: &[u8]) {
        let len = notes.len().min(MAX_ARP_NOTES);
        if self.notes() == &notes[..len] {
            return;
        }
        self.notes[..len].copy_from_slice(&notes[..len]);
        self.len = len;
        if self.cursor >= len {
            self.cursor = 0;
            self.ascending = true;
        }
    }

    pub fn set_mode(&mut self, mode: ArpMode) {
        self.mode = mode;
    }

    pub fn set_rate(&mut self, multiplier: f64) {
        if multiplier.is_finite() && multiplier > 0.0 {
            self.rate = multiplier;
        }
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
        self.ascending = true;
        self.progress = 0.0;
    }

    pub fn notes(&self) -> &[u8] {
        &self.notes[..self.len]
    }

    pub fn mode(&self) -> ArpMode {
        self.mode
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn fractional_progress(&self) -> f64 {
        self.progress
    }

    /// Note under the cursor, or `None` with an empty note set.
    pub fn current_note(&self) -> Option<u8> {
        self.notes().get(self.cursor).copied()
    }

    /// Length of one arp sub-step given the current step length.
    pub fn samples_per_arp_step(&self, samples_per_step: f64) -> f64 {
        (samples_per_step * self.rate).max(MIN_SAMPLES_PER_ARP_STEP)
    }

    /// Accumulate `delta` samples. Returns true iff at least one sub-step
    /// boundary was crossed; the cursor moves once per boundary and the
    /// overshoot carries into the next sub-step.
    pub fn advance_samples(&mut self, delta: f64, samples_per_arp_step: f64) -> bool {
        if self.len == 0 || !(delta > 0.0) {
            return false;
        }
        let span = if samples_per_arp_step.is_finite() {
            samples_per_arp_step.max(MIN_SAMPLES_PER_ARP_STEP)
        } else {
            MIN_SAMPLES_PER_ARP_STEP
        };
        self.progress += delta / span;

        let mut crossed = 0;
        while self.progress >= 1.0 && crossed < MAX_CROSSINGS_PER_ADVANCE {
            self.progress -= 1.0;
            self.step();
            crossed += 1;
        }
        if self.progress >= 1.0 {
            self.progress = self.progress.fract();
        }
        crossed > 0
    }

    fn step(&mut self) {
        let len = self.len;
        if len <= 1 {
            self.cursor = 0;
            return;
        }
        self.cursor = match self.mode {
            ArpMode::Up => (self.cursor + 1) % len,
            ArpMode::Down => {
                if self.cursor == 0 {
                    len - 1
                } else {
                    self.cursor - 1
                }
            }
            ArpMode::UpDown => {
                if self.ascending {
                    if self.cursor + 1 >= len {
                        self.ascending = false;
                        len - 2
                    } else {
                        self.cursor + 1
                    }
                } else if self.cursor == 0 {
                    self.ascending = true;
                    1
                } else {
                    self.cursor - 1
                }
            }
            ArpMode::Random => {
                // Draw among the other len-1 slots so the note never repeats
                let r = (self.next_random() % (len as u64 - 1)) as usize;
                if r >= self.cursor {
                    r + 1
                } else {
                    r
                }
            }
        };
    }

    fn next_random(&mut self) -> u64 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.rng_state >> 33
    }
}
