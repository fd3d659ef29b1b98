//! Lock-free configuration handoff from the control thread to the audio thread.
//!
//! Three slots rotate between the writer (back), a hand-over slot (middle) and
//! the reader (front). Publishing swaps back and middle; taking swaps middle and
//! front. Neither side ever waits on the other, and the reader only ever sees
//! complete snapshots.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// State byte layout: [fresh:1][unused:1][back:2][middle:2][front:2]
const FRONT_SHIFT: u8 = 0;
const MIDDLE_SHIFT: u8 = 2;
const BACK_SHIFT: u8 = 4;
const SLOT_MASK: u8 = 0b11;
const FRESH: u8 = 0x80;

const INITIAL_STATE: u8 = (2 << BACK_SHIFT) | (1 << MIDDLE_SHIFT) | (0 << FRONT_SHIFT);

fn slot(state: u8, shift: u8) -> usize {
    ((state >> shift) & SLOT_MASK) as usize
}

fn encode(back: usize, middle: usize, front: usize) -> u8 {
    ((back as u8) << BACK_SHIFT) | ((middle as u8) << MIDDLE_SHIFT) | ((front as u8) << FRONT_SHIFT)
}

struct SnapshotSlots<T> {
    slots: [UnsafeCell<T>; 3],
    state: AtomicU8,
}

// Safety: each slot is touched by at most one side at a time, arbitrated by `state`
unsafe impl<T: Send> Send for SnapshotSlots<T> {}
unsafe impl<T: Send> Sync for SnapshotSlots<T> {}

impl<T: Copy> SnapshotSlots<T> {
    fn new(value: T) -> Self {
        Self {
            slots: [
                UnsafeCell::new(value),
                UnsafeCell::new(value),
                UnsafeCell::new(value),
            ],
            state: AtomicU8::new(INITIAL_STATE),
        }
    }

    /// Swap back and middle, marking the middle fresh.
    fn publish(&self) {
        let mut state = self.state.load(Ordering::Acquire);
        loop {
            let next = encode(
                slot(state, MIDDLE_SHIFT),
                slot(state, BACK_SHIFT),
                slot(state, FRONT_SHIFT),
            ) | FRESH;
            match self
                .state
                .compare_exchange_weak(state, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return,
                Err(actual) => state = actual,
            }
        }
    }

    /// Swap middle and front if the middle is fresh. Returns whether it was.
    fn take(&self) -> bool {
        let mut state = self.state.load(Ordering::Acquire);
        loop {
            if state & FRESH == 0 {
                return false;
            }
            let next = encode(
                slot(state, BACK_SHIFT),
                slot(state, FRONT_SHIFT),
                slot(state, MIDDLE_SHIFT),
            );
            match self
                .state
                .compare_exchange_weak(state, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return true,
                Err(actual) => state = actual,
            }
        }
    }
}

/// Control-thread half.
pub struct SnapshotWriter<T> {
    shared: Arc<SnapshotSlots<T>>,
}

impl<T: Copy> SnapshotWriter<T> {
    /// Write a complete snapshot and hand it over to the reader.
    pub fn publish(&mut self, value: T) {
        let back = slot(self.shared.state.load(Ordering::Acquire), BACK_SHIFT);
        // Safety: only the writer touches the back slot, and `&mut self` keeps it unique
        unsafe {
            *self.shared.slots[back].get() = value;
        }
        self.shared.publish();
    }
}

/// Audio-thread half.
pub struct SnapshotReader<T> {
    shared: Arc<SnapshotSlots<T>>,
}

impl<T: Copy> SnapshotReader<T> {
    /// The newest snapshot, if one was published since the last call.
    pub fn latest(&mut self) -> Option<T> {
        if self.shared.take() {
            Some(self.current())
        } else {
            None
        }
    }

    /// Copy of the snapshot currently held by the reader.
    pub fn current(&self) -> T {
        let front = slot(self.shared.state.load(Ordering::Acquire), FRONT_SHIFT);
        // Safety: only the reader touches the front slot
        unsafe { *self.shared.slots[front].get() }
    }

    pub fn has_fresh(&self) -> bool {
        self.shared.state.load(Ordering::Acquire) & FRESH != 0
    }
}

/// Create a writer/reader pair holding `initial`.
pub fn snapshot_channel<T: Copy + Send>(initial: T) -> (SnapshotWriter<T>, SnapshotReader<T>) {
    let shared = Arc::new(SnapshotSlots::new(initial));
    (
        SnapshotWriter {
            shared: Arc::clone(&shared),
        },
        SnapshotReader { shared },
    )
}
