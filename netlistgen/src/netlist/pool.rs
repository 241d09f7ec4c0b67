//! The free-sequential-instance pool.
//!
//! An owned worklist of `(instance, pin)` free input slots on sequential
//! instances. Slots are removed as they are consumed, so an instance drops
//! out of the pool the instant its last input is bound; there is no
//! rejection sampling against already-full instances.

use arcstr::ArcStr;
use rand::Rng;

use super::InstanceKey;

/// A free data-input slot on a sequential instance.
#[derive(Clone, Debug)]
pub(crate) struct FreeSlot {
    pub instance: InstanceKey,
    pub pin: ArcStr,
}

/// The pool of free sequential input slots.
#[derive(Debug, Default)]
pub(crate) struct FreeSeqPool {
    slots: Vec<FreeSlot>,
}

impl FreeSeqPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the free data-input pins of a newly created instance.
    pub fn register(&mut self, instance: InstanceKey, pins: impl IntoIterator<Item = ArcStr>) {
        self.slots
            .extend(pins.into_iter().map(|pin| FreeSlot { instance, pin }));
    }

    /// Removes and returns a uniformly random free slot.
    pub fn acquire_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<FreeSlot> {
        if self.slots.is_empty() {
            return None;
        }
        let i = rng.gen_range(0..self.slots.len());
        Some(self.slots.swap_remove(i))
    }
}
