//! Leaf nodes and generation-checked leaf handles

use std::fmt;

use smallvec::SmallVec;

/// Keys up to this length are stored inline
pub const INLINE_KEY_BYTES: usize = 16;

/// Key storage used inside leaves
pub type KeyBuf = SmallVec<[u8; INLINE_KEY_BYTES]>;

/// Handle to a leaf in a [`LeafStore`](super::LeafStore)
///
/// A handle names an arena slot plus the generation the slot had when the
/// handle was issued. Freeing a leaf bumps its slot's generation, so a
/// handle kept across the free is detectably stale instead of silently
/// pointing at whatever leaf reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeafId {
    slot: u32,
    generation: u32,
}

impl LeafId {
    pub(crate) fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    /// Arena slot
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Slot generation at issue time
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for LeafId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "leaf#{}@{}", self.slot, self.generation)
    }
}

/// A sorted run of entries with links to its siblings
#[derive(Debug, Clone, Default)]
pub(crate) struct LeafNode {
    pub(crate) generation: u32,
    pub(crate) live: bool,
    /// Entries sorted by key
    pub(crate) entries: Vec<(KeyBuf, Vec<u8>)>,
    pub(crate) prev: Option<u32>,
    pub(crate) next: Option<u32>,
}

impl LeafNode {
    pub(crate) fn new() -> Self {
        Self {
            live: true,
            ..Default::default()
        }
    }

    pub(crate) fn first_key(&self) -> Option<&[u8]> {
        self.entries.first().map(|(k, _)| k.as_slice())
    }

    pub(crate) fn search(&self, key: &[u8]) -> Result<usize, usize> {
        self.entries.binary_search_by(|(k, _)| k.as_slice().cmp(key))
    }

    pub(crate) fn value(&self, key: &[u8]) -> Option<&[u8]> {
        self.search(key).ok().map(|pos| self.entries[pos].1.as_slice())
    }

    /// Return the node to the free state and invalidate outstanding handles
    pub(crate) fn retire(&mut self) {
        self.live = false;
        self.entries.clear();
        self.prev = None;
        self.next = None;
        self.generation = self.generation.wrapping_add(1);
    }
}
