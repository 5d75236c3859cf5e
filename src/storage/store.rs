//! Ordered leaf store
//!
//! Leaves live in an arena and are chained in ascending key order. A
//! `BTreeMap` from each leaf's first key to its slot plays the part of the
//! store's internal tree: it is the authoritative route to the leaf that
//! owns a key, and the path a learned hint is meant to short-circuit.

use std::collections::BTreeMap;
use std::ops::Bound;

use tracing::trace;

use super::leaf::{KeyBuf, LeafId, LeafNode};
use super::LeafChain;
use crate::config::StoreConfig;
use crate::encoding::KeyEncoding;
use crate::error::{Error, Result};

/// Outcome of a lookup that started from a leaf hint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HintedLookup<'a> {
    /// Value stored under the key, if any
    pub value: Option<&'a [u8]>,
    /// Leaf that owns the key's range
    pub leaf: Option<LeafId>,
    /// Whether the hint was live and owned the key, so the authoritative
    /// route was skipped
    pub hint_valid: bool,
}

/// Ordered key-value store built from linked leaves
#[derive(Debug)]
pub struct LeafStore {
    config: StoreConfig,
    nodes: Vec<LeafNode>,
    free: Vec<u32>,
    /// First key of every live leaf -> slot
    index: BTreeMap<KeyBuf, u32>,
    head: Option<u32>,
    len: usize,
}

impl Default for LeafStore {
    fn default() -> Self {
        Self::with_config(StoreConfig::default())
    }
}

impl LeafStore {
    /// Create an empty store after validating `config`
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            nodes: Vec::new(),
            free: Vec::new(),
            index: BTreeMap::new(),
            head: None,
            len: 0,
        }
    }

    /// Store configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Encoding used for leaf boundary keys
    pub fn encoding(&self) -> KeyEncoding {
        self.config.encoding
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of live leaves
    pub fn leaf_count(&self) -> usize {
        self.index.len()
    }

    /// Insert or overwrite `key`. Returns true if the key was new.
    pub fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<bool> {
        if key.len() > self.config.max_key_len {
            return Err(Error::KeyTooLong {
                len: key.len(),
                max: self.config.max_key_len,
            });
        }

        let Some(slot) = self.locate_slot(key) else {
            let slot = self.allocate();
            self.nodes[slot as usize]
                .entries
                .push((KeyBuf::from_slice(key), value.to_vec()));
            self.index.insert(KeyBuf::from_slice(key), slot);
            self.head = Some(slot);
            self.len += 1;
            return Ok(true);
        };

        let node = &mut self.nodes[slot as usize];
        match node.search(key) {
            Ok(pos) => {
                node.entries[pos].1 = value.to_vec();
                return Ok(false);
            }
            Err(pos) => {
                // Only the head leaf can receive a key below its first key
                let old_first = (pos == 0).then(|| node.entries.first().map(|(k, _)| k.clone())).flatten();
                node.entries.insert(pos, (KeyBuf::from_slice(key), value.to_vec()));
                if let Some(old_first) = old_first {
                    self.index.remove(old_first.as_slice());
                    self.index.insert(KeyBuf::from_slice(key), slot);
                }
            }
        }
        self.len += 1;

        if self.nodes[slot as usize].entries.len() > self.config.leaf_capacity {
            self.split(slot);
        }
        Ok(true)
    }

    /// Authoritative point lookup
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        let slot = self.locate_slot(key)?;
        self.nodes[slot as usize].value(key)
    }

    /// Authoritative route to the leaf that owns `key`'s range
    pub fn locate(&self, key: &[u8]) -> Option<LeafId> {
        self.locate_slot(key).map(|slot| self.id_of(slot))
    }

    /// Point lookup that tries `hint` first.
    ///
    /// The hint is only trusted if it is still live and owns `key`'s range;
    /// otherwise the lookup falls back to the authoritative route. The
    /// result is identical to [`get`](Self::get) either way.
    pub fn get_hinted(&self, key: &[u8], hint: Option<LeafId>) -> HintedLookup<'_> {
        let hinted = hint
            .and_then(|id| self.live_slot(id))
            .filter(|&slot| self.covers(slot, key));
        let hint_valid = hinted.is_some();

        match hinted.or_else(|| self.locate_slot(key)) {
            Some(slot) => HintedLookup {
                value: self.nodes[slot as usize].value(key),
                leaf: Some(self.id_of(slot)),
                hint_valid,
            },
            None => HintedLookup {
                value: None,
                leaf: None,
                hint_valid,
            },
        }
    }

    /// Remove `key`, returning its value. Leaves left empty are unlinked
    /// and freed, which invalidates their handles.
    pub fn remove(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        let slot = self.locate_slot(key)?;
        let node = &mut self.nodes[slot as usize];
        let pos = node.search(key).ok()?;
        let (removed, value) = node.entries.remove(pos);
        self.len -= 1;

        if node.entries.is_empty() {
            self.index.remove(removed.as_slice());
            self.unlink(slot);
        } else if pos == 0 {
            let new_first = node.entries[0].0.clone();
            self.index.remove(removed.as_slice());
            self.index.insert(new_first, slot);
        }
        Some(value)
    }

    /// Iterate up to `limit` entries starting at the first key `>= start`,
    /// following sibling links across leaves
    pub fn scan(&self, start: &[u8], limit: usize) -> ScanIter<'_> {
        let slot = self.locate_slot(start);
        let pos = slot.map_or(0, |s| match self.nodes[s as usize].search(start) {
            Ok(p) | Err(p) => p,
        });
        ScanIter {
            store: self,
            slot,
            pos,
            remaining: limit,
        }
    }

    /// Whether `leaf` still names a live leaf
    pub fn is_live(&self, leaf: LeafId) -> bool {
        self.live_slot(leaf).is_some()
    }

    /// Previous leaf in ascending key order
    pub fn safe_prev(&self, leaf: LeafId) -> Option<LeafId> {
        let slot = self.live_slot(leaf)?;
        self.nodes[slot as usize].prev.map(|p| self.id_of(p))
    }

    /// Walk backward links from any live leaf to the head
    pub fn head_from(&self, leaf: LeafId) -> Option<LeafId> {
        let mut current = self.live_slot(leaf)?;
        while let Some(prev) = self.nodes[current as usize].prev {
            current = prev;
        }
        Some(self.id_of(current))
    }

    /// First key stored in `leaf`
    pub fn first_key(&self, leaf: LeafId) -> Option<&[u8]> {
        let slot = self.live_slot(leaf)?;
        self.nodes[slot as usize].first_key()
    }

    /// Number of entries in `leaf`
    pub fn leaf_len(&self, leaf: LeafId) -> Option<usize> {
        self.live_slot(leaf).map(|slot| self.nodes[slot as usize].entries.len())
    }

    /// All live leaves in ascending key order
    pub fn leaves(&self) -> impl Iterator<Item = LeafId> + '_ {
        std::iter::successors(self.head(), move |&id| self.safe_next(id))
    }

    fn id_of(&self, slot: u32) -> LeafId {
        LeafId::new(slot, self.nodes[slot as usize].generation)
    }

    fn live_slot(&self, leaf: LeafId) -> Option<u32> {
        self.nodes
            .get(leaf.slot() as usize)
            .filter(|n| n.live && n.generation == leaf.generation())
            .map(|_| leaf.slot())
    }

    /// Slot of the last leaf whose first key is `<= key`, or the head
    fn locate_slot(&self, key: &[u8]) -> Option<u32> {
        self.index
            .range::<[u8], _>((Bound::Unbounded, Bound::Included(key)))
            .next_back()
            .map(|(_, &slot)| slot)
            .or(self.head)
    }

    /// Whether the leaf in `slot` owns `key`'s range
    fn covers(&self, slot: u32, key: &[u8]) -> bool {
        let node = &self.nodes[slot as usize];
        let above_start = self.head == Some(slot) || node.first_key().is_some_and(|first| first <= key);
        let below_end = match node.next {
            Some(next) => self.nodes[next as usize].first_key().is_some_and(|first| key < first),
            None => true,
        };
        above_start && below_end
    }

    fn allocate(&mut self) -> u32 {
        if let Some(slot) = self.free.pop() {
            self.nodes[slot as usize].live = true;
            slot
        } else {
            self.nodes.push(LeafNode::new());
            (self.nodes.len() - 1) as u32
        }
    }

    /// Move the upper half of an overfull leaf into a new right sibling
    fn split(&mut self, slot: u32) {
        let mid = self.nodes[slot as usize].entries.len() / 2;
        let upper = self.nodes[slot as usize].entries.split_off(mid);
        let upper_first = upper[0].0.clone();
        let old_next = self.nodes[slot as usize].next;

        let right = self.allocate();
        let node = &mut self.nodes[right as usize];
        node.entries = upper;
        node.prev = Some(slot);
        node.next = old_next;

        self.nodes[slot as usize].next = Some(right);
        if let Some(next) = old_next {
            self.nodes[next as usize].prev = Some(right);
        }
        self.index.insert(upper_first, right);

        trace!(left = slot, right, "split leaf");
    }

    fn unlink(&mut self, slot: u32) {
        let (prev, next) = {
            let node = &self.nodes[slot as usize];
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.nodes[p as usize].next = next,
            None => self.head = next,
        }
        if let Some(n) = next {
            self.nodes[n as usize].prev = prev;
        }
        self.nodes[slot as usize].retire();
        self.free.push(slot);

        trace!(slot, "freed empty leaf");
    }
}

impl LeafChain for LeafStore {
    type Handle = LeafId;

    fn head(&self) -> Option<LeafId> {
        self.head.map(|slot| self.id_of(slot))
    }

    fn safe_next(&self, leaf: LeafId) -> Option<LeafId> {
        let slot = self.live_slot(leaf)?;
        self.nodes[slot as usize].next.map(|n| self.id_of(n))
    }

    fn first_key_u64(&self, leaf: LeafId) -> Option<u64> {
        self.first_key(leaf).map(|k| self.config.encoding.encode(k))
    }
}

/// Range scan over the leaf chain
pub struct ScanIter<'a> {
    store: &'a LeafStore,
    slot: Option<u32>,
    pos: usize,
    remaining: usize,
}

impl<'a> Iterator for ScanIter<'a> {
    type Item = (&'a [u8], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let store = self.store;
        loop {
            let node = &store.nodes[self.slot? as usize];
            if let Some((k, v)) = node.entries.get(self.pos) {
                self.pos += 1;
                self.remaining -= 1;
                return Some((k.as_slice(), v.as_slice()));
            }
            self.slot = node.next;
            self.pos = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::make_key;

    fn filled(n: u64, capacity: usize) -> LeafStore {
        let config = StoreConfig {
            leaf_capacity: capacity,
            ..Default::default()
        };
        let mut store = LeafStore::new(config).unwrap();
        for i in 0..n {
            store.insert(make_key(i).as_bytes(), format!("v{}", i).as_bytes()).unwrap();
        }
        store
    }

    #[test]
    fn test_empty_store() {
        let store = LeafStore::default();
        assert!(store.is_empty());
        assert_eq!(store.leaf_count(), 0);
        assert_eq!(store.get(b"k0000001"), None);
        assert_eq!(store.locate(b"k0000001"), None);
        assert_eq!(store.head(), None);
        assert_eq!(store.scan(b"", 10).count(), 0);
    }

    #[test]
    fn test_insert_get_and_overwrite() {
        let mut store = filled(100, 4);
        assert_eq!(store.len(), 100);
        for i in 0..100 {
            let expected = format!("v{}", i);
            assert_eq!(store.get(make_key(i).as_bytes()), Some(expected.as_bytes()));
        }
        assert_eq!(store.get(b"k0000100"), None);

        assert!(!store.insert(b"k0000042", b"new").unwrap());
        assert_eq!(store.get(b"k0000042"), Some(b"new".as_slice()));
        assert_eq!(store.len(), 100);
    }

    #[test]
    fn test_splits_keep_chain_sorted_and_bounded() {
        let mut store = LeafStore::new(StoreConfig { leaf_capacity: 8, ..Default::default() }).unwrap();
        // Reverse order exercises head-leaf first key replacement
        for i in (0..500u64).rev() {
            store.insert(make_key(i * 3).as_bytes(), b"v").unwrap();
        }

        let leaves: Vec<LeafId> = store.leaves().collect();
        assert_eq!(leaves.len(), store.leaf_count());
        assert!(leaves.len() > 500 / 8);

        let firsts: Vec<&[u8]> = leaves.iter().map(|&l| store.first_key(l).unwrap()).collect();
        assert!(firsts.windows(2).all(|w| w[0] < w[1]));
        assert!(leaves.iter().all(|&l| store.leaf_len(l).unwrap() <= 8));
        assert_eq!(firsts[0], make_key(0).as_bytes());
    }

    #[test]
    fn test_key_too_long() {
        let mut store = LeafStore::new(StoreConfig { max_key_len: 4, ..Default::default() }).unwrap();
        assert_eq!(
            store.insert(b"toolong", b"v"),
            Err(Error::KeyTooLong { len: 7, max: 4 })
        );
        assert!(store.insert(b"ok", b"v").unwrap());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = StoreConfig { leaf_capacity: 0, ..Default::default() };
        assert!(LeafStore::new(config).is_err());
    }

    #[test]
    fn test_hinted_lookup_uses_valid_hint() {
        let store = filled(100, 4);
        let key = make_key(57);
        let owner = store.locate(key.as_bytes()).unwrap();

        let found = store.get_hinted(key.as_bytes(), Some(owner));
        assert!(found.hint_valid);
        assert_eq!(found.leaf, Some(owner));
        assert_eq!(found.value, Some(b"v57".as_slice()));
    }

    #[test]
    fn test_hinted_lookup_falls_back_on_wrong_hint() {
        let store = filled(100, 4);
        let key = make_key(57);
        let owner = store.locate(key.as_bytes()).unwrap();
        let wrong = store.head().unwrap();
        assert_ne!(owner, wrong);

        let found = store.get_hinted(key.as_bytes(), Some(wrong));
        assert!(!found.hint_valid);
        assert_eq!(found.leaf, Some(owner));
        assert_eq!(found.value, Some(b"v57".as_slice()));

        let unhinted = store.get_hinted(key.as_bytes(), None);
        assert!(!unhinted.hint_valid);
        assert_eq!(unhinted.value, store.get(key.as_bytes()));
    }

    #[test]
    fn test_head_hint_covers_keys_below_first() {
        let mut store = LeafStore::default();
        store.insert(b"k0000500", b"v").unwrap();
        let head = store.head().unwrap();
        let found = store.get_hinted(b"k0000001", Some(head));
        assert!(found.hint_valid);
        assert_eq!(found.value, None);
    }

    #[test]
    fn test_remove_frees_leaf_and_stales_handle() {
        let mut store = filled(12, 2);
        let key = make_key(5);
        let owner = store.locate(key.as_bytes()).unwrap();
        let siblings: Vec<Vec<u8>> = store
            .scan(store.first_key(owner).unwrap(), store.leaf_len(owner).unwrap())
            .map(|(k, _)| k.to_vec())
            .collect();

        for k in &siblings {
            assert!(store.remove(k).is_some());
        }
        assert!(!store.is_live(owner));
        assert_eq!(store.first_key(owner), None);
        assert_eq!(store.safe_next(owner), None);

        // A stale hint is rejected and the lookup still answers correctly
        let probe = make_key(9);
        let found = store.get_hinted(probe.as_bytes(), Some(owner));
        assert!(!found.hint_valid);
        assert_eq!(found.value, Some(b"v9".as_slice()));

        // Slot reuse hands out a fresh generation
        for i in 100..140 {
            store.insert(make_key(i).as_bytes(), b"x").unwrap();
        }
        assert!(!store.is_live(owner));
        let firsts: Vec<&[u8]> = store.leaves().map(|l| store.first_key(l).unwrap()).collect();
        assert!(firsts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_remove_first_key_reindexes() {
        let mut store = filled(30, 4);
        let leaves: Vec<LeafId> = store.leaves().collect();
        let second = leaves[1];
        let first_key = store.first_key(second).unwrap().to_vec();

        assert!(store.remove(&first_key).is_some());
        assert_eq!(store.get(&first_key), None);
        assert_eq!(store.remove(&first_key), None);
        assert_eq!(store.len(), 29);
        for i in 0..30u64 {
            let key = make_key(i);
            if key.as_bytes() != first_key.as_slice() {
                assert!(store.get(key.as_bytes()).is_some(), "lost {}", key);
            }
        }
    }

    #[test]
    fn test_remove_everything() {
        let mut store = filled(20, 3);
        for i in 0..20 {
            assert!(store.remove(make_key(i).as_bytes()).is_some());
        }
        assert!(store.is_empty());
        assert_eq!(store.leaf_count(), 0);
        assert_eq!(store.head(), None);

        store.insert(b"k0000001", b"again").unwrap();
        assert_eq!(store.get(b"k0000001"), Some(b"again".as_slice()));
    }

    #[test]
    fn test_scan_crosses_leaves() {
        let store = filled(50, 4);
        let keys: Vec<Vec<u8>> = store.scan(make_key(10).as_bytes(), 20).map(|(k, _)| k.to_vec()).collect();
        assert_eq!(keys.len(), 20);
        for (offset, k) in keys.iter().enumerate() {
            assert_eq!(k.as_slice(), make_key(10 + offset as u64).as_bytes());
        }

        assert_eq!(store.scan(make_key(45).as_bytes(), 100).count(), 5);
        assert_eq!(store.scan(b"k0000010x", 1).next().map(|(k, _)| k), Some(make_key(11).as_bytes()));
    }

    #[test]
    fn test_head_from_and_prev_links() {
        let store = filled(60, 4);
        let leaves: Vec<LeafId> = store.leaves().collect();
        let tail = *leaves.last().unwrap();

        assert_eq!(store.head_from(tail), store.head());
        assert_eq!(store.safe_prev(leaves[1]), Some(leaves[0]));
        assert_eq!(store.safe_prev(leaves[0]), None);
        assert_eq!(store.safe_next(tail), None);
    }

    #[test]
    fn test_first_key_u64_uses_encoding() {
        let store = filled(40, 4);
        let encoded: Vec<u64> = store.leaves().map(|l| store.first_key_u64(l).unwrap()).collect();
        assert_eq!(encoded[0], 0);
        assert!(encoded.windows(2).all(|w| w[0] < w[1]));
    }
}
