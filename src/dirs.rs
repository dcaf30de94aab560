//! Reference-counted directory entry table.
//!
//! Directories are never stored by the record store; they exist here only
//! as synthetic, reference-counted nodes derived from record paths. The
//! table is an arena of `DirEntry` slots addressed by `DirIndex`, with a
//! free list for slot reuse, plus hash buckets mapping an externally
//! computed case-folded hash to the chain of entries sharing it. Parent
//! links are arena handles, never references, so removing a zero-count
//! node can never dangle.

use std::ops::{Index, IndexMut};

use fnv::FnvHashMap;
use thin_vec::ThinVec;

/// A compact 32-bit handle into the directory arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct DirIndex(u32);

impl DirIndex {
    /// Creates a new DirIndex from a usize.
    ///
    /// # Panics
    /// Panics if `index >= u32::MAX`.
    #[inline]
    fn new(index: usize) -> Self {
        assert!(
            index < u32::MAX as usize,
            "directory index must be less than u32::MAX"
        );
        Self(index as u32)
    }

    #[inline]
    fn get(self) -> usize {
        self.0 as usize
    }
}

/// One synthetic directory node.
///
/// `name` is the directory's path prefix without a trailing separator,
/// stored in the case of the first record that created it; that spelling
/// is what case canonicalization rewrites lookups to.
#[derive(Debug)]
pub struct DirEntry {
    name: Box<[u8]>,
    hash: u64,
    parent: Option<DirIndex>,
    refs: u32,
}

impl DirEntry {
    /// The canonical-case path prefix, without trailing separator.
    #[inline]
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Handle of the parent directory, or `None` at the root.
    #[inline]
    pub fn parent(&self) -> Option<DirIndex> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<DirIndex>) {
        self.parent = parent;
    }

    /// Number of records and live descendant directories attesting this
    /// directory's existence.
    #[inline]
    pub fn refs(&self) -> u32 {
        self.refs
    }

    pub(crate) fn incref(&mut self) -> u32 {
        let prior = self.refs;
        self.refs += 1;
        prior
    }

    pub(crate) fn decref(&mut self) -> u32 {
        self.refs -= 1;
        self.refs
    }
}

/// Arena plus hash buckets for directory entries.
#[derive(Debug, Default)]
pub struct DirTable {
    slots: Vec<Option<DirEntry>>,
    free: Vec<DirIndex>,
    buckets: FnvHashMap<u64, ThinVec<DirIndex>>,
    len: usize,
}

impl DirTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-sizes the arena and buckets for roughly `additional` entries.
    pub fn reserve(&mut self, additional: usize) {
        self.slots.reserve(additional);
        self.buckets.reserve(additional);
    }

    /// Number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Gets the entry at `index`, if the slot is occupied.
    pub fn get(&self, index: DirIndex) -> Option<&DirEntry> {
        self.slots.get(index.get()).and_then(Option::as_ref)
    }

    /// Finds the entry whose name equals `name` ignoring ASCII case,
    /// among entries hashed to `hash`.
    pub fn find(&self, hash: u64, name: &[u8]) -> Option<DirIndex> {
        let chain = self.buckets.get(&hash)?;
        chain
            .iter()
            .copied()
            .find(|&index| self[index].name.eq_ignore_ascii_case(name))
    }

    /// Inserts a new entry with a zero reference count and no parent.
    pub fn insert(&mut self, hash: u64, name: &[u8]) -> DirIndex {
        let entry = DirEntry {
            name: name.to_vec().into_boxed_slice(),
            hash,
            parent: None,
            refs: 0,
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index.get()] = Some(entry);
                index
            }
            None => {
                let index = DirIndex::new(self.slots.len());
                self.slots.push(Some(entry));
                index
            }
        };
        self.buckets.entry(hash).or_default().push(index);
        self.len += 1;
        index
    }

    /// Removes the entry at `index`, vacating its slot for reuse.
    pub fn remove(&mut self, index: DirIndex) {
        let entry = self.slots[index.get()]
            .take()
            .expect("removal of vacant directory slot");
        if let Some(chain) = self.buckets.get_mut(&entry.hash) {
            if let Some(pos) = chain.iter().position(|&candidate| candidate == index) {
                chain.remove(pos);
            }
            if chain.is_empty() {
                self.buckets.remove(&entry.hash);
            }
        }
        self.free.push(index);
        self.len -= 1;
    }

    /// Drops every entry and all bucket storage.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.buckets.clear();
        self.len = 0;
    }

    /// Iterates over live entries.
    pub fn iter(&self) -> impl Iterator<Item = (DirIndex, &DirEntry)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|entry| (DirIndex::new(i), entry)))
    }
}

impl Index<DirIndex> for DirTable {
    type Output = DirEntry;

    fn index(&self, index: DirIndex) -> &Self::Output {
        self.slots[index.get()]
            .as_ref()
            .expect("access to vacant directory slot")
    }
}

impl IndexMut<DirIndex> for DirTable {
    fn index_mut(&mut self, index: DirIndex) -> &mut Self::Output {
        self.slots[index.get()]
            .as_mut()
            .expect("access to vacant directory slot")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::ihash;

    #[test]
    fn insert_and_find_ignores_case() {
        let mut table = DirTable::new();
        let index = table.insert(ihash(b"Src"), b"Src");
        assert_eq!(table.len(), 1);

        assert_eq!(table.find(ihash(b"src"), b"src"), Some(index));
        assert_eq!(table.find(ihash(b"SRC"), b"SRC"), Some(index));
        assert_eq!(table.find(ihash(b"lib"), b"lib"), None);
        // Stored spelling is the one from insertion.
        assert_eq!(table[index].name(), b"Src");
    }

    #[test]
    fn find_distinguishes_same_hash_bucket_by_name() {
        let mut table = DirTable::new();
        let hash = ihash(b"a");
        // Force two entries into one bucket regardless of their names.
        let a = table.insert(hash, b"a");
        let b = table.insert(hash, b"b");
        assert_eq!(table.find(hash, b"A"), Some(a));
        assert_eq!(table.find(hash, b"B"), Some(b));
    }

    #[test]
    fn remove_vacates_slot_and_bucket() {
        let mut table = DirTable::new();
        let index = table.insert(ihash(b"a/b"), b"a/b");
        table.remove(index);

        assert!(table.is_empty());
        assert_eq!(table.find(ihash(b"a/b"), b"a/b"), None);
        assert!(table.get(index).is_none());
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut table = DirTable::new();
        let first = table.insert(ihash(b"one"), b"one");
        table.remove(first);
        let second = table.insert(ihash(b"two"), b"two");
        assert_eq!(first, second);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn refcount_updates() {
        let mut table = DirTable::new();
        let index = table.insert(ihash(b"d"), b"d");
        assert_eq!(table[index].refs(), 0);
        assert_eq!(table[index].incref(), 0);
        assert_eq!(table[index].incref(), 1);
        assert_eq!(table[index].decref(), 1);
        assert_eq!(table[index].decref(), 0);
    }
}
