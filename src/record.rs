//! Path records and their per-record hash cache.
//!
//! A `PathRecord` is owned by the surrounding record store and shared with
//! the index through `Arc`. The index only augments it: an `indexed` flag
//! tracking membership in the name table, and an optional pair of
//! precomputed hash values that spare the lazy build from rehashing every
//! path and every parent-directory prefix.

use std::cell::Cell;

use crate::hash::{ihash, ihash_continue, SEP};

bitflags::bitflags! {
    /// Per-record state flags maintained by the index.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RecordFlags: u8 {
        /// Set while the record is present in the name table.
        const INDEXED = 1 << 0;
    }
}

/// Precomputed hash values for one record, set at most once before the
/// record is first indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashCache {
    /// No precomputation has run; hashes are computed on demand.
    #[default]
    Unset,
    /// The record lives in the root directory: only the full-path hash.
    NameOnly(u64),
    /// The record lives in a subdirectory: the immediate parent
    /// directory's hash plus the full-path hash continued from it.
    NameAndDir { dir: u64, name: u64 },
}

/// One tracked path, as seen by the name index.
///
/// Interior mutability keeps the store's view of the record immutable
/// while the index flips its flags; the index is single-threaded, so
/// `Cell` is sufficient (and makes the type deliberately `!Sync`).
#[derive(Debug)]
pub struct PathRecord {
    path: Box<[u8]>,
    flags: Cell<RecordFlags>,
    hash_cache: Cell<HashCache>,
}

impl PathRecord {
    /// Creates a record for `path`, which must already be in canonical
    /// separator form (`/`-delimited, no trailing separator).
    pub fn new(path: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into().into_boxed_slice(),
            flags: Cell::new(RecordFlags::empty()),
            hash_cache: Cell::new(HashCache::Unset),
        }
    }

    /// The stored path bytes.
    #[inline]
    pub fn path(&self) -> &[u8] {
        &self.path
    }

    /// True while the record is present in the name table.
    #[inline]
    pub fn is_indexed(&self) -> bool {
        self.flags.get().contains(RecordFlags::INDEXED)
    }

    pub(crate) fn set_indexed(&self, indexed: bool) {
        let mut flags = self.flags.get();
        flags.set(RecordFlags::INDEXED, indexed);
        self.flags.set(flags);
    }

    /// The precomputed hash state.
    #[inline]
    pub fn hash_cache(&self) -> HashCache {
        self.hash_cache.get()
    }

    /// Precomputes the hash values used by the name and directory tables.
    ///
    /// For a record in the root directory this is just the full-path
    /// hash. For a record in a subdirectory, the immediate parent
    /// directory is hashed first and the full-path hash is continued
    /// from it, so indexing later needs neither hash recomputed.
    ///
    /// Contract: call at most once, before the record is first indexed.
    /// Calling it twice or after indexing leaves the index in an
    /// unspecified state; this is not detected.
    pub fn precompute_hashes(&self) {
        let cache = match memchr::memrchr(SEP, &self.path) {
            None => HashCache::NameOnly(ihash(&self.path)),
            Some(dirlen) => {
                let dir = ihash(&self.path[..dirlen]);
                let name = ihash_continue(dir, &self.path[dirlen..]);
                HashCache::NameAndDir { dir, name }
            }
        };
        self.hash_cache.set(cache);
    }

    /// The full-path hash, from the cache when available.
    pub(crate) fn name_hash(&self) -> u64 {
        match self.hash_cache.get() {
            HashCache::NameOnly(name) | HashCache::NameAndDir { name, .. } => name,
            HashCache::Unset => ihash(&self.path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_unindexed_and_uncached() {
        let record = PathRecord::new(*b"src/main.c");
        assert!(!record.is_indexed());
        assert_eq!(record.hash_cache(), HashCache::Unset);
        assert_eq!(record.path(), b"src/main.c");
    }

    #[test]
    fn precompute_root_record_stores_name_only() {
        let record = PathRecord::new(*b"README");
        record.precompute_hashes();
        assert_eq!(record.hash_cache(), HashCache::NameOnly(ihash(b"README")));
    }

    #[test]
    fn precompute_subdir_record_matches_direct_hashes() {
        let record = PathRecord::new(*b"a/b/c.txt");
        record.precompute_hashes();
        match record.hash_cache() {
            HashCache::NameAndDir { dir, name } => {
                assert_eq!(dir, ihash(b"a/b"));
                assert_eq!(name, ihash(b"a/b/c.txt"));
            }
            other => panic!("expected NameAndDir, got {other:?}"),
        }
    }

    #[test]
    fn name_hash_without_cache_equals_cached() {
        let plain = PathRecord::new(*b"Dir/File");
        let cached = PathRecord::new(*b"Dir/File");
        cached.precompute_hashes();
        assert_eq!(plain.name_hash(), cached.name_hash());
    }

    #[test]
    fn indexed_flag_round_trips() {
        let record = PathRecord::new(*b"x");
        record.set_indexed(true);
        assert!(record.is_indexed());
        record.set_indexed(false);
        assert!(!record.is_indexed());
    }
}
