//! The name-indexing engine.
//!
//! `NameIndex` keeps two coupled structures over an externally owned,
//! ordered collection of path records:
//!
//! 1. The name table — case-folded full-path hash to the chain of records
//!    sharing it, for O(1)-amortized path lookup.
//! 2. The directory table — reference-counted synthetic directory nodes
//!    derived from record paths, for "does this tracked directory prefix
//!    exist" queries and for case canonicalization.
//!
//! Both are built together, lazily, on the first query, then maintained
//! incrementally as the store adds and removes records. Directory nodes
//! are only tracked under the case-insensitive policy; a case-sensitive
//! index never materializes them and reports every directory as absent.

use std::sync::Arc;

use fnv::FnvHashMap;
use thin_vec::ThinVec;

use crate::dirs::{DirIndex, DirTable};
use crate::hash::{ihash, SEP};
use crate::record::{HashCache, PathRecord};

/// Engine configuration, fixed at construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexConfig {
    /// Whether path matching may ignore ASCII case. Also controls
    /// directory tracking: directories are only tracked when set.
    pub ignore_case: bool,
}

/// The name index over a record collection.
///
/// Single-threaded by design: every operation assumes exclusive access
/// for its duration, and the lazy build is guarded by a plain flag.
#[derive(Debug, Default)]
pub struct NameIndex {
    config: IndexConfig,
    built: bool,
    names: FnvHashMap<u64, ThinVec<Arc<PathRecord>>>,
    dirs: DirTable,
}

impl NameIndex {
    /// Creates an empty, unbuilt index.
    pub fn new(config: IndexConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The active case-folding policy.
    #[inline]
    pub fn ignore_case(&self) -> bool {
        self.config.ignore_case
    }

    /// Builds both tables from `records` if they are not built yet.
    ///
    /// Records are indexed in collection order with a running
    /// last-directory hint, so path-sorted input resolves each record's
    /// directory in near-constant time. Idempotent; every query calls
    /// this first.
    pub fn ensure_built(&mut self, records: &[Arc<PathRecord>]) {
        if self.built {
            return;
        }
        self.names.reserve(records.len());
        self.dirs.reserve(records.len());
        let mut last_dir = None;
        for record in records {
            self.index_record(record, Some(&mut last_dir));
        }
        self.built = true;
        log::debug!(
            "name index built: {} records, {} directories",
            records.len(),
            self.dirs.len()
        );
    }

    /// Indexes a record that was just inserted into the collection.
    ///
    /// No-op while the index is unbuilt; the record is picked up by the
    /// lazy build instead.
    pub fn add(&mut self, record: &Arc<PathRecord>) {
        if self.built {
            self.index_record(record, None);
        }
    }

    /// De-indexes a record that is being deleted from the collection.
    ///
    /// Removal targets this exact record instance, not its path: under
    /// case folding several live records may share a case-insensitive
    /// path. No-op if the index is unbuilt or the record is not indexed.
    pub fn remove(&mut self, record: &Arc<PathRecord>) {
        if !self.built || !record.is_indexed() {
            return;
        }
        record.set_indexed(false);

        let hash = record.name_hash();
        if let Some(chain) = self.names.get_mut(&hash) {
            if let Some(pos) = chain.iter().position(|c| Arc::ptr_eq(c, record)) {
                chain.remove(pos);
            }
            if chain.is_empty() {
                self.names.remove(&hash);
            }
        }

        if self.config.ignore_case {
            self.remove_dir_ref(record);
        }
    }

    /// Looks up a record by path.
    ///
    /// Every candidate is first compared byte-exactly; only when that
    /// fails and both the request and the policy allow it does the
    /// ASCII case-insensitive comparison run.
    pub fn find(
        &mut self,
        records: &[Arc<PathRecord>],
        name: &[u8],
        case_insensitive: bool,
    ) -> Option<Arc<PathRecord>> {
        self.ensure_built(records);
        let icase = case_insensitive && self.config.ignore_case;
        let chain = self.names.get(&ihash(name))?;
        chain
            .iter()
            .find(|record| same_name(record.path(), name, icase))
            .cloned()
    }

    /// Reports whether `name` is a live tracked directory prefix.
    ///
    /// Always false under the case-sensitive policy, where directories
    /// are never tracked.
    pub fn dir_exists(&mut self, records: &[Arc<PathRecord>], name: &[u8]) -> bool {
        self.ensure_built(records);
        match self.dirs.find(ihash(name), name) {
            Some(index) => self.dirs[index].refs() > 0,
            None => false,
        }
    }

    /// Rewrites the directory segments of `path`, in place, to the case
    /// spelling stored in the directory table.
    ///
    /// Each prefix ending at a separator is looked up; on a match the
    /// not-yet-rewritten part of that prefix is overwritten with the
    /// canonical bytes. Segments with no match are left as given — in
    /// particular the final filename segment, which is not a directory.
    pub fn canonicalize_dir_case(&mut self, records: &[Arc<PathRecord>], path: &mut [u8]) {
        self.ensure_built(records);
        let mut rewritten = 0;
        let mut pos = 0;
        while let Some(offset) = memchr::memchr(SEP, &path[pos..]) {
            let sep = pos + offset;
            if let Some(index) = self.dirs.find(ihash(&path[..sep]), &path[..sep]) {
                let canonical = self.dirs[index].name();
                path[rewritten..sep].copy_from_slice(&canonical[rewritten..sep]);
                rewritten = sep + 1;
            }
            pos = sep + 1;
        }
    }

    /// Releases both tables and returns the index to the unbuilt state.
    ///
    /// Records stay owned by the store and keep their `indexed` flags;
    /// a torn-down index must only be rebuilt over records whose flags
    /// the store has reset (in practice, freshly created ones).
    pub fn teardown(&mut self) {
        if !self.built {
            return;
        }
        self.built = false;
        log::debug!(
            "name index released: {} name buckets, {} directories",
            self.names.len(),
            self.dirs.len()
        );
        self.names.clear();
        self.dirs.clear();
    }

    fn index_record(&mut self, record: &Arc<PathRecord>, hint: Option<&mut Option<DirIndex>>) {
        if record.is_indexed() {
            return;
        }
        record.set_indexed(true);

        self.names
            .entry(record.name_hash())
            .or_default()
            .push(Arc::clone(record));

        if self.config.ignore_case {
            self.add_dir_ref(record, hint);
        }
    }

    /// Resolves the directory enclosing `record.path()[..namelen]`,
    /// creating it — and, recursively, its missing ancestors — on first
    /// sight. Returns `None` for records in the root directory.
    fn resolve_dir(
        &mut self,
        record: &PathRecord,
        namelen: usize,
        hint: Option<&mut Option<DirIndex>>,
    ) -> Option<DirIndex> {
        let path = record.path();
        let mut precomputed = None;
        if namelen == path.len() {
            // The cached dir hash covers the full path's parent only,
            // never the shorter prefixes of recursive calls.
            match record.hash_cache() {
                HashCache::NameOnly(_) => return None,
                HashCache::NameAndDir { dir, .. } => precomputed = Some(dir),
                HashCache::Unset => {}
            }
        }
        let dirlen = memchr::memrchr(SEP, &path[..namelen])?;
        let dirname = &path[..dirlen];

        let dir = match hint.as_ref().and_then(|h| **h) {
            // Sequential iteration over path-sorted records lands
            // sibling after sibling in the same directory; reuse it
            // without hashing or a table lookup.
            Some(prev) if self.dirs[prev].name() == dirname => prev,
            _ => {
                let hash = precomputed.unwrap_or_else(|| ihash(dirname));
                match self.dirs.find(hash, dirname) {
                    Some(found) => found,
                    None => {
                        let created = self.dirs.insert(hash, dirname);
                        let parent = self.resolve_dir(record, dirlen, None);
                        self.dirs[created].set_parent(parent);
                        created
                    }
                }
            }
        };

        if let Some(h) = hint {
            *h = Some(dir);
        }
        Some(dir)
    }

    fn add_dir_ref(&mut self, record: &PathRecord, hint: Option<&mut Option<DirIndex>>) {
        let mut dir = self.resolve_dir(record, record.path().len(), hint);
        // Walk up until an ancestor was already live; everything above
        // it is already counted by that ancestor's own earlier increment.
        while let Some(index) = dir {
            let entry = &mut self.dirs[index];
            if entry.incref() > 0 {
                break;
            }
            dir = entry.parent();
        }
    }

    fn remove_dir_ref(&mut self, record: &PathRecord) {
        let mut dir = self.resolve_dir(record, record.path().len(), None);
        while let Some(index) = dir {
            let parent = self.dirs[index].parent();
            if self.dirs[index].decref() > 0 {
                break;
            }
            self.dirs.remove(index);
            dir = parent;
        }
    }
}

/// Path equality: exact bytes first (the common case), then ASCII
/// case-insensitive only when requested.
fn same_name(path: &[u8], name: &[u8], icase: bool) -> bool {
    if path == name {
        return true;
    }
    icase && path.eq_ignore_ascii_case(name)
}
