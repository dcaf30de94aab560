//! Case-folding path hashing with a continuation property.
//!
//! Both index tables hash paths with ASCII case folded, so a single hash
//! code serves exact and case-insensitive lookups alike (equality decides,
//! the hash only narrows). The hash is FNV-1a via the `fnv` crate; because
//! FNV folds one byte at a time, a hash computed over a prefix can be
//! resumed over a suffix with `FnvHasher::with_key`, which is what lets a
//! record's full-path hash be derived from its parent-directory hash
//! without rehashing the prefix.

use std::hash::Hasher;

use fnv::FnvHasher;

/// Path separator. Stored paths are trusted to use this form only.
pub const SEP: u8 = b'/';

/// Hashes `bytes` with ASCII case folded.
pub fn ihash(bytes: &[u8]) -> u64 {
    let mut hasher = FnvHasher::default();
    write_folded(&mut hasher, bytes);
    hasher.finish()
}

/// Continues a case-folded hash from a prior `ihash` result.
///
/// `ihash_continue(ihash(a), b)` equals `ihash` of `a` and `b`
/// concatenated.
pub fn ihash_continue(prior: u64, bytes: &[u8]) -> u64 {
    let mut hasher = FnvHasher::with_key(prior);
    write_folded(&mut hasher, bytes);
    hasher.finish()
}

fn write_folded(hasher: &mut FnvHasher, bytes: &[u8]) {
    for &b in bytes {
        hasher.write_u8(b.to_ascii_lowercase());
    }
}
