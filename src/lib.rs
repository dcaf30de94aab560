//! Name indexing for tracked-file collections.
//!
//! This crate provides the path-lookup layer over an ordered collection
//! of path records:
//! - O(1)-amortized lookup by full path, optionally ASCII
//!   case-insensitive
//! - "does this tracked directory prefix exist" queries backed by a
//!   reference-counted synthetic directory tree
//! - in-place canonicalization of a path's directory-segment casing
//!
//! The record collection stays owned by the caller; the index builds
//! itself lazily from it on the first query and is kept consistent
//! through `add`/`remove` as records come and go.
//!
//! ## Module Structure
//!
//! - `hash` - Case-folding continuable path hashing
//! - `record` - Path records with per-record hash cache and flags
//! - `dirs` - Reference-counted directory entry arena
//! - `index` - The indexing engine and its public operations

pub mod dirs;
pub mod hash;
pub mod index;
pub mod record;

// Re-export main types
pub use dirs::{DirEntry, DirIndex, DirTable};
pub use index::{IndexConfig, NameIndex};
pub use record::{HashCache, PathRecord, RecordFlags};
