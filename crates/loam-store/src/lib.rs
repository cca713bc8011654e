//! Content-addressed object storage for loam.
//!
//! This crate implements a hash-keyed object store laid out exactly like
//! git's `.git/objects/` directory. Every blob, tree and commit is stored as
//! an immutable object identified by the SHA-1 of its canonical encoding.
//!
//! # Object Types
//!
//! - [`Blob`] -- raw content (file contents, arbitrary data)
//! - [`Tree`] -- directory listing mapping names to object ids
//! - [`Commit`] -- text record pointing at a tree and its parents
//!
//! # Formats
//!
//! - [`codec`] -- the canonical `"<kind> <len>\0<payload>"` encoding
//! - [`tree`] -- the binary tree payload (`encode_tree` / `decode_tree`)
//! - [`commit`] -- the text commit payload (`encode_commit` / `decode_commit`)
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`LooseObjectStore`] -- one zlib-compressed file per object on disk
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. The store is append-only: nothing is ever deleted or rewritten.
//! 3. Writes go to a temporary file and are renamed into place.
//! 4. The store never interprets payloads; format modules do.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod codec;
pub mod commit;
pub mod config;
pub mod error;
pub mod loose;
pub mod memory;
pub mod object;
pub mod traits;
pub mod tree;

// Re-export primary types at crate root for ergonomic imports.
pub use commit::{
    build_commit, decode_commit, encode_commit, encode_commit_at, Commit, CommitFields, Identity,
    Signature,
};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use loose::LooseObjectStore;
pub use memory::InMemoryObjectStore;
pub use object::{Blob, StoredObject};
pub use traits::ObjectStore;
pub use tree::{decode_tree, encode_tree, EntryKind, EntryMode, Tree, TreeEntry};
