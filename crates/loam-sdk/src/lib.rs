//! High-level repository API for loam.
//!
//! [`Repository`] ties a work tree to its `.git/objects` store and exposes the
//! operations a command layer needs: hashing files, reading objects, listing
//! trees, snapshotting directories and creating commits. Everything takes its
//! inputs as arguments; nothing reads process-wide state.

pub mod config;
pub mod error;
pub mod repository;
pub mod worktree;

pub use config::RepoConfig;
pub use error::{SdkError, SdkResult};
pub use repository::Repository;
pub use worktree::{EntrySource, WorkEntry};
