//! Foundation types for loam.
//!
//! Every other loam crate depends on `loam-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Content-addressed identifier (SHA-1 of the canonical encoding)
//! - [`ObjectKind`] -- The three object kinds: blob, tree, commit

pub mod error;
pub mod kind;
pub mod object;

pub use error::TypeError;
pub use kind::ObjectKind;
pub use object::{ObjectId, OBJECT_ID_HEX_LEN, OBJECT_ID_LEN};
