//! Digest engine for loam.
//!
//! Object ids are SHA-1 digests of the canonical encoding
//! `"<kind> <len>\0<payload>"`, never of the payload alone. All crypto
//! operations wrap established libraries; no custom cryptography.

pub mod hasher;

pub use hasher::ContentHasher;
