//! Shared foundational types used across the tether wrapper generator.
//!
//! Provides the content digest used to fingerprint files between build runs
//! and the all-or-nothing write helper used for every persisted state file.

#![warn(missing_docs)]

pub mod fs;
pub mod hash;

pub use fs::{is_missing, write_atomic};
pub use hash::{ContentHash, ParseHashError};
