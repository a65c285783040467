//! Shared utilities.
//!
//! Slash-path helpers for import paths, directory copying for embedded
//! files, and test helpers.

pub mod fs;
pub mod path;
