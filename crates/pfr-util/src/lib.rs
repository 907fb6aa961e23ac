//! Shared utilities for the Puppetfile resolver.
//!
//! This crate provides cross-cutting concerns used by all other resolver
//! crates: the error taxonomy, filesystem helpers, content hashing for the
//! persistent cache, external process spawning for version-control
//! searchers, and terminal status output.

pub mod errors;
pub mod fs;
pub mod hash;
pub mod process;
pub mod progress;
