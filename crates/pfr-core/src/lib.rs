//! Core data types for the Puppetfile resolver.
//!
//! This crate defines the types that describe a Puppetfile and the modules
//! it pulls in: the Puppetfile interpreter and its [`document::Document`],
//! module titles and dependencies, the origin classifier, module
//! specifications (the vertices of a resolved graph), and the global
//! configuration file.
//!
//! This crate is intentionally free of network I/O.

/// Default Puppet Forge API endpoint.
pub const DEFAULT_FORGE_URL: &str = "https://forgeapi.puppet.com";

pub mod classifier;
pub mod config;
pub mod dependency;
pub mod document;
mod lexer;
pub mod puppetfile;
pub mod specification;
