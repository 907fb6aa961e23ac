//! Dependency resolution engine: Puppet version requirements, backtracking
//! resolution over module candidates, the resolved graph and its DOT
//! rendering, and validation error reporting.

pub mod conflict;
pub mod graph;
pub mod resolver;
pub mod ui;
pub mod version;
