//! Progress hooks for a resolution run.

/// Receives progress and trace events from the resolver.
///
/// Every method has a default, so implementors only override what they show.
pub trait ResolverUi {
    fn before_resolution(&self) {}

    /// Called once per dependency the resolver works on.
    fn indicate_progress(&self) {}

    /// Solver trace. `depth` is the number of open choice points.
    fn debug(&self, depth: usize, message: &str) {
        tracing::debug!("{:indent$}{message}", "", indent = depth * 2);
    }

    fn after_resolution(&self) {}
}

/// A UI that shows nothing; solver trace still goes to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullUi;

impl ResolverUi for NullUi {}
