//! Terminal progress for a resolution run.

use std::cell::Cell;

use indicatif::ProgressBar;

use pfr_resolver::ui::ResolverUi;
use pfr_util::progress;

/// Shows a spinner while resolving and forwards the solver trace to `tracing`.
pub struct SpinnerUi {
    bar: ProgressBar,
    modules: Cell<usize>,
}

impl SpinnerUi {
    /// A spinner on stderr, or a hidden one when the trace is printed.
    pub fn new(show: bool) -> Self {
        let bar = if show {
            progress::spinner("Resolving")
        } else {
            ProgressBar::hidden()
        };
        Self {
            bar,
            modules: Cell::new(0),
        }
    }
}

impl ResolverUi for SpinnerUi {
    fn indicate_progress(&self) {
        let n = self.modules.get() + 1;
        self.modules.set(n);
        self.bar.set_message(format!("Resolving ({n} modules visited)"));
    }

    fn debug(&self, depth: usize, message: &str) {
        self.bar
            .suspend(|| tracing::debug!("{:indent$}{message}", "", indent = depth * 2));
    }

    fn after_resolution(&self) {
        self.bar.finish_and_clear();
    }
}
