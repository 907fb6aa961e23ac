//! Command handlers.

mod resolve;

use pfr_util::errors::PfrResult;

use crate::cli::Cli;

/// Run a parsed CLI invocation.
pub fn dispatch(cli: Cli) -> PfrResult<()> {
    resolve::exec(&cli)
}
