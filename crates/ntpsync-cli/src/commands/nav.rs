//! `help`, `about` and `donate` commands

use ntpsync_core::ports::{Destination, INavigator};
use tracing::info;

use super::CliContext;
use crate::terminal::TerminalNavigator;

/// Opens an informational page outside the controller
pub fn execute(destination: Destination, ctx: &CliContext) -> anyhow::Result<()> {
    info!(destination = %destination, "Opening page");
    TerminalNavigator::new(ctx.format).open(destination);
    Ok(())
}
