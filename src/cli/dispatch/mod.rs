//! Map validated CLI arguments to the action the binary runs.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_PORT, gate};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches
        .get_one::<u16>(ARG_PORT)
        .copied()
        .context("missing required argument: --port")?;

    let gate_opts = gate::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        options: gate_opts.into_gate_options(),
    }))
}
