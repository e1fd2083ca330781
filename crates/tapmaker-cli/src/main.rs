//! # tap-maker
//!
//! Pre-provisions a persistent TAP device inside the network namespace of
//! another process, or creates one in the current namespace and keeps it
//! open.

mod commands;
mod logging;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    // Input the parser could not see still exits like a usage error.
    let config = match cli.into_config() {
        Ok(config) => config,
        Err(err) if err.is_user_error() => {
            Cli::command().error(ErrorKind::ValueValidation, err).exit()
        }
        Err(err) => return Err(err.into()),
    };
    commands::execute(config)
}
