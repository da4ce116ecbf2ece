//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`] or [`invoke`].

pub mod invoke;
pub mod run;

use crate::cli::{Cli, Commands};
use crate::error::RelayError;

pub async fn dispatch(cli: Cli) -> Result<(), RelayError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(*args).await,
        Some(Commands::Invoke(args)) => invoke::execute(args).await,
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  fetch-relay v{version} \u{2014} CORS-enabled HTTP fetch relay\n\n  \
         No command provided. To get started:\n\n    \
         fetch-relay run                        Serve GET /fetch-url?url=<target> on port 3000\n    \
         fetch-relay invoke <url>               Run the handler once and print the response\n    \
         fetch-relay --help                     See all commands and options\n"
    );
}
