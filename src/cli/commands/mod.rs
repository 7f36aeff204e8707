//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod completions;
pub mod scenarios;
pub mod simulate;
pub mod validate;
pub mod version;

use crate::cli::args::{Cli, Commands};
use crate::error::CooldownError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli) -> Result<(), CooldownError> {
    match cli.command {
        Commands::Simulate(args) => simulate::run(&args).await,
        Commands::Validate(args) => validate::run(&args),
        Commands::Scenarios(args) => scenarios::run(&args),
        Commands::Completions(args) => {
            completions::run(&args);
            Ok(())
        }
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}
