//! `scenarios` command handler
//!
//! Lists the built-in scenarios, or prints one of them as YAML.

use std::fmt::Write as _;

use crate::cli::args::{OutputFormat, ScenariosArgs};
use crate::error::CooldownError;
use crate::scenario::{find_scenario, list_scenario_names, suggest_scenario};

/// List built-in scenarios, or show the YAML of the named one.
///
/// # Errors
///
/// Returns a usage error if the scenario name is not found.
pub fn run(args: &ScenariosArgs) -> Result<(), CooldownError> {
    if let Some(name) = &args.name {
        let scenario = find_scenario(name).ok_or_else(|| unknown_scenario(name))?;
        print!("{}", scenario.yaml);
        return Ok(());
    }

    let builtins: Vec<_> = list_scenario_names()
        .into_iter()
        .filter_map(find_scenario)
        .collect();

    match args.format {
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = builtins
                .iter()
                .map(|s| serde_json::json!({ "name": s.name, "description": s.description }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Human => {
            println!("Built-in Scenarios ({} available)\n", builtins.len());
            for s in builtins {
                println!("  {:<16}{}", s.name, s.description);
            }
            println!();
            println!("Replay a scenario: pvp-cooldown simulate --scenario <name>");
            println!("View YAML:         pvp-cooldown scenarios <name>");
        }
    }

    Ok(())
}

/// Builds the usage error for a name that matches no built-in scenario.
pub(crate) fn unknown_scenario(name: &str) -> CooldownError {
    let mut message = format!("Unknown scenario '{name}'");

    if let Some(suggestion) = suggest_scenario(name) {
        let _ = write!(message, "\n\nDid you mean '{suggestion}'?");
    }

    message.push_str("\n\nAvailable scenarios:");
    for name in list_scenario_names() {
        if let Some(s) = find_scenario(name) {
            let _ = write!(message, "\n  {:<16}{}", s.name, s.description);
        }
    }

    CooldownError::Usage(message)
}
