//! `simulate` command handler
//!
//! Resolves the scenario and policy, replays the scenario, and prints the
//! transcript.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cli::args::{OutputFormat, SimulateArgs};
use crate::cli::commands::scenarios::unknown_scenario;
use crate::config::{ConfigLoader, LoadResult, PolicyConfig};
use crate::error::CooldownError;
use crate::observability::{EventEmitter, init_metrics};
use crate::scenario::{Scenario, SimulationReport, find_scenario, replay, replay_realtime};

/// Replay a scenario and print the transcript.
///
/// # Errors
///
/// Returns an error if the scenario or configuration cannot be loaded, the
/// event file cannot be created, or the metrics listener cannot bind.
pub async fn run(args: &SimulateArgs) -> Result<(), CooldownError> {
    let scenario = load_scenario(&args.scenario)?;
    let load_result = resolve_policy(args.config.as_deref(), &scenario)?;
    for warning in &load_result.warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }
    let policy = load_result.config;

    if let Some(port) = args.metrics_port {
        init_metrics(Some(port))?;
        tracing::info!(port, "metrics endpoint listening");
    }

    let events = match &args.events_file {
        Some(path) => EventEmitter::from_file(path)?,
        None => EventEmitter::noop(),
    };
    let events = Arc::new(events);

    tracing::info!(
        scenario = %args.scenario,
        realtime = args.realtime,
        cooldown = %humantime::format_duration(policy.cooldown),
        "replaying scenario"
    );

    let report = if args.realtime {
        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_signal.cancel();
            }
        });
        replay_realtime(&scenario, Arc::clone(&policy), Arc::clone(&events), cancel).await?
    } else {
        replay(&scenario, Arc::clone(&policy), Arc::clone(&events))?
    };

    tracing::debug!(events = events.event_count(), "tracker events emitted");
    print_report(&scenario, &policy, &report, args.format)
}

/// Loads a built-in scenario by name, or a scenario file by path.
fn load_scenario(source: &str) -> Result<Scenario, CooldownError> {
    if let Some(builtin) = find_scenario(source) {
        return Scenario::from_yaml(builtin.yaml);
    }

    let path = Path::new(source);
    if path.exists() {
        return Scenario::from_file(path);
    }

    let looks_like_path = source.contains(std::path::MAIN_SEPARATOR)
        || path
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
    if looks_like_path {
        Err(CooldownError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("file not found: {source}"),
        )))
    } else {
        Err(unknown_scenario(source))
    }
}

/// A `--config` file wins over the scenario's embedded config; with neither,
/// the defaults apply.
fn resolve_policy(config: Option<&Path>, scenario: &Scenario) -> Result<LoadResult, CooldownError> {
    let loader = ConfigLoader::with_defaults();
    if let Some(path) = config {
        return Ok(loader.load(path)?);
    }
    match &scenario.config {
        Some(raw) => Ok(loader.resolve(raw)?),
        None => Ok(LoadResult {
            config: Arc::new(PolicyConfig::default()),
            warnings: Vec::new(),
        }),
    }
}

fn print_report(
    scenario: &Scenario,
    policy: &PolicyConfig,
    report: &SimulationReport,
    format: OutputFormat,
) -> Result<(), CooldownError> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Human => {
            if let Some(description) = &scenario.description {
                println!("{}", description.trim());
            }
            println!(
                "cooldown {}, tick {}\n",
                humantime::format_duration(policy.cooldown),
                humantime::format_duration(policy.tick_interval)
            );
            for entry in &report.transcript {
                println!("{entry}");
            }
            println!();
            for p in &report.participants {
                println!(
                    "  {:<16} health {:<6} {:<8} {}",
                    p.name,
                    p.health,
                    if p.connected { "online" } else { "offline" },
                    if p.in_cooldown { "in cooldown" } else { "idle" }
                );
            }
            println!(
                "\n{} ticks over {}",
                report.ticks,
                humantime::format_duration(std::time::Duration::from_millis(report.duration_ms))
            );
        }
    }
    Ok(())
}
