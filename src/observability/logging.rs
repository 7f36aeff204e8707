//! Logging setup
//!
//! Diagnostics go to stderr; stdout is reserved for transcripts and JSON
//! reports. `-v`/`-vv` raise the level of this crate's own events only, so
//! tokio and the metrics exporter stay at `warn` until `-vvv`. `--quiet`
//! keeps errors. `PVP_COOLDOWN_LOG` replaces the computed filter outright.

use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::Uptime;

use crate::cli::args::{Cli, ColorChoice, OutputFormat};

/// Environment variable holding a full `EnvFilter` directive.
pub const LOG_ENV_VAR: &str = "PVP_COOLDOWN_LOG";

const CRATE_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Logging options taken from the global CLI flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    /// Human lines or flattened JSON objects.
    pub format: OutputFormat,
    /// Number of `-v` flags.
    pub verbosity: u8,
    /// `--quiet`: errors only, regardless of `verbosity`.
    pub quiet: bool,
    /// ANSI colour policy for human output.
    pub color: ColorChoice,
}

impl LogSettings {
    /// Reads the global flags.
    #[must_use]
    pub const fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.log_format,
            verbosity: cli.verbose,
            quiet: cli.quiet,
            color: cli.color,
        }
    }

    /// Filter directive used when [`LOG_ENV_VAR`] is unset.
    #[must_use]
    pub fn directive(&self) -> String {
        if self.quiet {
            return "error".to_owned();
        }
        match self.verbosity {
            0 => "warn".to_owned(),
            1 => format!("warn,{CRATE_TARGET}=info"),
            2 => format!("warn,{CRATE_TARGET}=debug"),
            _ => "trace".to_owned(),
        }
    }

    fn ansi(&self) -> bool {
        match self.color {
            ColorChoice::Auto => {
                std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
            }
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        }
    }
}

/// Installs the global subscriber. Later calls are no-ops.
///
/// Human lines are stamped with time since start, which lines up with the
/// offsets in a replay transcript.
pub fn init_logging(settings: &LogSettings) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(settings.directive()));

    match settings.format {
        OutputFormat::Human => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(settings.ansi())
                .with_target(settings.verbosity >= 2)
                .with_timer(Uptime::default())
                .with_writer(std::io::stderr)
                .try_init();
        }
        OutputFormat::Json => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .flatten_event(true)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
