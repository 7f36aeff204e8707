//! CLI argument definitions
//!
//! All Clap derive structs for `pvp-cooldown` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

// ============================================================================
// Root CLI
// ============================================================================

/// PvP combat cooldown tracker: replay scripted fights against a policy.
#[derive(Parser, Debug)]
#[command(name = "pvp-cooldown", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace for dependencies too).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "PVP_COOLDOWN_COLOR")]
    pub color: ColorChoice,

    /// Log line format on stderr.
    #[arg(
        long,
        default_value = "human",
        global = true,
        env = "PVP_COOLDOWN_LOG_FORMAT"
    )]
    pub log_format: OutputFormat,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a combat scenario and print what the host observed.
    Simulate(SimulateArgs),

    /// Validate policy configuration files.
    Validate(ValidateArgs),

    /// List the built-in scenarios.
    Scenarios(ScenariosArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version and build information.
    Version(VersionArgs),
}

// ============================================================================
// Simulate / Validate / Scenarios
// ============================================================================

/// Arguments for `simulate`.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Built-in scenario name or path to a scenario file.
    #[arg(short, long)]
    pub scenario: String,

    /// Policy configuration file (overrides the scenario's own `config`).
    #[arg(short, long, env = "PVP_COOLDOWN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format for the transcript.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Write tracker events as JSONL to this file.
    #[arg(long, env = "PVP_COOLDOWN_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,

    /// Serve Prometheus metrics on `127.0.0.1:<port>`.
    #[arg(long, env = "PVP_COOLDOWN_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Run on the wall clock instead of virtual time.
    #[arg(long)]
    pub realtime: bool,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Enable strict validation (warnings become errors).
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for `scenarios`.
#[derive(Args, Debug)]
pub struct ScenariosArgs {
    /// Print the YAML of this scenario instead of the list.
    pub name: Option<String>,

    /// Output format for the list.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Completions / Version
// ============================================================================

/// Arguments for shell completion generation.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script.
    pub shell: Shell,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

/// Shell type for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell.
    Bash,
    /// Zsh shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// `PowerShell`.
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell.
    Elvish,
}

// ============================================================================
// Tests
// ============================================================================
