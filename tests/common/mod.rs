//! Shared integration-test helpers for running the `pvp-cooldown` binary.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};

/// Runs the binary with `args` and waits for it to exit.
///
/// Logging is pinned to `warn` so stderr stays predictable.
#[allow(clippy::missing_panics_doc)]
pub fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pvp-cooldown"))
        .args(args)
        .env("PVP_COOLDOWN_LOG", "warn")
        .env("NO_COLOR", "1")
        .env_remove("PVP_COOLDOWN_CONFIG")
        .output()
        .expect("failed to spawn pvp-cooldown")
}

/// Path to a file under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Stdout as text.
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Stderr as text.
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
