//! Prometheus metrics for cooldown activity.
//!
//! All label values come from closed enums inside the crate, never from
//! participant names or command text, so label cardinality stays fixed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::CooldownError;
use crate::observability::events::EndReason;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `CooldownError::Io` if the recorder or HTTP listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), CooldownError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| CooldownError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!(
        "pvp_cooldown_started_total",
        "Participants that entered cooldown from idle"
    );
    describe_counter!(
        "pvp_cooldown_refreshed_total",
        "Combat events that reset an already running cooldown"
    );
    describe_counter!("pvp_cooldown_ended_total", "Cooldowns ended, by reason");
    describe_counter!(
        "pvp_cooldown_commands_blocked_total",
        "Commands cancelled because the sender was in cooldown"
    );
    describe_counter!(
        "pvp_cooldown_penalties_total",
        "Disconnect penalties applied, by punishment"
    );
    describe_gauge!(
        "pvp_cooldown_active",
        "Participants currently tracked in cooldown"
    );
    describe_gauge!(
        "pvp_cooldown_indicators",
        "Countdown indicators currently attached"
    );
    describe_histogram!(
        "pvp_cooldown_tick_duration_ms",
        "Reconciler tick duration in milliseconds"
    );
}

/// Records a combat event that started or refreshed a cooldown.
pub fn record_cooldown_started(newly_entering: bool) {
    if newly_entering {
        counter!("pvp_cooldown_started_total").increment(1);
    } else {
        counter!("pvp_cooldown_refreshed_total").increment(1);
    }
}

/// Records the end of a cooldown.
pub fn record_cooldown_ended(reason: EndReason) {
    counter!("pvp_cooldown_ended_total", "reason" => reason.as_str()).increment(1);
}

/// Records a blocked command.
pub fn record_command_blocked() {
    counter!("pvp_cooldown_commands_blocked_total").increment(1);
}

/// Records an applied disconnect penalty.
pub fn record_penalty(punishment: &'static str) {
    counter!("pvp_cooldown_penalties_total", "punishment" => punishment).increment(1);
}

/// Publishes ledger sizes after a mutation or tick.
#[allow(clippy::cast_precision_loss)]
pub fn set_ledger_sizes(cooldowns: usize, indicators: usize) {
    gauge!("pvp_cooldown_active").set(cooldowns as f64);
    gauge!("pvp_cooldown_indicators").set(indicators as f64);
}

/// Records how long a reconciler tick took.
pub fn record_tick_duration(duration: Duration) {
    histogram!("pvp_cooldown_tick_duration_ms").record(duration.as_secs_f64() * 1000.0);
}
