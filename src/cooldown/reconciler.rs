//! Reconciler tick
//!
//! One pass brings the ledger back in line with the host:
//! 1. redraw indicators, ending cooldowns whose indicator expired or whose
//!    owner disconnected,
//! 2. end stale cooldowns of connected participants (covers disabled
//!    indicators),
//! 3. drop entries of participants who are gone and have no indicator.

use serde::Serialize;

use super::EventGate;
use crate::host::ParticipantId;
use crate::observability::events::EndReason;

/// Participants affected by one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Cooldowns that ran out; each owner got the end notice.
    pub expired: Vec<ParticipantId>,
    /// Cooldowns dropped because the indicator owner disconnected.
    pub disconnected: Vec<ParticipantId>,
    /// Leaked entries of departed participants.
    pub collected: Vec<ParticipantId>,
}

impl TickReport {
    /// Returns `true` if the tick changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && self.disconnected.is_empty() && self.collected.is_empty()
    }

    /// Total number of cooldowns ended by the tick.
    #[must_use]
    pub fn len(&self) -> usize {
        self.expired.len() + self.disconnected.len() + self.collected.len()
    }
}

/// Runs reconciliation passes through an [`EventGate`].
#[derive(Debug)]
pub struct Reconciler<'a> {
    gate: EventGate<'a>,
}

impl<'a> Reconciler<'a> {
    /// Wraps a gate built at the tick instant.
    #[must_use]
    pub const fn new(gate: EventGate<'a>) -> Self {
        Self { gate }
    }

    /// Performs one reconciliation pass.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        let gate = &mut self.gate;
        let now = gate.now;
        let host = gate.host;

        if gate.ledger.indicators.enabled() {
            let super::Ledger { store, indicators } = &mut *gate.ledger;
            let refreshed = indicators.refresh_all(host, |p| store.remaining(p, now));
            for participant in refreshed.expired {
                if gate.end_cooldown(participant, EndReason::Expired) {
                    report.expired.push(participant);
                }
            }
            for participant in refreshed.disconnected {
                if gate.end_cooldown(participant, EndReason::Disconnected) {
                    report.disconnected.push(participant);
                }
            }
        }

        for participant in gate.ledger.store.expired(now) {
            if host.is_connected(participant) {
                gate.end_cooldown(participant, EndReason::Expired);
                report.expired.push(participant);
            }
        }

        for participant in gate.ledger.store.participants() {
            if !host.is_connected(participant) && !gate.ledger.indicators.contains(participant) {
                gate.end_cooldown(participant, EndReason::Collected);
                report.collected.push(participant);
            }
        }

        if !report.is_empty() {
            tracing::debug!(
                expired = report.expired.len(),
                disconnected = report.disconnected.len(),
                collected = report.collected.len(),
                "reconciler tick"
            );
        }
        report
    }
}
