//! Combat cooldown core
//!
//! - [`CooldownStore`]: participant → deadline
//! - [`IndicatorManager`]: countdown indicator handles
//! - [`EventGate`]: combat, command and disconnect handling
//! - [`Reconciler`]: periodic refresh, expiry and garbage collection
//! - [`CombatTracker`]: the service tying them to a host, a clock and a
//!   background task

pub mod gate;
pub mod indicator;
pub mod reconciler;
pub mod store;
pub mod tracker;

pub use gate::{CommandVerdict, DisconnectOutcome, EventGate};
pub use indicator::{IndicatorManager, RefreshOutcome, RefreshReport, display_seconds};
pub use reconciler::{Reconciler, TickReport};
pub use store::CooldownStore;
pub use tracker::CombatTracker;

use crate::config::PolicyConfig;

/// Cooldown and indicator state, always mutated together.
///
/// Every indicator in `indicators` has a matching entry in `store`; the
/// reconciler removes any that drift apart.
#[derive(Debug)]
pub struct Ledger {
    /// Cooldown deadlines.
    pub store: CooldownStore,
    /// Live indicators.
    pub indicators: IndicatorManager,
}

impl Ledger {
    /// Creates an empty ledger for `policy`.
    #[must_use]
    pub fn new(policy: &PolicyConfig) -> Self {
        Self {
            store: CooldownStore::new(),
            indicators: IndicatorManager::new(policy.indicator.clone(), policy.cooldown),
        }
    }
}
