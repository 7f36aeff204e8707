//! Observability module
//!
//! Logging, metrics, and the structured event stream describing cooldown
//! transitions.

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{EndReason, Event, EventEmitter};
pub use logging::{LogSettings, init_logging};
pub use metrics::init_metrics;
