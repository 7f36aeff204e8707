//! Host integration seam
//!
//! The cooldown core never talks to a game server directly. Everything it
//! needs from the outside world (who is online, who may bypass the
//! cooldown, how to message a participant, how to hurt them, how to draw a
//! countdown bar) is expressed as a small trait here. A server integration
//! implements all of them on one type and gets [`Host`] for free.
//!
//! [`InMemoryHost`] is the reference implementation used by the scenario
//! replayer and the test suite.

pub mod memory;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::policy::{BarColor, BarStyle};

pub use memory::{HostRecord, InMemoryHost, ParticipantRecord};

/// Stable identifier for one connected session identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(Uuid);

impl ParticipantId {
    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Generates a fresh random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ParticipantId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Opaque handle to an indicator living on a participant's client.
///
/// Issued by [`IndicatorBackend::create_indicator`]; only the backend knows
/// what it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct IndicatorHandle(pub u64);

/// Everything a backend needs to draw one countdown indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorView {
    /// Rendered title with `%seconds%` already substituted.
    pub title: String,
    /// Fill fraction in `[0.0, 1.0]`.
    pub progress: f64,
    /// Bar colour.
    pub color: BarColor,
    /// Bar segmentation style.
    pub style: BarStyle,
}

/// Connectivity of participants as seen by the host session.
pub trait Presence: Send + Sync {
    /// Returns whether the participant is currently connected.
    fn is_connected(&self, participant: ParticipantId) -> bool;

    /// Returns the participant's display name, if known.
    fn display_name(&self, participant: ParticipantId) -> Option<String>;
}

/// The bypass capability query.
pub trait Permissions: Send + Sync {
    /// Returns whether the participant may skip cooldowns and penalties.
    fn has_bypass(&self, participant: ParticipantId) -> bool;
}

/// Outbound chat.
pub trait Messenger: Send + Sync {
    /// Sends a direct message to one participant.
    fn send(&self, participant: ParticipantId, text: &str);

    /// Sends a message to every connected participant except `except`.
    fn broadcast(&self, except: ParticipantId, text: &str);
}

/// Participant health, used by the disconnect penalty.
pub trait Vitals: Send + Sync {
    /// Current health, or `None` when the participant has no body to hurt.
    fn health(&self, participant: ParticipantId) -> Option<f64>;

    /// Sets health. A value of `0.0` eliminates the participant.
    fn set_health(&self, participant: ParticipantId, health: f64);
}

/// Client-side countdown indicators (boss bars and the like).
pub trait IndicatorBackend: Send + Sync {
    /// Creates an indicator and attaches it to the participant's client.
    fn create_indicator(&self, participant: ParticipantId, view: &IndicatorView)
    -> IndicatorHandle;

    /// Redraws an existing indicator.
    fn update_indicator(&self, handle: IndicatorHandle, view: &IndicatorView);

    /// Detaches and destroys an indicator. Unknown handles are ignored.
    fn destroy_indicator(&self, handle: IndicatorHandle);
}

/// Everything the cooldown tracker needs from its host.
pub trait Host: Presence + Permissions + Messenger + Vitals + IndicatorBackend {}

impl<T> Host for T where T: Presence + Permissions + Messenger + Vitals + IndicatorBackend {}
