//! In-memory host
//!
//! A complete [`Host`](super::Host) backed by concurrent maps. It keeps a
//! journal of everything the tracker asked it to do so that scenario
//! transcripts and tests can inspect the outcome.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

use super::{
    IndicatorBackend, IndicatorHandle, IndicatorView, Messenger, ParticipantId, Permissions,
    Presence, Vitals,
};

/// State of one participant known to the in-memory host.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantRecord {
    /// Display name.
    pub name: String,
    /// Whether the participant is online.
    pub connected: bool,
    /// Current health.
    pub health: f64,
    /// Holds the bypass capability.
    pub bypass: bool,
}

/// One observable side effect performed through the host.
///
/// Indicator redraws are not journaled (they happen every tick); only the
/// moments an indicator appears or disappears are.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostRecord {
    /// Direct message.
    Message {
        /// Recipient.
        to: ParticipantId,
        /// Message text.
        text: String,
    },
    /// Message to everyone but one participant.
    Broadcast {
        /// Excluded participant.
        except: ParticipantId,
        /// Message text.
        text: String,
    },
    /// Health was changed.
    HealthChanged {
        /// Target.
        participant: ParticipantId,
        /// Health before.
        from: f64,
        /// Health after.
        to: f64,
    },
    /// An indicator was attached.
    IndicatorShown {
        /// Owner.
        participant: ParticipantId,
        /// Initial title.
        title: String,
    },
    /// An indicator was destroyed.
    IndicatorRemoved {
        /// Owner.
        participant: ParticipantId,
    },
}

#[derive(Debug, Clone)]
struct LiveIndicator {
    participant: ParticipantId,
    view: IndicatorView,
}

/// Reference host keeping all state in memory.
#[derive(Debug, Default)]
pub struct InMemoryHost {
    participants: DashMap<ParticipantId, ParticipantRecord>,
    indicators: DashMap<IndicatorHandle, LiveIndicator>,
    next_handle: AtomicU64,
    journal: Mutex<Vec<HostRecord>>,
}

impl InMemoryHost {
    /// Creates an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connected participant and returns its id.
    pub fn add_participant(&self, name: &str, health: f64, bypass: bool) -> ParticipantId {
        let id = ParticipantId::random();
        self.participants.insert(
            id,
            ParticipantRecord {
                name: name.to_owned(),
                connected: true,
                health,
                bypass,
            },
        );
        id
    }

    /// Marks a participant online or offline. Unknown ids are ignored.
    pub fn set_connected(&self, participant: ParticipantId, connected: bool) {
        if let Some(mut record) = self.participants.get_mut(&participant) {
            record.connected = connected;
        }
    }

    /// Grants or revokes the bypass capability.
    pub fn set_bypass(&self, participant: ParticipantId, bypass: bool) {
        if let Some(mut record) = self.participants.get_mut(&participant) {
            record.bypass = bypass;
        }
    }

    /// Returns a snapshot of a participant.
    #[must_use]
    pub fn participant(&self, participant: ParticipantId) -> Option<ParticipantRecord> {
        self.participants.get(&participant).map(|r| r.clone())
    }

    /// Returns all direct messages delivered to `participant`, oldest first.
    #[must_use]
    pub fn messages_for(&self, participant: ParticipantId) -> Vec<String> {
        self.journal()
            .into_iter()
            .filter_map(|record| match record {
                HostRecord::Message { to, text } if to == participant => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Returns every broadcast text, oldest first.
    #[must_use]
    pub fn broadcasts(&self) -> Vec<String> {
        self.journal()
            .into_iter()
            .filter_map(|record| match record {
                HostRecord::Broadcast { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Returns the current view of the participant's indicator, if one is live.
    #[must_use]
    pub fn indicator_for(&self, participant: ParticipantId) -> Option<IndicatorView> {
        self.indicators
            .iter()
            .find(|entry| entry.value().participant == participant)
            .map(|entry| entry.value().view.clone())
    }

    /// Number of indicators currently attached to clients.
    #[must_use]
    pub fn live_indicator_count(&self) -> usize {
        self.indicators.len()
    }

    /// Returns a copy of the journal.
    #[must_use]
    pub fn journal(&self) -> Vec<HostRecord> {
        self.lock_journal().clone()
    }

    /// Removes and returns everything journaled so far.
    pub fn drain_journal(&self) -> Vec<HostRecord> {
        std::mem::take(&mut *self.lock_journal())
    }

    fn record(&self, entry: HostRecord) {
        self.lock_journal().push(entry);
    }

    fn lock_journal(&self) -> std::sync::MutexGuard<'_, Vec<HostRecord>> {
        self.journal
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Presence for InMemoryHost {
    fn is_connected(&self, participant: ParticipantId) -> bool {
        self.participants
            .get(&participant)
            .is_some_and(|r| r.connected)
    }

    fn display_name(&self, participant: ParticipantId) -> Option<String> {
        self.participants.get(&participant).map(|r| r.name.clone())
    }
}

impl Permissions for InMemoryHost {
    fn has_bypass(&self, participant: ParticipantId) -> bool {
        self.participants.get(&participant).is_some_and(|r| r.bypass)
    }
}

impl Messenger for InMemoryHost {
    fn send(&self, participant: ParticipantId, text: &str) {
        self.record(HostRecord::Message {
            to: participant,
            text: text.to_owned(),
        });
    }

    fn broadcast(&self, except: ParticipantId, text: &str) {
        self.record(HostRecord::Broadcast {
            except,
            text: text.to_owned(),
        });
    }
}

impl Vitals for InMemoryHost {
    fn health(&self, participant: ParticipantId) -> Option<f64> {
        self.participants.get(&participant).map(|r| r.health)
    }

    fn set_health(&self, participant: ParticipantId, health: f64) {
        let previous = self.participants.get_mut(&participant).map(|mut r| {
            let from = r.health;
            r.health = health;
            from
        });
        if let Some(from) = previous {
            self.record(HostRecord::HealthChanged {
                participant,
                from,
                to: health,
            });
        }
    }
}

impl IndicatorBackend for InMemoryHost {
    fn create_indicator(
        &self,
        participant: ParticipantId,
        view: &IndicatorView,
    ) -> IndicatorHandle {
        let handle = IndicatorHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.indicators.insert(
            handle,
            LiveIndicator {
                participant,
                view: view.clone(),
            },
        );
        self.record(HostRecord::IndicatorShown {
            participant,
            title: view.title.clone(),
        });
        handle
    }

    fn update_indicator(&self, handle: IndicatorHandle, view: &IndicatorView) {
        if let Some(mut live) = self.indicators.get_mut(&handle) {
            live.view = view.clone();
        }
    }

    fn destroy_indicator(&self, handle: IndicatorHandle) {
        if let Some((_, live)) = self.indicators.remove(&handle) {
            self.record(HostRecord::IndicatorRemoved {
                participant: live.participant,
            });
        }
    }
}
