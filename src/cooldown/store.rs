//! Cooldown store
//!
//! Authoritative map from participant to cooldown deadline. Every query
//! takes the current instant explicitly; the store never reads a clock.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::clock::saturating_add;
use crate::host::ParticipantId;

/// Participant → expiry instant.
///
/// An entry whose deadline is at or before `now` is stale: it is never
/// reported active, and it stays in the map until the reconciler ends it.
#[derive(Debug, Default)]
pub struct CooldownStore {
    expiries: HashMap<ParticipantId, Instant>,
}

impl CooldownStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether `participant` has a cooldown that ends after `now`.
    #[must_use]
    pub fn is_active(&self, participant: ParticipantId, now: Instant) -> bool {
        self.expiries
            .get(&participant)
            .is_some_and(|expires_at| *expires_at > now)
    }

    /// Time left until the deadline, if the cooldown is active.
    #[must_use]
    pub fn remaining(&self, participant: ParticipantId, now: Instant) -> Option<Duration> {
        self.expiries
            .get(&participant)
            .filter(|expires_at| **expires_at > now)
            .map(|expires_at| expires_at.duration_since(now))
    }

    /// Sets the deadline to `now + duration`, replacing any previous one. A
    /// deadline past what `Instant` can hold is clamped to the latest one it
    /// can.
    ///
    /// Returns `true` when the participant was not active before the call.
    pub fn start(&mut self, participant: ParticipantId, duration: Duration, now: Instant) -> bool {
        let was_active = self.is_active(participant, now);
        self.expiries.insert(participant, saturating_add(now, duration));
        !was_active
    }

    /// Removes the entry. Returns whether one was present.
    pub fn end(&mut self, participant: ParticipantId) -> bool {
        self.expiries.remove(&participant).is_some()
    }

    /// Removes every entry, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.expiries.len();
        self.expiries.clear();
        count
    }

    /// Number of entries, stale ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.expiries.len()
    }

    /// Returns `true` if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expiries.is_empty()
    }

    /// Snapshot of every tracked participant, sorted for stable iteration.
    #[must_use]
    pub fn participants(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<_> = self.expiries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot of participants whose deadline is at or before `now`.
    #[must_use]
    pub fn expired(&self, now: Instant) -> Vec<ParticipantId> {
        let mut ids: Vec<_> = self
            .expiries
            .iter()
            .filter(|(_, expires_at)| **expires_at <= now)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }
}
