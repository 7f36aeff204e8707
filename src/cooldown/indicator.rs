//! Countdown indicators
//!
//! One indicator per participant in cooldown. The manager only knows about
//! handles and rendering; remaining time is always supplied by the caller,
//! who reads it from the [`CooldownStore`](super::CooldownStore).

use std::collections::HashMap;
use std::time::Duration;

use crate::config::policy::IndicatorSettings;
use crate::host::{IndicatorBackend, IndicatorHandle, IndicatorView, ParticipantId, Presence};

/// Seconds shown for `remaining`, rounded up.
///
/// Any non-zero remainder shows at least `1`; exactly ten seconds shows `10`.
#[must_use]
pub const fn display_seconds(remaining: Duration) -> u64 {
    let secs = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

/// Result of refreshing a single indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Title and progress were redrawn.
    Updated,
    /// No time is left; the caller should end the cooldown.
    Expired,
    /// The participant has no indicator.
    Missing,
}

/// Participants dropped during [`IndicatorManager::refresh_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Indicators whose time ran out.
    pub expired: Vec<ParticipantId>,
    /// Indicators whose owner is no longer connected.
    pub disconnected: Vec<ParticipantId>,
}

impl RefreshReport {
    /// Returns `true` if nothing was dropped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && self.disconnected.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct Indicator {
    handle: IndicatorHandle,
    last_rendered_seconds: u64,
}

/// Owns the indicator handle table.
#[derive(Debug)]
pub struct IndicatorManager {
    settings: IndicatorSettings,
    total: Duration,
    live: HashMap<ParticipantId, Indicator>,
}

impl IndicatorManager {
    /// Creates an empty manager drawing with `settings` for cooldowns of
    /// length `total`.
    #[must_use]
    pub fn new(settings: IndicatorSettings, total: Duration) -> Self {
        Self {
            settings,
            total,
            live: HashMap::new(),
        }
    }

    /// Whether indicators are shown at all.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Attaches an indicator if `participant` has none, then redraws it.
    ///
    /// Returns `true` when a new indicator was created.
    pub fn ensure<B>(
        &mut self,
        backend: &B,
        participant: ParticipantId,
        remaining: Option<Duration>,
    ) -> bool
    where
        B: IndicatorBackend + ?Sized,
    {
        let created = if self.live.contains_key(&participant) {
            false
        } else {
            let seconds = display_seconds(self.total);
            let handle = backend.create_indicator(participant, &self.view(seconds, 1.0));
            self.live.insert(
                participant,
                Indicator {
                    handle,
                    last_rendered_seconds: seconds,
                },
            );
            tracing::debug!(%participant, ?handle, "indicator attached");
            true
        };
        self.refresh_one(backend, participant, remaining);
        created
    }

    /// Redraws one indicator from the caller-supplied remaining time.
    ///
    /// An expired indicator is left in place; the caller ends the cooldown,
    /// which removes it.
    pub fn refresh_one<B>(
        &mut self,
        backend: &B,
        participant: ParticipantId,
        remaining: Option<Duration>,
    ) -> RefreshOutcome
    where
        B: IndicatorBackend + ?Sized,
    {
        let Some(indicator) = self.live.get(&participant).copied() else {
            return RefreshOutcome::Missing;
        };
        let Some(remaining) = remaining.filter(|r| !r.is_zero()) else {
            return RefreshOutcome::Expired;
        };

        let seconds = display_seconds(remaining);
        let progress = self.progress(remaining);
        backend.update_indicator(indicator.handle, &self.view(seconds, progress));
        if let Some(entry) = self.live.get_mut(&participant) {
            entry.last_rendered_seconds = seconds;
        }
        RefreshOutcome::Updated
    }

    /// Refreshes every live indicator.
    ///
    /// Indicators of disconnected or expired participants are destroyed and
    /// reported so the caller can end the matching cooldowns.
    pub fn refresh_all<H, F>(&mut self, host: &H, remaining: F) -> RefreshReport
    where
        H: IndicatorBackend + Presence + ?Sized,
        F: Fn(ParticipantId) -> Option<Duration>,
    {
        let mut report = RefreshReport::default();
        let mut participants: Vec<_> = self.live.keys().copied().collect();
        participants.sort_unstable();

        for participant in participants {
            if !host.is_connected(participant) {
                self.remove(host, participant);
                report.disconnected.push(participant);
                continue;
            }
            if self.refresh_one(host, participant, remaining(participant))
                == RefreshOutcome::Expired
            {
                self.remove(host, participant);
                report.expired.push(participant);
            }
        }
        report
    }

    /// Destroys the participant's indicator. No-op when absent.
    pub fn remove<B>(&mut self, backend: &B, participant: ParticipantId) -> bool
    where
        B: IndicatorBackend + ?Sized,
    {
        match self.live.remove(&participant) {
            Some(indicator) => {
                backend.destroy_indicator(indicator.handle);
                tracing::debug!(%participant, "indicator removed");
                true
            }
            None => false,
        }
    }

    /// Destroys every indicator, returning how many there were.
    pub fn remove_all<B>(&mut self, backend: &B) -> usize
    where
        B: IndicatorBackend + ?Sized,
    {
        let count = self.live.len();
        for (_, indicator) in self.live.drain() {
            backend.destroy_indicator(indicator.handle);
        }
        count
    }

    /// Whether `participant` has a live indicator.
    #[must_use]
    pub fn contains(&self, participant: ParticipantId) -> bool {
        self.live.contains_key(&participant)
    }

    /// Number of live indicators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Returns `true` if no indicator is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Seconds most recently drawn for `participant`.
    #[must_use]
    pub fn rendered_seconds(&self, participant: ParticipantId) -> Option<u64> {
        self.live.get(&participant).map(|i| i.last_rendered_seconds)
    }

    fn progress(&self, remaining: Duration) -> f64 {
        if self.total.is_zero() {
            return 0.0;
        }
        (remaining.as_secs_f64() / self.total.as_secs_f64()).clamp(0.0, 1.0)
    }

    fn view(&self, seconds: u64, progress: f64) -> IndicatorView {
        IndicatorView {
            title: self.settings.render_title(seconds),
            progress,
            color: self.settings.color,
            style: self.settings.style,
        }
    }
}
