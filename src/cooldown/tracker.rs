//! Combat tracker service
//!
//! Owns the ledger, the injected host and clock, the event emitter and the
//! background reconciler task. Every entry point locks the ledger, builds an
//! [`EventGate`] at the clock's current instant and delegates to it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{CommandVerdict, DisconnectOutcome, EventGate, Ledger, Reconciler, TickReport};
use crate::clock::{Clock, SystemClock};
use crate::config::PolicyConfig;
use crate::config::policy::MAX_TICK_INTERVAL;
use crate::host::{Host, ParticipantId};
use crate::observability::events::{Event, EventEmitter};
use crate::observability::metrics;

/// Per-participant combat cooldown service.
///
/// Host callbacks run while the ledger lock is held; a host must not call
/// back into the tracker from inside them.
pub struct CombatTracker {
    policy: Arc<PolicyConfig>,
    host: Arc<dyn Host>,
    clock: Arc<dyn Clock>,
    events: Arc<EventEmitter>,
    ledger: Mutex<Ledger>,
    cancel: CancellationToken,
    stopped: AtomicBool,
}

impl CombatTracker {
    /// Creates a tracker on the system clock with events discarded.
    #[must_use]
    pub fn new(policy: Arc<PolicyConfig>, host: Arc<dyn Host>) -> Self {
        let ledger = Ledger::new(&policy);
        Self {
            policy,
            host,
            clock: Arc::new(SystemClock),
            events: Arc::new(EventEmitter::noop()),
            ledger: Mutex::new(ledger),
            cancel: CancellationToken::new(),
            stopped: AtomicBool::new(false),
        }
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<EventEmitter>) -> Self {
        self.events = events;
        self
    }

    /// The policy this tracker enforces.
    #[must_use]
    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    // Once stopped, every entry point below is a no-op so nothing can be
    // recreated after `stop` has cleared the ledger.

    /// `attacker` damaged `victim`.
    pub fn on_combat(&self, attacker: ParticipantId, victim: ParticipantId) {
        if self
            .with_gate(|mut gate| gate.on_combat(attacker, victim))
            .is_none()
        {
            debug!(%attacker, %victim, "combat after stop ignored");
        }
    }

    /// `participant` tried to run `raw_command`. The host cancels the command
    /// when the verdict is [`CommandVerdict::Block`].
    #[must_use]
    pub fn on_command(&self, participant: ParticipantId, raw_command: &str) -> CommandVerdict {
        self.with_gate(|gate| gate.on_command(participant, raw_command))
            .unwrap_or(CommandVerdict::Allow)
    }

    /// `participant` is leaving the session.
    ///
    /// The host must call this before it drops the participant, so the
    /// penalty can still reach them.
    pub fn on_disconnect(&self, participant: ParticipantId) -> DisconnectOutcome {
        self.with_gate(|mut gate| gate.on_disconnect(participant))
            .unwrap_or(DisconnectOutcome::Ignored)
    }

    /// Runs one reconciliation pass now.
    pub fn tick(&self) -> TickReport {
        let started = std::time::Instant::now();
        let report = self
            .with_gate(|gate| Reconciler::new(gate).tick())
            .unwrap_or_default();
        metrics::record_tick_duration(started.elapsed());
        report
    }

    /// Spawns the reconciler on a tokio interval of `tick_interval`.
    ///
    /// The task exits once [`stop`](Self::stop) is called.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let tracker = Arc::clone(self);
        let period = self
            .policy
            .tick_interval
            .clamp(Duration::from_millis(1), MAX_TICK_INTERVAL);
        self.events.emit(Event::TrackerStarted {
            timestamp: Utc::now(),
            cooldown_ms: millis(self.policy.cooldown),
            tick_interval_ms: millis(period),
        });
        info!(
            cooldown = %humantime::format_duration(self.policy.cooldown),
            tick = %humantime::format_duration(period),
            "combat tracker started"
        );

        tokio::spawn(async move {
            let first = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(first, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = tracker.cancel.cancelled() => {
                        debug!("reconciler task cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        tracker.tick();
                    }
                }
            }
        })
    }

    /// Stops the reconciler, destroys every indicator and forgets every
    /// cooldown. No per-participant notices are sent. Idempotent.
    pub fn stop(&self) {
        self.cancel.cancel();
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut ledger = self.lock();
        let indicators = ledger.indicators.remove_all(self.host.as_ref());
        let active = ledger.store.clear();
        metrics::set_ledger_sizes(0, 0);
        drop(ledger);

        info!(active, indicators, "combat tracker stopped");
        self.events.emit(Event::TrackerStopped {
            timestamp: Utc::now(),
            active,
        });
    }

    /// Returns whether [`stop`](Self::stop) has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Whether `participant` is in cooldown right now.
    #[must_use]
    pub fn is_active(&self, participant: ParticipantId) -> bool {
        let now = self.clock.now();
        self.lock().store.is_active(participant, now)
    }

    /// Time left in the participant's cooldown.
    #[must_use]
    pub fn remaining(&self, participant: ParticipantId) -> Option<Duration> {
        let now = self.clock.now();
        self.lock().store.remaining(participant, now)
    }

    /// Number of participants currently in cooldown.
    #[must_use]
    pub fn active_count(&self) -> usize {
        let now = self.clock.now();
        let ledger = self.lock();
        ledger
            .store
            .participants()
            .into_iter()
            .filter(|p| ledger.store.is_active(*p, now))
            .count()
    }

    /// Whether `participant` has a live countdown indicator.
    #[must_use]
    pub fn has_indicator(&self, participant: ParticipantId) -> bool {
        self.lock().indicators.contains(participant)
    }

    /// Runs `f` under the ledger lock, or returns `None` once stopped. The
    /// flag is read under the lock so nothing lands after `stop` clears.
    fn with_gate<T>(&self, f: impl FnOnce(EventGate<'_>) -> T) -> Option<T> {
        let now = self.clock.now();
        let mut ledger = self.lock();
        if self.is_stopped() {
            return None;
        }
        let gate = EventGate::new(
            &mut *ledger,
            &self.policy,
            self.host.as_ref(),
            &self.events,
            now,
        );
        let out = f(gate);
        metrics::set_ledger_sizes(ledger.store.len(), ledger.indicators.len());
        Some(out)
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl std::fmt::Debug for CombatTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ledger = self.lock();
        f.debug_struct("CombatTracker")
            .field("cooldown", &self.policy.cooldown)
            .field("tracked", &ledger.store.len())
            .field("indicators", &ledger.indicators.len())
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}
