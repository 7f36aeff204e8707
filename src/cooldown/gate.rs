//! Event gate
//!
//! Applies the cooldown policy to host events. A gate is a short-lived view
//! over the [`Ledger`] built for one event at one instant; the
//! [`CombatTracker`](super::CombatTracker) creates it under the ledger lock.

use std::time::Instant;

use chrono::Utc;

use super::Ledger;
use crate::config::PolicyConfig;
use crate::config::policy::{Punishment, base_command};
use crate::host::{Host, ParticipantId};
use crate::observability::events::{EndReason, Event, EventEmitter};
use crate::observability::metrics;

/// Decision for a command attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandVerdict {
    /// Let the command run.
    Allow,
    /// Cancel the command; the sender has been told why.
    Block,
}

impl CommandVerdict {
    /// Returns `true` if the host must cancel the command.
    #[must_use]
    pub const fn is_blocked(self) -> bool {
        matches!(self, Self::Block)
    }
}

/// What happened on a disconnect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisconnectOutcome {
    /// Disconnect prevention is off; state is left for the reconciler.
    Ignored,
    /// The participant holds the bypass capability; any cooldown was
    /// dropped silently.
    Exempt,
    /// The participant was not in cooldown.
    NotInCombat,
    /// The participant left mid-cooldown and was punished.
    Penalized {
        /// Punishment applied.
        punishment: Punishment,
        /// Health before the penalty, if the host knows it.
        health_before: Option<f64>,
        /// Health after the penalty, if it was changed.
        health_after: Option<f64>,
    },
}

impl DisconnectOutcome {
    /// Short label for logs and transcripts.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Ignored => "ignored",
            Self::Exempt => "exempt",
            Self::NotInCombat => "not_in_combat",
            Self::Penalized { .. } => "penalized",
        }
    }
}

/// Handles combat, command and disconnect events at a fixed instant.
pub struct EventGate<'a> {
    pub(super) ledger: &'a mut Ledger,
    pub(super) policy: &'a PolicyConfig,
    pub(super) host: &'a dyn Host,
    pub(super) events: &'a EventEmitter,
    pub(super) now: Instant,
}

impl<'a> EventGate<'a> {
    /// Creates a gate over `ledger` evaluated at `now`.
    #[must_use]
    pub fn new(
        ledger: &'a mut Ledger,
        policy: &'a PolicyConfig,
        host: &'a dyn Host,
        events: &'a EventEmitter,
        now: Instant,
    ) -> Self {
        Self {
            ledger,
            policy,
            host,
            events,
            now,
        }
    }

    /// `attacker` damaged `victim`: both non-exempt sides enter (or stay in)
    /// cooldown. Self-damage and hits involving anyone not connected are
    /// ignored.
    pub fn on_combat(&mut self, attacker: ParticipantId, victim: ParticipantId) {
        if attacker == victim {
            return;
        }
        if !(self.host.is_connected(attacker) && self.host.is_connected(victim)) {
            tracing::debug!(%attacker, %victim, "combat with an offline participant ignored");
            return;
        }
        for participant in [attacker, victim] {
            if self.host.has_bypass(participant) {
                tracing::trace!(%participant, "bypass holder skipped");
                continue;
            }
            self.start_cooldown(participant);
        }
    }

    /// Starts or resets the participant's cooldown.
    ///
    /// Returns `true` if the participant was idle before.
    pub fn start_cooldown(&mut self, participant: ParticipantId) -> bool {
        let duration = self.policy.cooldown;
        let newly_entering = self.ledger.store.start(participant, duration, self.now);

        if newly_entering {
            tracing::info!(%participant, "cooldown started");
            self.notify(participant, &self.policy.messages.cooldown_start);
        } else {
            tracing::debug!(%participant, "cooldown reset");
        }

        if self.ledger.indicators.enabled() {
            let remaining = self.ledger.store.remaining(participant, self.now);
            self.ledger
                .indicators
                .ensure(self.host, participant, remaining);
        }

        metrics::record_cooldown_started(newly_entering);
        self.events.emit(Event::CooldownStarted {
            timestamp: Utc::now(),
            participant,
            expires_in_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            refreshed: !newly_entering,
        });
        newly_entering
    }

    /// Decides whether `participant` may run `raw_command`.
    pub fn on_command(&self, participant: ParticipantId, raw_command: &str) -> CommandVerdict {
        let policy = self.policy;
        let commands = &policy.commands;
        if !commands.enabled
            || self.host.has_bypass(participant)
            || !self.ledger.store.is_active(participant, self.now)
        {
            return CommandVerdict::Allow;
        }
        if commands.is_whitelisted(raw_command) {
            return CommandVerdict::Allow;
        }

        let command = base_command(raw_command).unwrap_or_default();
        tracing::debug!(%participant, %command, "command blocked");
        self.notify(participant, &commands.blocked_message);
        metrics::record_command_blocked();
        self.events.emit(Event::CommandBlocked {
            timestamp: Utc::now(),
            participant,
            command,
        });
        CommandVerdict::Block
    }

    /// Applies the disconnect policy to `participant`.
    pub fn on_disconnect(&mut self, participant: ParticipantId) -> DisconnectOutcome {
        if !self.policy.logout.enabled {
            return DisconnectOutcome::Ignored;
        }
        if self.host.has_bypass(participant) {
            self.end_cooldown(participant, EndReason::Exempt);
            return DisconnectOutcome::Exempt;
        }
        if !self.ledger.store.is_active(participant, self.now) {
            return DisconnectOutcome::NotInCombat;
        }

        let policy = self.policy;
        let logout = &policy.logout;
        self.notify(participant, &logout.message);

        let punishment = logout.punishment;
        let health_before = self.host.health(participant);
        let health_after = match (punishment, health_before) {
            (Punishment::None, _) | (_, None) => None,
            (_, Some(health)) => {
                let after = punishment.apply(health);
                self.host.set_health(participant, after);
                Some(after)
            }
        };
        tracing::warn!(
            %participant,
            punishment = punishment.label(),
            ?health_before,
            ?health_after,
            "participant left during cooldown"
        );

        self.end_cooldown(participant, EndReason::Penalized);

        let nickname = self
            .host
            .display_name(participant)
            .unwrap_or_else(|| participant.to_string());
        if let Some(text) = logout.render_broadcast(&nickname) {
            self.host.broadcast(participant, &text);
        }

        metrics::record_penalty(punishment.label());
        self.events.emit(Event::PenaltyApplied {
            timestamp: Utc::now(),
            participant,
            punishment: punishment.label(),
            health_before,
            health_after,
        });
        DisconnectOutcome::Penalized {
            punishment,
            health_before,
            health_after,
        }
    }

    /// Ends the participant's cooldown and removes its indicator.
    ///
    /// The end notice is sent only when an entry was actually removed and
    /// `reason` is one the participant can still see. Calling this for an
    /// idle participant has no effect beyond dropping a stray indicator.
    pub fn end_cooldown(&mut self, participant: ParticipantId, reason: EndReason) -> bool {
        let removed = self.ledger.store.end(participant);
        self.ledger.indicators.remove(self.host, participant);
        if !removed {
            return false;
        }

        tracing::info!(%participant, %reason, "cooldown ended");
        if reason.notifies() {
            self.notify(participant, &self.policy.messages.cooldown_end);
        }
        metrics::record_cooldown_ended(reason);
        self.events.emit(Event::CooldownEnded {
            timestamp: Utc::now(),
            participant,
            reason,
        });
        true
    }

    fn notify(&self, participant: ParticipantId, text: &str) {
        if !text.is_empty() {
            self.host.send(participant, text);
        }
    }
}

impl std::fmt::Debug for EventGate<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventGate")
            .field("ledger", &self.ledger)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::policy::{CommandPolicy, LogoutPolicy};
    use crate::host::{HostRecord, InMemoryHost};
    use std::time::Duration;

    struct Fixture {
        host: InMemoryHost,
        policy: PolicyConfig,
        ledger: Ledger,
        events: EventEmitter,
        now: Instant,
    }

    impl Fixture {
        fn new(policy: PolicyConfig) -> Self {
            let ledger = Ledger::new(&policy);
            Self {
                host: InMemoryHost::new(),
                policy,
                ledger,
                events: EventEmitter::noop(),
                now: Instant::now(),
            }
        }

        fn gate(&mut self) -> EventGate<'_> {
            EventGate::new(
                &mut self.ledger,
                &self.policy,
                &self.host,
                &self.events,
                self.now,
            )
        }

        fn advance(&mut self, by: Duration) {
            self.now += by;
        }
    }

    fn with_punishment(punishment: Punishment) -> PolicyConfig {
        PolicyConfig {
            logout: LogoutPolicy {
                punishment,
                broadcast: Some("%nickname% fled".to_owned()),
                ..LogoutPolicy::default()
            },
            ..PolicyConfig::default()
        }
    }

    #[test]
    fn combat_puts_both_sides_in_cooldown() {
        let mut fx = Fixture::new(PolicyConfig::default());
        let a = fx.host.add_participant("a", 20.0, false);
        let b = fx.host.add_participant("b", 20.0, false);

        fx.gate().on_combat(a, b);

        let now = fx.now;
        for p in [a, b] {
            assert!(fx.ledger.store.is_active(p, now));
            assert_eq!(
                fx.ledger.store.remaining(p, now),
                Some(Duration::from_secs(10))
            );
            assert!(fx.ledger.indicators.contains(p));
            assert_eq!(fx.host.messages_for(p), vec![fx.policy.messages.cooldown_start.clone()]);
        }
    }

    #[test]
    fn repeated_combat_sends_one_start_notice() {
        let mut fx = Fixture::new(PolicyConfig::default());
        let a = fx.host.add_participant("a", 20.0, false);
        let b = fx.host.add_participant("b", 20.0, false);

        fx.gate().on_combat(a, b);
        fx.advance(Duration::from_secs(4));
        fx.gate().on_combat(b, a);

        assert_eq!(fx.host.messages_for(a).len(), 1);
        assert_eq!(
            fx.ledger.store.remaining(a, fx.now),
            Some(Duration::from_secs(10))
        );
        assert_eq!(fx.host.live_indicator_count(), 2);
    }

    #[test]
    fn self_damage_is_ignored() {
        let mut fx = Fixture::new(PolicyConfig::default());
        let a = fx.host.add_participant("a", 20.0, false);
        fx.gate().on_combat(a, a);
        assert!(fx.ledger.store.is_empty());
    }

    #[test]
    fn combat_with_offline_side_is_ignored() {
        let mut fx = Fixture::new(PolicyConfig::default());
        let a = fx.host.add_participant("a", 20.0, false);
        let gone = fx.host.add_participant("gone", 20.0, false);
        fx.host.set_connected(gone, false);

        fx.gate().on_combat(a, gone);
        fx.gate().on_combat(gone, a);

        assert!(fx.ledger.store.is_empty());
        assert!(fx.ledger.indicators.is_empty());
        assert!(fx.host.journal().is_empty());
    }

    #[test]
    fn bypass_holder_never_enters_cooldown() {
        let mut fx = Fixture::new(PolicyConfig::default());
        let admin = fx.host.add_participant("admin", 20.0, true);
        let b = fx.host.add_participant("b", 20.0, false);

        fx.gate().on_combat(admin, b);

        assert!(!fx.ledger.store.is_active(admin, fx.now));
        assert!(fx.ledger.store.is_active(b, fx.now));
        assert!(!fx.ledger.indicators.contains(admin));
    }

    #[test]
    fn disabled_indicator_creates_none() {
        let mut policy = PolicyConfig::default();
        policy.indicator.enabled = false;
        let mut fx = Fixture::new(policy);
        let a = fx.host.add_participant("a", 20.0, false);
        let b = fx.host.add_participant("b", 20.0, false);

        fx.gate().on_combat(a, b);

        assert!(fx.ledger.indicators.is_empty());
        assert_eq!(fx.host.live_indicator_count(), 0);
    }

    #[test]
    fn commands_blocked_unless_whitelisted() {
        let policy = PolicyConfig {
            commands: CommandPolicy {
                whitelist: ["msg".to_owned()].into_iter().collect(),
                ..CommandPolicy::default()
            },
            ..PolicyConfig::default()
        };
        let mut fx = Fixture::new(policy);
        let a = fx.host.add_participant("a", 20.0, false);
        let b = fx.host.add_participant("b", 20.0, false);

        assert_eq!(fx.gate().on_command(a, "/spawn"), CommandVerdict::Allow);

        fx.gate().on_combat(a, b);
        fx.host.drain_journal();

        assert_eq!(fx.gate().on_command(a, "/spawn"), CommandVerdict::Block);
        assert_eq!(fx.gate().on_command(a, "/MSG b hello"), CommandVerdict::Allow);
        assert_eq!(
            fx.host.messages_for(a),
            vec![fx.policy.commands.blocked_message.clone()]
        );
    }

    #[test]
    fn commands_allowed_when_blocking_disabled_or_exempt() {
        let mut policy = PolicyConfig::default();
        policy.commands.enabled = false;
        let mut fx = Fixture::new(policy);
        let a = fx.host.add_participant("a", 20.0, false);
        let b = fx.host.add_participant("b", 20.0, false);
        fx.gate().on_combat(a, b);
        assert_eq!(fx.gate().on_command(a, "/home"), CommandVerdict::Allow);

        let mut fx = Fixture::new(PolicyConfig::default());
        let a = fx.host.add_participant("a", 20.0, false);
        let b = fx.host.add_participant("b", 20.0, false);
        fx.gate().on_combat(a, b);
        fx.host.set_bypass(a, true);
        assert_eq!(fx.gate().on_command(a, "/home"), CommandVerdict::Allow);
    }

    #[test]
    fn commands_allowed_after_expiry() {
        let mut fx = Fixture::new(PolicyConfig::default());
        let a = fx.host.add_participant("a", 20.0, false);
        let b = fx.host.add_participant("b", 20.0, false);
        fx.gate().on_combat(a, b);
        fx.advance(Duration::from_secs(10));
        assert_eq!(fx.gate().on_command(a, "/home"), CommandVerdict::Allow);
    }

    #[test]
    fn kill_on_disconnect() {
        let mut fx = Fixture::new(with_punishment(Punishment::Kill));
        let a = fx.host.add_participant("alice", 20.0, false);
        let b = fx.host.add_participant("bob", 20.0, false);
        fx.gate().on_combat(a, b);
        fx.host.drain_journal();

        let outcome = fx.gate().on_disconnect(a);

        assert_eq!(
            outcome,
            DisconnectOutcome::Penalized {
                punishment: Punishment::Kill,
                health_before: Some(20.0),
                health_after: Some(0.0),
            }
        );
        assert!(!fx.ledger.store.is_active(a, fx.now));
        assert!(!fx.ledger.indicators.contains(a));
        assert_eq!(
            fx.host.journal(),
            vec![
                HostRecord::Message {
                    to: a,
                    text: fx.policy.logout.message.clone(),
                },
                HostRecord::HealthChanged {
                    participant: a,
                    from: 20.0,
                    to: 0.0,
                },
                HostRecord::IndicatorRemoved { participant: a },
                HostRecord::Broadcast {
                    except: a,
                    text: "alice fled".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn damage_on_disconnect() {
        let mut fx = Fixture::new(with_punishment(Punishment::Damage(6.0)));
        let a = fx.host.add_participant("a", 20.0, false);
        let b = fx.host.add_participant("b", 4.0, false);
        fx.gate().on_combat(a, b);

        fx.gate().on_disconnect(a);
        fx.gate().on_disconnect(b);

        assert_eq!(fx.host.participant(a).unwrap().health, 14.0);
        assert_eq!(fx.host.participant(b).unwrap().health, 0.0);
        assert!(fx.ledger.store.is_empty());
    }

    #[test]
    fn none_punishment_keeps_health() {
        let mut fx = Fixture::new(with_punishment(Punishment::None));
        let a = fx.host.add_participant("a", 20.0, false);
        let b = fx.host.add_participant("b", 20.0, false);
        fx.gate().on_combat(a, b);

        let outcome = fx.gate().on_disconnect(a);

        assert!(matches!(outcome, DisconnectOutcome::Penalized { health_after: None, .. }));
        assert_eq!(fx.host.participant(a).unwrap().health, 20.0);
        assert!(!fx.ledger.store.is_active(a, fx.now));
    }

    #[test]
    fn disconnect_outside_combat_is_harmless() {
        let mut fx = Fixture::new(PolicyConfig::default());
        let a = fx.host.add_participant("a", 20.0, false);
        assert_eq!(fx.gate().on_disconnect(a), DisconnectOutcome::NotInCombat);
        assert!(fx.host.journal().is_empty());
    }

    #[test]
    fn disconnect_ignored_when_prevention_disabled() {
        let mut policy = PolicyConfig::default();
        policy.logout.enabled = false;
        let mut fx = Fixture::new(policy);
        let a = fx.host.add_participant("a", 20.0, false);
        let b = fx.host.add_participant("b", 20.0, false);
        fx.gate().on_combat(a, b);

        assert_eq!(fx.gate().on_disconnect(a), DisconnectOutcome::Ignored);
        assert!(fx.ledger.store.is_active(a, fx.now));
        assert_eq!(fx.host.participant(a).unwrap().health, 20.0);
    }

    #[test]
    fn exempt_disconnect_is_silent() {
        let mut fx = Fixture::new(PolicyConfig::default());
        let a = fx.host.add_participant("a", 20.0, false);
        let b = fx.host.add_participant("b", 20.0, false);
        fx.gate().on_combat(a, b);
        fx.host.set_bypass(a, true);
        fx.host.drain_journal();

        assert_eq!(fx.gate().on_disconnect(a), DisconnectOutcome::Exempt);
        assert!(!fx.ledger.store.is_active(a, fx.now));
        assert_eq!(
            fx.host.journal(),
            vec![HostRecord::IndicatorRemoved { participant: a }]
        );
        assert_eq!(fx.host.participant(a).unwrap().health, 20.0);

        // never in cooldown: still exempt, still silent
        let admin = fx.host.add_participant("admin", 20.0, true);
        assert_eq!(fx.gate().on_disconnect(admin), DisconnectOutcome::Exempt);
    }

    #[test]
    fn end_cooldown_is_idempotent() {
        let mut fx = Fixture::new(PolicyConfig::default());
        let a = fx.host.add_participant("a", 20.0, false);
        let b = fx.host.add_participant("b", 20.0, false);
        fx.gate().on_combat(a, b);
        fx.host.drain_journal();

        assert!(fx.gate().end_cooldown(a, EndReason::Expired));
        assert!(!fx.gate().end_cooldown(a, EndReason::Expired));

        assert_eq!(
            fx.host.journal(),
            vec![
                HostRecord::IndicatorRemoved { participant: a },
                HostRecord::Message {
                    to: a,
                    text: fx.policy.messages.cooldown_end.clone(),
                },
            ]
        );
    }

    #[test]
    fn silent_reasons_send_no_end_notice() {
        let mut fx = Fixture::new(PolicyConfig::default());
        let a = fx.host.add_participant("a", 20.0, false);
        let b = fx.host.add_participant("b", 20.0, false);
        fx.gate().on_combat(a, b);
        fx.host.drain_journal();

        fx.gate().end_cooldown(a, EndReason::Disconnected);
        fx.gate().end_cooldown(b, EndReason::Collected);

        assert!(fx.host.messages_for(a).is_empty());
        assert!(fx.host.messages_for(b).is_empty());
    }

    #[test]
    fn empty_messages_are_not_sent() {
        let mut policy = PolicyConfig::default();
        policy.messages.cooldown_start = String::new();
        let mut fx = Fixture::new(policy);
        let a = fx.host.add_participant("a", 20.0, false);
        let b = fx.host.add_participant("b", 20.0, false);
        fx.gate().on_combat(a, b);
        assert!(fx.host.messages_for(a).is_empty());
    }
}
