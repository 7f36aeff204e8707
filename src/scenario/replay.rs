//! Scenario replay
//!
//! Runs a resolved scenario against an [`InMemoryHost`]. [`replay`] uses a
//! [`ManualClock`] and ticks every `tick_interval` of virtual time; a tick due
//! at the same instant as a step runs before the step. [`replay_realtime`]
//! runs on the wall clock with the tracker's background reconciler.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{Plan, PlannedEvent, PlannedStep, Scenario};
use crate::clock::ManualClock;
use crate::config::PolicyConfig;
use crate::cooldown::{CombatTracker, TickReport};
use crate::error::ScenarioError;
use crate::host::{HostRecord, InMemoryHost, ParticipantId, Presence};
use crate::observability::EventEmitter;

// ============================================================================
// Transcript
// ============================================================================

/// Something observable that happened during a replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranscriptEvent {
    /// Scripted combat.
    Combat {
        /// Damage dealer.
        attacker: String,
        /// Damage receiver.
        victim: String,
    },
    /// Scripted command and its verdict.
    Command {
        /// Sender.
        participant: String,
        /// Raw command text.
        text: String,
        /// Whether the command was cancelled.
        blocked: bool,
    },
    /// Scripted disconnect and what the policy did about it.
    Disconnect {
        /// Leaver.
        participant: String,
        /// Outcome label.
        outcome: &'static str,
    },
    /// Scripted reconnect.
    Connect {
        /// Joiner.
        participant: String,
    },
    /// Direct message delivered by the host.
    Message {
        /// Recipient.
        to: String,
        /// Message text.
        text: String,
    },
    /// Broadcast delivered by the host.
    Broadcast {
        /// Excluded participant.
        except: String,
        /// Message text.
        text: String,
    },
    /// Health changed by a penalty.
    HealthChanged {
        /// Target.
        participant: String,
        /// Health before.
        from: f64,
        /// Health after.
        to: f64,
    },
    /// Indicator attached.
    IndicatorShown {
        /// Owner.
        participant: String,
        /// Initial title.
        title: String,
    },
    /// Indicator destroyed.
    IndicatorRemoved {
        /// Owner.
        participant: String,
    },
    /// A reconciler tick ended cooldowns.
    CooldownsEnded {
        /// Ran out.
        expired: Vec<String>,
        /// Owner disconnected.
        disconnected: Vec<String>,
        /// Swept as stale.
        collected: Vec<String>,
    },
}

/// A transcript line stamped with its virtual time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    /// Milliseconds since the scenario start.
    pub at_ms: u64,

    /// What happened.
    #[serde(flatten)]
    pub event: TranscriptEvent,
}

impl fmt::Display for TranscriptEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>3}.{:03}s] ", self.at_ms / 1000, self.at_ms % 1000)?;
        match &self.event {
            TranscriptEvent::Combat { attacker, victim } => write!(f, "{attacker} hits {victim}"),
            TranscriptEvent::Command {
                participant,
                text,
                blocked,
            } => {
                let verdict = if *blocked { "blocked" } else { "allowed" };
                write!(f, "{participant} runs `{text}`: {verdict}")
            }
            TranscriptEvent::Disconnect {
                participant,
                outcome,
            } => write!(f, "{participant} disconnects ({outcome})"),
            TranscriptEvent::Connect { participant } => write!(f, "{participant} connects"),
            TranscriptEvent::Message { to, text } => write!(f, "  -> {to}: {text}"),
            TranscriptEvent::Broadcast { except, text } => {
                write!(f, "  -> everyone but {except}: {text}")
            }
            TranscriptEvent::HealthChanged {
                participant,
                from,
                to,
            } => write!(f, "  {participant} health {from} -> {to}"),
            TranscriptEvent::IndicatorShown { participant, title } => {
                write!(f, "  indicator shown for {participant}: {title}")
            }
            TranscriptEvent::IndicatorRemoved { participant } => {
                write!(f, "  indicator removed for {participant}")
            }
            TranscriptEvent::CooldownsEnded {
                expired,
                disconnected,
                collected,
            } => {
                write!(f, "cooldowns ended")?;
                for (label, names) in [
                    ("expired", expired),
                    ("disconnected", disconnected),
                    ("collected", collected),
                ] {
                    if !names.is_empty() {
                        write!(f, " {label}=[{}]", names.join(", "))?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// Final state of one participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantSummary {
    /// Display name.
    pub name: String,
    /// Health at the end of the run.
    pub health: f64,
    /// Online at the end of the run.
    pub connected: bool,
    /// Still in cooldown when the run ended (before shutdown).
    pub in_cooldown: bool,
}

/// Result of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Everything that happened, in order.
    pub transcript: Vec<TranscriptEntry>,
    /// Participant states, in declaration order.
    pub participants: Vec<ParticipantSummary>,
    /// Reconciler ticks executed (estimated from elapsed time in real-time
    /// runs).
    pub ticks: u64,
    /// Virtual time covered, in milliseconds.
    pub duration_ms: u64,
}

impl SimulationReport {
    /// Transcript events without their timestamps.
    pub fn events(&self) -> impl Iterator<Item = &TranscriptEvent> {
        self.transcript.iter().map(|entry| &entry.event)
    }

    /// Messages delivered to `name`, in order.
    #[must_use]
    pub fn messages_to(&self, name: &str) -> Vec<&str> {
        self.events()
            .filter_map(|event| match event {
                TranscriptEvent::Message { to, text } if to == name => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Final state of `name`.
    #[must_use]
    pub fn participant(&self, name: &str) -> Option<&ParticipantSummary> {
        self.participants.iter().find(|p| p.name == name)
    }
}

// ============================================================================
// Replay
// ============================================================================

/// Replays `scenario` under `policy`, emitting tracker events to `events`.
///
/// Without an explicit `until`, the run continues for one cooldown plus one
/// tick after the last step so every cooldown can expire.
///
/// # Errors
///
/// Returns a [`ScenarioError`] if the scenario does not resolve.
pub fn replay(
    scenario: &Scenario,
    policy: Arc<PolicyConfig>,
    events: Arc<EventEmitter>,
) -> Result<SimulationReport, ScenarioError> {
    let host = Arc::new(InMemoryHost::new());
    let interval = policy.tick_interval;
    let plan = scenario.resolve(&host, policy.cooldown.saturating_add(interval))?;

    let clock = Arc::new(ManualClock::new());
    let tracker = CombatTracker::new(policy, host.clone())
        .with_clock(clock.clone())
        .with_events(events);

    let mut run = Run {
        plan: &plan,
        host: &host,
        clock: Some(&clock),
        tracker: &tracker,
        interval,
        next_tick: interval,
        ticks: 0,
        transcript: Vec::new(),
    };

    for step in &plan.steps {
        run.tick_through(step.at);
        clock.set_elapsed(step.at);
        run.apply(step);
    }
    run.tick_through(plan.until);
    clock.set_elapsed(plan.until);

    let participants = run.summaries(scenario);
    tracker.stop();
    run.drain(plan.until);

    tracing::info!(
        ticks = run.ticks,
        entries = run.transcript.len(),
        "scenario replay finished"
    );
    Ok(SimulationReport {
        transcript: run.transcript,
        participants,
        ticks: run.ticks,
        duration_ms: millis(plan.until),
    })
}

/// Replays `scenario` in wall-clock time.
///
/// The tracker runs on the system clock and its background task does the
/// ticking, so the transcript has no `cooldowns_ended` lines and host output
/// is stamped when it is collected, once per `tick_interval`. Cancelling
/// `cancel` cuts the run short; the report then covers the time elapsed.
///
/// # Errors
///
/// Returns a [`ScenarioError`] if the scenario does not resolve.
pub async fn replay_realtime(
    scenario: &Scenario,
    policy: Arc<PolicyConfig>,
    events: Arc<EventEmitter>,
    cancel: CancellationToken,
) -> Result<SimulationReport, ScenarioError> {
    let host = Arc::new(InMemoryHost::new());
    let interval = policy.tick_interval;
    let plan = scenario.resolve(&host, policy.cooldown.saturating_add(interval))?;

    let tracker = Arc::new(CombatTracker::new(policy, host.clone()).with_events(events));
    let handle = tracker.start();
    let origin = Instant::now();

    let mut run = Run {
        plan: &plan,
        host: &host,
        clock: None,
        tracker: &tracker,
        interval,
        next_tick: interval,
        ticks: 0,
        transcript: Vec::new(),
    };

    let mut completed = true;
    for step in &plan.steps {
        if !run.wait_until(origin, step.at, &cancel).await {
            completed = false;
            break;
        }
        run.apply(step);
    }
    if completed {
        completed = run.wait_until(origin, plan.until, &cancel).await;
    }
    let elapsed = if completed {
        plan.until
    } else {
        tracing::info!("real-time replay cancelled");
        origin.elapsed().min(plan.until)
    };

    let participants = run.summaries(scenario);
    tracker.stop();
    if let Err(e) = handle.await {
        tracing::warn!(error = %e, "reconciler task failed");
    }
    run.drain(elapsed);

    let ticks = u64::try_from(elapsed.as_nanos() / interval.as_nanos().max(1)).unwrap_or(u64::MAX);
    tracing::info!(
        ticks,
        entries = run.transcript.len(),
        "real-time replay finished"
    );
    Ok(SimulationReport {
        transcript: run.transcript,
        participants,
        ticks,
        duration_ms: millis(elapsed),
    })
}

struct Run<'a> {
    plan: &'a Plan,
    host: &'a InMemoryHost,
    clock: Option<&'a ManualClock>,
    tracker: &'a CombatTracker,
    interval: Duration,
    next_tick: Duration,
    ticks: u64,
    transcript: Vec<TranscriptEntry>,
}

impl Run<'_> {
    /// Runs every tick due at or before `until`.
    fn tick_through(&mut self, until: Duration) {
        let Some(clock) = self.clock else {
            return;
        };
        while self.next_tick <= until {
            let at = self.next_tick;
            clock.set_elapsed(at);
            let report = self.tracker.tick();
            self.ticks += 1;
            self.drain(at);
            if !report.is_empty() {
                let event = self.ended(&report);
                self.push(at, event);
            }
            self.next_tick += self.interval;
        }
    }

    /// Sleeps until `target` past `origin`, collecting host output once per
    /// interval. Returns `false` if cancelled first.
    async fn wait_until(
        &mut self,
        origin: Instant,
        target: Duration,
        cancel: &CancellationToken,
    ) -> bool {
        loop {
            let elapsed = origin.elapsed();
            if elapsed >= target {
                return true;
            }
            let slice = (target - elapsed).min(self.interval);
            tokio::select! {
                () = cancel.cancelled() => return false,
                () = tokio::time::sleep(slice) => {}
            }
            self.drain(origin.elapsed().min(target));
        }
    }

    fn apply(&mut self, step: &PlannedStep) {
        let event = match &step.event {
            PlannedEvent::Combat { attacker, victim } => {
                self.tracker.on_combat(*attacker, *victim);
                TranscriptEvent::Combat {
                    attacker: self.name(*attacker),
                    victim: self.name(*victim),
                }
            }
            PlannedEvent::Command { participant, text } => {
                let verdict = self.tracker.on_command(*participant, text);
                TranscriptEvent::Command {
                    participant: self.name(*participant),
                    text: text.clone(),
                    blocked: verdict.is_blocked(),
                }
            }
            PlannedEvent::Disconnect(participant) => {
                let outcome = self.tracker.on_disconnect(*participant);
                self.host.set_connected(*participant, false);
                TranscriptEvent::Disconnect {
                    participant: self.name(*participant),
                    outcome: outcome.label(),
                }
            }
            PlannedEvent::Connect(participant) => {
                self.host.set_connected(*participant, true);
                TranscriptEvent::Connect {
                    participant: self.name(*participant),
                }
            }
        };
        self.push(step.at, event);
        self.drain(step.at);
    }

    /// Moves the host journal into the transcript.
    fn drain(&mut self, at: Duration) {
        for record in self.host.drain_journal() {
            let event = match record {
                HostRecord::Message { to, text } => TranscriptEvent::Message {
                    to: self.name(to),
                    text,
                },
                HostRecord::Broadcast { except, text } => TranscriptEvent::Broadcast {
                    except: self.name(except),
                    text,
                },
                HostRecord::HealthChanged {
                    participant,
                    from,
                    to,
                } => TranscriptEvent::HealthChanged {
                    participant: self.name(participant),
                    from,
                    to,
                },
                HostRecord::IndicatorShown { participant, title } => {
                    TranscriptEvent::IndicatorShown {
                        participant: self.name(participant),
                        title,
                    }
                }
                HostRecord::IndicatorRemoved { participant } => TranscriptEvent::IndicatorRemoved {
                    participant: self.name(participant),
                },
            };
            self.push(at, event);
        }
    }

    fn ended(&self, report: &TickReport) -> TranscriptEvent {
        let names = |ids: &[ParticipantId]| ids.iter().map(|id| self.name(*id)).collect();
        TranscriptEvent::CooldownsEnded {
            expired: names(report.expired.as_slice()),
            disconnected: names(report.disconnected.as_slice()),
            collected: names(report.collected.as_slice()),
        }
    }

    fn summaries(&self, scenario: &Scenario) -> Vec<ParticipantSummary> {
        let ids: HashMap<&str, ParticipantId> = self
            .plan
            .names
            .iter()
            .map(|(id, name)| (name.as_str(), *id))
            .collect();
        scenario
            .participants
            .iter()
            .filter_map(|spec| {
                let id = *ids.get(spec.name.as_str())?;
                let record = self.host.participant(id)?;
                Some(ParticipantSummary {
                    name: record.name,
                    health: record.health,
                    connected: self.host.is_connected(id),
                    in_cooldown: self.tracker.is_active(id),
                })
            })
            .collect()
    }

    fn push(&mut self, at: Duration, event: TranscriptEvent) {
        self.transcript.push(TranscriptEntry {
            at_ms: millis(at),
            event,
        });
    }

    fn name(&self, id: ParticipantId) -> String {
        self.plan
            .names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(yaml: &str, policy: PolicyConfig) -> SimulationReport {
        let scenario = Scenario::from_yaml(yaml).unwrap();
        replay(&scenario, Arc::new(policy), Arc::new(EventEmitter::noop())).unwrap()
    }

    fn five_seconds() -> PolicyConfig {
        PolicyConfig {
            cooldown: Duration::from_secs(5),
            ..PolicyConfig::default()
        }
    }

    const DUEL: &str = "
participants: [{name: a}, {name: b}]
steps:
  - at: 0s
    combat: {attacker: a, victim: b}
";

    #[test]
    fn duel_expires_at_five_seconds() {
        let report = run(DUEL, five_seconds());

        let ended: Vec<_> = report
            .transcript
            .iter()
            .filter(|e| matches!(e.event, TranscriptEvent::CooldownsEnded { .. }))
            .collect();
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].at_ms, 5_000);
        for name in ["a", "b"] {
            assert_eq!(
                report.messages_to(name),
                vec![
                    five_seconds().messages.cooldown_start.as_str(),
                    five_seconds().messages.cooldown_end.as_str(),
                ]
            );
            assert!(!report.participant(name).unwrap().in_cooldown);
        }
        assert_eq!(report.duration_ms, 6_000);
        assert_eq!(report.ticks, 6);
    }

    #[test]
    fn indicators_shown_and_removed_once_each() {
        let report = run(DUEL, five_seconds());
        let shown = report
            .events()
            .filter(|e| matches!(e, TranscriptEvent::IndicatorShown { .. }))
            .count();
        let removed = report
            .events()
            .filter(|e| matches!(e, TranscriptEvent::IndicatorRemoved { .. }))
            .count();
        assert_eq!(shown, 2);
        assert_eq!(removed, 2);
    }

    #[test]
    fn disconnect_penalty_shows_in_transcript() {
        let report = run(
            "
participants: [{name: a}, {name: b, health: 12}]
steps:
  - at: 0s
    combat: {attacker: a, victim: b}
  - at: 1s
    command: {participant: b, text: /home}
  - at: 2s
    disconnect: b
until: 3s
",
            PolicyConfig::default(),
        );

        assert!(report.events().any(|e| matches!(
            e,
            TranscriptEvent::Command { blocked: true, .. }
        )));
        assert!(report.events().any(|e| matches!(
            e,
            TranscriptEvent::Disconnect { outcome: "penalized", .. }
        )));
        let b = report.participant("b").unwrap();
        assert!((b.health - 0.0).abs() < f64::EPSILON);
        assert!(!b.connected);
        assert!(report.participant("a").unwrap().in_cooldown);
    }

    #[test]
    fn stop_removes_remaining_indicators_at_until() {
        let report = run(
            "
participants: [{name: a}, {name: b}]
steps:
  - at: 0s
    combat: {attacker: a, victim: b}
until: 2s
",
            PolicyConfig::default(),
        );
        let last = report.transcript.last().unwrap();
        assert_eq!(last.at_ms, 2_000);
        assert!(matches!(last.event, TranscriptEvent::IndicatorRemoved { .. }));
        assert_eq!(report.messages_to("a").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn realtime_replay_expires_through_background_task() {
        let scenario = Scenario::from_yaml(DUEL).unwrap();
        let report = replay_realtime(
            &scenario,
            Arc::new(five_seconds()),
            Arc::new(EventEmitter::noop()),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.duration_ms, 6_000);
        for name in ["a", "b"] {
            assert_eq!(
                report.messages_to(name).last(),
                Some(&five_seconds().messages.cooldown_end.as_str())
            );
            assert!(!report.participant(name).unwrap().in_cooldown);
        }
        assert!(
            !report
                .events()
                .any(|e| matches!(e, TranscriptEvent::CooldownsEnded { .. }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn realtime_replay_stops_on_cancel() {
        let scenario = Scenario::from_yaml(
            "
participants: [{name: a}, {name: b}]
steps:
  - at: 0s
    combat: {attacker: a, victim: b}
  - at: 30s
    connect: a
",
        )
        .unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            trigger.cancel();
        });

        let report = replay_realtime(
            &scenario,
            Arc::new(PolicyConfig::default()),
            Arc::new(EventEmitter::noop()),
            cancel,
        )
        .await
        .unwrap();

        assert!(report.duration_ms < 30_000);
        assert!(report.participant("a").unwrap().in_cooldown);
        assert!(
            !report
                .events()
                .any(|e| matches!(e, TranscriptEvent::Connect { .. }))
        );
    }

    #[test]
    fn transcript_lines_render() {
        let entry = TranscriptEntry {
            at_ms: 2_500,
            event: TranscriptEvent::Command {
                participant: "bob".into(),
                text: "/spawn".into(),
                blocked: true,
            },
        };
        assert_eq!(entry.to_string(), "[  2.500s] bob runs `/spawn`: blocked");

        let ended = TranscriptEntry {
            at_ms: 5_000,
            event: TranscriptEvent::CooldownsEnded {
                expired: vec!["a".into(), "b".into()],
                disconnected: vec![],
                collected: vec![],
            },
        };
        assert_eq!(ended.to_string(), "[  5.000s] cooldowns ended expired=[a, b]");
    }

    #[test]
    fn transcript_serializes_flat() {
        let entry = TranscriptEntry {
            at_ms: 10,
            event: TranscriptEvent::Connect {
                participant: "a".into(),
            },
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["kind"], "connect");
        assert_eq!(value["at_ms"], 10);
        assert_eq!(value["participant"], "a");
    }
}
