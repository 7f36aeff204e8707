//! End-to-end behaviour of the tracker against the in-memory host.

use std::sync::Arc;
use std::time::Duration;

use pvp_cooldown::clock::ManualClock;
use pvp_cooldown::config::{ConfigLoader, PolicyConfig, Punishment};
use pvp_cooldown::cooldown::{CombatTracker, DisconnectOutcome};
use pvp_cooldown::host::{HostRecord, InMemoryHost, ParticipantId};
use pvp_cooldown::observability::EventEmitter;
use pvp_cooldown::scenario::{Scenario, TranscriptEvent, find_scenario, replay};

struct Session {
    host: Arc<InMemoryHost>,
    clock: Arc<ManualClock>,
    tracker: Arc<CombatTracker>,
}

impl Session {
    fn new(policy: PolicyConfig) -> Self {
        let host = Arc::new(InMemoryHost::new());
        let clock = Arc::new(ManualClock::new());
        let tracker = Arc::new(
            CombatTracker::new(Arc::new(policy), host.clone()).with_clock(clock.clone()),
        );
        Self {
            host,
            clock,
            tracker,
        }
    }

    fn join(&self, name: &str, health: f64) -> ParticipantId {
        self.host.add_participant(name, health, false)
    }

    fn advance(&self, ms: u64) {
        self.clock.advance(Duration::from_millis(ms));
    }
}

fn policy(yaml: &str) -> PolicyConfig {
    let result = tokio_test::assert_ok!(
        ConfigLoader::with_defaults().load_str(yaml, std::path::Path::new("<test>"))
    );
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    (*result.config).clone()
}

#[test]
fn five_second_fight_walkthrough() {
    let s = Session::new(policy("cooldown-duration-seconds: 5\n"));
    let alice = s.join("alice", 20.0);
    let bob = s.join("bob", 20.0);
    let defaults = PolicyConfig::default();

    s.tracker.on_combat(alice, bob);
    assert!(s.tracker.is_active(alice));
    assert!(s.tracker.is_active(bob));
    assert_eq!(
        s.host.indicator_for(bob).unwrap().title,
        "&cPvP Cooldown: &f5s remaining"
    );

    s.advance(1_200);
    s.tracker.tick();
    assert_eq!(
        s.host.indicator_for(bob).unwrap().title,
        "&cPvP Cooldown: &f4s remaining"
    );
    assert!(s.tracker.on_command(bob, "/home").is_blocked());

    // a second hit restarts the full cooldown without a second start notice
    s.tracker.on_combat(bob, alice);
    assert_eq!(s.tracker.remaining(alice), Some(Duration::from_secs(5)));

    s.advance(4_999);
    assert!(s.tracker.tick().is_empty());
    s.advance(1);
    assert_eq!(s.tracker.tick().expired.len(), 2);
    assert_eq!(s.host.live_indicator_count(), 0);
    assert!(!s.tracker.on_command(bob, "/home").is_blocked());

    assert_eq!(
        s.host.messages_for(alice),
        vec![
            defaults.messages.cooldown_start.clone(),
            defaults.messages.cooldown_end.clone(),
        ]
    );
    assert_eq!(
        s.host.messages_for(bob),
        vec![
            defaults.messages.cooldown_start.clone(),
            defaults.commands.blocked_message.clone(),
            defaults.messages.cooldown_end.clone(),
        ]
    );
}

#[test]
fn damage_penalty_with_broadcast() {
    let s = Session::new(policy(
        "logout-prevention:\n  punishment: DAMAGE\n  damage-amount: 6\n  broadcast-message:\n    enabled: true\n",
    ));
    let alice = s.join("alice", 20.0);
    let bob = s.join("bob", 15.0);
    let carol = s.join("carol", 20.0);

    s.tracker.on_combat(alice, bob);
    s.host.drain_journal();

    let outcome = s.tracker.on_disconnect(bob);
    assert_eq!(
        outcome,
        DisconnectOutcome::Penalized {
            punishment: Punishment::Damage(6.0),
            health_before: Some(15.0),
            health_after: Some(9.0),
        }
    );

    let journal = s.host.drain_journal();
    assert!(matches!(&journal[0], HostRecord::Message { to, .. } if *to == bob));
    assert_eq!(
        journal[1],
        HostRecord::HealthChanged {
            participant: bob,
            from: 15.0,
            to: 9.0,
        }
    );
    assert_eq!(journal[2], HostRecord::IndicatorRemoved { participant: bob });
    assert_eq!(
        journal[3],
        HostRecord::Broadcast {
            except: bob,
            text: "&ebob left the game during combat!".to_owned(),
        }
    );
    assert_eq!(journal.len(), 4);

    assert!(!s.tracker.is_active(bob));
    assert!(s.tracker.is_active(alice));
    assert!(s.host.messages_for(carol).is_empty());
}

#[test]
fn lethal_damage_floors_at_zero() {
    let s = Session::new(policy(
        "logout-prevention:\n  punishment: DAMAGE\n  damage-amount: 50\n",
    ));
    let alice = s.join("alice", 20.0);
    let bob = s.join("bob", 8.0);
    s.tracker.on_combat(alice, bob);

    let outcome = s.tracker.on_disconnect(bob);
    assert!(matches!(
        outcome,
        DisconnectOutcome::Penalized { health_after: Some(h), .. } if h == 0.0
    ));
    assert_eq!(s.host.participant(bob).unwrap().health, 0.0);
}

#[test]
fn punishment_none_warns_but_keeps_health() {
    let s = Session::new(policy("logout-prevention:\n  punishment: NONE\n"));
    let alice = s.join("alice", 20.0);
    let bob = s.join("bob", 20.0);
    s.tracker.on_combat(alice, bob);

    let outcome = s.tracker.on_disconnect(bob);
    assert!(matches!(
        outcome,
        DisconnectOutcome::Penalized {
            punishment: Punishment::None,
            health_after: None,
            ..
        }
    ));
    assert_eq!(s.host.participant(bob).unwrap().health, 20.0);
    assert_eq!(
        s.host.messages_for(bob).last(),
        Some(&PolicyConfig::default().logout.message)
    );
}

#[test]
fn bypass_holder_is_untouched() {
    let s = Session::new(PolicyConfig::default());
    let alice = s.join("alice", 20.0);
    let staff = s.host.add_participant("staff", 20.0, true);

    s.tracker.on_combat(staff, alice);
    assert!(!s.tracker.is_active(staff));
    assert!(s.tracker.is_active(alice));
    assert!(!s.tracker.on_command(staff, "/spawn").is_blocked());
    assert_eq!(s.tracker.on_disconnect(staff), DisconnectOutcome::Exempt);
    assert!(s.host.messages_for(staff).is_empty());
    assert_eq!(s.host.participant(staff).unwrap().health, 20.0);
}

#[test]
fn idle_disconnect_is_not_punished() {
    let s = Session::new(PolicyConfig::default());
    let alice = s.join("alice", 20.0);
    assert_eq!(
        s.tracker.on_disconnect(alice),
        DisconnectOutcome::NotInCombat
    );
    assert!(s.host.journal().is_empty());
}

#[test]
fn oversized_cooldown_falls_back_instead_of_overflowing() {
    let result = tokio_test::assert_ok!(ConfigLoader::with_defaults().load_str(
        "cooldown-duration-seconds: 9223372036854775807\n",
        std::path::Path::new("<test>"),
    ));
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.config.cooldown, Duration::from_secs(10));

    let s = Session::new((*result.config).clone());
    let alice = s.join("alice", 20.0);
    let bob = s.join("bob", 20.0);
    s.tracker.on_combat(alice, bob);
    assert_eq!(s.tracker.remaining(bob), Some(Duration::from_secs(10)));
}

#[test]
fn huge_cooldown_built_in_code_stays_active() {
    let s = Session::new(PolicyConfig {
        cooldown: Duration::MAX,
        ..PolicyConfig::default()
    });
    let alice = s.join("alice", 20.0);
    let bob = s.join("bob", 20.0);

    s.tracker.on_combat(alice, bob);
    s.advance(86_400_000);
    assert!(s.tracker.tick().is_empty());
    assert!(s.tracker.is_active(alice));
}

#[test]
fn combat_after_stop_leaves_nothing_behind() {
    let s = Session::new(PolicyConfig::default());
    let alice = s.join("alice", 20.0);
    let bob = s.join("bob", 20.0);

    s.tracker.stop();
    s.tracker.on_combat(alice, bob);
    s.tracker.stop();

    assert_eq!(s.tracker.active_count(), 0);
    assert_eq!(s.host.live_indicator_count(), 0);
    assert!(s.host.messages_for(alice).is_empty());
}

#[test]
fn stop_leaves_no_indicators() {
    let s = Session::new(PolicyConfig::default());
    let alice = s.join("alice", 20.0);
    let bob = s.join("bob", 20.0);
    s.tracker.on_combat(alice, bob);
    assert_eq!(s.host.live_indicator_count(), 2);

    s.tracker.stop();
    assert_eq!(s.host.live_indicator_count(), 0);
    assert_eq!(s.tracker.active_count(), 0);
}

#[test]
fn builtin_combat_log_replay() {
    let builtin = find_scenario("combat-log").unwrap();
    let scenario = Scenario::from_yaml(builtin.yaml).unwrap();
    let raw = scenario.config.clone().unwrap();
    let loaded = ConfigLoader::with_defaults().resolve(&raw).unwrap();

    let report = replay(&scenario, loaded.config, Arc::new(EventEmitter::noop())).unwrap();

    let commands: Vec<bool> = report
        .events()
        .filter_map(|e| match e {
            TranscriptEvent::Command { blocked, .. } => Some(*blocked),
            _ => None,
        })
        .collect();
    assert_eq!(commands, vec![true, false]);

    let bob = report.participant("bob").unwrap();
    assert_eq!(bob.health, 0.0);
    assert!(!bob.connected);

    let alice = report.participant("alice").unwrap();
    assert!(!alice.in_cooldown);
    assert!(report.messages_to("carol").is_empty());
    assert!(report.events().any(|e| matches!(
        e,
        TranscriptEvent::Broadcast { except, .. } if except == "bob"
    )));
}
