//! Scripted combat scenarios
//!
//! A scenario declares participants and a time-ordered list of host events.
//! [`replay`] drives a [`CombatTracker`](crate::cooldown::CombatTracker)
//! through them on a virtual clock and records what the host observed;
//! [`replay_realtime`] does the same on the wall clock.
//!
//! ```yaml
//! config:
//!   cooldown-duration-seconds: 5
//! participants:
//!   - name: alice
//!   - name: bob
//!     health: 12
//! steps:
//!   - at: 0s
//!     combat: { attacker: alice, victim: bob }
//!   - at: 2s
//!     command: { participant: bob, text: /spawn }
//!   - at: 3s
//!     disconnect: bob
//! until: 8s
//! ```

pub mod builtin;
pub mod replay;

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::schema::RawConfig;
use crate::error::{CooldownError, ScenarioError};
use crate::host::{InMemoryHost, ParticipantId};

pub use builtin::{BuiltinScenario, find_scenario, list_scenario_names, suggest_scenario};
pub use replay::{
    ParticipantSummary, SimulationReport, TranscriptEntry, TranscriptEvent, replay,
    replay_realtime,
};

/// Health given to participants that do not declare one.
pub const DEFAULT_HEALTH: f64 = 20.0;

// ============================================================================
// Schema
// ============================================================================

/// A scenario file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Policy used when no configuration file is given on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<RawConfig>,

    /// Participants present at the start.
    #[serde(default)]
    pub participants: Vec<ParticipantSpec>,

    /// Events, in chronological order.
    #[serde(default)]
    pub steps: Vec<Step>,

    /// Keep ticking until this offset (humantime, e.g. `"12s"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<String>,
}

/// A declared participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParticipantSpec {
    /// Unique display name.
    pub name: String,

    /// Starting health.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<f64>,

    /// Holds the bypass capability.
    #[serde(default)]
    pub bypass: bool,
}

/// One timed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Offset from the scenario start (humantime, e.g. `"1s 500ms"`).
    pub at: String,

    /// What happens.
    #[serde(flatten)]
    pub action: Action,
}

/// Event kinds a step can fire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// One participant damages another.
    Combat {
        /// Damage dealer.
        attacker: String,
        /// Damage receiver.
        victim: String,
    },
    /// A participant issues a command.
    Command {
        /// Sender.
        participant: String,
        /// Raw command text, e.g. `"/home"`.
        text: String,
    },
    /// A participant leaves.
    Disconnect(String),
    /// A participant (re)joins.
    Connect(String),
}

// ============================================================================
// Loading
// ============================================================================

impl Scenario {
    /// Parses a scenario document.
    ///
    /// # Errors
    ///
    /// Returns `CooldownError::Yaml` on malformed YAML or unknown keys.
    pub fn from_yaml(content: &str) -> Result<Self, CooldownError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        Ok(serde_yaml::from_str(content)?)
    }

    /// Reads and parses a scenario file.
    ///
    /// # Errors
    ///
    /// Returns `CooldownError::Io` if the file cannot be read, otherwise as
    /// [`from_yaml`](Self::from_yaml).
    pub fn from_file(path: &Path) -> Result<Self, CooldownError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Checks names, durations and ordering without running anything.
    ///
    /// # Errors
    ///
    /// Returns the first [`ScenarioError`] found.
    pub fn check(&self) -> Result<(), ScenarioError> {
        let host = InMemoryHost::new();
        self.resolve(&host, Duration::ZERO).map(|_| ())
    }

    /// Registers participants on `host` and resolves every step.
    ///
    /// `settle` is added after the last step when `until` is absent.
    pub(crate) fn resolve(
        &self,
        host: &InMemoryHost,
        settle: Duration,
    ) -> Result<Plan, ScenarioError> {
        let mut ids: HashMap<&str, ParticipantId> = HashMap::new();
        let mut names: HashMap<ParticipantId, String> = HashMap::new();
        for spec in &self.participants {
            if ids.contains_key(spec.name.as_str()) {
                return Err(ScenarioError::DuplicateParticipant(spec.name.clone()));
            }
            let id = host.add_participant(
                &spec.name,
                spec.health.unwrap_or(DEFAULT_HEALTH),
                spec.bypass,
            );
            ids.insert(spec.name.as_str(), id);
            names.insert(id, spec.name.clone());
        }

        let lookup = |name: &str, step: usize| {
            ids.get(name)
                .copied()
                .ok_or_else(|| ScenarioError::UnknownParticipant {
                    name: name.to_owned(),
                    step,
                })
        };

        let mut steps = Vec::with_capacity(self.steps.len());
        let mut previous = Duration::ZERO;
        for (index, step) in self.steps.iter().enumerate() {
            let at = parse_offset(&step.at, &format!("steps[{index}].at"))?;
            if at < previous {
                return Err(ScenarioError::OutOfOrder { step: index, at });
            }
            previous = at;

            let event = match &step.action {
                Action::Combat { attacker, victim } => PlannedEvent::Combat {
                    attacker: lookup(attacker, index)?,
                    victim: lookup(victim, index)?,
                },
                Action::Command { participant, text } => PlannedEvent::Command {
                    participant: lookup(participant, index)?,
                    text: text.clone(),
                },
                Action::Disconnect(name) => PlannedEvent::Disconnect(lookup(name, index)?),
                Action::Connect(name) => PlannedEvent::Connect(lookup(name, index)?),
            };
            steps.push(PlannedStep { at, event });
        }

        let until = match &self.until {
            Some(raw) => parse_offset(raw, "until")?.max(previous),
            None => previous.saturating_add(settle),
        };

        Ok(Plan {
            names,
            steps,
            until,
        })
    }
}

fn parse_offset(value: &str, location: &str) -> Result<Duration, ScenarioError> {
    let trimmed = value.trim();
    if trimmed == "0" {
        return Ok(Duration::ZERO);
    }
    humantime::parse_duration(trimmed).map_err(|e| ScenarioError::InvalidDuration {
        value: value.to_owned(),
        location: location.to_owned(),
        message: e.to_string(),
    })
}

/// A scenario with names resolved to host ids and offsets parsed.
#[derive(Debug)]
pub(crate) struct Plan {
    pub names: HashMap<ParticipantId, String>,
    pub steps: Vec<PlannedStep>,
    pub until: Duration,
}

#[derive(Debug)]
pub(crate) struct PlannedStep {
    pub at: Duration,
    pub event: PlannedEvent,
}

#[derive(Debug)]
pub(crate) enum PlannedEvent {
    Combat {
        attacker: ParticipantId,
        victim: ParticipantId,
    },
    Command {
        participant: ParticipantId,
        text: String,
    },
    Disconnect(ParticipantId),
    Connect(ParticipantId),
}
