//! Built-in scenarios
//!
//! Example scenarios embedded in the binary at compile time, so
//! `pvp-cooldown simulate --scenario duel` works without any files.

use std::sync::LazyLock;

/// A scenario shipped with the binary.
#[derive(Debug)]
pub struct BuiltinScenario {
    /// Unique identifier (kebab-case).
    pub name: &'static str,

    /// Short human-readable description.
    pub description: &'static str,

    /// Raw YAML content.
    pub yaml: &'static str,
}

static BUILTIN_SCENARIOS: LazyLock<Vec<BuiltinScenario>> = LazyLock::new(|| {
    vec![
        BuiltinScenario {
            name: "duel",
            description: "One exchange of blows; both cooldowns expire together",
            yaml: include_str!("../../scenarios/duel.yaml"),
        },
        BuiltinScenario {
            name: "combat-log",
            description: "Blocked command, whitelisted command, punished disconnect",
            yaml: include_str!("../../scenarios/combat-log.yaml"),
        },
        BuiltinScenario {
            name: "skirmish",
            description: "Repeated hits reset the timer; damage penalty on leave",
            yaml: include_str!("../../scenarios/skirmish.yaml"),
        },
        BuiltinScenario {
            name: "staff-bypass",
            description: "Bypass holder is never restricted or punished",
            yaml: include_str!("../../scenarios/staff-bypass.yaml"),
        },
        BuiltinScenario {
            name: "quiet-mode",
            description: "Indicators and penalties off; stale state is collected",
            yaml: include_str!("../../scenarios/quiet-mode.yaml"),
        },
    ]
});

/// Looks up a built-in scenario by exact name.
#[must_use]
pub fn find_scenario(name: &str) -> Option<&'static BuiltinScenario> {
    BUILTIN_SCENARIOS.iter().find(|s| s.name == name)
}

/// Returns all built-in scenario names in registry order.
#[must_use]
pub fn list_scenario_names() -> Vec<&'static str> {
    BUILTIN_SCENARIOS.iter().map(|s| s.name).collect()
}

/// Suggests the closest built-in name for a typo.
///
/// Only names within a Damerau-Levenshtein distance of 3 are suggested.
#[must_use]
pub fn suggest_scenario(input: &str) -> Option<&'static str> {
    BUILTIN_SCENARIOS
        .iter()
        .map(|s| (s.name, strsim::damerau_levenshtein(input, s.name)))
        .filter(|(_, dist)| *dist <= 3)
        .min_by_key(|(_, dist)| *dist)
        .map(|(name, _)| name)
}
