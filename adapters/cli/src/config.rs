use std::{fs, path::Path};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use vector_racing_core::{Acceleration, DEFAULT_REQUIRED_LAPS};
use vector_racing_system_autopilot::{AutopilotConfig, DEFAULT_LOOKAHEAD_SEGMENTS};
use vector_racing_system_planner::{HeuristicKind, DEFAULT_MAX_EXPANSIONS};

/// Turn budget after which a headless race is abandoned.
pub(crate) const DEFAULT_MAX_TURNS: u64 = 10_000;

/// Policy steering the human seat in headless races.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum HumanPolicy {
    /// Heads for the next sub-goal one move at a time.
    #[default]
    Greedy,
    /// Stays put whenever it may.
    Parked,
}

/// Race settings loaded from a TOML file, overridable from the command line.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct RaceConfig {
    pub(crate) required_laps: u32,
    pub(crate) seed: u64,
    pub(crate) autopilot: bool,
    pub(crate) heuristic: HeuristicKind,
    pub(crate) max_expansions: usize,
    pub(crate) lookahead_segments: usize,
    pub(crate) max_turns: u64,
    pub(crate) human: HumanPolicy,
    /// Accelerations played by the human before its policy takes over.
    pub(crate) human_script: Vec<[i8; 2]>,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            required_laps: DEFAULT_REQUIRED_LAPS,
            seed: 0,
            autopilot: true,
            heuristic: HeuristicKind::default(),
            max_expansions: DEFAULT_MAX_EXPANSIONS,
            lookahead_segments: DEFAULT_LOOKAHEAD_SEGMENTS,
            max_turns: DEFAULT_MAX_TURNS,
            human: HumanPolicy::default(),
            human_script: Vec::new(),
        }
    }
}

impl RaceConfig {
    /// Reads the configuration file, or returns defaults when none is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            tracing::debug!("no configuration file given, using defaults");
            return Ok(Self::default());
        };

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration {}", path.display()))?;
        let config = Self::parse(&contents)
            .with_context(|| format!("failed to parse configuration {}", path.display()))?;
        tracing::info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Settings handed to the autopilot system.
    pub(crate) fn autopilot_config(&self) -> AutopilotConfig {
        AutopilotConfig {
            heuristic: self.heuristic,
            max_expansions: self.max_expansions,
            lookahead_segments: self.lookahead_segments,
        }
    }

    /// Scripted human accelerations, skipping entries outside the unit range.
    pub(crate) fn script(&self) -> Vec<Acceleration> {
        self.human_script
            .iter()
            .filter_map(|&[ddx, ddy]| {
                let acceleration = Acceleration::new(ddx, ddy);
                if acceleration.is_none() {
                    tracing::warn!(ddx, ddy, "ignoring scripted acceleration out of range");
                }
                acceleration
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = RaceConfig::parse("").expect("empty config parses");

        assert_eq!(config, RaceConfig::default());
        assert_eq!(config.max_turns, 10_000);
        assert_eq!(config.max_expansions, 2_000_000);
        assert!(config.autopilot);
    }

    #[test]
    fn file_values_override_defaults() {
        let config = RaceConfig::parse(
            r#"
            required_laps = 3
            seed = 42
            autopilot = false
            heuristic = "manhattan-to-finish"
            human = "parked"
            human_script = [[1, 0], [0, 1]]
            "#,
        )
        .expect("config parses");

        assert_eq!(config.required_laps, 3);
        assert_eq!(config.seed, 42);
        assert!(!config.autopilot);
        assert_eq!(config.heuristic, HeuristicKind::ManhattanToFinish);
        assert_eq!(config.human, HumanPolicy::Parked);
        assert_eq!(config.lookahead_segments, DEFAULT_LOOKAHEAD_SEGMENTS);
        assert_eq!(config.script().len(), 2);
    }

    #[test]
    fn unknown_heuristics_are_rejected() {
        assert!(RaceConfig::parse(r#"heuristic = "telepathy""#).is_err());
    }

    #[test]
    fn out_of_range_script_entries_are_dropped() {
        let config = RaceConfig {
            human_script: vec![[1, 1], [2, 0], [-1, 0]],
            ..RaceConfig::default()
        };

        assert_eq!(
            config.script(),
            vec![
                Acceleration::new(1, 1).expect("unit"),
                Acceleration::new(-1, 0).expect("unit"),
            ]
        );
    }

    #[test]
    fn autopilot_settings_follow_the_file() {
        let config = RaceConfig {
            heuristic: HeuristicKind::UniformCost,
            lookahead_segments: 4,
            ..RaceConfig::default()
        };

        let autopilot = config.autopilot_config();

        assert_eq!(autopilot.heuristic, HeuristicKind::UniformCost);
        assert_eq!(autopilot.lookahead_segments, 4);
    }
}
