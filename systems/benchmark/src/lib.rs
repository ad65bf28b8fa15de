#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Side-by-side comparison of the planner's heuristics on a single track.

use std::{
    fmt,
    str::FromStr,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vector_racing_core::{CellCoord, DEFAULT_REQUIRED_LAPS};
use vector_racing_system_planner::{HeuristicKind, PlanError, Planner, DEFAULT_MAX_EXPANSIONS};
use vector_racing_world::track::Track;

/// Trials per heuristic when nothing else is configured.
pub const DEFAULT_TRIALS: u32 = 5;

/// Parameters shared by every heuristic in a benchmark run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Searches run per heuristic.
    pub trials: u32,
    /// Laps each search must complete.
    pub required_laps: u32,
    /// Expansion cap handed to every planner.
    pub max_expansions: usize,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
            required_laps: DEFAULT_REQUIRED_LAPS,
            max_expansions: DEFAULT_MAX_EXPANSIONS,
        }
    }
}

/// Reasons a benchmark cannot run at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum BenchmarkError {
    /// Zero trials were requested.
    #[error("a benchmark needs at least one trial")]
    NoTrials,
    /// Zero laps were requested.
    #[error("a benchmark needs at least one lap")]
    NoLaps,
}

/// Measurements gathered for one heuristic.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeuristicResult {
    /// Heuristic that was measured.
    pub kind: HeuristicKind,
    /// Searches attempted.
    pub trials: u32,
    /// Searches that produced a plan.
    pub successes: u32,
    /// Mean wall time per search, successful or not.
    pub mean_duration: Duration,
    /// Mean plan length over successful searches.
    pub mean_moves: Option<f64>,
    /// Mean states expanded over successful searches.
    pub mean_expansions: Option<f64>,
    /// Last failure observed, if any.
    pub last_error: Option<String>,
}

impl HeuristicResult {
    /// Fraction of trials that produced a plan.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.trials == 0 {
            return 0.0;
        }
        f64::from(self.successes) / f64::from(self.trials)
    }
}

/// Orderings offered for a finished report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    /// Fastest mean duration first.
    #[default]
    Time,
    /// Shortest mean plan first.
    Moves,
}

/// Rejection produced when parsing an unknown sort key.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown sort key `{0}`, expected `time` or `moves`")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "time" => Ok(Self::Time),
            "moves" => Ok(Self::Moves),
            other => Err(UnknownSortKey(other.to_owned())),
        }
    }
}

/// Results for every measured heuristic.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BenchmarkReport {
    /// Cell every search started from.
    pub start: CellCoord,
    /// One entry per heuristic, in measurement order until sorted.
    pub results: Vec<HeuristicResult>,
}

impl BenchmarkReport {
    /// Reorders the results by `key`.
    ///
    /// Heuristics without a single success always sort last.
    pub fn sort_by(&mut self, key: SortKey) {
        self.results.sort_by(|left, right| {
            let failed = (left.successes == 0).cmp(&(right.successes == 0));
            failed.then_with(|| match key {
                SortKey::Time => left.mean_duration.cmp(&right.mean_duration),
                SortKey::Moves => left
                    .mean_moves
                    .unwrap_or(f64::INFINITY)
                    .total_cmp(&right.mean_moves.unwrap_or(f64::INFINITY)),
            })
        });
    }

    /// Returns the report sorted by `key`.
    #[must_use]
    pub fn sorted(mut self, key: SortKey) -> Self {
        self.sort_by(key);
        self
    }

    /// Entry for `kind`, if it was measured.
    #[must_use]
    pub fn result(&self, kind: HeuristicKind) -> Option<&HeuristicResult> {
        self.results.iter().find(|result| result.kind == kind)
    }
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<22} {:>12} {:>9} {:>12} {:>8}",
            "heuristic", "mean time", "moves", "expansions", "success"
        )?;
        for result in &self.results {
            let moves = result
                .mean_moves
                .map_or_else(|| "-".to_owned(), |moves| format!("{moves:.1}"));
            let expansions = result
                .mean_expansions
                .map_or_else(|| "-".to_owned(), |expansions| format!("{expansions:.0}"));
            writeln!(
                f,
                "{:<22} {:>12} {:>9} {:>12} {:>7.0}%",
                result.kind.label(),
                format!("{:.3?}", result.mean_duration),
                moves,
                expansions,
                result.success_rate() * 100.0
            )?;
        }
        Ok(())
    }
}

/// Benchmarks every built-in heuristic from the track's first finish cell.
pub fn run(track: &Track, config: BenchmarkConfig) -> Result<BenchmarkReport, BenchmarkError> {
    run_kinds(track, config, &HeuristicKind::ALL)
}

/// Benchmarks the listed heuristics from the track's first finish cell.
pub fn run_kinds(
    track: &Track,
    config: BenchmarkConfig,
    kinds: &[HeuristicKind],
) -> Result<BenchmarkReport, BenchmarkError> {
    if config.trials == 0 {
        return Err(BenchmarkError::NoTrials);
    }
    if config.required_laps == 0 {
        return Err(BenchmarkError::NoLaps);
    }

    let start = track.finish_anchor();
    let results = kinds
        .iter()
        .map(|&kind| measure(track, start, kind, config))
        .collect();

    Ok(BenchmarkReport { start, results })
}

fn measure(
    track: &Track,
    start: CellCoord,
    kind: HeuristicKind,
    config: BenchmarkConfig,
) -> HeuristicResult {
    let planner = Planner::with_kind(kind).with_max_expansions(config.max_expansions);
    let mut elapsed = Duration::ZERO;
    let mut successes = 0_u32;
    let mut total_moves = 0_usize;
    let mut total_expansions = 0_usize;
    let mut last_error: Option<PlanError> = None;

    for _ in 0..config.trials {
        let started = Instant::now();
        let result = planner.plan(track, start, config.required_laps);
        elapsed += started.elapsed();

        match result {
            Ok(outcome) => {
                successes += 1;
                total_moves += outcome.plan.move_count();
                total_expansions += outcome.stats.expansions;
            }
            Err(error) => last_error = Some(error),
        }
    }

    let mean_over_successes = |total: usize| {
        (successes > 0).then(|| total as f64 / f64::from(successes))
    };
    let result = HeuristicResult {
        kind,
        trials: config.trials,
        successes,
        mean_duration: elapsed / config.trials,
        mean_moves: mean_over_successes(total_moves),
        mean_expansions: mean_over_successes(total_expansions),
        last_error: last_error.map(|error| error.to_string()),
    };

    tracing::info!(
        heuristic = kind.label(),
        successes,
        trials = config.trials,
        mean_duration = ?result.mean_duration,
        "heuristic measured"
    );
    result
}
