//! Interchangeable cost-to-go estimates used to order the search frontier.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vector_racing_core::{CellCoord, Centroid};

/// Targets available to a heuristic when scoring a cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubGoal {
    /// Centroid of the next unmet requirement.
    pub target: Centroid,
    /// First start/finish cell of the track.
    pub finish_anchor: CellCoord,
}

/// Strategy that estimates the remaining cost from a cell.
pub trait Heuristic {
    /// Short human-readable name.
    fn name(&self) -> &str;

    /// Estimated remaining cost from `cell` given the current sub-goal.
    fn estimate(&self, cell: CellCoord, goal: &SubGoal) -> f64;
}

/// Distance metric applied between a cell and an anchor point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Sum of the axis distances.
    Manhattan,
    /// Largest axis distance.
    Chebyshev,
    /// Straight-line distance.
    Euclidean,
}

impl Metric {
    /// Distance for the provided axis offsets.
    #[must_use]
    pub fn distance(self, dx: f64, dy: f64) -> f64 {
        let (dx, dy) = (dx.abs(), dy.abs());
        match self {
            Self::Manhattan => dx + dy,
            Self::Chebyshev => dx.max(dy),
            Self::Euclidean => dx.hypot(dy),
        }
    }
}

/// Point a distance heuristic measures towards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// The centroid of the next unmet sub-goal.
    Target,
    /// The first start/finish cell, regardless of lap stage.
    FinishLine,
}

/// Heuristic built from a metric and an anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DistanceHeuristic {
    metric: Metric,
    anchor: Anchor,
    name: &'static str,
}

impl DistanceHeuristic {
    /// Creates a named distance heuristic.
    #[must_use]
    pub const fn new(metric: Metric, anchor: Anchor, name: &'static str) -> Self {
        Self {
            metric,
            anchor,
            name,
        }
    }
}

impl Heuristic for DistanceHeuristic {
    fn name(&self) -> &str {
        self.name
    }

    fn estimate(&self, cell: CellCoord, goal: &SubGoal) -> f64 {
        let point = match self.anchor {
            Anchor::Target => goal.target,
            Anchor::FinishLine => Centroid::of_cell(goal.finish_anchor),
        };
        let (dx, dy) = point.delta_from(cell);
        self.metric.distance(dx, dy)
    }
}

/// Zero estimate, turning the search into uniform-cost search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct UniformCost;

impl Heuristic for UniformCost {
    fn name(&self) -> &str {
        "uniform-cost"
    }

    fn estimate(&self, _cell: CellCoord, _goal: &SubGoal) -> f64 {
        0.0
    }
}

/// Adapts a closure into a named heuristic.
pub struct FnHeuristic<F> {
    name: String,
    estimate: F,
}

impl<F> FnHeuristic<F>
where
    F: Fn(CellCoord, &SubGoal) -> f64,
{
    /// Wraps the closure under the provided name.
    pub fn new(name: impl Into<String>, estimate: F) -> Self {
        Self {
            name: name.into(),
            estimate,
        }
    }
}

impl<F> Heuristic for FnHeuristic<F>
where
    F: Fn(CellCoord, &SubGoal) -> f64,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn estimate(&self, cell: CellCoord, goal: &SubGoal) -> f64 {
        (self.estimate)(cell, goal)
    }
}

impl<F> fmt::Debug for FnHeuristic<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHeuristic")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

static MANHATTAN_TO_TARGET: DistanceHeuristic =
    DistanceHeuristic::new(Metric::Manhattan, Anchor::Target, "manhattan-to-target");
static MANHATTAN_TO_FINISH: DistanceHeuristic =
    DistanceHeuristic::new(Metric::Manhattan, Anchor::FinishLine, "manhattan-to-finish");
static CHEBYSHEV_TO_TARGET: DistanceHeuristic =
    DistanceHeuristic::new(Metric::Chebyshev, Anchor::Target, "chebyshev-to-target");
static CHEBYSHEV_TO_FINISH: DistanceHeuristic =
    DistanceHeuristic::new(Metric::Chebyshev, Anchor::FinishLine, "chebyshev-to-finish");
static EUCLIDEAN_TO_TARGET: DistanceHeuristic =
    DistanceHeuristic::new(Metric::Euclidean, Anchor::Target, "euclidean-to-target");
static EUCLIDEAN_TO_FINISH: DistanceHeuristic =
    DistanceHeuristic::new(Metric::Euclidean, Anchor::FinishLine, "euclidean-to-finish");
static UNIFORM_COST: UniformCost = UniformCost;

/// Closed set of built-in heuristics selectable from configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeuristicKind {
    /// Manhattan distance to the next sub-goal centroid.
    ManhattanToTarget,
    /// Manhattan distance to the first finish cell.
    ManhattanToFinish,
    /// Chebyshev distance to the next sub-goal centroid.
    ChebyshevToTarget,
    /// Chebyshev distance to the first finish cell.
    ChebyshevToFinish,
    /// Euclidean distance to the next sub-goal centroid.
    #[default]
    EuclideanToTarget,
    /// Euclidean distance to the first finish cell.
    EuclideanToFinish,
    /// No estimate at all.
    UniformCost,
}

impl HeuristicKind {
    /// Every built-in heuristic.
    pub const ALL: [HeuristicKind; 7] = [
        HeuristicKind::ManhattanToTarget,
        HeuristicKind::ManhattanToFinish,
        HeuristicKind::ChebyshevToTarget,
        HeuristicKind::ChebyshevToFinish,
        HeuristicKind::EuclideanToTarget,
        HeuristicKind::EuclideanToFinish,
        HeuristicKind::UniformCost,
    ];

    /// Strategy implementing the heuristic.
    #[must_use]
    pub fn strategy(self) -> &'static dyn Heuristic {
        match self {
            Self::ManhattanToTarget => &MANHATTAN_TO_TARGET,
            Self::ManhattanToFinish => &MANHATTAN_TO_FINISH,
            Self::ChebyshevToTarget => &CHEBYSHEV_TO_TARGET,
            Self::ChebyshevToFinish => &CHEBYSHEV_TO_FINISH,
            Self::EuclideanToTarget => &EUCLIDEAN_TO_TARGET,
            Self::EuclideanToFinish => &EUCLIDEAN_TO_FINISH,
            Self::UniformCost => &UNIFORM_COST,
        }
    }

    /// Configuration name of the heuristic.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::UniformCost => "uniform-cost",
            other => other.strategy().name(),
        }
    }
}

impl fmt::Display for HeuristicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Name that does not match any built-in heuristic.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown heuristic `{0}`")]
pub struct UnknownHeuristic(pub String);

impl FromStr for HeuristicKind {
    type Err = UnknownHeuristic;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        HeuristicKind::ALL
            .into_iter()
            .find(|kind| kind.label() == value)
            .ok_or_else(|| UnknownHeuristic(value.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal() -> SubGoal {
        SubGoal {
            target: Centroid::new(3.0, 4.0),
            finish_anchor: CellCoord::new(0, 1),
        }
    }

    #[test]
    fn metrics_measure_to_the_target() {
        let origin = CellCoord::new(0, 0);
        let goal = goal();
        let estimate = |kind: HeuristicKind| kind.strategy().estimate(origin, &goal);

        assert!((estimate(HeuristicKind::ManhattanToTarget) - 7.0).abs() < 1e-9);
        assert!((estimate(HeuristicKind::ChebyshevToTarget) - 4.0).abs() < 1e-9);
        assert!((estimate(HeuristicKind::EuclideanToTarget) - 5.0).abs() < 1e-9);
        assert!((estimate(HeuristicKind::EuclideanToFinish) - 1.0).abs() < 1e-9);
        assert_eq!(estimate(HeuristicKind::UniformCost), 0.0);
    }

    #[test]
    fn labels_parse_back_into_kinds() {
        for kind in HeuristicKind::ALL {
            assert_eq!(kind.label().parse::<HeuristicKind>(), Ok(kind));
        }
        assert!("dijkstra".parse::<HeuristicKind>().is_err());
        assert_eq!(HeuristicKind::default(), HeuristicKind::EuclideanToTarget);
    }

    #[test]
    fn closures_can_serve_as_heuristics() {
        let doubled = FnHeuristic::new("doubled", |cell: CellCoord, goal: &SubGoal| {
            2.0 * EUCLIDEAN_TO_TARGET.estimate(cell, goal)
        });
        assert_eq!(doubled.name(), "doubled");
        assert!((doubled.estimate(CellCoord::new(0, 0), &goal()) - 10.0).abs() < 1e-9);
    }
}
