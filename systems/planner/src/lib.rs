#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Informed search over position, velocity and lap progress.
//!
//! The planner explores the extended state space of a single mover with A*
//! and returns the shortest move sequence it finds that completes the
//! required laps. Successors are produced by the same validator and progress
//! rules the race session applies, so every plan is drivable as returned.

pub mod heuristic;

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap},
    fmt,
};

use thiserror::Error;
use vector_racing_core::{CellCoord, MoverState, Plan};
use vector_racing_world::{progress, track::Track, trajectory};

pub use crate::heuristic::{Heuristic, HeuristicKind, SubGoal};

/// Expansion cap used when nothing else is configured.
pub const DEFAULT_MAX_EXPANSIONS: usize = 2_000_000;

/// Failures that prevent a plan from being produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PlanError {
    /// Zero laps were requested.
    #[error("a plan needs at least one lap")]
    NoLaps,
    /// The frontier emptied without completing the laps.
    #[error("no lap-completing route from {start} after {expansions} expansions")]
    Unreachable {
        /// Cell the search started from.
        start: CellCoord,
        /// States expanded before giving up.
        expansions: usize,
    },
    /// The search hit its expansion cap.
    #[error("search stopped at the cap of {limit} expansions")]
    SearchLimitReached {
        /// Configured expansion cap.
        limit: usize,
    },
}

/// Work performed by a single search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// States removed from the frontier and expanded.
    pub expansions: usize,
    /// Successor states pushed onto the frontier.
    pub generated: usize,
}

/// Successful search result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanOutcome {
    /// Waypoints from the start cell to the lap-completing cell.
    pub plan: Plan,
    /// Work performed by the search.
    pub stats: SearchStats,
}

/// A* search configured with a heuristic and an expansion cap.
#[derive(Clone, Copy)]
pub struct Planner<'h> {
    heuristic: &'h dyn Heuristic,
    max_expansions: usize,
}

impl fmt::Debug for Planner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Planner")
            .field("heuristic", &self.heuristic.name())
            .field("max_expansions", &self.max_expansions)
            .finish()
    }
}

impl<'h> Planner<'h> {
    /// Creates a planner using the provided heuristic.
    #[must_use]
    pub fn new(heuristic: &'h dyn Heuristic) -> Self {
        Self {
            heuristic,
            max_expansions: DEFAULT_MAX_EXPANSIONS,
        }
    }

    /// Creates a planner using one of the built-in heuristics.
    #[must_use]
    pub fn with_kind(kind: HeuristicKind) -> Planner<'static> {
        Planner::new(kind.strategy())
    }

    /// Replaces the expansion cap.
    #[must_use]
    pub fn with_max_expansions(mut self, max_expansions: usize) -> Self {
        self.max_expansions = max_expansions;
        self
    }

    /// Configured expansion cap.
    #[must_use]
    pub const fn max_expansions(&self) -> usize {
        self.max_expansions
    }

    /// Plans from rest on `start` with no checkpoints passed.
    pub fn plan(
        &self,
        track: &Track,
        start: CellCoord,
        required_laps: u32,
    ) -> Result<PlanOutcome, PlanError> {
        self.plan_from(track, MoverState::at_start(start), required_laps)
    }

    /// Plans from an arbitrary mover state.
    pub fn plan_from(
        &self,
        track: &Track,
        start: MoverState,
        required_laps: u32,
    ) -> Result<PlanOutcome, PlanError> {
        if required_laps == 0 {
            return Err(PlanError::NoLaps);
        }

        let result = self.search(track, start, required_laps);
        match &result {
            Ok(outcome) => tracing::info!(
                heuristic = self.heuristic.name(),
                start = %start.cell,
                moves = outcome.plan.move_count(),
                expansions = outcome.stats.expansions,
                "plan computed"
            ),
            Err(error) => tracing::debug!(
                heuristic = self.heuristic.name(),
                start = %start.cell,
                %error,
                "planning failed"
            ),
        }
        result
    }

    fn search(
        &self,
        track: &Track,
        start: MoverState,
        required_laps: u32,
    ) -> Result<PlanOutcome, PlanError> {
        let grid = track.grid();
        let mut nodes = vec![Node {
            state: start,
            cost: 0,
            parent: None,
        }];
        let mut best: HashMap<MoverState, u32> = HashMap::from([(start, 0)]);
        let mut closed: HashMap<MoverState, u32> = HashMap::new();
        let mut open = BinaryHeap::new();
        let mut sequence = 0_u64;
        let mut stats = SearchStats::default();

        open.push(Frontier {
            priority: self.estimate(track, &start, required_laps),
            sequence,
            node: 0,
        });

        while let Some(entry) = open.pop() {
            let Node { state, cost, .. } = nodes[entry.node];

            if state.has_finished(required_laps) {
                return Ok(PlanOutcome {
                    plan: Plan::new(reconstruct(&nodes, entry.node)),
                    stats,
                });
            }

            if closed.get(&state).is_some_and(|&closed_cost| closed_cost <= cost) {
                continue;
            }

            if stats.expansions >= self.max_expansions {
                return Err(PlanError::SearchLimitReached {
                    limit: self.max_expansions,
                });
            }

            let _ = closed.insert(state, cost);
            stats.expansions += 1;

            for candidate in trajectory::candidate_moves(grid, state.cell, state.velocity) {
                let moved = MoverState {
                    cell: candidate.destination,
                    velocity: candidate.velocity,
                    ..state
                };
                let next = progress::advance(
                    moved,
                    &candidate.crossings,
                    track.checkpoint1(),
                    track.checkpoint2(),
                )
                .state;
                let next_cost = cost + 1;

                if best.get(&next).is_some_and(|&known| known <= next_cost) {
                    continue;
                }
                let _ = best.insert(next, next_cost);

                nodes.push(Node {
                    state: next,
                    cost: next_cost,
                    parent: Some(entry.node),
                });
                sequence += 1;
                open.push(Frontier {
                    priority: f64::from(next_cost) + self.estimate(track, &next, required_laps),
                    sequence,
                    node: nodes.len() - 1,
                });
                stats.generated += 1;
            }
        }

        Err(PlanError::Unreachable {
            start: start.cell,
            expansions: stats.expansions,
        })
    }

    fn estimate(&self, track: &Track, state: &MoverState, required_laps: u32) -> f64 {
        let target = if state.has_finished(required_laps) {
            track.finish_centroid()
        } else {
            track.sub_goal(state)
        };
        let goal = SubGoal {
            target,
            finish_anchor: track.finish_anchor(),
        };
        self.heuristic.estimate(state.cell, &goal)
    }
}

#[derive(Clone, Copy, Debug)]
struct Node {
    state: MoverState,
    cost: u32,
    parent: Option<usize>,
}

#[derive(Clone, Copy, Debug)]
struct Frontier {
    priority: f64,
    sequence: u64,
    node: usize,
}

// Reversed so the max-heap pops the lowest priority, earliest insertion first.
impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

fn reconstruct(nodes: &[Node], goal: usize) -> Vec<CellCoord> {
    let mut cells = Vec::new();
    let mut current = Some(goal);

    while let Some(index) = current {
        let Some(node) = nodes.get(index) else {
            break;
        };
        cells.push(node.state.cell);
        current = node.parent;
    }

    cells.reverse();
    cells
}
