#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Autopilot system that follows planner routes and replans around the opponent.

pub mod policy;

use serde::Deserialize;
use thiserror::Error;
use vector_racing_core::{CellCoord, Centroid, Command, Event, MoverId, MoverState, Plan};
use vector_racing_system_planner::{HeuristicKind, PlanError, Planner, DEFAULT_MAX_EXPANSIONS};
use vector_racing_world::{query, Race};

/// Number of upcoming plan segments checked against the opponent by default.
pub const DEFAULT_LOOKAHEAD_SEGMENTS: usize = 2;

/// Tunables for the autopilot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AutopilotConfig {
    /// Heuristic used for every search.
    pub heuristic: HeuristicKind,
    /// Expansion cap handed to the planner.
    pub max_expansions: usize,
    /// Plan segments tested against the opponent before each move.
    pub lookahead_segments: usize,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            heuristic: HeuristicKind::default(),
            max_expansions: DEFAULT_MAX_EXPANSIONS,
            lookahead_segments: DEFAULT_LOOKAHEAD_SEGMENTS,
        }
    }
}

/// Failures that take the autopilot out of the race.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum AutopilotError {
    /// No route could be planned from the start cell.
    #[error("autopilot has no route to the finish: {0}")]
    UnreachableGoal(#[from] PlanError),
}

/// Counters describing the autopilot's replanning activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct AutopilotStats {
    /// Replans that produced a new route.
    pub replans: u32,
    /// Replans that found no route and kept the previous plan.
    pub failed_replans: u32,
    /// Moves made without following the plan.
    pub fallback_moves: u32,
}

/// Pure system that drives the autopilot seat of a race.
#[derive(Debug, Default)]
pub struct Autopilot {
    config: AutopilotConfig,
    plan: Option<Plan>,
    recalculating: bool,
    stats: AutopilotStats,
}

impl Autopilot {
    /// Creates an autopilot with the provided configuration.
    #[must_use]
    pub fn new(config: AutopilotConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Route currently being followed.
    #[must_use]
    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    /// Reports whether a replan ran while choosing the latest move.
    #[must_use]
    pub const fn is_recalculating(&self) -> bool {
        self.recalculating
    }

    /// Replanning counters accumulated since the race started.
    #[must_use]
    pub const fn stats(&self) -> AutopilotStats {
        self.stats
    }

    /// Consumes race events and emits the autopilot's move commands.
    ///
    /// Fails only when the initial route cannot be planned.
    pub fn handle(
        &mut self,
        events: &[Event],
        race: &Race,
        out: &mut Vec<Command>,
    ) -> Result<(), AutopilotError> {
        let mut turn_started = false;

        for event in events {
            match event {
                Event::RaceStarted {
                    autopilot_start: Some(start),
                    required_laps,
                    ..
                } => {
                    self.plan = None;
                    self.recalculating = false;
                    self.stats = AutopilotStats::default();
                    let outcome = self
                        .planner()
                        .plan(query::track(race), *start, *required_laps)?;
                    self.plan = Some(outcome.plan);
                }
                Event::MoveCommitted {
                    mover: MoverId::Autopilot,
                    from,
                    to,
                    ..
                } => {
                    if let Some(plan) = self.plan.as_mut() {
                        if plan.next_waypoint() != Some(*to) {
                            plan.splice(vec![*from, *to]);
                        }
                        let _ = plan.advance();
                    }
                }
                Event::TurnStarted {
                    mover: MoverId::Autopilot,
                } => turn_started = true,
                _ => {}
            }
        }

        if turn_started {
            self.take_turn(race, out);
        }

        Ok(())
    }

    fn planner(&self) -> Planner<'static> {
        Planner::with_kind(self.config.heuristic).with_max_expansions(self.config.max_expansions)
    }

    fn take_turn(&mut self, race: &Race, out: &mut Vec<Command>) {
        self.recalculating = false;
        let Some(state) = query::mover_state(race, MoverId::Autopilot) else {
            return;
        };
        let opponent = query::opponent_cell(race, MoverId::Autopilot);

        let needs_replan = match (&self.plan, opponent) {
            (None, _) => true,
            (Some(plan), _) if plan.is_exhausted() => true,
            (Some(plan), Some(obstacle)) => {
                policy::path_threatened(plan, obstacle, self.config.lookahead_segments)
            }
            (Some(_), None) => false,
        };
        if needs_replan {
            self.replan(race, state, opponent);
        }

        let moves = query::available_moves(race, MoverId::Autopilot);
        let planned = self
            .plan
            .as_ref()
            .and_then(Plan::next_waypoint)
            .and_then(|waypoint| policy::acceleration_towards(&state, waypoint, &moves));

        let acceleration = match planned {
            Some(acceleration) => acceleration,
            None => {
                let target = self
                    .plan
                    .as_ref()
                    .and_then(Plan::next_waypoint)
                    .map_or_else(
                        || query::track(race).sub_goal(&state),
                        Centroid::of_cell,
                    );
                let Some(fallback) = policy::closest_move(&moves, target) else {
                    return;
                };
                self.stats.fallback_moves += 1;
                tracing::debug!(
                    destination = %fallback.destination,
                    "autopilot leaving its plan for the closest legal move"
                );
                fallback.acceleration
            }
        };

        out.push(Command::BeginMove {
            mover: MoverId::Autopilot,
            acceleration,
        });
    }

    fn replan(&mut self, race: &Race, state: MoverState, obstacle: Option<CellCoord>) {
        self.recalculating = true;
        let result = policy::replan_around(
            &self.planner(),
            query::track(race),
            state,
            query::required_laps(race),
            obstacle,
        );

        match result {
            Ok(replacement) => {
                self.stats.replans += 1;
                tracing::debug!(
                    from = %state.cell,
                    moves = replacement.move_count(),
                    "autopilot replanned"
                );
                match self.plan.as_mut() {
                    Some(plan) => plan.splice(replacement.into_waypoints()),
                    None => self.plan = Some(replacement),
                }
            }
            Err(error) => {
                self.stats.failed_replans += 1;
                tracing::warn!(%error, "autopilot replan failed, keeping previous plan");
            }
        }
    }
}
