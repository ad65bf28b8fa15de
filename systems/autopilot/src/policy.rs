//! Opponent-aware decisions taken before the autopilot commits to a move.

use vector_racing_core::{Acceleration, CellCoord, Centroid, MoverState, Plan, Velocity};
use vector_racing_system_planner::{PlanError, Planner};
use vector_racing_world::{track::Track, trajectory, trajectory::CandidateMove};

/// Reports whether one of the next `lookahead` plan segments runs into `obstacle`.
#[must_use]
pub fn path_threatened(plan: &Plan, obstacle: CellCoord, lookahead: usize) -> bool {
    plan.upcoming_segments(lookahead)
        .any(|(from, to)| trajectory::collides_with(from, to, obstacle))
}

/// Plans from `state` with the optional obstacle injected into a scratch track.
///
/// The scratch copy lives only for the duration of the call.
pub fn replan_around(
    planner: &Planner<'_>,
    track: &Track,
    state: MoverState,
    required_laps: u32,
    obstacle: Option<CellCoord>,
) -> Result<Plan, PlanError> {
    let outcome = match obstacle {
        Some(cell) => {
            let scratch = track.with_obstacle(cell);
            planner.plan_from(&scratch, state, required_laps)?
        }
        None => planner.plan_from(track, state, required_laps)?,
    };
    Ok(outcome.plan)
}

/// Acceleration that drives from `state` to `waypoint`, if one of `moves` does.
#[must_use]
pub fn acceleration_towards(
    state: &MoverState,
    waypoint: CellCoord,
    moves: &[CandidateMove],
) -> Option<Acceleration> {
    let wanted = Velocity::between(state.cell, waypoint);
    let acceleration = Acceleration::between(state.velocity, wanted)?;
    moves
        .iter()
        .any(|candidate| candidate.acceleration == acceleration)
        .then_some(acceleration)
}

/// Move whose destination lies closest to `target`, preferring earlier moves on ties.
#[must_use]
pub fn closest_move(moves: &[CandidateMove], target: Centroid) -> Option<&CandidateMove> {
    moves.iter().min_by(|left, right| {
        distance(left.destination, target).total_cmp(&distance(right.destination, target))
    })
}

fn distance(cell: CellCoord, target: Centroid) -> f64 {
    let (dx, dy) = target.delta_from(cell);
    dx.hypot(dy)
}
