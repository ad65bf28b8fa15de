//! Lap gating rules applied to the crossings of a committed move.

use vector_racing_core::{CrossingEvent, MoverState, SpecialTile};

use crate::connectivity::Region;

/// Observable consequence of a single crossing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressNote {
    /// A checkpoint was credited to the current lap.
    CheckpointPassed(SpecialTile),
    /// The finish line completed a lap.
    LapCompleted {
        /// One-based number of the lap that was completed.
        completed_lap: u32,
    },
    /// The finish line was crossed early and lap progress was reset.
    FinishMissed,
}

/// State after applying a move's crossings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Updated mover state.
    pub state: MoverState,
    /// Whether at least one lap was completed by the crossings.
    pub lap_completed: bool,
}

/// Applies the crossings of a move to the mover state in travel order.
#[must_use]
pub fn advance(
    state: MoverState,
    crossings: &[CrossingEvent],
    checkpoint1: &Region,
    checkpoint2: &Region,
) -> ProgressUpdate {
    advance_observed(state, crossings, checkpoint1, checkpoint2, |_| {})
}

/// Same as [`advance`], reporting every credited crossing to `observe`.
pub fn advance_observed<F>(
    mut state: MoverState,
    crossings: &[CrossingEvent],
    checkpoint1: &Region,
    checkpoint2: &Region,
    mut observe: F,
) -> ProgressUpdate
where
    F: FnMut(ProgressNote),
{
    let mut lap_completed = false;

    for crossing in crossings {
        match crossing.kind {
            SpecialTile::Checkpoint1 => {
                if !state.checkpoint1_passed && checkpoint1.contains(crossing.cell) {
                    state.checkpoint1_passed = true;
                    observe(ProgressNote::CheckpointPassed(SpecialTile::Checkpoint1));
                }
            }
            SpecialTile::Checkpoint2 => {
                if state.checkpoint1_passed
                    && !state.checkpoint2_passed
                    && checkpoint2.contains(crossing.cell)
                {
                    state.checkpoint2_passed = true;
                    observe(ProgressNote::CheckpointPassed(SpecialTile::Checkpoint2));
                }
            }
            SpecialTile::StartFinish => {
                if state.checkpoint1_passed && state.checkpoint2_passed {
                    let completed_lap = state.lap;
                    state.lap = state.lap.saturating_add(1);
                    state.checkpoint1_passed = false;
                    state.checkpoint2_passed = false;
                    lap_completed = true;
                    observe(ProgressNote::LapCompleted { completed_lap });
                } else if state.checkpoint1_passed || state.checkpoint2_passed {
                    state.checkpoint1_passed = false;
                    state.checkpoint2_passed = false;
                    observe(ProgressNote::FinishMissed);
                }
            }
        }
    }

    ProgressUpdate {
        state,
        lap_completed,
    }
}
