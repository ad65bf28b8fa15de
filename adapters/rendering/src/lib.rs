#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared presentation contracts for vector racing adapters.

use std::fmt;

use glam::Vec2;
use vector_racing_core::{CellCoord, MoverId, Plan, RaceOutcome, Tile};
use vector_racing_world::{query, Race};

/// Frames used to blend a mover from one cell to the next.
pub const ANIMATION_STEPS: u32 = 10;

/// Glyph drawn on cells the autopilot intends to visit.
pub const PLAN_GLYPH: char = '*';

/// Glyph drawn when both movers share a cell.
pub const SHARED_CELL_GLYPH: char = 'X';

/// Returns the world-space centre of a cell, one unit per cell.
#[must_use]
pub fn cell_center(cell: CellCoord) -> Vec2 {
    Vec2::new(cell.column() as f32 + 0.5, cell.row() as f32 + 0.5)
}

/// Glyph representing a mover on the board.
#[must_use]
pub const fn mover_glyph(mover: MoverId) -> char {
    match mover {
        MoverId::Human => 'H',
        MoverId::Autopilot => 'A',
    }
}

/// Linear interpolation between the pre- and post-move cells of a mover.
///
/// The race itself only knows discrete states; the animation exists purely so
/// adapters can draw the in-between frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoveAnimation {
    from: Vec2,
    to: Vec2,
    step: u32,
}

impl MoveAnimation {
    /// Creates an animation that starts at `from` and ends at `to`.
    #[must_use]
    pub fn new(from: CellCoord, to: CellCoord) -> Self {
        Self {
            from: cell_center(from),
            to: cell_center(to),
            step: 0,
        }
    }

    /// Frames rendered so far.
    #[must_use]
    pub const fn step(&self) -> u32 {
        self.step
    }

    /// Reports whether every frame has been produced.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.step >= ANIMATION_STEPS
    }

    /// Blend factor of the current frame in the range 0.0..=1.0.
    #[must_use]
    pub fn progress(&self) -> f32 {
        self.step.min(ANIMATION_STEPS) as f32 / ANIMATION_STEPS as f32
    }

    /// World-space position of the current frame.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.from.lerp(self.to, self.progress())
    }
}

impl Iterator for MoveAnimation {
    type Item = Vec2;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_finished() {
            return None;
        }
        self.step += 1;
        Some(MoveAnimation::position(self))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = ANIMATION_STEPS.saturating_sub(self.step) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for MoveAnimation {}

/// Mover drawn on top of the board.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MoverPresentation {
    /// Seat the mover occupies.
    pub mover: MoverId,
    /// Cell the mover occupies in the race.
    pub cell: CellCoord,
    /// Animation towards the destination of an uncommitted move.
    pub animation: Option<MoveAnimation>,
}

impl MoverPresentation {
    /// World-space position to draw the mover at.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.animation
            .map_or_else(|| cell_center(self.cell), |animation| animation.position())
    }
}

/// Frozen snapshot of a race suitable for drawing.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    columns: u32,
    rows: u32,
    tiles: Vec<Tile>,
    /// Movers seated in the race.
    pub movers: Vec<MoverPresentation>,
    /// Waypoints of the autopilot's plan, if one is overlaid.
    pub plan: Vec<CellCoord>,
    /// Result of the race once it finished.
    pub outcome: Option<RaceOutcome>,
}

impl Scene {
    /// Captures the current state of a race with an optional plan overlay.
    #[must_use]
    pub fn capture(race: &Race, plan: Option<&Plan>) -> Self {
        let grid = query::track(race).grid();
        let in_flight = query::in_flight(race);

        let movers = [MoverId::Human, MoverId::Autopilot]
            .into_iter()
            .filter_map(|mover| {
                let state = query::mover_state(race, mover)?;
                let animation = in_flight
                    .filter(|pending| pending.mover == mover)
                    .map(|pending| MoveAnimation::new(pending.from, pending.to));
                Some(MoverPresentation {
                    mover,
                    cell: state.cell,
                    animation,
                })
            })
            .collect();

        Self {
            columns: grid.columns(),
            rows: grid.rows(),
            tiles: grid.cells().map(|(_, tile)| tile).collect(),
            movers,
            plan: plan.map(|plan| plan.waypoints().to_vec()).unwrap_or_default(),
            outcome: query::outcome(race),
        }
    }

    /// Width of the board in cells.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Height of the board in cells.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Glyph shown at `cell` once movers and the plan overlay are drawn.
    #[must_use]
    pub fn glyph_at(&self, cell: CellCoord) -> Option<char> {
        if cell.column() >= self.columns || cell.row() >= self.rows {
            return None;
        }

        let mut occupants = self.movers.iter().filter(|mover| mover.cell == cell);
        match (occupants.next(), occupants.next()) {
            (Some(_), Some(_)) => return Some(SHARED_CELL_GLYPH),
            (Some(mover), None) => return Some(mover_glyph(mover.mover)),
            _ => {}
        }

        if self.plan.contains(&cell) {
            return Some(PLAN_GLYPH);
        }

        let index = cell.row() as usize * self.columns as usize + cell.column() as usize;
        self.tiles.get(index).map(|tile| tile.glyph())
    }

    /// Board rendered as one string per row.
    #[must_use]
    pub fn to_lines(&self) -> Vec<String> {
        (0..self.rows)
            .map(|row| {
                (0..self.columns)
                    .filter_map(|column| self.glyph_at(CellCoord::new(column, row)))
                    .collect()
            })
            .collect()
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.to_lines() {
            writeln!(f, "{line}")?;
        }
        match self.outcome {
            Some(RaceOutcome::Winner(mover)) => writeln!(f, "winner: {mover}"),
            Some(RaceOutcome::Stalled) => writeln!(f, "race stalled"),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vector_racing_core::{Acceleration, Command};
    use vector_racing_world::track::{Track, TrackGrid};

    fn race() -> Race {
        let grid = TrackGrid::from_glyphs(&["S......12S", "S......12S"]).expect("valid layout");
        let mut race = Race::new(Track::analyze(grid).expect("valid track"));
        let mut events = Vec::new();
        vector_racing_world::apply(
            &mut race,
            Command::StartRace {
                required_laps: 1,
                human_start: CellCoord::new(0, 0),
                autopilot_start: Some(CellCoord::new(0, 1)),
            },
            &mut events,
        );
        race
    }

    #[test]
    fn animation_interpolates_ten_frames() {
        let frames: Vec<_> =
            MoveAnimation::new(CellCoord::new(0, 0), CellCoord::new(10, 0)).collect();

        assert_eq!(frames.len(), ANIMATION_STEPS as usize);
        assert_eq!(frames[0], Vec2::new(1.5, 0.5));
        assert_eq!(frames[4], Vec2::new(5.5, 0.5));
        assert_eq!(frames[9], cell_center(CellCoord::new(10, 0)));
    }

    #[test]
    fn animation_starts_at_the_origin() {
        let mut animation = MoveAnimation::new(CellCoord::new(2, 3), CellCoord::new(4, 1));

        assert_eq!(animation.position(), cell_center(CellCoord::new(2, 3)));
        assert_eq!(animation.len(), 10);
        let _ = animation.by_ref().last();
        assert!(animation.is_finished());
        assert_eq!(animation.next(), None);
    }

    #[test]
    fn scene_draws_movers_over_tiles() {
        let scene = Scene::capture(&race(), None);

        assert_eq!(scene.to_lines(), vec!["H......12S", "A......12S"]);
        assert_eq!(scene.outcome, None);
    }

    #[test]
    fn plan_overlay_marks_waypoints() {
        let plan = Plan::new(vec![
            CellCoord::new(0, 1),
            CellCoord::new(1, 1),
            CellCoord::new(3, 1),
        ]);
        let scene = Scene::capture(&race(), Some(&plan));

        assert_eq!(scene.to_lines()[1], "A*.*...12S");
    }

    #[test]
    fn uncommitted_moves_are_animated() {
        let mut race = race();
        let mut events = Vec::new();
        vector_racing_world::apply(
            &mut race,
            Command::BeginMove {
                mover: MoverId::Human,
                acceleration: Acceleration::new(1, 0).expect("unit acceleration"),
            },
            &mut events,
        );

        let scene = Scene::capture(&race, None);
        let human = scene
            .movers
            .iter()
            .find(|mover| mover.mover == MoverId::Human)
            .expect("human seated");

        assert_eq!(human.cell, CellCoord::new(0, 0));
        assert!(human.animation.is_some());
        assert_eq!(human.position(), cell_center(CellCoord::new(0, 0)));
    }

    #[test]
    fn glyphs_outside_the_board_are_absent() {
        let scene = Scene::capture(&race(), None);

        assert_eq!(scene.glyph_at(CellCoord::new(10, 0)), None);
        assert_eq!(scene.glyph_at(CellCoord::new(0, 2)), None);
    }
}
