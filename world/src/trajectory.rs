//! Integer line rasterization and move legality checks.

use vector_racing_core::{Acceleration, CellCoord, CrossingEvent, Velocity};

use crate::track::TrackGrid;

/// Result of checking a straight segment against the grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SegmentCheck {
    /// Every cell along the segment is drivable.
    Legal {
        /// Special tiles touched after leaving the origin, in travel order.
        crossings: Vec<CrossingEvent>,
    },
    /// The segment leaves the grid or touches an out-of-bounds cell.
    Blocked {
        /// First offending cell along the segment.
        at: CellCoord,
    },
}

impl SegmentCheck {
    /// Reports whether the segment may be driven.
    #[must_use]
    pub fn is_legal(&self) -> bool {
        matches!(self, Self::Legal { .. })
    }

    /// Crossings of a legal segment, or `None` when it is blocked.
    #[must_use]
    pub fn into_crossings(self) -> Option<Vec<CrossingEvent>> {
        match self {
            Self::Legal { crossings } => Some(crossings),
            Self::Blocked { .. } => None,
        }
    }
}

/// Legal move available from a given kinematic state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateMove {
    /// Acceleration that produces the move.
    pub acceleration: Acceleration,
    /// Velocity after the acceleration.
    pub velocity: Velocity,
    /// Cell the move reaches.
    pub destination: CellCoord,
    /// Special tiles crossed on the way.
    pub crossings: Vec<CrossingEvent>,
}

/// Cells visited by a straight segment between two cells, endpoints included.
///
/// The walk is gap free and the same cells are visited in reverse order when
/// the endpoints are swapped.
#[must_use]
pub fn rasterize(from: CellCoord, to: CellCoord) -> Vec<CellCoord> {
    if to < from {
        let mut cells = bresenham(to, from);
        cells.reverse();
        return cells;
    }

    bresenham(from, to)
}

fn bresenham(from: CellCoord, to: CellCoord) -> Vec<CellCoord> {
    let (x0, y0) = (i64::from(from.column()), i64::from(from.row()));
    let (x1, y1) = (i64::from(to.column()), i64::from(to.row()));
    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let step_x = if x0 > x1 { -1 } else { 1 };
    let step_y = if y0 > y1 { -1 } else { 1 };

    let mut cells = Vec::with_capacity(usize::try_from(dx.max(dy) + 1).unwrap_or(0));
    let (mut x, mut y) = (x0, y0);

    // Error terms are doubled so the half-step start stays integral.
    if dx > dy {
        let mut error = dx;
        while x != x1 {
            cells.push(cell_at(x, y));
            error -= 2 * dy;
            if error < 0 {
                y += step_y;
                error += 2 * dx;
            }
            x += step_x;
        }
    } else {
        let mut error = dy;
        while y != y1 {
            cells.push(cell_at(x, y));
            error -= 2 * dx;
            if error < 0 {
                x += step_x;
                error += 2 * dy;
            }
            y += step_y;
        }
    }

    cells.push(to);
    cells
}

fn cell_at(x: i64, y: i64) -> CellCoord {
    CellCoord::new(
        u32::try_from(x).unwrap_or_default(),
        u32::try_from(y).unwrap_or_default(),
    )
}

/// Checks whether the straight move between two cells may be driven.
#[must_use]
pub fn validate(grid: &TrackGrid, from: CellCoord, to: CellCoord) -> SegmentCheck {
    let cells = rasterize(from, to);

    for &cell in &cells {
        match grid.tile(cell) {
            Some(tile) if tile.is_drivable() => {}
            _ => return SegmentCheck::Blocked { at: cell },
        }
    }

    let crossings = cells
        .iter()
        .skip(1)
        .filter_map(|&cell| {
            let kind = grid.tile(cell)?.special()?;
            Some(CrossingEvent { kind, cell })
        })
        .collect();

    SegmentCheck::Legal { crossings }
}

/// Reports whether a move from `from` to `to` reaches or passes `obstacle`.
///
/// The origin is not tested since the mover is already standing on it.
#[must_use]
pub fn collides_with(from: CellCoord, to: CellCoord, obstacle: CellCoord) -> bool {
    to == obstacle || rasterize(from, to).iter().skip(1).any(|&cell| cell == obstacle)
}

/// Legal moves from `cell` travelling at `velocity`, in acceleration order.
pub fn candidate_moves(
    grid: &TrackGrid,
    cell: CellCoord,
    velocity: Velocity,
) -> impl Iterator<Item = CandidateMove> + '_ {
    Acceleration::ALL.into_iter().filter_map(move |acceleration| {
        let velocity = velocity.accelerate(acceleration);
        let destination = cell.offset(velocity)?;
        if !grid.contains(destination) {
            return None;
        }

        let crossings = validate(grid, cell, destination).into_crossings()?;
        Some(CandidateMove {
            acceleration,
            velocity,
            destination,
            crossings,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vector_racing_core::SpecialTile;

    fn corridor() -> TrackGrid {
        TrackGrid::from_glyphs(&["S......12S"]).expect("valid layout")
    }

    #[test]
    fn horizontal_segment_visits_every_cell() {
        let cells = rasterize(CellCoord::new(1, 0), CellCoord::new(4, 0));
        let expected: Vec<_> = (1..=4).map(|column| CellCoord::new(column, 0)).collect();
        assert_eq!(cells, expected);
    }

    #[test]
    fn shallow_diagonal_steps_on_the_short_axis() {
        let cells = rasterize(CellCoord::new(0, 0), CellCoord::new(4, 2));
        assert_eq!(
            cells,
            vec![
                CellCoord::new(0, 0),
                CellCoord::new(1, 0),
                CellCoord::new(2, 1),
                CellCoord::new(3, 1),
                CellCoord::new(4, 2),
            ]
        );
    }

    #[test]
    fn zero_length_segment_is_its_origin() {
        let cell = CellCoord::new(3, 3);
        assert_eq!(rasterize(cell, cell), vec![cell]);
    }

    #[test]
    fn crossings_exclude_the_origin() {
        let grid = corridor();

        let check = validate(&grid, CellCoord::new(0, 0), CellCoord::new(3, 0));
        assert_eq!(check, SegmentCheck::Legal { crossings: vec![] });

        let check = validate(&grid, CellCoord::new(6, 0), CellCoord::new(9, 0));
        assert_eq!(
            check.into_crossings(),
            Some(vec![
                CrossingEvent {
                    kind: SpecialTile::Checkpoint1,
                    cell: CellCoord::new(7, 0)
                },
                CrossingEvent {
                    kind: SpecialTile::Checkpoint2,
                    cell: CellCoord::new(8, 0)
                },
                CrossingEvent {
                    kind: SpecialTile::StartFinish,
                    cell: CellCoord::new(9, 0)
                },
            ])
        );
    }

    #[test]
    fn walls_block_the_segment() {
        let grid = TrackGrid::from_glyphs(&["S..#..S"]).expect("valid layout");
        let check = validate(&grid, CellCoord::new(1, 0), CellCoord::new(5, 0));
        assert_eq!(
            check,
            SegmentCheck::Blocked {
                at: CellCoord::new(3, 0)
            }
        );
    }

    #[test]
    fn segments_leaving_the_grid_are_blocked() {
        let grid = corridor();
        let check = validate(&grid, CellCoord::new(8, 0), CellCoord::new(11, 0));
        assert!(!check.is_legal());
    }

    #[test]
    fn collision_ignores_the_origin() {
        let from = CellCoord::new(0, 0);
        let to = CellCoord::new(4, 0);
        assert!(collides_with(from, to, CellCoord::new(2, 0)));
        assert!(collides_with(from, to, to));
        assert!(!collides_with(from, to, from));
        assert!(!collides_with(from, to, CellCoord::new(2, 1)));
    }

    #[test]
    fn candidates_from_rest_in_a_corridor() {
        let grid = corridor();

        let moves: Vec<_> = candidate_moves(&grid, CellCoord::new(0, 0), Velocity::ZERO).collect();

        let destinations: Vec<_> = moves.iter().map(|candidate| candidate.destination).collect();
        assert_eq!(
            destinations,
            vec![CellCoord::new(0, 0), CellCoord::new(1, 0)]
        );
        assert_eq!(moves[1].acceleration, Acceleration::new(1, 0).expect("unit"));
    }

    mod proptests {
        use proptest::prelude::*;
        use vector_racing_core::CellCoord;

        use crate::trajectory::rasterize;

        proptest! {
            #[test]
            fn swapped_endpoints_visit_the_same_cells(
                a in (0u32..40, 0u32..40),
                b in (0u32..40, 0u32..40),
            ) {
                let start = CellCoord::new(a.0, a.1);
                let end = CellCoord::new(b.0, b.1);

                let forward = rasterize(start, end);
                let mut backward = rasterize(end, start);
                backward.reverse();

                prop_assert_eq!(&forward, &backward);
                prop_assert_eq!(forward.first().copied(), Some(start));
                prop_assert_eq!(forward.last().copied(), Some(end));
                for pair in forward.windows(2) {
                    prop_assert!(pair[0].column().abs_diff(pair[1].column()) <= 1);
                    prop_assert!(pair[0].row().abs_diff(pair[1].row()) <= 1);
                    prop_assert_ne!(pair[0], pair[1]);
                }
            }
        }
    }
}
