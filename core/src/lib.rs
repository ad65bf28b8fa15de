#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the vector racing engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative race session, and pure systems. Adapters submit [`Command`]
//! values describing desired mutations, the session executes those commands
//! via its `apply` entry point, and then broadcasts [`Event`] values for
//! systems to react to deterministically. Systems consume event streams, query
//! immutable snapshots, and respond exclusively with new command batches.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of laps a race requires when nothing else is configured.
pub const DEFAULT_REQUIRED_LAPS: u32 = 1;

/// Kind of terrain stored in a single track cell.
///
/// The discriminants are the persisted tile codes used by track files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tile {
    /// Terrain that cannot be entered or crossed.
    OutOfBounds,
    /// Ordinary drivable road.
    Road,
    /// Start and finish line.
    StartFinish,
    /// Part of the first checkpoint.
    Checkpoint1,
    /// Part of the second checkpoint.
    Checkpoint2,
}

impl Tile {
    /// Every tile kind ordered by its persisted code.
    pub const ALL: [Tile; 5] = [
        Tile::OutOfBounds,
        Tile::Road,
        Tile::StartFinish,
        Tile::Checkpoint1,
        Tile::Checkpoint2,
    ];

    /// Persisted integer code of the tile.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::OutOfBounds => 0,
            Self::Road => 1,
            Self::StartFinish => 2,
            Self::Checkpoint1 => 3,
            Self::Checkpoint2 => 4,
        }
    }

    /// Resolves a persisted integer code into a tile.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::OutOfBounds),
            1 => Some(Self::Road),
            2 => Some(Self::StartFinish),
            3 => Some(Self::Checkpoint1),
            4 => Some(Self::Checkpoint2),
            _ => None,
        }
    }

    /// Single character used by text layouts and ASCII boards.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::OutOfBounds => '#',
            Self::Road => '.',
            Self::StartFinish => 'S',
            Self::Checkpoint1 => '1',
            Self::Checkpoint2 => '2',
        }
    }

    /// Resolves a text layout character into a tile.
    #[must_use]
    pub const fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '#' => Some(Self::OutOfBounds),
            '.' => Some(Self::Road),
            'S' => Some(Self::StartFinish),
            '1' => Some(Self::Checkpoint1),
            '2' => Some(Self::Checkpoint2),
            _ => None,
        }
    }

    /// Reports whether a mover may occupy or cross the tile.
    #[must_use]
    pub const fn is_drivable(self) -> bool {
        !matches!(self, Self::OutOfBounds)
    }

    /// Special region kind represented by the tile, if any.
    #[must_use]
    pub const fn special(self) -> Option<SpecialTile> {
        match self {
            Self::StartFinish => Some(SpecialTile::StartFinish),
            Self::Checkpoint1 => Some(SpecialTile::Checkpoint1),
            Self::Checkpoint2 => Some(SpecialTile::Checkpoint2),
            Self::OutOfBounds | Self::Road => None,
        }
    }
}

impl From<Tile> for u8 {
    fn from(tile: Tile) -> Self {
        tile.code()
    }
}

impl TryFrom<u8> for Tile {
    type Error = UnknownTileCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Tile::from_code(code).ok_or(UnknownTileCode(code))
    }
}

/// Integer that does not correspond to any persisted tile code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("tile code {0} is not part of the track format")]
pub struct UnknownTileCode(pub u8);

/// Tile kinds that form regions relevant to lap progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SpecialTile {
    /// Start and finish line.
    StartFinish,
    /// First checkpoint.
    Checkpoint1,
    /// Second checkpoint.
    Checkpoint2,
}

impl SpecialTile {
    /// Every special tile kind.
    pub const ALL: [SpecialTile; 3] = [
        SpecialTile::StartFinish,
        SpecialTile::Checkpoint1,
        SpecialTile::Checkpoint2,
    ];

    /// Tile that carries this special kind.
    #[must_use]
    pub const fn tile(self) -> Tile {
        match self {
            Self::StartFinish => Tile::StartFinish,
            Self::Checkpoint1 => Tile::Checkpoint1,
            Self::Checkpoint2 => Tile::Checkpoint2,
        }
    }
}

impl fmt::Display for SpecialTile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::StartFinish => "start/finish",
            Self::Checkpoint1 => "checkpoint 1",
            Self::Checkpoint2 => "checkpoint 2",
        };
        f.write_str(label)
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Cell reached by travelling one turn at the provided velocity.
    ///
    /// Returns `None` when the destination would have a negative coordinate.
    #[must_use]
    pub fn offset(self, velocity: Velocity) -> Option<CellCoord> {
        let column = self.column.checked_add_signed(velocity.dx())?;
        let row = self.row.checked_add_signed(velocity.dy())?;
        Some(CellCoord::new(column, row))
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// Floating-point mean position of a set of cells.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    column: f64,
    row: f64,
}

impl Centroid {
    /// Creates a centroid from explicit coordinates.
    #[must_use]
    pub const fn new(column: f64, row: f64) -> Self {
        Self { column, row }
    }

    /// Centroid located exactly on a single cell.
    #[must_use]
    pub fn of_cell(cell: CellCoord) -> Self {
        Self::new(f64::from(cell.column()), f64::from(cell.row()))
    }

    /// Mean coordinate of the provided cells, or `None` when there are none.
    #[must_use]
    pub fn of(cells: &[CellCoord]) -> Option<Self> {
        if cells.is_empty() {
            return None;
        }

        let (column_sum, row_sum) = cells.iter().fold((0.0, 0.0), |(columns, rows), cell| {
            (
                columns + f64::from(cell.column()),
                rows + f64::from(cell.row()),
            )
        });
        let count = cells.len() as f64;
        Some(Self::new(column_sum / count, row_sum / count))
    }

    /// Horizontal coordinate measured in cells.
    #[must_use]
    pub const fn column(&self) -> f64 {
        self.column
    }

    /// Vertical coordinate measured in cells.
    #[must_use]
    pub const fn row(&self) -> f64 {
        self.row
    }

    /// Signed offset from the provided cell to the centroid.
    #[must_use]
    pub fn delta_from(&self, cell: CellCoord) -> (f64, f64) {
        (
            self.column - f64::from(cell.column()),
            self.row - f64::from(cell.row()),
        )
    }
}

/// Per-turn displacement of a mover measured in cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Velocity {
    dx: i32,
    dy: i32,
}

impl Velocity {
    /// Velocity of a mover at rest.
    pub const ZERO: Velocity = Velocity::new(0, 0);

    /// Creates a velocity from explicit components.
    #[must_use]
    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    /// Horizontal component in cells per turn.
    #[must_use]
    pub const fn dx(&self) -> i32 {
        self.dx
    }

    /// Vertical component in cells per turn.
    #[must_use]
    pub const fn dy(&self) -> i32 {
        self.dy
    }

    /// Velocity after applying a single acceleration.
    #[must_use]
    pub const fn accelerate(self, acceleration: Acceleration) -> Self {
        Self::new(
            self.dx + acceleration.ddx() as i32,
            self.dy + acceleration.ddy() as i32,
        )
    }

    /// Velocity that carries a mover from `from` to `to` in one turn.
    #[must_use]
    pub fn between(from: CellCoord, to: CellCoord) -> Self {
        let dx = i64::from(to.column()) - i64::from(from.column());
        let dy = i64::from(to.row()) - i64::from(from.row());
        Self::new(dx as i32, dy as i32)
    }

    /// Reports whether the velocity is zero on both axes.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

/// Bounded per-turn change of velocity with components in `{-1, 0, 1}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Acceleration {
    ddx: i8,
    ddy: i8,
}

impl Acceleration {
    /// Acceleration that keeps the current velocity.
    pub const COAST: Acceleration = Acceleration { ddx: 0, ddy: 0 };

    /// The nine permissible accelerations in generation order.
    pub const ALL: [Acceleration; 9] = [
        Acceleration { ddx: -1, ddy: -1 },
        Acceleration { ddx: -1, ddy: 0 },
        Acceleration { ddx: -1, ddy: 1 },
        Acceleration { ddx: 0, ddy: -1 },
        Acceleration { ddx: 0, ddy: 0 },
        Acceleration { ddx: 0, ddy: 1 },
        Acceleration { ddx: 1, ddy: -1 },
        Acceleration { ddx: 1, ddy: 0 },
        Acceleration { ddx: 1, ddy: 1 },
    ];

    /// Creates an acceleration, rejecting components outside `{-1, 0, 1}`.
    #[must_use]
    pub const fn new(ddx: i8, ddy: i8) -> Option<Self> {
        if ddx < -1 || ddx > 1 || ddy < -1 || ddy > 1 {
            return None;
        }
        Some(Self { ddx, ddy })
    }

    /// Acceleration that turns `current` into `next`, if it is permissible.
    #[must_use]
    pub fn between(current: Velocity, next: Velocity) -> Option<Self> {
        let ddx = i8::try_from(next.dx() - current.dx()).ok()?;
        let ddy = i8::try_from(next.dy() - current.dy()).ok()?;
        Self::new(ddx, ddy)
    }

    /// Horizontal component.
    #[must_use]
    pub const fn ddx(&self) -> i8 {
        self.ddx
    }

    /// Vertical component.
    #[must_use]
    pub const fn ddy(&self) -> i8 {
        self.ddy
    }
}

/// Identifies one of the two seats in a race.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MoverId {
    /// Seat controlled by a person or an external script.
    Human,
    /// Seat controlled by the planner.
    Autopilot,
}

impl MoverId {
    /// The other seat.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Human => Self::Autopilot,
            Self::Autopilot => Self::Human,
        }
    }
}

impl fmt::Display for MoverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Human => f.write_str("human"),
            Self::Autopilot => f.write_str("autopilot"),
        }
    }
}

/// Next unmet requirement on the way to completing a lap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LapStage {
    /// The first checkpoint has not been crossed this lap.
    NeedCheckpoint1,
    /// The second checkpoint has not been crossed this lap.
    NeedCheckpoint2,
    /// Both checkpoints are done and the finish line is next.
    NeedFinish,
}

/// Complete kinematic and progress state of a mover.
///
/// Equal values describe the same search node regardless of how they were
/// reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MoverState {
    /// Cell currently occupied.
    pub cell: CellCoord,
    /// Velocity carried into the next move.
    pub velocity: Velocity,
    /// Whether the first checkpoint was crossed during the current lap.
    pub checkpoint1_passed: bool,
    /// Whether the second checkpoint was crossed during the current lap.
    pub checkpoint2_passed: bool,
    /// One-based lap currently being driven.
    pub lap: u32,
}

impl MoverState {
    /// State of a mover parked on its start cell before the first move.
    #[must_use]
    pub const fn at_start(cell: CellCoord) -> Self {
        Self {
            cell,
            velocity: Velocity::ZERO,
            checkpoint1_passed: false,
            checkpoint2_passed: false,
            lap: 1,
        }
    }

    /// Next requirement for completing the current lap.
    #[must_use]
    pub const fn stage(&self) -> LapStage {
        if !self.checkpoint1_passed {
            LapStage::NeedCheckpoint1
        } else if !self.checkpoint2_passed {
            LapStage::NeedCheckpoint2
        } else {
            LapStage::NeedFinish
        }
    }

    /// Reports whether the mover completed every required lap.
    #[must_use]
    pub const fn has_finished(&self, required_laps: u32) -> bool {
        self.lap > required_laps
    }
}

/// Special tile touched while a move travels across the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CrossingEvent {
    /// Kind of special tile.
    pub kind: SpecialTile,
    /// Cell where the tile was touched.
    pub cell: CellCoord,
}

/// Ordered waypoints produced by the planner and consumed one per turn.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Plan {
    waypoints: Vec<CellCoord>,
    cursor: usize,
}

impl Plan {
    /// Creates a plan positioned on its first waypoint.
    #[must_use]
    pub fn new(waypoints: Vec<CellCoord>) -> Self {
        Self {
            waypoints,
            cursor: 0,
        }
    }

    /// Every waypoint, including those already executed.
    #[must_use]
    pub fn waypoints(&self) -> &[CellCoord] {
        &self.waypoints
    }

    /// Index of the waypoint the mover currently occupies.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Waypoint the mover currently occupies.
    #[must_use]
    pub fn current(&self) -> Option<CellCoord> {
        self.waypoints.get(self.cursor).copied()
    }

    /// Waypoint the next move should reach.
    #[must_use]
    pub fn next_waypoint(&self) -> Option<CellCoord> {
        self.waypoints.get(self.cursor + 1).copied()
    }

    /// Waypoints from the current one onward.
    #[must_use]
    pub fn remaining(&self) -> &[CellCoord] {
        self.waypoints.get(self.cursor..).unwrap_or(&[])
    }

    /// Up to `count` segments starting at the current waypoint.
    pub fn upcoming_segments(
        &self,
        count: usize,
    ) -> impl Iterator<Item = (CellCoord, CellCoord)> + '_ {
        self.remaining()
            .windows(2)
            .take(count)
            .map(|pair| (pair[0], pair[1]))
    }

    /// Number of moves the complete plan describes.
    #[must_use]
    pub fn move_count(&self) -> usize {
        self.waypoints.len().saturating_sub(1)
    }

    /// Reports whether no further waypoint remains to be driven.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.next_waypoint().is_none()
    }

    /// Moves the cursor onto the next waypoint and returns it.
    pub fn advance(&mut self) -> Option<CellCoord> {
        let next = self.next_waypoint()?;
        self.cursor += 1;
        Some(next)
    }

    /// Replaces the waypoints from the cursor onward with `replacement`.
    ///
    /// The replacement must start at the current cell. Executed waypoints are
    /// kept and the cursor is clamped into the resulting range.
    pub fn splice(&mut self, replacement: Vec<CellCoord>) {
        self.waypoints.truncate(self.cursor);
        self.waypoints.extend(replacement);
        self.cursor = self.cursor.min(self.waypoints.len().saturating_sub(1));
    }

    /// Consumes the plan and returns its waypoints.
    #[must_use]
    pub fn into_waypoints(self) -> Vec<CellCoord> {
        self.waypoints
    }
}

/// Commands that express all permissible race mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Resets the session and places the movers on their start cells.
    StartRace {
        /// Laps each mover must complete to win.
        required_laps: u32,
        /// Start cell of the human seat.
        human_start: CellCoord,
        /// Start cell of the autopilot seat, or `None` for a solo race.
        autopilot_start: Option<CellCoord>,
    },
    /// Validates a move for the mover whose turn it is and holds it in flight.
    BeginMove {
        /// Mover requesting the move.
        mover: MoverId,
        /// Acceleration applied before travelling.
        acceleration: Acceleration,
    },
    /// Applies the in-flight move, its progress and the turn hand-off.
    CommitMove,
}

/// Events broadcast by the race session after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A race was configured and the movers were placed.
    RaceStarted {
        /// Laps each mover must complete to win.
        required_laps: u32,
        /// Start cell of the human seat.
        human_start: CellCoord,
        /// Start cell of the autopilot seat, if one participates.
        autopilot_start: Option<CellCoord>,
    },
    /// A `StartRace` command was refused.
    RaceRejected {
        /// Why the race could not start.
        reason: StartRejection,
    },
    /// A mover became responsible for the next move.
    TurnStarted {
        /// Mover whose turn began.
        mover: MoverId,
    },
    /// A mover had no legal, non-colliding move and lost its turn.
    TurnSkipped {
        /// Mover whose turn was skipped.
        mover: MoverId,
    },
    /// A move passed validation and is now in flight.
    MoveStarted {
        /// Mover performing the move.
        mover: MoverId,
        /// Cell the move leaves.
        from: CellCoord,
        /// Cell the move reaches.
        to: CellCoord,
        /// Velocity after the acceleration.
        velocity: Velocity,
    },
    /// A move request was refused.
    MoveRejected {
        /// Mover that requested the move.
        mover: MoverId,
        /// Acceleration that was requested.
        acceleration: Acceleration,
        /// Reason the move was refused.
        reason: MoveRejection,
    },
    /// An in-flight move was applied.
    MoveCommitted {
        /// Mover that moved.
        mover: MoverId,
        /// Cell the move left.
        from: CellCoord,
        /// Cell the move reached.
        to: CellCoord,
        /// Velocity carried into the mover's next turn.
        velocity: Velocity,
    },
    /// A checkpoint counted towards the current lap.
    CheckpointPassed {
        /// Mover that crossed the checkpoint.
        mover: MoverId,
        /// Checkpoint that was credited.
        checkpoint: SpecialTile,
    },
    /// The finish line was crossed before both checkpoints.
    FinishMissed {
        /// Mover whose lap progress was reset.
        mover: MoverId,
    },
    /// A mover completed a lap.
    LapCompleted {
        /// Mover that completed the lap.
        mover: MoverId,
        /// One-based number of the lap that was completed.
        completed_lap: u32,
    },
    /// The race ended.
    RaceFinished {
        /// How the race ended.
        outcome: RaceOutcome,
    },
}

/// Reasons a `StartRace` command can be refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StartRejection {
    /// Zero laps were requested.
    NoLaps,
    /// A start cell is not part of the start/finish line.
    NotOnFinishLine {
        /// Offending start cell.
        cell: CellCoord,
    },
}

/// Reasons a move request can be refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveRejection {
    /// No race is currently running.
    RaceNotRunning,
    /// The requesting mover does not hold the turn.
    NotYourTurn,
    /// Another move is still waiting to be committed.
    MoveInFlight,
    /// The destination lies outside the grid.
    LeavesGrid,
    /// The straight path touches an out-of-bounds cell.
    Blocked {
        /// First out-of-bounds cell along the path.
        at: CellCoord,
    },
    /// The destination or path touches the opponent's cell.
    CollidesWithOpponent {
        /// Cell occupied by the opponent.
        at: CellCoord,
    },
}

/// Final result of a race.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RaceOutcome {
    /// The mover completed every required lap first.
    Winner(MoverId),
    /// No mover had a legal move left.
    Stalled,
}

/// Errors raised while building a track from raw tile data.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TrackError {
    /// The grid has no rows or no columns.
    #[error("track grid is empty")]
    EmptyGrid,
    /// A row length differs from the first row.
    #[error("row {row} has {found} tiles but the first row has {expected}")]
    RaggedRow {
        /// Zero-based index of the offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },
    /// A cell holds a code outside the track format.
    #[error("unknown tile code {code} at column {column}, row {row}")]
    UnknownTileCode {
        /// Offending code.
        code: u8,
        /// Zero-based column of the cell.
        column: usize,
        /// Zero-based row of the cell.
        row: usize,
    },
    /// A cell holds a character outside the text layout alphabet.
    #[error("unknown tile glyph {glyph:?} at column {column}, row {row}")]
    UnknownTileGlyph {
        /// Offending character.
        glyph: char,
        /// Zero-based column of the cell.
        column: usize,
        /// Zero-based row of the cell.
        row: usize,
    },
    /// The grid lacks any cell of a required special kind.
    #[error("track has no {0} region")]
    MissingRegion(SpecialTile),
}
