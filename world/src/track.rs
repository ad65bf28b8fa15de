//! Tile grid storage and the analysed track derived from it.

use rand::{seq::SliceRandom, Rng};
use vector_racing_core::{CellCoord, Centroid, LapStage, MoverState, SpecialTile, Tile, TrackError};

use crate::connectivity::{find_regions, Region};

/// Fewest cells a special region should have to be considered well formed.
pub const MIN_REGION_CELLS: usize = 4;

/// Dense row-major grid of track tiles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackGrid {
    columns: u32,
    rows: u32,
    tiles: Vec<Tile>,
}

impl TrackGrid {
    /// Creates a grid where every cell holds the same tile.
    #[must_use]
    pub fn filled(columns: u32, rows: u32, tile: Tile) -> Self {
        let count = usize::try_from(columns)
            .ok()
            .zip(usize::try_from(rows).ok())
            .and_then(|(columns, rows)| columns.checked_mul(rows))
            .unwrap_or(0);
        Self {
            columns,
            rows,
            tiles: vec![tile; count],
        }
    }

    /// Builds a grid from rows of tiles.
    pub fn from_rows(rows: Vec<Vec<Tile>>) -> Result<Self, TrackError> {
        let expected = rows.first().map_or(0, Vec::len);
        if expected == 0 {
            return Err(TrackError::EmptyGrid);
        }

        let mut tiles = Vec::with_capacity(expected * rows.len());
        for (index, row) in rows.iter().enumerate() {
            if row.len() != expected {
                return Err(TrackError::RaggedRow {
                    row: index,
                    expected,
                    found: row.len(),
                });
            }
            tiles.extend_from_slice(row);
        }

        let columns = u32::try_from(expected).map_err(|_| TrackError::EmptyGrid)?;
        let row_count = u32::try_from(rows.len()).map_err(|_| TrackError::EmptyGrid)?;

        Ok(Self {
            columns,
            rows: row_count,
            tiles,
        })
    }

    /// Builds a grid from rows of persisted tile codes.
    pub fn from_codes(rows: &[Vec<u8>]) -> Result<Self, TrackError> {
        let tiles = rows
            .iter()
            .enumerate()
            .map(|(row, codes)| {
                codes
                    .iter()
                    .enumerate()
                    .map(|(column, &code)| {
                        Tile::from_code(code).ok_or(TrackError::UnknownTileCode {
                            code,
                            column,
                            row,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_rows(tiles)
    }

    /// Builds a grid from text rows using the tile glyph alphabet.
    pub fn from_glyphs<S: AsRef<str>>(lines: &[S]) -> Result<Self, TrackError> {
        let tiles = lines
            .iter()
            .enumerate()
            .map(|(row, line)| {
                line.as_ref()
                    .chars()
                    .enumerate()
                    .map(|(column, glyph)| {
                        Tile::from_glyph(glyph).ok_or(TrackError::UnknownTileGlyph {
                            glyph,
                            column,
                            row,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_rows(tiles)
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Total number of cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.tiles.len()
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Tile stored at the cell, or `None` outside the grid.
    #[must_use]
    pub fn tile(&self, cell: CellCoord) -> Option<Tile> {
        self.index(cell)
            .and_then(|index| self.tiles.get(index).copied())
    }

    /// Overwrites the tile at the cell. Cells outside the grid are ignored.
    pub fn set(&mut self, cell: CellCoord, tile: Tile) {
        if let Some(slot) = self.index(cell).and_then(|index| self.tiles.get_mut(index)) {
            *slot = tile;
        }
    }

    /// Iterates every cell with its tile in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (CellCoord, Tile)> + '_ {
        let columns = self.columns.max(1);
        self.tiles.iter().enumerate().map(move |(index, &tile)| {
            let index = u32::try_from(index).unwrap_or(u32::MAX);
            (CellCoord::new(index % columns, index / columns), tile)
        })
    }

    /// Rows of persisted tile codes.
    #[must_use]
    pub fn to_codes(&self) -> Vec<Vec<u8>> {
        self.rows_of(Tile::code)
    }

    /// Rows of text glyphs.
    #[must_use]
    pub fn to_glyphs(&self) -> Vec<String> {
        self.rows_of(Tile::glyph)
            .into_iter()
            .map(|row| row.into_iter().collect())
            .collect()
    }

    /// Copy of the grid with the cell turned into an obstacle.
    #[must_use]
    pub fn with_obstacle(&self, cell: CellCoord) -> TrackGrid {
        let mut copy = self.clone();
        copy.set(cell, Tile::OutOfBounds);
        copy
    }

    pub(crate) fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }

        let width = usize::try_from(self.columns).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let row = usize::try_from(cell.row()).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    fn rows_of<T>(&self, map: fn(Tile) -> T) -> Vec<Vec<T>> {
        let width = usize::try_from(self.columns).unwrap_or(0).max(1);
        self.tiles
            .chunks(width)
            .map(|row| row.iter().map(|&tile| map(tile)).collect())
            .collect()
    }
}

/// Layout problem that does not prevent racing but breaks the authoring rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutIssue {
    /// A region is smaller than [`MIN_REGION_CELLS`].
    UndersizedRegion {
        /// Kind of the region.
        kind: SpecialTile,
        /// Number of cells it has.
        cells: usize,
    },
    /// More than one region of a checkpoint kind exists; only the first counts.
    ExtraRegions {
        /// Kind of the duplicated regions.
        kind: SpecialTile,
        /// Number of regions that are ignored.
        ignored: usize,
    },
    /// The two checkpoint regions share an edge.
    AdjacentCheckpoints,
}

/// Grid together with the regions that drive lap progress.
///
/// The grid is treated as immutable once analysed; obstacle variants are
/// built as separate copies.
#[derive(Clone, Debug)]
pub struct Track {
    grid: TrackGrid,
    finish_line: Vec<CellCoord>,
    finish_centroid: Centroid,
    checkpoint1: Region,
    checkpoint2: Region,
    issues: Vec<LayoutIssue>,
}

impl Track {
    /// Analyses the grid into regions, failing when a required kind is absent.
    pub fn analyze(grid: TrackGrid) -> Result<Self, TrackError> {
        let finish_regions = find_regions(&grid, SpecialTile::StartFinish);
        let mut finish_line: Vec<CellCoord> = finish_regions
            .iter()
            .flat_map(|region| region.cells().iter().copied())
            .collect();
        finish_line.sort_by_key(|cell| (cell.row(), cell.column()));
        let finish_centroid = Centroid::of(&finish_line)
            .ok_or(TrackError::MissingRegion(SpecialTile::StartFinish))?;

        let mut issues = Vec::new();
        if !finish_regions
            .iter()
            .any(|region| region.len() >= MIN_REGION_CELLS)
        {
            issues.push(LayoutIssue::UndersizedRegion {
                kind: SpecialTile::StartFinish,
                cells: finish_regions.iter().map(Region::len).max().unwrap_or(0),
            });
        }

        let checkpoint1 = first_region(&grid, SpecialTile::Checkpoint1, &mut issues)?;
        let checkpoint2 = first_region(&grid, SpecialTile::Checkpoint2, &mut issues)?;
        if checkpoint1.touches(&checkpoint2) {
            issues.push(LayoutIssue::AdjacentCheckpoints);
        }

        for issue in &issues {
            tracing::warn!(?issue, "track layout issue");
        }
        tracing::info!(
            columns = grid.columns(),
            rows = grid.rows(),
            finish_cells = finish_line.len(),
            checkpoint1_cells = checkpoint1.len(),
            checkpoint2_cells = checkpoint2.len(),
            "track analysed"
        );

        Ok(Self {
            grid,
            finish_line,
            finish_centroid,
            checkpoint1,
            checkpoint2,
            issues,
        })
    }

    /// Underlying tile grid.
    #[must_use]
    pub const fn grid(&self) -> &TrackGrid {
        &self.grid
    }

    /// Every start/finish cell in row-major order.
    #[must_use]
    pub fn finish_line(&self) -> &[CellCoord] {
        &self.finish_line
    }

    /// Reports whether the cell is part of the start/finish line.
    #[must_use]
    pub fn is_on_finish_line(&self, cell: CellCoord) -> bool {
        self.grid.tile(cell) == Some(Tile::StartFinish)
    }

    /// First start/finish cell in row-major order.
    #[must_use]
    pub fn finish_anchor(&self) -> CellCoord {
        self.finish_line
            .first()
            .copied()
            .unwrap_or_else(|| CellCoord::new(0, 0))
    }

    /// Mean position of every start/finish cell.
    #[must_use]
    pub const fn finish_centroid(&self) -> Centroid {
        self.finish_centroid
    }

    /// Region that counts as the first checkpoint.
    #[must_use]
    pub const fn checkpoint1(&self) -> &Region {
        &self.checkpoint1
    }

    /// Region that counts as the second checkpoint.
    #[must_use]
    pub const fn checkpoint2(&self) -> &Region {
        &self.checkpoint2
    }

    /// Authoring problems found while analysing the grid.
    #[must_use]
    pub fn layout_issues(&self) -> &[LayoutIssue] {
        &self.issues
    }

    /// Centroid of the next unmet requirement for the provided state.
    #[must_use]
    pub fn sub_goal(&self, state: &MoverState) -> Centroid {
        match state.stage() {
            LapStage::NeedCheckpoint1 => self.checkpoint1.centroid(),
            LapStage::NeedCheckpoint2 => self.checkpoint2.centroid(),
            LapStage::NeedFinish => self.finish_centroid,
        }
    }

    /// Copy of the track whose grid has the cell turned into an obstacle.
    ///
    /// Regions are kept as analysed so progress rules stay unchanged.
    #[must_use]
    pub fn with_obstacle(&self, cell: CellCoord) -> Track {
        Track {
            grid: self.grid.with_obstacle(cell),
            ..self.clone()
        }
    }
}

fn first_region(
    grid: &TrackGrid,
    kind: SpecialTile,
    issues: &mut Vec<LayoutIssue>,
) -> Result<Region, TrackError> {
    let mut regions = find_regions(grid, kind).into_iter();
    let region = regions.next().ok_or(TrackError::MissingRegion(kind))?;

    let ignored = regions.count();
    if ignored > 0 {
        issues.push(LayoutIssue::ExtraRegions { kind, ignored });
    }
    if region.len() < MIN_REGION_CELLS {
        issues.push(LayoutIssue::UndersizedRegion {
            kind,
            cells: region.len(),
        });
    }

    Ok(region)
}

/// Start cells chosen for a race.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StartGrid {
    /// Start cell of the human seat.
    pub human: CellCoord,
    /// Start cell of the autopilot seat, when one participates.
    pub autopilot: Option<CellCoord>,
}

/// Picks random start cells on the finish line.
///
/// The two seats get distinct cells whenever the line has more than one.
pub fn starting_grid<R: Rng + ?Sized>(track: &Track, rng: &mut R, with_autopilot: bool) -> StartGrid {
    let anchor = track.finish_anchor();
    let line = track.finish_line();
    let human = line.choose(rng).copied().unwrap_or(anchor);

    let autopilot = with_autopilot.then(|| {
        let others: Vec<CellCoord> = line.iter().copied().filter(|&cell| cell != human).collect();
        others.choose(rng).copied().unwrap_or(human)
    });

    StartGrid { human, autopilot }
}
