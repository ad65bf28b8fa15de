//! Flood-fill grouping of special tiles into regions.

use std::collections::{HashSet, VecDeque};

use vector_racing_core::{CellCoord, Centroid, SpecialTile};

use crate::track::TrackGrid;

/// Maximal 4-connected cluster of cells that share one special tile kind.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    kind: SpecialTile,
    cells: Vec<CellCoord>,
    members: HashSet<CellCoord>,
    centroid: Centroid,
}

impl Region {
    /// Special tile kind shared by every member.
    #[must_use]
    pub const fn kind(&self) -> SpecialTile {
        self.kind
    }

    /// Member cells in discovery order.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// Number of member cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether the region has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Reports whether the cell belongs to the region.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.members.contains(&cell)
    }

    /// Mean coordinate of the member cells.
    #[must_use]
    pub const fn centroid(&self) -> Centroid {
        self.centroid
    }

    /// Reports whether any member touches a member of `other` along an edge.
    #[must_use]
    pub fn touches(&self, other: &Region) -> bool {
        self.cells.iter().any(|&cell| {
            neighbors(cell, u32::MAX, u32::MAX).any(|neighbor| other.contains(neighbor))
        })
    }
}

/// Returns every region of `kind` in row-major discovery order.
#[must_use]
pub fn find_regions(grid: &TrackGrid, kind: SpecialTile) -> Vec<Region> {
    let target = kind.tile();
    let mut visited = vec![false; grid.cell_count()];
    let mut regions = Vec::new();

    for (cell, tile) in grid.cells() {
        if tile != target {
            continue;
        }

        let Some(index) = grid.index(cell) else {
            continue;
        };

        if visited[index] {
            continue;
        }

        visited[index] = true;
        regions.push(flood(grid, kind, cell, &mut visited));
    }

    regions
}

fn flood(grid: &TrackGrid, kind: SpecialTile, seed: CellCoord, visited: &mut [bool]) -> Region {
    let target = kind.tile();
    let mut queue = VecDeque::from([seed]);
    let mut cells = Vec::new();

    while let Some(cell) = queue.pop_front() {
        cells.push(cell);

        for neighbor in neighbors(cell, grid.columns(), grid.rows()) {
            if grid.tile(neighbor) != Some(target) {
                continue;
            }

            let Some(index) = grid.index(neighbor) else {
                continue;
            };

            if visited[index] {
                continue;
            }

            visited[index] = true;
            queue.push_back(neighbor);
        }
    }

    let centroid = Centroid::of(&cells).unwrap_or_else(|| Centroid::of_cell(seed));
    let members = cells.iter().copied().collect();

    Region {
        kind,
        cells,
        members,
        centroid,
    }
}

pub(crate) fn neighbors(
    cell: CellCoord,
    width: u32,
    height: u32,
) -> impl Iterator<Item = CellCoord> {
    let mut candidates = [None; 4];
    let mut count = 0;

    if let Some(row) = cell.row().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(cell.column(), row));
        count += 1;
    }

    if let Some(column) = cell.column().checked_add(1) {
        if column < width {
            candidates[count] = Some(CellCoord::new(column, cell.row()));
            count += 1;
        }
    }

    if let Some(row) = cell.row().checked_add(1) {
        if row < height {
            candidates[count] = Some(CellCoord::new(cell.column(), row));
            count += 1;
        }
    }

    if let Some(column) = cell.column().checked_sub(1) {
        candidates[count] = Some(CellCoord::new(column, cell.row()));
        count += 1;
    }

    candidates.into_iter().take(count).flatten()
}
