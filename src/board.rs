//! Battleship mask generation, the reference collaborator for the solver.
//!
//! The solver itself only ever sees opaque bitmask groups; this module is one
//! way to produce them. Cell `(x, y)` of a `width x height` grid maps to
//! universe bit `y * width + x`.

use crate::bitmask::{EMPTY, Mask};

/// knowledge state of a single grid cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum CellState {
    #[default]
    Unknown,
    Miss,
    Hit,
    Sunk,
}

/// rectangular battleship grid of at most 128 cells.
#[derive(Clone, Debug)]
pub struct Board {
    width: usize,
    height: usize,
    cells: Vec<CellState>,
}

impl Board {
    /// Panics if the grid does not fit the mask universe.
    pub fn new(width: usize, height: usize) -> Self {
        assert!(
            width * height <= Mask::WIDTH,
            "{width}x{height} board exceeds the {}-bit mask universe",
            Mask::WIDTH
        );
        Self { width, height, cells: vec![CellState::Unknown; width * height] }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell(&self, x: usize, y: usize) -> CellState {
        self.cells[y * self.width + x]
    }

    /// Record knowledge about a cell. Out-of-range coordinates are ignored.
    pub fn set_cell(&mut self, x: usize, y: usize, state: CellState) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = state;
        }
    }

    /// Admissible placements for one ship: horizontal and vertical runs of
    /// `size` cells that stay on the grid and avoid cells known to be empty
    /// water (`Miss`) or already-sunk ships.
    fn placements(&self, size: usize) -> Vec<Vec<(usize, usize)>> {
        let mut placements = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                if x + size <= self.width {
                    placements.push((0..size).map(|i| (x + i, y)).collect());
                }
                if y + size <= self.height {
                    placements.push((0..size).map(|i| (x, y + i)).collect());
                }
            }
        }
        placements.retain(|cells: &Vec<(usize, usize)>| {
            cells
                .iter()
                .all(|&(x, y)| !matches!(self.cell(x, y), CellState::Miss | CellState::Sunk))
        });
        placements
    }

    /// Bitmask per admissible placement of a `size`-cell ship, padded with
    /// the right, down and down-right neighbour of every occupied cell.
    ///
    /// The one-sided padding is what encodes the no-touch rule: two padded
    /// placements share a bit exactly when the unpadded ships overlap or
    /// touch, diagonals included.
    pub fn placement_masks(&self, size: usize) -> Vec<Mask> {
        self.placements(size)
            .iter()
            .map(|cells| {
                let mut mask = EMPTY;
                for &(x, y) in cells {
                    mask |= Mask::bit(y * self.width + x);
                    for (dx, dy) in [(1, 0), (0, 1), (1, 1)] {
                        let (nx, ny) = (x + dx, y + dy);
                        if nx < self.width && ny < self.height {
                            mask |= Mask::bit(ny * self.width + nx);
                        }
                    }
                }
                mask
            })
            .collect()
    }

    /// One mask group per entry of `ship_sizes`, ready for
    /// [`Problem::from_groups`](crate::Problem::from_groups).
    pub fn mask_groups(&self, ship_sizes: &[usize]) -> Vec<Vec<Mask>> {
        ship_sizes.iter().map(|&size| self.placement_masks(size)).collect()
    }
}
