use ndarray::Array2;
use serde::{Deserialize, Serialize};

pub use cell::*;
pub use error::*;
pub use game::*;
pub use generator::*;
pub use types::*;

mod cell;
mod error;
mod game;
mod generator;
mod types;

/// Requested board dimensions and mine count.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSpec {
    pub rows: Coord,
    pub cols: Coord,
    pub mines: CellCount,
}

impl BoardSpec {
    pub const fn new(rows: Coord, cols: Coord, mines: CellCount) -> Self {
        Self { rows, cols, mines }
    }

    /// A spec is valid when both axes are positive and at least one cell is
    /// left free of mines.
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 || self.mines >= self.total_cells() {
            Err(GameError::InvalidBoardSpec)
        } else {
            Ok(())
        }
    }

    pub const fn total_cells(&self) -> CellCount {
        cell_total(self.cols, self.rows)
    }
}

/// The generated minefield, immutable after creation. Every safe cell
/// carries its adjacent-mine count, computed once at construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    cells: Array2<BoardCell>,
    mine_count: CellCount,
}

impl Board {
    /// Builds a board from a mine mask, filling in the adjacency counts for
    /// every safe cell.
    pub fn from_mine_mask(mine_mask: Array2<bool>) -> Self {
        let mut cells = Array2::from_elem(mine_mask.raw_dim(), BoardCell::Count(0));
        let mut mine_count: CellCount = 0;

        let (rows, cols) = mine_mask.dim();
        for y in 0..rows {
            for x in 0..cols {
                let coords = (x as Coord, y as Coord);
                if mine_mask[coords.to_nd_index()] {
                    cells[coords.to_nd_index()] = BoardCell::Mine;
                    mine_count += 1;
                } else {
                    let adjacent = mine_mask
                        .iter_neighbors(coords)
                        .filter(|&pos| mine_mask[pos.to_nd_index()])
                        .count();
                    cells[coords.to_nd_index()] = BoardCell::Count(adjacent.try_into().unwrap());
                }
            }
        }

        Self { cells, mine_count }
    }

    pub fn from_mine_coords(spec: BoardSpec, mine_coords: &[Coord2]) -> Result<Self> {
        let mut mine_mask: Array2<bool> =
            Array2::default([spec.rows as usize, spec.cols as usize]);

        for &coords in mine_coords {
            if coords.0 >= spec.cols || coords.1 >= spec.rows {
                return Err(GameError::OutOfBounds);
            }
            mine_mask[coords.to_nd_index()] = true;
        }

        Ok(Self::from_mine_mask(mine_mask))
    }

    pub fn spec(&self) -> BoardSpec {
        BoardSpec {
            rows: self.rows(),
            cols: self.cols(),
            mines: self.mine_count,
        }
    }

    pub fn rows(&self) -> Coord {
        self.cells.dim().0.try_into().unwrap()
    }

    pub fn cols(&self) -> Coord {
        self.cells.dim().1.try_into().unwrap()
    }

    pub fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        if coords.0 < self.cols() && coords.1 < self.rows() {
            Ok(coords)
        } else {
            Err(GameError::OutOfBounds)
        }
    }

    pub fn cell_at(&self, coords: Coord2) -> BoardCell {
        self.cells[coords.to_nd_index()]
    }

    pub fn contains_mine(&self, coords: Coord2) -> bool {
        self.cells[coords.to_nd_index()].is_mine()
    }

    pub fn mine_count(&self) -> CellCount {
        self.mine_count
    }

    pub fn total_cells(&self) -> CellCount {
        self.cells.len().try_into().unwrap()
    }

    pub fn safe_cell_count(&self) -> CellCount {
        self.total_cells() - self.mine_count
    }

    pub(crate) fn iter_neighbors(&self, coords: Coord2) -> NeighborIter {
        self.cells.iter_neighbors(coords)
    }
}

/// Outcome of a flag/question mark attempt.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MarkOutcome {
    NoChange,
    Changed,
}

impl MarkOutcome {
    pub const fn has_update(self) -> bool {
        match self {
            Self::NoChange => false,
            Self::Changed => true,
        }
    }
}

/// Outcome of a reveal attempt.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RevealOutcome {
    NoChange,
    Revealed,
    HitMine,
    Won,
}

impl RevealOutcome {
    pub const fn has_update(self) -> bool {
        use RevealOutcome::*;
        match self {
            NoChange => false,
            Revealed => true,
            HitMine => true,
            Won => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_rejects_empty_axes_and_full_boards() {
        assert_eq!(
            BoardSpec::new(0, 5, 1).validate(),
            Err(GameError::InvalidBoardSpec)
        );
        assert_eq!(
            BoardSpec::new(5, 0, 1).validate(),
            Err(GameError::InvalidBoardSpec)
        );
        assert_eq!(
            BoardSpec::new(3, 3, 9).validate(),
            Err(GameError::InvalidBoardSpec)
        );
        assert_eq!(BoardSpec::new(3, 3, 8).validate(), Ok(()));
        assert_eq!(BoardSpec::new(1, 2, 0).validate(), Ok(()));
    }

    #[test]
    fn adjacency_counts_cover_the_whole_grid() {
        let spec = BoardSpec::new(3, 3, 1);
        let board = Board::from_mine_coords(spec, &[(1, 1)]).unwrap();

        assert_eq!(board.mine_count(), 1);
        assert_eq!(board.safe_cell_count(), 8);
        for y in 0..3 {
            for x in 0..3 {
                let coords = (x, y);
                if coords == (1, 1) {
                    assert!(board.contains_mine(coords));
                } else {
                    assert_eq!(board.cell_at(coords), BoardCell::Count(1));
                }
            }
        }
    }

    #[test]
    fn corner_mine_counts_clip_at_edges() {
        let spec = BoardSpec::new(2, 2, 1);
        let board = Board::from_mine_coords(spec, &[(0, 0)]).unwrap();

        assert_eq!(board.cell_at((1, 0)), BoardCell::Count(1));
        assert_eq!(board.cell_at((0, 1)), BoardCell::Count(1));
        assert_eq!(board.cell_at((1, 1)), BoardCell::Count(1));
    }

    #[test]
    fn mine_coords_outside_the_spec_are_rejected() {
        let spec = BoardSpec::new(2, 2, 1);

        assert_eq!(
            Board::from_mine_coords(spec, &[(2, 0)]),
            Err(GameError::OutOfBounds)
        );
    }

    #[test]
    fn coords_validation_uses_cols_for_x_and_rows_for_y() {
        let board = Board::from_mine_coords(BoardSpec::new(2, 4, 1), &[(0, 0)]).unwrap();

        assert!(board.validate_coords((3, 1)).is_ok());
        assert_eq!(board.validate_coords((4, 0)), Err(GameError::OutOfBounds));
        assert_eq!(board.validate_coords((0, 2)), Err(GameError::OutOfBounds));
    }
}
