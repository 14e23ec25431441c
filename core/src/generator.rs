use ndarray::Array2;
use rand::prelude::*;

use crate::*;

/// Strategy seam for mine placement; the service picks one at game creation.
pub trait BoardGenerator {
    fn generate(&self, spec: &BoardSpec) -> Result<Board>;
}

/// Consecutive duplicate hits tolerated before rejection sampling gives up
/// and the remaining mines are drawn from the free cells directly.
const DUPLICATE_STREAK_LIMIT: u32 = 64;

/// Purely random placement: uniform rejection sampling over the grid, with a
/// fallback to sampling the remaining free cells without replacement so that
/// near-full boards cannot loop unboundedly.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RandomBoardGenerator {
    seed: u64,
}

impl RandomBoardGenerator {
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn from_entropy() -> Self {
        Self { seed: rand::rng().random() }
    }
}

impl BoardGenerator for RandomBoardGenerator {
    fn generate(&self, spec: &BoardSpec) -> Result<Board> {
        spec.validate()?;

        let mut rng = SmallRng::seed_from_u64(self.seed);
        let mut mine_mask: Array2<bool> =
            Array2::default([spec.rows as usize, spec.cols as usize]);
        let mut placed: CellCount = 0;
        let mut duplicate_streak: u32 = 0;

        while placed < spec.mines {
            let x: Coord = rng.random_range(0..spec.cols);
            let y: Coord = rng.random_range(0..spec.rows);
            let index = (x, y).to_nd_index();
            if mine_mask[index] {
                duplicate_streak += 1;
                if duplicate_streak >= DUPLICATE_STREAK_LIMIT {
                    break;
                }
                continue;
            }
            mine_mask[index] = true;
            placed += 1;
            duplicate_streak = 0;
        }

        if placed < spec.mines {
            // dense board: draw the rest from the free cells directly
            let missing = usize::from(spec.mines - placed);
            log::debug!(
                "rejection sampling stalled at {placed}/{} mines, drawing {missing} from free cells",
                spec.mines
            );
            let free_cells: Vec<usize> = mine_mask
                .iter()
                .enumerate()
                .filter(|&(_, &is_mine)| !is_mine)
                .map(|(flat, _)| flat)
                .collect();
            let tiles = mine_mask.as_slice_mut().expect("standard layout");
            for pick in rand::seq::index::sample(&mut rng, free_cells.len(), missing) {
                tiles[free_cells[pick]] = true;
            }
        }

        Ok(Board::from_mine_mask(mine_mask))
    }
}
