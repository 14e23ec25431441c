use serde::{Deserialize, Serialize};

/// A single cell of the generated board: a mine, or its adjacent-mine count.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoardCell {
    Mine,
    Count(u8),
}

impl BoardCell {
    pub const fn is_mine(self) -> bool {
        matches!(self, Self::Mine)
    }

    /// Adjacent-mine count for a safe cell, `None` for a mine.
    pub const fn count(self) -> Option<u8> {
        match self {
            Self::Mine => None,
            Self::Count(count) => Some(count),
        }
    }
}

/// Player-visible mark kept per cell, all `Hidden` at game creation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellMark {
    Hidden,
    Revealed,
    Flagged,
    Questioned,
}

impl CellMark {
    pub const fn is_revealed(self) -> bool {
        matches!(self, Self::Revealed)
    }
}

impl Default for CellMark {
    fn default() -> Self {
        Self::Hidden
    }
}
