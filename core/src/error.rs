use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid board spec: rows and cols must be positive, mines must be fewer than cells")]
    InvalidBoardSpec,
    #[error("Cell coordinates outside the board")]
    OutOfBounds,
    #[error("Game already finished, no further actions are accepted")]
    AlreadyTerminal,
}

pub type Result<T> = core::result::Result<T, GameError>;
