use demine_core::GameError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Unknown game id: {0}")]
    GameNotFound(String),
    #[error("Concurrent updates exhausted the retry budget for game {0}")]
    ConcurrencyConflict(String),
    #[error(transparent)]
    Game(#[from] GameError),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
