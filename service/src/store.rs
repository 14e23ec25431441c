use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use demine_core::Game;
use parking_lot::RwLock;

use crate::{Result, ServiceError};

/// Monotonic per-record version used for optimistic concurrency control.
pub type Version = u64;

/// Keyed durable storage for games.
///
/// `update` commits only when the caller still holds the latest version;
/// a stale version fails with `ConcurrencyConflict`, which is how racing
/// mutations of a single game (a reveal against a timeout fire) are
/// serialized without holding a lock across the whole read-modify-write.
#[async_trait]
pub trait GameStore: Send + Sync {
    async fn insert(&self, game: Game) -> Result<()>;

    /// Loads a game together with the version an update must present.
    async fn load(&self, id: &str) -> Result<(Game, Version)>;

    /// Conditional write: commits the record and bumps its version, or
    /// fails with `ConcurrencyConflict` when `expected` is stale.
    async fn update(&self, expected: Version, game: Game) -> Result<()>;

    /// Ids of games that have not reached a terminal state. The timeout
    /// scheduler re-arms from these after a restart.
    async fn active_ids(&self) -> Vec<String>;
}

#[async_trait]
impl<T: GameStore + ?Sized> GameStore for Arc<T> {
    async fn insert(&self, game: Game) -> Result<()> {
        (**self).insert(game).await
    }

    async fn load(&self, id: &str) -> Result<(Game, Version)> {
        (**self).load(id).await
    }

    async fn update(&self, expected: Version, game: Game) -> Result<()> {
        (**self).update(expected, game).await
    }

    async fn active_ids(&self) -> Vec<String> {
        (**self).active_ids().await
    }
}

/// Reference store: a versioned map behind a lock. Durable backends plug in
/// through the same trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    games: RwLock<HashMap<String, (Game, Version)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.games.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.read().is_empty()
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn insert(&self, game: Game) -> Result<()> {
        self.games
            .write()
            .insert(game.id().to_string(), (game, 0));
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<(Game, Version)> {
        self.games
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceError::GameNotFound(id.to_string()))
    }

    async fn update(&self, expected: Version, game: Game) -> Result<()> {
        let mut games = self.games.write();
        let Some(entry) = games.get_mut(game.id()) else {
            return Err(ServiceError::GameNotFound(game.id().to_string()));
        };
        if entry.1 != expected {
            log::debug!(
                "game {}: stale update (expected v{expected}, at v{})",
                game.id(),
                entry.1
            );
            return Err(ServiceError::ConcurrencyConflict(game.id().to_string()));
        }
        *entry = (game, expected + 1);
        Ok(())
    }

    async fn active_ids(&self) -> Vec<String> {
        self.games
            .read()
            .values()
            .filter(|(game, _)| !game.state().is_terminal())
            .map(|(game, _)| game.id().to_string())
            .collect()
    }
}
