use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use demine_core::{BoardGenerator, BoardSpec, Coord, Game, RandomBoardGenerator};
use demine_protocol::GameSnapshot;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{GameStore, Result, ServiceError, TimeoutScheduler};

/// Service tunables. An outer layer can deserialize these from its own
/// config source; every field has a sensible default.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Wall-clock budget per game before the timeout trigger fires.
    pub timeout_secs: u32,
    /// Transparent retries for a mutation that lost a version race.
    pub conflict_retries: u32,
    /// Capacity of the timer fire channel.
    pub fire_queue_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20 * 60,
            conflict_retries: 3,
            fire_queue_capacity: 64,
        }
    }
}

/// The operations façade over one store: game creation, player actions, and
/// timeout delivery, each applied as a serialized read-modify-write.
pub struct GameService<S> {
    store: S,
    scheduler: TimeoutScheduler,
    config: ServiceConfig,
    id_seq: AtomicU64,
}

impl<S: GameStore> GameService<S> {
    /// Builds the service and hands back the fire-channel receiver to pass
    /// into `spawn_timeout_driver`.
    pub fn new(store: S, config: ServiceConfig) -> (Self, mpsc::Receiver<String>) {
        let (scheduler, fire_rx) = TimeoutScheduler::new(config.fire_queue_capacity);
        let service = Self {
            store,
            scheduler,
            config,
            id_seq: AtomicU64::new(0),
        };
        (service, fire_rx)
    }

    /// Generates a board for the given spec, stores the new game, and arms
    /// its timeout timer.
    pub async fn create_game(&self, spec: BoardSpec, owner: &str) -> Result<GameSnapshot> {
        let board = RandomBoardGenerator::from_entropy().generate(&spec)?;
        let id = self.mint_id();
        let game = Game::new(id.clone(), owner, board, self.config.timeout_secs);
        let snapshot = GameSnapshot::from(&game);

        self.store.insert(game).await?;
        self.scheduler
            .schedule(&id, Duration::from_secs(self.config.timeout_secs.into()));
        log::info!(
            "created game {id} for {owner}: {}x{} with {} mines",
            spec.rows,
            spec.cols,
            spec.mines
        );
        Ok(snapshot)
    }

    pub async fn game_snapshot(&self, id: &str) -> Result<GameSnapshot> {
        let (game, _) = self.store.load(id).await?;
        Ok(GameSnapshot::from(&game))
    }

    pub async fn reveal_cell(&self, id: &str, x: Coord, y: Coord) -> Result<GameSnapshot> {
        self.with_game(id, |game| Ok(game.reveal((x, y))?.has_update()))
            .await
    }

    pub async fn flag_cell(&self, id: &str, x: Coord, y: Coord) -> Result<GameSnapshot> {
        self.with_game(id, |game| Ok(game.flag((x, y))?.has_update()))
            .await
    }

    pub async fn question_cell(&self, id: &str, x: Coord, y: Coord) -> Result<GameSnapshot> {
        self.with_game(id, |game| Ok(game.question((x, y))?.has_update()))
            .await
    }

    pub async fn pause_game(&self, id: &str) -> Result<GameSnapshot> {
        self.with_game(id, |game| {
            let before = game.state();
            game.pause()?;
            Ok(game.state() != before)
        })
        .await
    }

    pub async fn resume_game(&self, id: &str) -> Result<GameSnapshot> {
        self.with_game(id, |game| {
            let before = game.state();
            game.resume()?;
            Ok(game.state() != before)
        })
        .await
    }

    /// Delivers the timeout trigger. Safe to call any number of times: a
    /// game that already reached a terminal state is left untouched.
    pub async fn fire_timeout(&self, id: &str) -> Result<GameSnapshot> {
        self.with_game(id, |game| Ok(game.fire_timeout())).await
    }

    /// Re-arms timers for every non-terminal game from its stored deadline,
    /// firing immediately for deadlines that passed while the process was
    /// down. Returns how many timers were armed.
    pub async fn resume_pending(&self) -> usize {
        let ids = self.store.active_ids().await;
        let now = Utc::now();
        let mut armed = 0;

        for id in ids {
            let Ok((game, _)) = self.store.load(&id).await else {
                continue;
            };
            let remaining = (game.timeout_at() - now).to_std().unwrap_or(Duration::ZERO);
            self.scheduler.schedule(&id, remaining);
            armed += 1;
        }

        log::info!("re-armed {armed} timeout timers");
        armed
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.active_count()
    }

    /// One serialized mutation: load, apply on a working copy, and commit
    /// with the loaded version. A lost version race reloads and reapplies
    /// up to the configured retry budget, so the caller never observes a
    /// half-applied transition. `apply` reports whether anything changed;
    /// untouched games are not rewritten.
    async fn with_game<F>(&self, id: &str, mut apply: F) -> Result<GameSnapshot>
    where
        F: FnMut(&mut Game) -> Result<bool>,
    {
        let mut attempts = 0;
        loop {
            let (mut game, version) = self.store.load(id).await?;
            let changed = apply(&mut game)?;
            let snapshot = GameSnapshot::from(&game);
            if !changed {
                return Ok(snapshot);
            }

            match self.store.update(version, game).await {
                Ok(()) => return Ok(snapshot),
                Err(ServiceError::ConcurrencyConflict(_))
                    if attempts < self.config.conflict_retries =>
                {
                    attempts += 1;
                    log::debug!("game {id}: lost a version race, retry {attempts}");
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn mint_id(&self) -> String {
        let seq = self.id_seq.fetch_add(1, Ordering::Relaxed);
        format!("g{}-{seq}", Utc::now().timestamp_millis())
    }
}

impl<S: GameStore + 'static> GameService<S> {
    /// Spawns the background loop that turns timer fires into state machine
    /// transitions. The loop ends when the scheduler (and with it the fire
    /// channel) is dropped.
    pub fn spawn_timeout_driver(
        self: &Arc<Self>,
        mut fire_rx: mpsc::Receiver<String>,
    ) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(game_id) = fire_rx.recv().await {
                match service.fire_timeout(&game_id).await {
                    Ok(snapshot) => {
                        log::debug!("timeout delivered for game {game_id}: {}", snapshot.state)
                    }
                    Err(ServiceError::GameNotFound(_)) => {
                        log::warn!("timeout fired for unknown game {game_id}")
                    }
                    Err(err) => {
                        log::warn!("timeout delivery failed for game {game_id}: {err}")
                    }
                }
            }
        })
    }
}
