use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

/// Lifecycle states. `Timeout`, `Won`, and `Lost` are terminal: once
/// reached, every further action is refused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    New,
    Started,
    Paused,
    Timeout,
    Won,
    Lost,
}

impl GameState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Timeout | Self::Won | Self::Lost)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Started => "started",
            Self::Paused => "paused",
            Self::Timeout => "timeout",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::New
    }
}

/// A single game from creation to its terminal state: the immutable board,
/// the player's view of it, and the time-bounded lifecycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Game {
    id: String,
    owner: String,
    title: String,
    board: Board,
    view: Array2<CellMark>,
    state: GameState,
    revealed_count: CellCount,
    duration_seconds: u64,
    elapsed_seconds: u64,
    score: i64,
    created_at: DateTime<Utc>,
    resumed_at: DateTime<Utc>,
    timeout_at: DateTime<Utc>,
}

impl Game {
    pub fn new(id: impl Into<String>, owner: impl Into<String>, board: Board, timeout_secs: u32) -> Self {
        let now = Utc::now();
        let owner = owner.into();
        let size = [board.rows() as usize, board.cols() as usize];
        Self {
            id: id.into(),
            title: format!("Game for {owner}"),
            owner,
            board,
            view: Array2::default(size),
            state: GameState::default(),
            revealed_count: 0,
            duration_seconds: 0,
            elapsed_seconds: 0,
            score: 0,
            created_at: now,
            resumed_at: now,
            timeout_at: now + Duration::seconds(i64::from(timeout_secs)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn mark_at(&self, coords: Coord2) -> CellMark {
        self.view[coords.to_nd_index()]
    }

    pub fn duration_seconds(&self) -> u64 {
        self.duration_seconds
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn resumed_at(&self) -> DateTime<Utc> {
        self.resumed_at
    }

    /// Deadline the timeout scheduler re-arms from after a restart.
    pub fn timeout_at(&self) -> DateTime<Utc> {
        self.timeout_at
    }

    /// Reveals a cell. A mine ends the game as `Lost`; a zero-count cell
    /// cascades through its whole zero region; revealing the last safe cell
    /// wins. Revealing overwrites any flag/question mark on the target, and
    /// an already-revealed cell is left untouched.
    pub fn reveal(&mut self, coords: Coord2) -> Result<RevealOutcome> {
        let coords = self.board.validate_coords(coords)?;
        self.check_not_terminal()?;

        if self.view[coords.to_nd_index()].is_revealed() {
            return Ok(RevealOutcome::NoChange);
        }

        self.activate();
        self.view[coords.to_nd_index()] = CellMark::Revealed;

        if self.board.contains_mine(coords) {
            log::debug!("game {}: mine hit at {coords:?}", self.id);
            self.finish(GameState::Lost);
            return Ok(RevealOutcome::HitMine);
        }

        self.revealed_count += 1;
        if self.board.cell_at(coords) == BoardCell::Count(0) {
            self.flood_reveal_from(coords);
        }

        if self.revealed_count == self.board.safe_cell_count() {
            self.finish(GameState::Won);
            Ok(RevealOutcome::Won)
        } else {
            Ok(RevealOutcome::Revealed)
        }
    }

    /// Work-queue cascade from a zero-count cell. The `Revealed` mark is the
    /// visited check, so each cell is processed at most once; neighbors of a
    /// zero cell can never be mines, so the cascade never detonates.
    fn flood_reveal_from(&mut self, start: Coord2) {
        let mut to_visit: VecDeque<Coord2> = self.board.iter_neighbors(start).collect();

        while let Some(coords) = to_visit.pop_front() {
            if self.view[coords.to_nd_index()].is_revealed() {
                continue;
            }

            self.view[coords.to_nd_index()] = CellMark::Revealed;
            self.revealed_count += 1;
            log::trace!("game {}: cascade revealed {coords:?}", self.id);

            if self.board.cell_at(coords) == BoardCell::Count(0) {
                to_visit.extend(
                    self.board
                        .iter_neighbors(coords)
                        .filter(|&pos| !self.view[pos.to_nd_index()].is_revealed()),
                );
            }
        }
    }

    /// Sets a flag mark; revealed cells are left untouched.
    pub fn flag(&mut self, coords: Coord2) -> Result<MarkOutcome> {
        self.mark(coords, CellMark::Flagged)
    }

    /// Sets a question mark; revealed cells are left untouched.
    pub fn question(&mut self, coords: Coord2) -> Result<MarkOutcome> {
        self.mark(coords, CellMark::Questioned)
    }

    fn mark(&mut self, coords: Coord2, mark: CellMark) -> Result<MarkOutcome> {
        let coords = self.board.validate_coords(coords)?;
        self.check_not_terminal()?;

        let cell = &mut self.view[coords.to_nd_index()];
        if cell.is_revealed() || *cell == mark {
            return Ok(MarkOutcome::NoChange);
        }

        *cell = mark;
        Ok(MarkOutcome::Changed)
    }

    /// Freezes the clock. Pausing a game that is not running is a no-op.
    pub fn pause(&mut self) -> Result<()> {
        self.check_not_terminal()?;

        if self.state == GameState::Started {
            self.freeze_clock(Utc::now());
            self.state = GameState::Paused;
            log::debug!("game {}: paused at {}s", self.id, self.duration_seconds);
        }
        Ok(())
    }

    /// Restarts the clock from now. Resuming a game that is already running
    /// is a no-op.
    pub fn resume(&mut self) -> Result<()> {
        self.check_not_terminal()?;

        if matches!(self.state, GameState::New | GameState::Paused) {
            self.resumed_at = Utc::now();
            self.state = GameState::Started;
            log::debug!("game {}: resumed", self.id);
        }
        Ok(())
    }

    /// The timeout trigger. Returns whether the game actually transitioned;
    /// firing on a terminal game is the expected no-op for late or duplicate
    /// deliveries.
    pub fn fire_timeout(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }

        if matches!(self.state, GameState::New | GameState::Started) {
            self.freeze_clock(Utc::now());
        }
        self.state = GameState::Timeout;
        log::debug!("game {}: timed out after {}s", self.id, self.duration_seconds);
        true
    }

    /// Folds the running segment into the accumulated duration. Duration
    /// accumulates across pause/resume cycles; `elapsed_seconds` mirrors the
    /// total at every transition.
    fn freeze_clock(&mut self, now: DateTime<Utc>) {
        self.duration_seconds += (now - self.resumed_at).num_seconds().max(0) as u64;
        self.elapsed_seconds = self.duration_seconds;
    }

    /// First reveal on a fresh or paused game moves it to `Started`. Leaving
    /// `Paused` restamps the clock; a `New` game's clock has been running
    /// since creation.
    fn activate(&mut self) {
        match self.state {
            GameState::New => self.state = GameState::Started,
            GameState::Paused => {
                self.resumed_at = Utc::now();
                self.state = GameState::Started;
            }
            _ => {}
        }
    }

    fn finish(&mut self, state: GameState) {
        self.freeze_clock(Utc::now());
        self.state = state;
        log::debug!(
            "game {}: finished as {} after {}s",
            self.id,
            state.as_str(),
            self.duration_seconds
        );
    }

    fn check_not_terminal(&self) -> Result<()> {
        if self.state.is_terminal() {
            Err(GameError::AlreadyTerminal)
        } else {
            Ok(())
        }
    }
}
