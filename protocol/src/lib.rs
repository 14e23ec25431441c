use core::fmt;

use chrono::{DateTime, Utc};
use demine_core::{BoardCell, CellMark, Game};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// What one cell shows through a snapshot: the player's mark while hidden,
/// the true board value once revealed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CellView {
    Blank,
    Questioned,
    Flagged,
    Mine,
    Count(u8),
}

impl CellView {
    fn of(cell: BoardCell, mark: CellMark) -> Self {
        match mark {
            CellMark::Hidden => Self::Blank,
            CellMark::Questioned => Self::Questioned,
            CellMark::Flagged => Self::Flagged,
            CellMark::Revealed => match cell {
                BoardCell::Mine => Self::Mine,
                BoardCell::Count(count) => Self::Count(count),
            },
        }
    }
}

/// Wire form: `" "`, `"?"`, `"!"`, `"x"`, or the bare adjacency count 0-8.
impl Serialize for CellView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Self::Blank => serializer.serialize_str(" "),
            Self::Questioned => serializer.serialize_str("?"),
            Self::Flagged => serializer.serialize_str("!"),
            Self::Mine => serializer.serialize_str("x"),
            Self::Count(count) => serializer.serialize_u8(count),
        }
    }
}

impl<'de> Deserialize<'de> for CellView {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CellViewVisitor;

        impl<'de> Visitor<'de> for CellViewVisitor {
            type Value = CellView;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a cell mark string or an adjacency count 0-8")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<CellView, E> {
                if value <= 8 {
                    Ok(CellView::Count(value as u8))
                } else {
                    Err(E::custom(format!("adjacency count {value} out of range")))
                }
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<CellView, E> {
                u64::try_from(value)
                    .map_err(|_| E::custom(format!("adjacency count {value} out of range")))
                    .and_then(|value| self.visit_u64(value))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<CellView, E> {
                match value {
                    " " => Ok(CellView::Blank),
                    "?" => Ok(CellView::Questioned),
                    "!" => Ok(CellView::Flagged),
                    "x" => Ok(CellView::Mine),
                    other => Err(E::custom(format!("unknown cell mark {other:?}"))),
                }
            }
        }

        deserializer.deserialize_any(CellViewVisitor)
    }
}

/// The serialized game view returned to callers. Mines are never disclosed
/// through `board_view` unless the player revealed them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub id: String,
    pub title: String,
    pub state: String,
    pub board_view: Vec<Vec<CellView>>,
    pub duration_seconds: u64,
    pub elapsed_seconds: u64,
    pub score: i64,
    pub resumed_timestamp: DateTime<Utc>,
}

impl From<&Game> for GameSnapshot {
    fn from(game: &Game) -> Self {
        let board = game.board();
        let rows = board.rows();
        let cols = board.cols();

        let mut board_view = Vec::with_capacity(rows as usize);
        for y in 0..rows {
            let mut row = Vec::with_capacity(cols as usize);
            for x in 0..cols {
                let coords = (x, y);
                row.push(CellView::of(board.cell_at(coords), game.mark_at(coords)));
            }
            board_view.push(row);
        }

        Self {
            id: game.id().to_string(),
            title: game.title().to_string(),
            state: game.state().as_str().to_string(),
            board_view,
            duration_seconds: game.duration_seconds(),
            elapsed_seconds: game.elapsed_seconds(),
            score: game.score(),
            resumed_timestamp: game.resumed_at(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use demine_core::{Board, BoardSpec};

    fn game_with_mines(spec: BoardSpec, mines: &[(u8, u8)]) -> Game {
        let board = Board::from_mine_coords(spec, mines).unwrap();
        Game::new("g-1", "tester", board, 1200)
    }

    #[test]
    fn fresh_game_snapshot_is_all_blank() {
        let game = game_with_mines(BoardSpec::new(2, 3, 1), &[(0, 0)]);

        let snapshot = GameSnapshot::from(&game);

        assert_eq!(snapshot.state, "new");
        assert_eq!(snapshot.board_view.len(), 2);
        assert_eq!(snapshot.board_view[0].len(), 3);
        assert!(snapshot
            .board_view
            .iter()
            .flatten()
            .all(|&cell| cell == CellView::Blank));
    }

    #[test]
    fn marks_show_without_disclosing_mines() {
        let mut game = game_with_mines(BoardSpec::new(2, 2, 1), &[(0, 0)]);
        game.flag((0, 0)).unwrap();
        game.question((1, 0)).unwrap();
        game.reveal((1, 1)).unwrap();

        let snapshot = GameSnapshot::from(&game);

        assert_eq!(snapshot.board_view[0][0], CellView::Flagged);
        assert_eq!(snapshot.board_view[0][1], CellView::Questioned);
        assert_eq!(snapshot.board_view[1][1], CellView::Count(1));
        assert_eq!(snapshot.board_view[1][0], CellView::Blank);
    }

    #[test]
    fn a_lost_game_shows_the_revealed_mine() {
        let mut game = game_with_mines(BoardSpec::new(2, 2, 1), &[(0, 0)]);
        game.reveal((0, 0)).unwrap();

        let snapshot = GameSnapshot::from(&game);

        assert_eq!(snapshot.state, "lost");
        assert_eq!(snapshot.board_view[0][0], CellView::Mine);
        // the other mine-free cells stay hidden, nothing else is disclosed
        assert_eq!(snapshot.board_view[0][1], CellView::Blank);
    }

    #[test]
    fn cell_views_use_the_wire_alphabet() {
        let row = vec![
            CellView::Blank,
            CellView::Questioned,
            CellView::Flagged,
            CellView::Mine,
            CellView::Count(0),
            CellView::Count(8),
        ];

        let json = serde_json::to_string(&row).unwrap();

        assert_eq!(json, r#"[" ","?","!","x",0,8]"#);
        let parsed: Vec<CellView> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, row);
    }

    #[test]
    fn out_of_range_counts_fail_to_parse() {
        assert!(serde_json::from_str::<CellView>("9").is_err());
        assert!(serde_json::from_str::<CellView>(r#""m""#).is_err());
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut game = game_with_mines(BoardSpec::new(3, 3, 1), &[(2, 2)]);
        game.reveal((0, 0)).unwrap();
        let snapshot = GameSnapshot::from(&game);

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: GameSnapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, snapshot);
        assert_eq!(parsed.state, "won");
    }
}
