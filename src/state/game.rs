use std::{
    collections::BTreeSet,
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::dao::models::SnapshotEntity;

/// Number of rows and columns on a card.
pub const BOARD_SIZE: usize = 5;
/// Text of the always-clicked center cell.
pub const FREE_SPACE_TEXT: &str = "FREE MEAT";
/// Coordinate of the free space.
pub const FREE_SPACE: Coord = Coord { row: 2, col: 2 };
/// Header shown while the game is open.
pub const DEFAULT_HEADER_TEXT: &str = "COMMIT !BINGO";
/// Header shown once the game has been closed.
pub const CLOSED_HEADER_TEXT: &str = "Bingo Is Closed";
/// Placeholder displayed instead of the board while closed.
pub const CLOSED_MESSAGE_TEXT: &str = "GAME CLOSED";

/// Position of a cell on the card, guaranteed to be inside the 5×5 grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coord {
    row: u8,
    col: u8,
}

impl Coord {
    /// Build a coordinate, returning `None` when it falls outside the card.
    pub fn new(row: usize, col: usize) -> Option<Self> {
        (row < BOARD_SIZE && col < BOARD_SIZE).then_some(Self {
            row: row as u8,
            col: col as u8,
        })
    }

    /// Zero-based row index.
    pub fn row(self) -> usize {
        self.row as usize
    }

    /// Zero-based column index.
    pub fn col(self) -> usize {
        self.col as usize
    }

    /// Every coordinate of the card in row-major order.
    pub fn all() -> impl Iterator<Item = Coord> {
        (0..BOARD_SIZE)
            .flat_map(|row| (0..BOARD_SIZE).map(move |col| Coord::cell(row, col)))
    }

    // Only used with indices already bounded by BOARD_SIZE.
    pub(crate) fn cell(row: usize, col: usize) -> Self {
        debug_assert!(row < BOARD_SIZE && col < BOARD_SIZE);
        Self {
            row: row as u8,
            col: col as u8,
        }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Set of marked cells.
pub type ClickedSet = BTreeSet<Coord>;
/// Identifiers of the winning shapes already announced.
pub type PatternSet = BTreeSet<String>;

/// A 5×5 card of phrases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: [[String; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    /// Wrap a full grid of phrases.
    pub fn new(cells: [[String; BOARD_SIZE]; BOARD_SIZE]) -> Self {
        Self { cells }
    }

    /// Lay out exactly 25 phrases row by row.
    ///
    /// Returns `None` when the iterator does not yield exactly 25 entries.
    pub fn from_phrases<I>(phrases: I) -> Option<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut iter = phrases.into_iter();
        let mut rows: Vec<[String; BOARD_SIZE]> = Vec::with_capacity(BOARD_SIZE);
        for _ in 0..BOARD_SIZE {
            let row: Vec<String> = iter.by_ref().take(BOARD_SIZE).collect();
            rows.push(row.try_into().ok()?);
        }
        if iter.next().is_some() {
            return None;
        }
        Some(Self {
            cells: rows.try_into().ok()?,
        })
    }

    /// Convert nested rows into a board, rejecting anything that is not 5×5.
    pub fn from_rows(rows: Vec<Vec<String>>) -> Option<Self> {
        if rows.len() != BOARD_SIZE || rows.iter().any(|row| row.len() != BOARD_SIZE) {
            return None;
        }
        Self::from_phrases(rows.into_iter().flatten())
    }

    /// Phrase at the given coordinate.
    pub fn phrase(&self, coord: Coord) -> &str {
        &self.cells[coord.row()][coord.col()]
    }

    /// Whether the center cell holds the free-space sentinel.
    pub fn has_free_space(&self) -> bool {
        self.phrase(FREE_SPACE).eq_ignore_ascii_case(FREE_SPACE_TEXT)
    }

    /// Borrow the rows of the card.
    pub fn rows(&self) -> &[[String; BOARD_SIZE]; BOARD_SIZE] {
        &self.cells
    }

    /// Owned nested rows, as stored in snapshots.
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        self.cells.iter().map(|row| row.to_vec()).collect()
    }
}

/// Canonical state of the shared card.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    /// Current card; `None` until the first board is generated.
    pub board: Option<Board>,
    /// Cells marked by the players.
    pub clicked: ClickedSet,
    /// Winning shapes already announced.
    pub patterns: PatternSet,
    /// Monotonic counter of generated boards.
    pub board_iteration: u64,
    /// Human-readable seed label of the current board.
    pub today_seed: Option<String>,
    /// Whether the game has been closed by a player.
    pub is_game_closed: bool,
    /// Header displayed above the board.
    pub header_text: String,
    /// Last modification time, in seconds since the Unix epoch.
    pub timestamp: f64,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            board: None,
            clicked: ClickedSet::new(),
            patterns: PatternSet::new(),
            board_iteration: 1,
            today_seed: None,
            is_game_closed: false,
            header_text: DEFAULT_HEADER_TEXT.to_string(),
            timestamp: epoch_seconds(),
        }
    }
}

impl GameState {
    /// Clear marks and announced patterns, keeping the free space marked.
    pub fn clear_marks(&mut self) {
        self.clicked.clear();
        self.patterns.clear();
        self.ensure_free_space();
    }

    /// Re-add the free space when the board carries the sentinel.
    pub fn ensure_free_space(&mut self) {
        if self.board.as_ref().is_some_and(Board::has_free_space) {
            self.clicked.insert(FREE_SPACE);
        }
    }

    /// Record that the state changed now.
    pub fn touch(&mut self) {
        self.timestamp = epoch_seconds();
    }
}

/// Reason a persisted snapshot was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotShapeError {
    /// No board was stored.
    MissingBoard,
    /// The stored board is not 5×5.
    BoardShape,
    /// A clicked coordinate lies outside the card.
    CoordinateOutOfRange {
        /// Stored row.
        row: usize,
        /// Stored column.
        col: usize,
    },
}

impl fmt::Display for SnapshotShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingBoard => write!(f, "snapshot has no board"),
            Self::BoardShape => write!(f, "board is not {BOARD_SIZE}x{BOARD_SIZE}"),
            Self::CoordinateOutOfRange { row, col } => {
                write!(f, "clicked tile [{row}, {col}] is outside the board")
            }
        }
    }
}

impl TryFrom<SnapshotEntity> for GameState {
    type Error = SnapshotShapeError;

    fn try_from(value: SnapshotEntity) -> Result<Self, Self::Error> {
        let rows = value.board.ok_or(SnapshotShapeError::MissingBoard)?;
        let board = Board::from_rows(rows).ok_or(SnapshotShapeError::BoardShape)?;

        let clicked = value
            .clicked_tiles
            .into_iter()
            .map(|[row, col]| {
                Coord::new(row, col).ok_or(SnapshotShapeError::CoordinateOutOfRange { row, col })
            })
            .collect::<Result<ClickedSet, _>>()?;

        let mut state = Self {
            board: Some(board),
            clicked,
            patterns: value.bingo_patterns.into_iter().collect(),
            board_iteration: value.board_iteration,
            today_seed: value.today_seed,
            is_game_closed: value.is_game_closed,
            header_text: value.header_text,
            timestamp: value.timestamp,
        };
        state.ensure_free_space();
        Ok(state)
    }
}

impl From<&GameState> for SnapshotEntity {
    fn from(value: &GameState) -> Self {
        Self {
            board: value.board.as_ref().map(Board::to_rows),
            clicked_tiles: value
                .clicked
                .iter()
                .map(|coord| [coord.row(), coord.col()])
                .collect(),
            bingo_patterns: value.patterns.iter().cloned().collect(),
            board_iteration: value.board_iteration,
            is_game_closed: value.is_game_closed,
            today_seed: value.today_seed.clone(),
            header_text: value.header_text.clone(),
            timestamp: epoch_seconds(),
        }
    }
}

/// Seconds since the Unix epoch as a float, the snapshot timestamp format.
pub fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default()
}
