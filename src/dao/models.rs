use serde::{Deserialize, Serialize};

use crate::state::game::{DEFAULT_HEADER_TEXT, epoch_seconds};

/// On-disk representation of the shared card.
///
/// Every field defaults when absent so snapshots written by older or newer
/// builds still load; structural checks happen when converting into
/// [`GameState`](crate::state::game::GameState).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotEntity {
    /// Rows of phrases, expected to be 5×5.
    #[serde(default)]
    pub board: Option<Vec<Vec<String>>>,
    /// Marked cells as `[row, col]` pairs.
    #[serde(default)]
    pub clicked_tiles: Vec<[usize; 2]>,
    /// Identifiers of the winning shapes already announced.
    #[serde(default)]
    pub bingo_patterns: Vec<String>,
    /// Monotonic counter of generated boards.
    #[serde(default = "default_iteration")]
    pub board_iteration: u64,
    /// Whether the game was closed.
    #[serde(default)]
    pub is_game_closed: bool,
    /// Seed label of the board.
    #[serde(default)]
    pub today_seed: Option<String>,
    /// Header displayed above the board.
    #[serde(default = "default_header_text")]
    pub header_text: String,
    /// Write time in seconds since the Unix epoch.
    #[serde(default = "epoch_seconds")]
    pub timestamp: f64,
}

fn default_iteration() -> u64 {
    1
}

fn default_header_text() -> String {
    DEFAULT_HEADER_TEXT.to_string()
}
