//! Request and response payloads of the board REST API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::state::{
    ToggleOutcome,
    game::{Board, GameState},
    patterns::{Announcement, Pattern},
};

/// Tile to toggle.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ToggleRequest {
    /// Zero-based row, 0 to 4.
    #[validate(range(max = 4))]
    pub row: usize,
    /// Zero-based column, 0 to 4.
    #[validate(range(max = 4))]
    pub col: usize,
}

/// Result of a toggle.
#[derive(Debug, Serialize, ToSchema)]
pub struct ToggleResponse {
    /// Whether the tile is marked after the toggle.
    pub clicked: bool,
    /// Identifiers of the shapes completed by this toggle.
    pub new_patterns: Vec<String>,
    /// Win messages broadcast to every view.
    pub announcements: Vec<Announcement>,
}

impl From<ToggleOutcome> for ToggleResponse {
    fn from(value: ToggleOutcome) -> Self {
        Self {
            clicked: value.clicked,
            new_patterns: value.new_patterns.iter().map(Pattern::id).collect(),
            announcements: value.announcements,
        }
    }
}

/// New header text.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct HeaderRequest {
    /// Text shown above the board.
    #[validate(length(min = 1, max = 64))]
    pub text: String,
}

/// Full view of the shared card.
#[derive(Debug, Serialize, ToSchema)]
pub struct BoardResponse {
    /// Rows of phrases; absent before the first board.
    pub board: Option<Vec<Vec<String>>>,
    /// Marked tiles as `[row, col]` pairs.
    #[schema(value_type = Vec<Vec<usize>>)]
    pub clicked_tiles: Vec<[usize; 2]>,
    /// Shapes already announced.
    pub bingo_patterns: Vec<String>,
    /// Board iteration.
    pub board_iteration: u64,
    /// Seed label of the board.
    pub today_seed: Option<String>,
    /// Whether the game is closed.
    pub is_game_closed: bool,
    /// Header shown above the board.
    pub header_text: String,
    /// Last change, in seconds since the Unix epoch.
    pub timestamp: f64,
}

impl From<&GameState> for BoardResponse {
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
            today_seed: value.today_seed.clone(),
            is_game_closed: value.is_game_closed,
            header_text: value.header_text.clone(),
            timestamp: value.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_request_rejects_out_of_range_indices() {
        assert!(ToggleRequest { row: 4, col: 0 }.validate().is_ok());
        assert!(ToggleRequest { row: 5, col: 0 }.validate().is_err());
        assert!(ToggleRequest { row: 0, col: 9 }.validate().is_err());
    }

    #[test]
    fn header_request_requires_bounded_text() {
        assert!(HeaderRequest { text: "HELLO".into() }.validate().is_ok());
        assert!(HeaderRequest { text: String::new() }.validate().is_err());
        assert!(HeaderRequest { text: "X".repeat(65) }.validate().is_err());
    }
}
