use tracing::{info, warn};

use crate::{
    dto::board::{BoardResponse, HeaderRequest, ToggleRequest, ToggleResponse},
    error::ServiceError,
    state::SharedState,
};

/// Current card as seen by every player.
pub async fn board(state: &SharedState) -> BoardResponse {
    let snapshot = state.store().snapshot().await;
    BoardResponse::from(&snapshot)
}

/// Toggle one tile and announce any shape it completes.
pub async fn toggle_tile(
    state: &SharedState,
    request: ToggleRequest,
) -> Result<ToggleResponse, ServiceError> {
    let outcome = state
        .store()
        .toggle_and_score(request.row, request.col)
        .await?;

    if !outcome.announcements.is_empty() {
        info!(
            patterns = ?outcome.new_patterns,
            "bingo announced"
        );
        state.views().broadcast_announcements(&outcome.announcements);
    }

    Ok(outcome.into())
}

/// Clear every mark on the current card.
pub async fn reset_board(state: &SharedState) -> BoardResponse {
    state.store().reset_board().await;
    board(state).await
}

/// Draw the next card from the phrase pool, picking up phrase file edits.
pub async fn new_board(state: &SharedState) -> BoardResponse {
    state.phrases().refresh().await;
    let pool = state.phrases().current().await;
    let (iteration, generated) = state.store().generate_next_board(&pool).await;
    if generated.degraded {
        warn!(iteration, "board generated with placeholder phrases");
    }
    board(state).await
}

/// Close the game; the change is written to disk before returning.
pub async fn close_game(state: &SharedState) -> BoardResponse {
    state.store().close_game().await;
    board(state).await
}

/// Reopen a closed game on a fresh card drawn from a re-read phrase file.
pub async fn reopen_game(state: &SharedState) -> BoardResponse {
    let count = state.phrases().reload().await;
    let pool = state.phrases().current().await;
    let (iteration, generated) = state.store().reopen_with_board(&pool).await;
    if generated.degraded {
        warn!(iteration, phrases = count, "reopened with placeholder phrases");
    }
    board(state).await
}

/// Change the header shown above the board.
pub async fn set_header(
    state: &SharedState,
    request: HeaderRequest,
) -> Result<BoardResponse, ServiceError> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(ServiceError::InvalidInput(
            "header text must not be blank".into(),
        ));
    }

    state.store().set_header_text(text).await;
    Ok(board(state).await)
}
