use axum::{
    Json, Router,
    extract::State,
    routing::{get, post, put},
};
use validator::Validate;

use crate::{
    dto::board::{BoardResponse, HeaderRequest, ToggleRequest, ToggleResponse},
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Routes operating on the shared card.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/board", get(get_board))
        .route("/board/tiles", post(toggle_tile))
        .route("/board/reset", post(reset_board))
        .route("/board/new", post(new_board))
        .route("/board/close", post(close_game))
        .route("/board/reopen", post(reopen_game))
        .route("/board/header", put(set_header))
}

/// Return the full card.
#[utoipa::path(
    get,
    path = "/board",
    tag = "board",
    responses((status = 200, description = "Current card", body = BoardResponse))
)]
pub async fn get_board(State(state): State<SharedState>) -> Json<BoardResponse> {
    Json(game_service::board(&state).await)
}

/// Toggle one tile and report the shapes it completed.
#[utoipa::path(
    post,
    path = "/board/tiles",
    tag = "board",
    request_body = ToggleRequest,
    responses(
        (status = 200, description = "Tile toggled", body = ToggleResponse),
        (status = 400, description = "Coordinates outside the board"),
        (status = 409, description = "Game closed or no board yet")
    )
)]
pub async fn toggle_tile(
    State(state): State<SharedState>,
    Json(payload): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>, AppError> {
    payload.validate()?;
    let response = game_service::toggle_tile(&state, payload).await?;
    Ok(Json(response))
}

/// Clear every mark.
#[utoipa::path(
    post,
    path = "/board/reset",
    tag = "board",
    responses((status = 200, description = "Board reset", body = BoardResponse))
)]
pub async fn reset_board(State(state): State<SharedState>) -> Json<BoardResponse> {
    Json(game_service::reset_board(&state).await)
}

/// Draw the next card.
#[utoipa::path(
    post,
    path = "/board/new",
    tag = "board",
    responses((status = 200, description = "New board generated", body = BoardResponse))
)]
pub async fn new_board(State(state): State<SharedState>) -> Json<BoardResponse> {
    Json(game_service::new_board(&state).await)
}

/// Close the game for everyone.
#[utoipa::path(
    post,
    path = "/board/close",
    tag = "board",
    responses((status = 200, description = "Game closed", body = BoardResponse))
)]
pub async fn close_game(State(state): State<SharedState>) -> Json<BoardResponse> {
    Json(game_service::close_game(&state).await)
}

/// Reopen the game on a fresh card.
#[utoipa::path(
    post,
    path = "/board/reopen",
    tag = "board",
    responses((status = 200, description = "Game reopened", body = BoardResponse))
)]
pub async fn reopen_game(State(state): State<SharedState>) -> Json<BoardResponse> {
    Json(game_service::reopen_game(&state).await)
}

/// Change the header text.
#[utoipa::path(
    put,
    path = "/board/header",
    tag = "board",
    request_body = HeaderRequest,
    responses(
        (status = 200, description = "Header updated", body = BoardResponse),
        (status = 400, description = "Empty or oversized header")
    )
)]
pub async fn set_header(
    State(state): State<SharedState>,
    Json(payload): Json<HeaderRequest>,
) -> Result<Json<BoardResponse>, AppError> {
    payload.validate()?;
    let response = game_service::set_header(&state, payload).await?;
    Ok(Json(response))
}
