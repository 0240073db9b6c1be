use std::convert::Infallible;

use axum::{
    Router,
    extract::State,
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    services::sse_service,
    state::{SharedState, views::ViewKind},
};

#[utoipa::path(
    get,
    path = "/sse/home",
    tag = "sse",
    responses((status = 200, description = "Interactive view stream", content_type = "text/event-stream", body = String))
)]
/// Stream frames, tile diffs and announcements to a player's page.
pub async fn home_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (view_id, receiver) = sse_service::subscribe(&state, "home", ViewKind::Interactive).await;
    info!(%view_id, "New interactive SSE connection");
    sse_service::to_sse_stream(state, view_id, receiver)
}

#[utoipa::path(
    get,
    path = "/sse/stream",
    tag = "sse",
    responses((status = 200, description = "Display-only view stream", content_type = "text/event-stream", body = String))
)]
/// Stream the read-only card, e.g. for a projector.
pub async fn display_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (view_id, receiver) = sse_service::subscribe(&state, "stream", ViewKind::DisplayOnly).await;
    info!(%view_id, "New display-only SSE connection");
    sse_service::to_sse_stream(state, view_id, receiver)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/home", get(home_stream))
        .route("/sse/stream", get(display_stream))
}
