use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Bingo Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::board::get_board,
        crate::routes::board::toggle_tile,
        crate::routes::board::reset_board,
        crate::routes::board::new_board,
        crate::routes::board::close_game,
        crate::routes::board::reopen_game,
        crate::routes::board::set_header,
        crate::routes::sse::home_stream,
        crate::routes::sse::display_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::board::BoardResponse,
            crate::dto::board::ToggleRequest,
            crate::dto::board::ToggleResponse,
            crate::dto::board::HeaderRequest,
            crate::state::patterns::Announcement,
            crate::state::patterns::AnnouncementKind,
            crate::state::views::ViewFrame,
            crate::state::views::TileView,
            crate::state::views::Control,
            crate::state::views::TilesDiff,
            crate::state::views::TileChange,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "board", description = "Shared bingo card operations"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
