use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/health` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status, always "ok" while the process serves requests.
    pub health: String,
    /// Connected interactive views.
    pub active_players: usize,
    /// Connected display-only views.
    pub stream_viewers: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(active_players: usize, stream_viewers: usize) -> Self {
        Self {
            health: "ok".to_string(),
            active_players,
            stream_viewers,
        }
    }
}
