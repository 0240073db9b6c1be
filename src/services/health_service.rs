use crate::{
    dto::health::HealthResponse,
    state::{SharedState, views::ViewKind},
};

/// Report liveness together with the number of connected views.
pub fn health_status(state: &SharedState) -> HealthResponse {
    let views = state.views();
    HealthResponse::ok(
        views.count(ViewKind::Interactive),
        views.count(ViewKind::DisplayOnly),
    )
}
