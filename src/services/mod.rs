/// OpenAPI documentation generation.
pub mod documentation;
/// Board operations exposed over HTTP.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Phrase pool loading and normalization.
pub mod phrase_service;
/// Server-Sent Events view connections.
pub mod sse_service;
/// Snapshot persistence worker with debouncing.
pub mod storage_supervisor;
/// Push-on-change reconciliation of connected views.
pub mod sync_service;
