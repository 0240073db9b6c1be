use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use bingo_back::{
    dao::snapshot_store::MemorySnapshotStore,
    routes,
    state::{AppState, store::StateStore},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn app() -> Router {
    let (store, worker) = StateStore::new(
        Arc::new(MemorySnapshotStore::new()),
        Duration::from_millis(20),
    );
    tokio::spawn(worker.run());
    let phrases: Vec<String> = (0..40).map(|i| format!("MEETING RUNS LATE {i}")).collect();
    store.seed_initial_board(&phrases).await;
    routes::router(AppState::new(store, phrases))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let res = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_view_counts() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "health": "ok", "active_players": 0, "stream_viewers": 0 })
    );
}

#[tokio::test]
async fn board_starts_with_only_the_free_space() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/board", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["board"][2][2], "FREE MEAT");
    assert_eq!(body["clicked_tiles"], json!([[2, 2]]));
    assert_eq!(body["is_game_closed"], false);
}

#[tokio::test]
async fn completing_a_column_returns_the_announcement() {
    let app = app().await;
    for row in [0, 1, 3] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/board/tiles",
            Some(json!({ "row": row, "col": 2 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["clicked"], true);
    }

    let (_, body) = send(
        &app,
        Method::POST,
        "/board/tiles",
        Some(json!({ "row": 4, "col": 2 })),
    )
    .await;

    assert_eq!(body["new_patterns"], json!(["col2"]));
    assert_eq!(
        body["announcements"],
        json!([{ "message": "BINGO!", "kind": "standard" }])
    );
}

#[tokio::test]
async fn out_of_range_tile_is_a_bad_request() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/board/tiles",
        Some(json!({ "row": 5, "col": 0 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("validation failed"));
}

#[tokio::test]
async fn closed_game_rejects_toggles_with_conflict() {
    let app = app().await;
    let (status, body) = send(&app, Method::POST, "/board/close", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["header_text"], "Bingo Is Closed");

    let (status, _) = send(
        &app,
        Method::POST,
        "/board/tiles",
        Some(json!({ "row": 0, "col": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, Method::POST, "/board/reopen", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_game_closed"], false);
    assert_eq!(body["board_iteration"], 2);
}

#[tokio::test]
async fn reset_and_new_board_clear_marks() {
    let app = app().await;
    send(
        &app,
        Method::POST,
        "/board/tiles",
        Some(json!({ "row": 1, "col": 1 })),
    )
    .await;

    let (_, reset) = send(&app, Method::POST, "/board/reset", None).await;
    assert_eq!(reset["clicked_tiles"], json!([[2, 2]]));
    assert_eq!(reset["board_iteration"], 1);

    let (_, fresh) = send(&app, Method::POST, "/board/new", None).await;
    assert_eq!(fresh["board_iteration"], 2);
    assert_eq!(fresh["clicked_tiles"], json!([[2, 2]]));
}

#[tokio::test]
async fn header_must_be_between_1_and_64_characters() {
    let app = app().await;
    let (status, _) = send(
        &app,
        Method::PUT,
        "/board/header",
        Some(json!({ "text": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/board/header",
        Some(json!({ "text": "SPRINT REVIEW" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["header_text"], "SPRINT REVIEW");
}

#[tokio::test]
async fn openapi_document_lists_board_routes() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/api-doc/openapi.json", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/board/tiles"].is_object());
    assert!(body["paths"]["/sse/home"].is_object());
}
