//! Bingo Back binary entrypoint wiring the shared card, its snapshot file, REST and SSE layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bingo_back::{
    config::AppConfig,
    dao::snapshot_store::FileSnapshotStore,
    routes,
    services::{
        phrase_service::{self, PhraseBook},
        sync_service,
    },
    state::{AppState, SharedState, store::StateStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();

    let snapshots = Arc::new(FileSnapshotStore::new(&config.state_file));
    let (store, worker) = StateStore::new(snapshots, config.debounce);
    let store = store.with_open_header(config.header_text.clone());
    tokio::spawn(worker.run());

    let outcome = store.load_from_storage().await;
    let phrases = PhraseBook::load(&config.phrases_file).await;
    let pool = phrases.current().await;
    if store.seed_initial_board(&pool).await {
        info!("no board restored; generated the first one");
    }
    info!(?outcome, phrases = pool.len(), "game state ready");

    let app_state = AppState::new(store, phrases);
    let sync = tokio::spawn(sync_service::run(
        app_state.clone(),
        config.sync_interval,
    ));
    let phrase_watch = tokio::spawn(phrase_service::watch_phrases(
        app_state.clone(),
        config.phrase_check_interval,
    ));

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state.clone());

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    let served = axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum");

    sync.abort();
    phrase_watch.abort();
    match app_state.store().flush().await {
        Ok(()) => info!("final snapshot written"),
        Err(err) => error!(error = %err, "final snapshot write failed"),
    }

    served
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
