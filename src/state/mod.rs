pub mod board;
pub mod game;
pub mod patterns;
pub mod store;
pub mod views;

use std::sync::Arc;

use tokio::sync::Mutex;

use self::{
    store::StateStore,
    views::{ReconcileReport, ViewRegistry},
};
use crate::services::phrase_service::PhraseBook;

pub use self::store::{LoadOutcome, StateError, ToggleOutcome};

pub type SharedState = Arc<AppState>;

/// Central application state shared by every handler and background task.
pub struct AppState {
    store: StateStore,
    views: ViewRegistry,
    phrases: PhraseBook,
    /// Serialises reconciliations so frames leave in snapshot order.
    sync_gate: Mutex<()>,
}

impl AppState {
    /// Wrap the game store and phrase pool in an [`Arc`] so it can be cloned cheaply.
    pub fn new(store: StateStore, phrases: impl Into<PhraseBook>) -> SharedState {
        Arc::new(Self {
            store,
            views: ViewRegistry::new(),
            phrases: phrases.into(),
            sync_gate: Mutex::new(()),
        })
    }

    /// Owner of the canonical card.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Connected views.
    pub fn views(&self) -> &ViewRegistry {
        &self.views
    }

    /// Phrase pool boards are drawn from.
    pub fn phrases(&self) -> &PhraseBook {
        &self.phrases
    }

    /// Push the current state to every view that is behind.
    pub async fn sync_views(&self) -> ReconcileReport {
        let _gate = self.sync_gate.lock().await;
        let snapshot = self.store.snapshot().await;
        self.views.reconcile(&snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        dao::snapshot_store::MemorySnapshotStore,
        state::{
            game::{Coord, FREE_SPACE},
            views::{ViewKind, ViewUpdate, tests::RecordingHandle},
        },
    };

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_syncs_never_push_an_older_state() {
        let (store, worker) =
            StateStore::new(Arc::new(MemorySnapshotStore::new()), Duration::from_millis(20));
        tokio::spawn(worker.run());
        store.seed_initial_board(&[]).await;
        let state = AppState::new(store, PhraseBook::fixed(Vec::new()));

        let viewer = Arc::new(RecordingHandle::default());
        state
            .views()
            .register("player", ViewKind::Interactive, viewer.clone());
        state.sync_views().await;

        let tasks: Vec<_> = Coord::all()
            .filter(|coord| *coord != FREE_SPACE)
            .map(|coord| {
                let state = state.clone();
                tokio::spawn(async move {
                    state
                        .store()
                        .toggle_tile(coord.row(), coord.col())
                        .await
                        .unwrap();
                    state.sync_views().await;
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        // Every toggle only adds a mark, so an unmark can only come from a
        // stale snapshot overtaking a newer one.
        for update in viewer.take() {
            if let ViewUpdate::Tiles(diff) = update {
                assert!(diff.tiles.iter().all(|tile| tile.clicked), "{diff:?}");
            }
        }
    }
}
