//! Single-writer owner of the canonical card.
//!
//! Every operation takes the state lock, applies its change synchronously and
//! releases the lock before any I/O. Durability is delegated to the
//! persistence worker (see [`crate::services::storage_supervisor`]) through a
//! channel of [`PersistCommand`]s, so a slow write never blocks the next
//! mutation.

use std::{sync::Arc, time::Duration};

use thiserror::Error;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::{
    dao::{
        snapshot_store::SnapshotStore,
        storage::{StorageError, StorageResult},
    },
    services::storage_supervisor::PersistenceWorker,
    state::{
        board::{self, GeneratedBoard},
        game::{
            Board, CLOSED_HEADER_TEXT, Coord, DEFAULT_HEADER_TEXT, FREE_SPACE, GameState,
        },
        patterns::{self, Announcement, Pattern},
    },
};

/// Default coalescing window for snapshot writes.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Game state guarded by the state lock, shared with the persistence worker.
pub(crate) type SharedGame = Arc<Mutex<GameState>>;

/// Signals consumed by the persistence worker.
#[derive(Debug)]
pub enum PersistCommand {
    /// State changed; write it once the debounce window is quiet.
    Dirty,
    /// Write the latest state now and report the outcome.
    Flush(oneshot::Sender<StorageResult<()>>),
}

/// Rejections of a mutation by the game rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// Coordinates outside the 5×5 card.
    #[error("tile ({row}, {col}) is outside the board")]
    OutOfBounds {
        /// Requested row.
        row: usize,
        /// Requested column.
        col: usize,
    },
    /// Tiles cannot be toggled while the game is closed.
    #[error("the game is closed")]
    GameClosed,
    /// No board has been generated yet.
    #[error("no board has been generated yet")]
    NoBoard,
}

/// Result of a toggle, including the shapes it completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// Whether the tile is marked after the toggle.
    pub clicked: bool,
    /// Shapes completed by this toggle, in catalogue order.
    pub new_patterns: Vec<Pattern>,
    /// Messages announcing `new_patterns`.
    pub announcements: Vec<Announcement>,
}

/// How the state was obtained by [`StateStore::load_from_storage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A valid snapshot was restored.
    Restored,
    /// Nothing was stored; the state is fresh.
    Missing,
    /// The snapshot was unreadable or invalid and has been ignored.
    Discarded {
        /// Why the snapshot was rejected.
        reason: String,
    },
}

impl LoadOutcome {
    /// True when the previous game was recovered.
    pub fn is_restored(&self) -> bool {
        matches!(self, LoadOutcome::Restored)
    }
}

/// Canonical owner of the shared card.
pub struct StateStore {
    state: SharedGame,
    persist: mpsc::UnboundedSender<PersistCommand>,
    revision: watch::Sender<u64>,
    snapshots: Arc<dyn SnapshotStore>,
    open_header: String,
}

impl StateStore {
    /// Create an empty store and the worker that persists it.
    ///
    /// The worker must be spawned (`tokio::spawn(worker.run())`) for writes to
    /// happen; it stops once the store is dropped.
    pub fn new(
        snapshots: Arc<dyn SnapshotStore>,
        debounce: Duration,
    ) -> (Self, PersistenceWorker) {
        let state: SharedGame = Arc::new(Mutex::new(GameState::default()));
        let (persist_tx, persist_rx) = mpsc::unbounded_channel();
        let (revision, _rx) = watch::channel(0);

        let worker =
            PersistenceWorker::new(state.clone(), snapshots.clone(), persist_rx, debounce);

        let store = Self {
            state,
            persist: persist_tx,
            revision,
            snapshots,
            open_header: DEFAULT_HEADER_TEXT.to_string(),
        };
        (store, worker)
    }

    /// Header used for fresh games and restored when a game is reopened.
    pub fn with_open_header(mut self, text: impl Into<String>) -> Self {
        self.open_header = text.into();
        self
    }

    fn fresh_state(&self) -> GameState {
        GameState {
            header_text: self.open_header.clone(),
            ..GameState::default()
        }
    }

    /// Replace the in-memory state with the stored snapshot.
    ///
    /// Never fails: a missing snapshot yields a fresh state and an unreadable or
    /// invalid one is discarded (and left on disk until the next write).
    pub async fn load_from_storage(&self) -> LoadOutcome {
        let (next, outcome) = match self.snapshots.load().await {
            Ok(Some(entity)) => match GameState::try_from(entity) {
                Ok(state) => {
                    info!(
                        iteration = state.board_iteration,
                        clicked = state.clicked.len(),
                        "game state restored from snapshot"
                    );
                    (state, LoadOutcome::Restored)
                }
                Err(reason) => {
                    warn!(%reason, "snapshot failed validation; starting fresh");
                    let reason = reason.to_string();
                    (self.fresh_state(), LoadOutcome::Discarded { reason })
                }
            },
            Ok(None) => {
                info!("no snapshot found; starting fresh");
                (self.fresh_state(), LoadOutcome::Missing)
            }
            Err(err) => {
                warn!(error = %err, "failed to load snapshot; starting fresh");
                let reason = err.to_string();
                (self.fresh_state(), LoadOutcome::Discarded { reason })
            }
        };

        *self.state.lock().await = next;
        self.revision.send_modify(|rev| *rev += 1);
        outcome
    }

    /// Deep copy of the current state.
    pub async fn snapshot(&self) -> GameState {
        self.state.lock().await.clone()
    }

    /// Watch channel bumped after every change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Flip a tile and report whether it is marked afterwards.
    ///
    /// The free space always stays marked while the card carries it; on a
    /// card without it, the centre toggles like any other tile.
    pub async fn toggle_tile(&self, row: usize, col: usize) -> Result<bool, StateError> {
        self.toggle_and_score(row, col)
            .await
            .map(|outcome| outcome.clicked)
    }

    /// Flip a tile, detect completed shapes and record them, in one locked step.
    pub async fn toggle_and_score(
        &self,
        row: usize,
        col: usize,
    ) -> Result<ToggleOutcome, StateError> {
        let coord = Coord::new(row, col).ok_or(StateError::OutOfBounds { row, col })?;

        let outcome = {
            let mut state = self.state.lock().await;
            if state.board.is_none() {
                return Err(StateError::NoBoard);
            }
            if state.is_game_closed {
                return Err(StateError::GameClosed);
            }
            if coord == FREE_SPACE && state.board.as_ref().is_some_and(Board::has_free_space) {
                return Ok(ToggleOutcome {
                    clicked: true,
                    new_patterns: Vec::new(),
                    announcements: Vec::new(),
                });
            }

            let clicked = if state.clicked.remove(&coord) {
                false
            } else {
                state.clicked.insert(coord);
                true
            };

            let new_patterns = patterns::evaluate(&state.clicked, &state.patterns);
            state
                .patterns
                .extend(new_patterns.iter().map(Pattern::id));
            let announcements = patterns::announcements(&new_patterns, &state.patterns);
            state.touch();

            ToggleOutcome {
                clicked,
                new_patterns,
                announcements,
            }
        };

        debug!(%coord, clicked = outcome.clicked, "tile toggled");
        self.mark_dirty();
        Ok(outcome)
    }

    /// Clear every mark and announced shape, keeping the free space.
    pub async fn reset_board(&self) {
        {
            let mut state = self.state.lock().await;
            state.clear_marks();
            state.touch();
        }
        info!("board reset");
        self.mark_dirty();
    }

    /// Install a new board, clearing marks and shapes.
    ///
    /// The iteration counter never moves backward: it becomes the larger of
    /// `iteration` and the current value plus one.
    pub async fn update_board(&self, board: Board, iteration: u64, seed: Option<String>) {
        let iteration = {
            let mut state = self.state.lock().await;
            install_board(&mut state, board, iteration, seed)
        };
        info!(iteration, "board replaced");
        self.mark_dirty();
    }

    /// Generate and install the next board from `pool`, returning its iteration.
    ///
    /// The next iteration doubles as the generation seed.
    pub async fn generate_next_board(&self, pool: &[String]) -> (u64, GeneratedBoard) {
        let (iteration, generated) = {
            let mut state = self.state.lock().await;
            install_next_board(&mut state, pool)
        };
        info!(iteration, "new board generated");
        self.mark_dirty();
        (iteration, generated)
    }

    /// Install the very first board, unless one already exists.
    ///
    /// Returns `false` when a board was already present.
    pub async fn seed_initial_board(&self, pool: &[String]) -> bool {
        {
            let mut state = self.state.lock().await;
            if state.board.is_some() {
                return false;
            }
            let seed = state.board_iteration;
            let generated = board::generate(seed, pool);
            state.board = Some(generated.board);
            state.today_seed = Some(board::seed_label(seed));
            state.clear_marks();
            state.touch();
        }
        self.mark_dirty();
        true
    }

    /// Close the game and persist it immediately.
    pub async fn close_game(&self) {
        {
            let mut state = self.state.lock().await;
            state.is_game_closed = true;
            state.header_text = CLOSED_HEADER_TEXT.to_string();
            state.touch();
        }
        info!("game closed");
        self.revision.send_modify(|rev| *rev += 1);
        if let Err(err) = self.flush().await {
            error!(error = %err, "failed to persist closed game");
        }
    }

    /// Reopen a closed game.
    pub async fn reopen_game(&self) {
        {
            let mut state = self.state.lock().await;
            state.is_game_closed = false;
            state.header_text = self.open_header.clone();
            state.touch();
        }
        info!("game reopened");
        self.mark_dirty();
    }

    /// Reopen a closed game on the next board drawn from `pool`.
    ///
    /// The flag, the header and the new board change under a single lock, so
    /// no toggle, view or write ever sees the old card reopened.
    pub async fn reopen_with_board(&self, pool: &[String]) -> (u64, GeneratedBoard) {
        let (iteration, generated) = {
            let mut state = self.state.lock().await;
            state.is_game_closed = false;
            state.header_text = self.open_header.clone();
            install_next_board(&mut state, pool)
        };
        info!(iteration, "game reopened on a new board");
        self.mark_dirty();
        (iteration, generated)
    }

    /// Record a shape as announced; duplicates are ignored.
    pub async fn add_pattern(&self, id: impl Into<String>) {
        let inserted = {
            let mut state = self.state.lock().await;
            let inserted = state.patterns.insert(id.into());
            if inserted {
                state.touch();
            }
            inserted
        };
        if inserted {
            self.mark_dirty();
        }
    }

    /// Change the header shown above the board.
    pub async fn set_header_text(&self, text: impl Into<String>) {
        {
            let mut state = self.state.lock().await;
            state.header_text = text.into();
            state.touch();
        }
        self.mark_dirty();
    }

    /// Write the latest state now, bypassing the debounce window.
    pub async fn flush(&self) -> StorageResult<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.persist
            .send(PersistCommand::Flush(ack_tx))
            .map_err(|_| StorageError::WorkerStopped)?;
        ack_rx.await.map_err(|_| StorageError::WorkerStopped)?
    }

    fn mark_dirty(&self) {
        self.revision.send_modify(|rev| *rev += 1);
        if self.persist.send(PersistCommand::Dirty).is_err() {
            warn!("persistence worker stopped; change kept in memory only");
        }
    }
}

fn install_next_board(state: &mut GameState, pool: &[String]) -> (u64, GeneratedBoard) {
    let next = state.board_iteration + 1;
    let generated = board::generate(next, pool);
    let iteration = install_board(
        state,
        generated.board.clone(),
        next,
        Some(board::seed_label(next)),
    );
    (iteration, generated)
}

fn install_board(state: &mut GameState, board: Board, iteration: u64, seed: Option<String>) -> u64 {
    state.board = Some(board);
    state.board_iteration = iteration.max(state.board_iteration + 1);
    state.today_seed = seed;
    state.clear_marks();
    state.touch();
    state.board_iteration
}
