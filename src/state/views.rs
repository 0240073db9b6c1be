//! Connected views of the shared card and the diffing that keeps them current.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::{
    game::{CLOSED_MESSAGE_TEXT, Coord, GameState},
    patterns::Announcement,
};

/// How a view presents the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    /// Players can toggle tiles and use the controls.
    Interactive,
    /// Read-only mirror, e.g. a projector.
    DisplayOnly,
}

/// Buttons offered to a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    /// Clear every mark.
    Reset,
    /// Generate the next board.
    NewBoard,
    /// Close the game.
    Close,
    /// Reopen a closed game.
    Reopen,
}

/// One rendered cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TileView {
    /// Phrase printed on the tile.
    pub phrase: String,
    /// Whether the tile is marked.
    pub clicked: bool,
    /// Whether the view may toggle it.
    pub clickable: bool,
}

/// Complete picture pushed when a view's layout changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ViewFrame {
    /// Header above the board.
    pub header: String,
    /// Seed label of the board.
    pub seed: Option<String>,
    /// Board iteration.
    pub iteration: u64,
    /// Whether the game is closed.
    pub closed: bool,
    /// Rows of tiles; absent while closed or before the first board.
    pub cells: Option<Vec<Vec<TileView>>>,
    /// Placeholder shown instead of the board while closed.
    pub closed_message: Option<String>,
    /// Available controls.
    pub controls: Vec<Control>,
}

impl ViewFrame {
    /// Render `state` for a view of the given kind.
    pub fn render(state: &GameState, kind: ViewKind) -> Self {
        let interactive = kind == ViewKind::Interactive;
        let closed = state.is_game_closed;

        let cells = match (&state.board, closed) {
            (Some(board), false) => Some(
                board
                    .rows()
                    .iter()
                    .enumerate()
                    .map(|(row, phrases)| {
                        phrases
                            .iter()
                            .enumerate()
                            .map(|(col, phrase)| TileView {
                                phrase: phrase.clone(),
                                clicked: state.clicked.contains(&Coord::cell(row, col)),
                                clickable: interactive,
                            })
                            .collect()
                    })
                    .collect(),
            ),
            _ => None,
        };

        let controls = match (interactive, closed) {
            (false, _) => Vec::new(),
            (true, true) => vec![Control::Reopen],
            (true, false) => vec![Control::Reset, Control::NewBoard, Control::Close],
        };

        Self {
            header: state.header_text.clone(),
            seed: state.today_seed.clone(),
            iteration: state.board_iteration,
            closed,
            cells,
            closed_message: closed.then(|| CLOSED_MESSAGE_TEXT.to_string()),
            controls,
        }
    }

    /// True when both frames show the same board and chrome, ignoring marks.
    fn same_layout(&self, other: &ViewFrame) -> bool {
        fn phrases(frame: &ViewFrame) -> Option<Vec<&str>> {
            frame.cells.as_ref().map(|rows| {
                rows.iter()
                    .flatten()
                    .map(|tile| tile.phrase.as_str())
                    .collect()
            })
        }

        self.header == other.header
            && self.seed == other.seed
            && self.iteration == other.iteration
            && self.closed == other.closed
            && self.controls == other.controls
            && phrases(self) == phrases(other)
    }

    /// Tiles whose mark differs from `previous`.
    fn changed_tiles(&self, previous: &ViewFrame) -> Vec<TileChange> {
        let (Some(current), Some(before)) = (&self.cells, &previous.cells) else {
            return Vec::new();
        };

        current
            .iter()
            .zip(before)
            .enumerate()
            .flat_map(|(row, (now, was))| {
                now.iter()
                    .zip(was)
                    .enumerate()
                    .filter(|(_, (now, was))| now.clicked != was.clicked)
                    .map(move |(col, (now, _))| TileChange {
                        row,
                        col,
                        clicked: now.clicked,
                    })
            })
            .collect()
    }
}

/// A single tile whose mark changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TileChange {
    /// Row of the tile.
    pub row: usize,
    /// Column of the tile.
    pub col: usize,
    /// New mark.
    pub clicked: bool,
}

/// Incremental update carrying only changed marks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TilesDiff {
    /// Board iteration the diff applies to.
    pub iteration: u64,
    /// Changed tiles, row-major.
    pub tiles: Vec<TileChange>,
}

/// Message delivered to a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewUpdate {
    /// Replace the whole picture.
    Frame(ViewFrame),
    /// Apply mark changes to the current picture.
    Tiles(TilesDiff),
    /// Show a win message.
    Announcement(Announcement),
}

impl ViewUpdate {
    /// Event name used on the wire.
    pub fn event_name(&self) -> &'static str {
        match self {
            ViewUpdate::Frame(_) => "frame",
            ViewUpdate::Tiles(_) => "tiles",
            ViewUpdate::Announcement(_) => "announcement",
        }
    }
}

/// Why a push did not reach a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ViewPushError {
    /// The view disconnected.
    #[error("view disconnected")]
    Closed,
    /// The view is not draining its queue fast enough.
    #[error("view queue is full")]
    Full,
}

/// Sink receiving updates for one connected view.
pub trait ViewHandle: Send + Sync {
    /// Queue `update` without waiting.
    fn push(&self, update: &ViewUpdate) -> Result<(), ViewPushError>;
    /// Whether the view has gone away.
    fn is_closed(&self) -> bool;
}

struct RegisteredView {
    name: String,
    kind: ViewKind,
    handle: Arc<dyn ViewHandle>,
    last: Option<ViewFrame>,
}

/// Summary of one reconciliation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Full frames pushed.
    pub frames: usize,
    /// Tile diffs pushed.
    pub diffs: usize,
    /// Views removed because they disconnected.
    pub pruned: usize,
}

/// Every view currently connected.
#[derive(Default)]
pub struct ViewRegistry {
    views: DashMap<Uuid, RegisteredView>,
}

impl ViewRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a view; it receives a full frame on the next reconciliation.
    pub fn register(
        &self,
        name: impl Into<String>,
        kind: ViewKind,
        handle: Arc<dyn ViewHandle>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let name = name.into();
        info!(%id, %name, ?kind, "view registered");
        self.views.insert(
            id,
            RegisteredView {
                name,
                kind,
                handle,
                last: None,
            },
        );
        id
    }

    /// Remove a view; returns `false` when it was already gone.
    pub fn deregister(&self, id: Uuid) -> bool {
        match self.views.remove(&id) {
            Some((_, view)) => {
                info!(%id, name = %view.name, "view deregistered");
                true
            }
            None => false,
        }
    }

    /// Number of connected views of `kind`.
    pub fn count(&self, kind: ViewKind) -> usize {
        self.views
            .iter()
            .filter(|entry| entry.kind == kind && !entry.handle.is_closed())
            .count()
    }

    /// Bring every view in line with `state`.
    pub fn reconcile(&self, state: &GameState) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut gone = Vec::new();

        for mut entry in self.views.iter_mut() {
            let id = *entry.key();
            let view = entry.value_mut();
            if view.handle.is_closed() {
                gone.push(id);
                continue;
            }

            let frame = ViewFrame::render(state, view.kind);
            let update = match &view.last {
                Some(last) if last.same_layout(&frame) => {
                    let tiles = frame.changed_tiles(last);
                    if tiles.is_empty() {
                        continue;
                    }
                    ViewUpdate::Tiles(TilesDiff {
                        iteration: frame.iteration,
                        tiles,
                    })
                }
                _ => ViewUpdate::Frame(frame.clone()),
            };

            match view.handle.push(&update) {
                Ok(()) => {
                    match update {
                        ViewUpdate::Frame(_) => report.frames += 1,
                        _ => report.diffs += 1,
                    }
                    view.last = Some(frame);
                }
                Err(ViewPushError::Full) => {
                    debug!(%id, name = %view.name, "view lagging; resyncing with a full frame");
                    view.last = None;
                }
                Err(ViewPushError::Closed) => gone.push(id),
            }
        }

        for id in gone {
            if self.deregister(id) {
                report.pruned += 1;
            }
        }
        report
    }

    /// Send win messages to every view.
    pub fn broadcast_announcements(&self, announcements: &[Announcement]) {
        if announcements.is_empty() {
            return;
        }

        let mut gone = Vec::new();
        for entry in self.views.iter() {
            for announcement in announcements {
                let update = ViewUpdate::Announcement(announcement.clone());
                if let Err(ViewPushError::Closed) = entry.handle.push(&update) {
                    gone.push(*entry.key());
                    break;
                }
            }
        }
        for id in gone {
            self.deregister(id);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    };

    use super::*;
    use crate::state::{
        game::{CLOSED_HEADER_TEXT, FREE_SPACE, tests::sample_board},
        patterns::AnnouncementKind,
    };

    #[derive(Default)]
    pub(crate) struct RecordingHandle {
        pub(crate) updates: Mutex<Vec<ViewUpdate>>,
        pub(crate) closed: AtomicBool,
        pub(crate) full: AtomicBool,
    }

    impl RecordingHandle {
        pub(crate) fn take(&self) -> Vec<ViewUpdate> {
            std::mem::take(&mut *self.updates.lock().unwrap())
        }
    }

    impl ViewHandle for RecordingHandle {
        fn push(&self, update: &ViewUpdate) -> Result<(), ViewPushError> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(ViewPushError::Closed);
            }
            if self.full.load(Ordering::SeqCst) {
                return Err(ViewPushError::Full);
            }
            self.updates.lock().unwrap().push(update.clone());
            Ok(())
        }

        fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    fn open_state() -> GameState {
        let mut state = GameState {
            board: Some(sample_board()),
            today_seed: Some("20250101.1".into()),
            ..GameState::default()
        };
        state.ensure_free_space();
        state
    }

    fn registry_with(kind: ViewKind) -> (ViewRegistry, Arc<RecordingHandle>) {
        let registry = ViewRegistry::new();
        let handle = Arc::new(RecordingHandle::default());
        registry.register("test", kind, handle.clone());
        (registry, handle)
    }

    #[test]
    fn first_reconcile_pushes_a_full_frame() {
        let (registry, handle) = registry_with(ViewKind::Interactive);
        let report = registry.reconcile(&open_state());

        assert_eq!(report.frames, 1);
        let updates = handle.take();
        let [ViewUpdate::Frame(frame)] = updates.as_slice() else {
            panic!("expected one frame, got {updates:?}");
        };
        let cells = frame.cells.as_ref().unwrap();
        assert!(cells[2][2].clicked);
        assert!(cells[0][0].clickable);
        assert_eq!(
            frame.controls,
            vec![Control::Reset, Control::NewBoard, Control::Close]
        );
    }

    #[test]
    fn unchanged_state_pushes_nothing() {
        let (registry, handle) = registry_with(ViewKind::Interactive);
        let state = open_state();
        registry.reconcile(&state);
        handle.take();

        assert_eq!(registry.reconcile(&state), ReconcileReport::default());
        assert!(handle.take().is_empty());
    }

    #[test]
    fn mark_changes_push_only_changed_tiles() {
        let (registry, handle) = registry_with(ViewKind::Interactive);
        let mut state = open_state();
        registry.reconcile(&state);
        handle.take();

        state.clicked.insert(Coord::new(0, 3).unwrap());
        state.clicked.insert(Coord::new(4, 1).unwrap());
        let report = registry.reconcile(&state);

        assert_eq!(report.diffs, 1);
        assert_eq!(
            handle.take(),
            vec![ViewUpdate::Tiles(TilesDiff {
                iteration: 1,
                tiles: vec![
                    TileChange {
                        row: 0,
                        col: 3,
                        clicked: true
                    },
                    TileChange {
                        row: 4,
                        col: 1,
                        clicked: true
                    },
                ],
            })]
        );
    }

    #[test]
    fn new_iteration_pushes_a_full_frame() {
        let (registry, handle) = registry_with(ViewKind::Interactive);
        let mut state = open_state();
        registry.reconcile(&state);
        handle.take();

        state.board_iteration += 1;
        assert_eq!(registry.reconcile(&state).frames, 1);
    }

    #[test]
    fn closed_game_shows_placeholder_and_reopen_only() {
        let (registry, handle) = registry_with(ViewKind::Interactive);
        let mut state = open_state();
        state.is_game_closed = true;
        state.header_text = CLOSED_HEADER_TEXT.into();
        registry.reconcile(&state);

        let updates = handle.take();
        let [ViewUpdate::Frame(frame)] = updates.as_slice() else {
            panic!("expected one frame, got {updates:?}");
        };
        assert!(frame.cells.is_none());
        assert_eq!(frame.closed_message.as_deref(), Some(CLOSED_MESSAGE_TEXT));
        assert_eq!(frame.header, CLOSED_HEADER_TEXT);
        assert_eq!(frame.controls, vec![Control::Reopen]);
    }

    #[test]
    fn display_only_frame_has_no_controls_or_clickable_tiles() {
        let state = open_state();
        let interactive = ViewFrame::render(&state, ViewKind::Interactive);
        let display = ViewFrame::render(&state, ViewKind::DisplayOnly);

        assert!(display.controls.is_empty());
        let cells = display.cells.as_ref().unwrap();
        assert!(cells.iter().flatten().all(|tile| !tile.clickable));
        assert_eq!(display.header, interactive.header);
        assert_eq!(
            cells[FREE_SPACE.row()][FREE_SPACE.col()].clicked,
            interactive.cells.as_ref().unwrap()[2][2].clicked
        );
    }

    #[test]
    fn lagging_view_is_resynced_with_full_frame() {
        let (registry, handle) = registry_with(ViewKind::Interactive);
        let mut state = open_state();
        registry.reconcile(&state);
        handle.take();

        handle.full.store(true, Ordering::SeqCst);
        state.clicked.insert(Coord::new(1, 1).unwrap());
        registry.reconcile(&state);

        handle.full.store(false, Ordering::SeqCst);
        registry.reconcile(&state);
        let updates = handle.take();
        assert!(matches!(updates.as_slice(), [ViewUpdate::Frame(_)]));
    }

    #[test]
    fn closed_views_are_pruned() {
        let (registry, handle) = registry_with(ViewKind::DisplayOnly);
        assert_eq!(registry.count(ViewKind::DisplayOnly), 1);

        handle.closed.store(true, Ordering::SeqCst);
        let report = registry.reconcile(&open_state());

        assert_eq!(report.pruned, 1);
        assert_eq!(registry.count(ViewKind::DisplayOnly), 0);
    }

    #[test]
    fn announcements_reach_every_view() {
        let registry = ViewRegistry::new();
        let player = Arc::new(RecordingHandle::default());
        let screen = Arc::new(RecordingHandle::default());
        registry.register("player", ViewKind::Interactive, player.clone());
        registry.register("screen", ViewKind::DisplayOnly, screen.clone());

        let announcement = Announcement {
            message: "BINGO!".into(),
            kind: AnnouncementKind::Standard,
        };
        registry.broadcast_announcements(std::slice::from_ref(&announcement));

        for handle in [player, screen] {
            assert_eq!(
                handle.take(),
                vec![ViewUpdate::Announcement(announcement.clone())]
            );
        }
    }

    #[test]
    fn counts_are_per_kind() {
        let registry = ViewRegistry::new();
        registry.register("a", ViewKind::Interactive, Arc::new(RecordingHandle::default()));
        registry.register("b", ViewKind::Interactive, Arc::new(RecordingHandle::default()));
        let id = registry.register("c", ViewKind::DisplayOnly, Arc::new(RecordingHandle::default()));

        assert_eq!(registry.count(ViewKind::Interactive), 2);
        assert_eq!(registry.count(ViewKind::DisplayOnly), 1);
        assert!(registry.deregister(id));
        assert!(!registry.deregister(id));
        assert_eq!(registry.count(ViewKind::DisplayOnly), 0);
    }
}
