use std::{
    collections::HashSet,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use tokio::{
    fs,
    sync::Mutex,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, warn};

use crate::state::SharedState;

/// Phrases repeating more than half of their words are rejected.
const MIN_UNIQUE_WORD_RATIO: f64 = 0.5;

/// Default period between two checks of the phrase file.
pub const DEFAULT_PHRASE_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Phrase pool backed by a file and re-read when that file changes.
pub struct PhraseBook {
    path: Option<PathBuf>,
    pool: Mutex<LoadedPool>,
}

#[derive(Default)]
struct LoadedPool {
    phrases: Vec<String>,
    modified: Option<SystemTime>,
}

impl PhraseBook {
    /// Read the pool from `path`, remembering the file's modification time.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let modified = modified_at(&path).await;
        let phrases = load_phrases(&path).await;
        Self {
            path: Some(path),
            pool: Mutex::new(LoadedPool { phrases, modified }),
        }
    }

    /// Pool that is never reloaded.
    pub fn fixed(phrases: Vec<String>) -> Self {
        Self {
            path: None,
            pool: Mutex::new(LoadedPool {
                phrases,
                modified: None,
            }),
        }
    }

    /// Copy of the current pool.
    pub async fn current(&self) -> Vec<String> {
        self.pool.lock().await.phrases.clone()
    }

    /// Re-read the file if its modification time moved since the last read.
    ///
    /// Returns `true` when the pool was replaced. A file that cannot be
    /// inspected keeps the current pool.
    pub async fn refresh(&self) -> bool {
        let Some(path) = &self.path else {
            return false;
        };

        let mut pool = self.pool.lock().await;
        let Some(modified) = modified_at(path).await else {
            return false;
        };
        if pool.modified == Some(modified) {
            return false;
        }

        info!(path = %path.display(), "phrase file changed; reloading");
        pool.phrases = load_phrases(path).await;
        pool.modified = Some(modified);
        true
    }

    /// Re-read the file unconditionally and return the new pool size.
    pub async fn reload(&self) -> usize {
        let Some(path) = &self.path else {
            return self.pool.lock().await.phrases.len();
        };

        let mut pool = self.pool.lock().await;
        pool.modified = modified_at(path).await;
        pool.phrases = load_phrases(path).await;
        pool.phrases.len()
    }
}

impl From<Vec<String>> for PhraseBook {
    fn from(phrases: Vec<String>) -> Self {
        Self::fixed(phrases)
    }
}

async fn modified_at(path: &Path) -> Option<SystemTime> {
    match fs::metadata(path).await.and_then(|meta| meta.modified()) {
        Ok(modified) => Some(modified),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "cannot read phrase file mtime");
            None
        }
    }
}

/// Watch the phrase file and draw a new board whenever it changes.
///
/// A closed game keeps its card; reopening reads the file again anyway.
/// Runs until the task is aborted.
pub async fn watch_phrases(state: SharedState, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately and the pool was just loaded.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if !state.phrases().refresh().await {
            continue;
        }
        if state.store().snapshot().await.is_game_closed {
            debug!("phrase pool reloaded while closed; board kept");
            continue;
        }

        let pool = state.phrases().current().await;
        let (iteration, generated) = state.store().generate_next_board(&pool).await;
        info!(iteration, degraded = generated.degraded, "new board drawn from reloaded phrases");
    }
}

/// Read the phrase pool from `path`.
///
/// A missing or unreadable file yields an empty pool; board generation then
/// falls back to placeholder phrases.
pub async fn load_phrases(path: &Path) -> Vec<String> {
    match fs::read_to_string(path).await {
        Ok(contents) => {
            let phrases = normalize_phrases(&contents);
            info!(path = %path.display(), count = phrases.len(), "loaded phrase pool");
            phrases
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "phrase file not found; using placeholders");
            Vec::new()
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read phrase file; using placeholders");
            Vec::new()
        }
    }
}

/// One phrase per line: trimmed, uppercased, deduplicated in order of first
/// appearance, without blank lines or word-salad repetitions.
pub fn normalize_phrases(contents: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    contents
        .lines()
        .map(|line| line.trim().to_uppercase())
        .filter(|line| !line.is_empty())
        .filter(|line| has_enough_unique_words(line))
        .filter(|line| seen.insert(line.clone()))
        .collect()
}

fn has_enough_unique_words(phrase: &str) -> bool {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    let unique: HashSet<&str> = words.iter().copied().collect();
    unique.len() as f64 / words.len() as f64 >= MIN_UNIQUE_WORD_RATIO
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_trimmed_uppercased_and_deduplicated() {
        let contents = "  ships on friday \n\nShips on Friday\nworks on my machine\n   \n";
        assert_eq!(
            normalize_phrases(contents),
            vec!["SHIPS ON FRIDAY", "WORKS ON MY MACHINE"]
        );
    }

    #[test]
    fn order_of_first_appearance_is_kept() {
        let contents = "b\na\nb\nc\na";
        assert_eq!(normalize_phrases(contents), vec!["B", "A", "C"]);
    }

    #[test]
    fn repetitive_phrases_are_dropped() {
        let contents = "again again again again\nagain and again\nmeeting meeting";
        // Only the first falls below half unique words.
        assert_eq!(
            normalize_phrases(contents),
            vec!["AGAIN AND AGAIN", "MEETING MEETING"]
        );
    }

    fn touch_later(path: &Path) {
        std::fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(5))
            .unwrap();
    }

    #[tokio::test]
    async fn refresh_reloads_only_after_the_file_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phrases.txt");
        std::fs::write(&path, "stand up
").unwrap();
        let book = PhraseBook::load(&path).await;

        assert!(!book.refresh().await);
        assert_eq!(book.current().await, vec!["STAND UP"]);

        std::fs::write(&path, "stand up
sit down
").unwrap();
        touch_later(&path);

        assert!(book.refresh().await);
        assert_eq!(book.current().await, vec!["STAND UP", "SIT DOWN"]);
        assert!(!book.refresh().await);
    }

    #[tokio::test]
    async fn reload_reads_the_file_unconditionally() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phrases.txt");
        std::fs::write(&path, "one thing
").unwrap();
        let book = PhraseBook::load(&path).await;

        std::fs::write(&path, "one thing
another thing
").unwrap();

        assert_eq!(book.reload().await, 2);
        assert_eq!(book.current().await, vec!["ONE THING", "ANOTHER THING"]);
    }

    #[tokio::test]
    async fn fixed_pool_never_reloads() {
        let book = PhraseBook::from(vec!["ALPHA".to_string()]);
        assert!(!book.refresh().await);
        assert_eq!(book.reload().await, 1);
        assert_eq!(book.current().await, vec!["ALPHA"]);
    }

    #[tokio::test]
    async fn deleted_file_keeps_the_current_pool() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phrases.txt");
        std::fs::write(&path, "code freeze
").unwrap();
        let book = PhraseBook::load(&path).await;

        std::fs::remove_file(&path).unwrap();

        assert!(!book.refresh().await);
        assert_eq!(book.current().await, vec!["CODE FREEZE"]);
    }

    #[tokio::test]
    async fn edited_phrase_file_draws_a_new_board() {
        use std::sync::Arc;

        use crate::{
            dao::snapshot_store::MemorySnapshotStore,
            state::{AppState, store::StateStore},
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phrases.txt");
        std::fs::write(&path, "release train\n").unwrap();

        let (store, worker) = StateStore::new(
            Arc::new(MemorySnapshotStore::new()),
            Duration::from_millis(20),
        );
        tokio::spawn(worker.run());
        store.seed_initial_board(&[]).await;
        let state = AppState::new(store, PhraseBook::load(&path).await);
        let before = state.store().snapshot().await.board_iteration;
        tokio::spawn(watch_phrases(state.clone(), Duration::from_millis(20)));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(state.store().snapshot().await.board_iteration, before);

        std::fs::write(&path, "release train\nhotfix friday\n").unwrap();
        touch_later(&path);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(state.store().snapshot().await.board_iteration, before + 1);
        assert_eq!(state.phrases().current().await.len(), 2);
    }

    #[tokio::test]
    async fn missing_file_yields_empty_pool() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_phrases(&dir.path().join("phrases.txt")).await.is_empty());
    }

    #[tokio::test]
    async fn file_contents_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phrases.txt");
        std::fs::write(&path, "flaky test\nFLAKY TEST\nmerge conflict\n").unwrap();

        assert_eq!(
            load_phrases(&path).await,
            vec!["FLAKY TEST", "MERGE CONFLICT"]
        );
    }
}
