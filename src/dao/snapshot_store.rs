use std::{
    ffi::OsString,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use futures::future::BoxFuture;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, warn};

use crate::dao::{
    models::SnapshotEntity,
    storage::{StorageError, StorageResult},
};

/// Durable home of the shared card.
pub trait SnapshotStore: Send + Sync {
    /// Read the stored snapshot; `Ok(None)` when nothing has been written yet.
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<SnapshotEntity>>>;
    /// Replace the stored snapshot with `snapshot` atomically.
    fn save(&self, snapshot: SnapshotEntity) -> BoxFuture<'static, StorageResult<()>>;
}

/// JSON file store writing through a sibling temporary file and an atomic rename.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: Arc<Path>,
}

impl FileSnapshotStore {
    /// Store snapshots at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path: PathBuf = path.into();
        Self {
            path: Arc::from(path),
        }
    }

    /// Location of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file used while a write is in flight.
    pub fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("snapshot"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<SnapshotEntity>>> {
        let path = self.path.clone();
        Box::pin(async move {
            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
                Err(err) => return Err(StorageError::io(&*path, err)),
            };

            serde_json::from_slice::<SnapshotEntity>(&bytes)
                .map(Some)
                .map_err(|err| StorageError::Corrupt {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                })
        })
    }

    fn save(&self, snapshot: SnapshotEntity) -> BoxFuture<'static, StorageResult<()>> {
        let path = self.path.clone();
        let temp_path = self.temp_path();
        Box::pin(async move {
            let payload =
                serde_json::to_vec_pretty(&snapshot).map_err(StorageError::Serialize)?;

            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|err| StorageError::io(parent, err))?;
            }

            if let Err(err) = write_and_rename(&temp_path, &path, &payload).await {
                match fs::remove_file(&temp_path).await {
                    Err(cleanup) if cleanup.kind() != ErrorKind::NotFound => {
                        warn!(path = %temp_path.display(), error = %cleanup, "failed to remove temporary snapshot");
                    }
                    _ => {}
                }
                return Err(err);
            }

            debug!(path = %path.display(), bytes = payload.len(), "snapshot written");
            Ok(())
        })
    }
}

async fn write_and_rename(temp_path: &Path, path: &Path, payload: &[u8]) -> StorageResult<()> {
    let mut file = fs::File::create(temp_path)
        .await
        .map_err(|err| StorageError::io(temp_path, err))?;
    file.write_all(payload)
        .await
        .map_err(|err| StorageError::io(temp_path, err))?;
    file.sync_all()
        .await
        .map_err(|err| StorageError::io(temp_path, err))?;
    drop(file);

    fs::rename(temp_path, path)
        .await
        .map_err(|err| StorageError::io(path, err))
}

/// Process-local store keeping the last snapshot in memory.
///
/// Handy for ephemeral runs and tests; it also counts writes so callers can
/// observe how bursts were coalesced.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    slot: Arc<Mutex<Option<SnapshotEntity>>>,
    writes: Arc<AtomicUsize>,
}

impl MemorySnapshotStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `save` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Last snapshot written, if any.
    pub fn latest(&self) -> Option<SnapshotEntity> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<SnapshotEntity>>> {
        let snapshot = self.latest();
        Box::pin(async move { Ok(snapshot) })
    }

    fn save(&self, snapshot: SnapshotEntity) -> BoxFuture<'static, StorageResult<()>> {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(snapshot);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }
}
