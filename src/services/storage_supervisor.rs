use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, mpsc},
    time::timeout,
};
use tracing::{debug, error, info};

use crate::{
    dao::{models::SnapshotEntity, snapshot_store::SnapshotStore, storage::StorageResult},
    state::store::{PersistCommand, SharedGame},
};

/// Single writer of the snapshot file.
///
/// Dirty signals arriving within `debounce` of each other collapse into one
/// write of the latest state. Flush commands write immediately and report the
/// outcome to the caller.
pub struct PersistenceWorker {
    state: SharedGame,
    snapshots: Arc<dyn SnapshotStore>,
    commands: mpsc::UnboundedReceiver<PersistCommand>,
    debounce: Duration,
    write_lock: Mutex<()>,
}

impl PersistenceWorker {
    pub(crate) fn new(
        state: SharedGame,
        snapshots: Arc<dyn SnapshotStore>,
        commands: mpsc::UnboundedReceiver<PersistCommand>,
        debounce: Duration,
    ) -> Self {
        Self {
            state,
            snapshots,
            commands,
            debounce,
            write_lock: Mutex::new(()),
        }
    }

    /// Process commands until every [`StateStore`](crate::state::store::StateStore)
    /// handle is dropped, writing pending changes before returning.
    pub async fn run(mut self) {
        let mut dirty = false;

        loop {
            let command = if dirty {
                match timeout(self.debounce, self.commands.recv()).await {
                    Ok(command) => command,
                    Err(_elapsed) => {
                        dirty = false;
                        self.write_logged().await;
                        continue;
                    }
                }
            } else {
                self.commands.recv().await
            };

            match command {
                Some(PersistCommand::Dirty) => dirty = true,
                Some(PersistCommand::Flush(ack)) => {
                    dirty = false;
                    let result = self.write_latest().await;
                    if let Err(err) = &result {
                        error!(error = %err, "immediate snapshot write failed");
                    }
                    let _ = ack.send(result);
                }
                None => {
                    if dirty {
                        self.write_logged().await;
                    }
                    info!("persistence worker stopped");
                    break;
                }
            }
        }
    }

    async fn write_logged(&self) {
        if let Err(err) = self.write_latest().await {
            error!(error = %err, "debounced snapshot write failed; will retry on next change");
        }
    }

    async fn write_latest(&self) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let snapshot = {
            let state = self.state.lock().await;
            SnapshotEntity::from(&*state)
        };
        debug!(
            iteration = snapshot.board_iteration,
            clicked = snapshot.clicked_tiles.len(),
            "writing snapshot"
        );
        self.snapshots.save(snapshot).await
    }
}
