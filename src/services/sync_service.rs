use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::state::SharedState;

/// Default period of the safety-net reconciliation.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(1);

/// Keep every view in line with the canonical state.
///
/// Wakes on each state change and on a periodic tick, so a push missed
/// because a view was lagging is repaired within one period. Runs until the
/// task is aborted.
pub async fn run(state: SharedState, period: Duration) {
    let mut revisions = state.store().subscribe();
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = ticker.tick() => {}
        }

        let report = state.sync_views().await;
        if report != Default::default() {
            debug!(
                frames = report.frames,
                diffs = report.diffs,
                pruned = report.pruned,
                "views synchronised"
            );
        }
    }

    info!("view synchronisation stopped");
}
