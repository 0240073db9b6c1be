use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    dto::sse::ServerEvent,
    state::{
        SharedState,
        views::{ViewHandle, ViewKind, ViewPushError, ViewUpdate},
    },
};

/// Events buffered per connection before the view counts as lagging.
const VIEW_QUEUE_CAPACITY: usize = 32;

/// View backed by an SSE connection.
pub struct SseViewHandle {
    tx: mpsc::Sender<ServerEvent>,
}

impl SseViewHandle {
    /// Wrap the sending half of a connection queue.
    pub fn new(tx: mpsc::Sender<ServerEvent>) -> Self {
        Self { tx }
    }
}

impl ViewHandle for SseViewHandle {
    fn push(&self, update: &ViewUpdate) -> Result<(), ViewPushError> {
        let name = Some(update.event_name().to_string());
        let encoded = match update {
            ViewUpdate::Frame(frame) => ServerEvent::json(name, frame),
            ViewUpdate::Tiles(diff) => ServerEvent::json(name, diff),
            ViewUpdate::Announcement(announcement) => ServerEvent::json(name, announcement),
        };
        let event = match encoded {
            Ok(event) => event,
            Err(err) => {
                error!(error = %err, "failed to encode view update");
                return Ok(());
            }
        };

        self.tx.try_send(event).map_err(|err| match err {
            TrySendError::Full(_) => ViewPushError::Full,
            TrySendError::Closed(_) => ViewPushError::Closed,
        })
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Register a new SSE view and return its identifier and event queue.
///
/// The view receives its first frame on the next reconciliation, which is
/// triggered right away.
pub async fn subscribe(
    state: &SharedState,
    name: &str,
    kind: ViewKind,
) -> (Uuid, mpsc::Receiver<ServerEvent>) {
    let (tx, rx) = mpsc::channel(VIEW_QUEUE_CAPACITY);
    let id = state
        .views()
        .register(name, kind, Arc::new(SseViewHandle::new(tx)));
    state.sync_views().await;
    (id, rx)
}

/// Convert a view queue into an SSE response, forwarding events and
/// deregistering the view once the client disconnects.
pub fn to_sse_stream(
    state: SharedState,
    view_id: Uuid,
    mut receiver: mpsc::Receiver<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from the view queue and pushes into mpsc
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                payload = receiver.recv() => {
                    let Some(payload) = payload else { break };
                    let mut event = Event::default().data(payload.data);
                    if let Some(name) = payload.event {
                        event = event.event(name);
                    }

                    if tx.send(Ok(event)).await.is_err() {
                        break;
                    }
                }
            }
        }

        state.views().deregister(view_id);
        info!(%view_id, "SSE view disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
