//! SSE plumbing: turning bus subscriptions into long-lived response streams
//! with per-kind teardown, and the single-host token claim.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;
use uuid::Uuid;

use crate::{
    bus::Topic,
    dto::events::{Handshake, ServerEvent},
    error::{ServiceError, ServiceResult},
    state::SharedState,
};

/// Keep-alive ping interval for every SSE response.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);
/// Bounded buffer between the bus forwarders and the response stream.
const STREAM_BUFFER: usize = 8;

/// Identifies the SSE stream so teardown can run stream-specific
/// bookkeeping once the client disconnects.
#[derive(Clone)]
pub enum StreamKind {
    /// Read-only overlay / spectator stream.
    Overlay,
    /// Privileged host stream. Carries the state handle so teardown can
    /// release the host token; cloning it only bumps the `Arc`.
    Host(SharedState),
    /// Per-player stream. Teardown drops the presence entry.
    Player {
        /// State handle for presence cleanup.
        state: SharedState,
        /// The player the stream belongs to.
        player_id: Uuid,
    },
}

/// Per-event predicate applied before forwarding to the client.
pub type EventFilter = Box<dyn Fn(&ServerEvent) -> bool + Send + Sync + 'static>;

/// Build an SSE response fanning in one or more bus subscriptions.
///
/// Each receiver gets its own forwarder task pushing into one bounded
/// channel; a watcher task runs the teardown exactly once after the client
/// disconnects (every forwarder exits once the channel closes).
pub fn to_sse_stream(
    receivers: Vec<broadcast::Receiver<ServerEvent>>,
    filter: Option<EventFilter>,
    handshake: Handshake,
    kind: StreamKind,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(STREAM_BUFFER);

    if let Ok(payload) = serde_json::to_string(&handshake) {
        let _ = tx.try_send(Ok(Event::default().event("handshake").data(payload)));
    }

    let filter = filter.map(Arc::new);
    for receiver in receivers {
        let tx = tx.clone();
        let filter = filter.clone();
        tokio::spawn(forward_events(receiver, tx, filter));
    }

    // Watcher owns the last non-forwarder sender clone; once the response
    // stream drops, all senders fail and this runs the teardown.
    let watcher_tx = tx;
    tokio::spawn(async move {
        watcher_tx.closed().await;
        match kind {
            StreamKind::Overlay => info!("overlay SSE stream disconnected"),
            StreamKind::Host(state) => {
                reset_host_token(&state).await;
                info!("host SSE stream disconnected");
            }
            StreamKind::Player { state, player_id } => {
                state.presence().remove(&player_id);
                info!(%player_id, "player SSE stream disconnected");
            }
        }
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}

async fn forward_events(
    mut receiver: broadcast::Receiver<ServerEvent>,
    tx: mpsc::Sender<Result<Event, Infallible>>,
    filter: Option<Arc<EventFilter>>,
) {
    loop {
        tokio::select! {
            _ = tx.closed() => break,
            received = receiver.recv() => match received {
                Ok(payload) => {
                    if filter.as_ref().is_some_and(|filter| !(**filter)(&payload)) {
                        continue;
                    }
                    let mut event = Event::default().data(payload.data);
                    if let Some(name) = payload.event {
                        event = event.event(name);
                    }
                    if tx.send(Ok(event)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
                // Skip lagged messages but keep the stream alive.
                Err(RecvError::Lagged(_)) => continue,
            }
        }
    }
}

/// Subscribe to every topic the overlay mirrors.
pub fn subscribe_all(state: &SharedState) -> Vec<broadcast::Receiver<ServerEvent>> {
    vec![
        state.bus().subscribe(Topic::GameEvents),
        state.bus().subscribe(Topic::WheelEvents),
        state.bus().subscribe(Topic::CardEffects),
    ]
}

/// Reserve the host token for a new stream, generating one when none exists
/// and failing while another connection still holds it.
pub async fn claim_host_token(state: &SharedState) -> ServiceResult<String> {
    let mut guard = state.host_token().lock().await;
    match &mut *guard {
        slot @ None => {
            let token = Uuid::new_v4().simple().to_string();
            slot.replace(token.clone());
            Ok(token)
        }
        Some(_) => Err(ServiceError::Unauthorized(
            "another host stream is already active".into(),
        )),
    }
}

/// Whether the presented token matches the claimed host token.
pub async fn verify_host_token(state: &SharedState, presented: &str) -> bool {
    state
        .host_token()
        .lock()
        .await
        .as_deref()
        .is_some_and(|token| token == presented)
}

/// Clear the stored host token so the next host connection negotiates a
/// fresh credential.
pub async fn reset_host_token(state: &SharedState) {
    state.host_token().lock().await.take();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::AppState};

    #[tokio::test]
    async fn host_token_is_exclusive_until_released() {
        let state = AppState::new(AppConfig::default());

        let token = claim_host_token(&state).await.unwrap();
        assert!(verify_host_token(&state, &token).await);
        assert!(!verify_host_token(&state, "forged").await);
        assert!(matches!(
            claim_host_token(&state).await,
            Err(ServiceError::Unauthorized(_))
        ));

        reset_host_token(&state).await;
        let fresh = claim_host_token(&state).await.unwrap();
        assert_ne!(fresh, token);
    }
}
