use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{
    dto::events::Handshake,
    error::AppError,
    services::sse_service::{self, StreamKind},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sse/overlay",
    tag = "sse",
    responses((status = 200, description = "Overlay SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream every realtime topic to the overlay / spectator view.
pub async fn overlay_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    info!("new overlay SSE connection");
    let receivers = sse_service::subscribe_all(&state);
    let handshake = Handshake {
        stream: "overlay".into(),
        degraded: state.is_degraded().await,
        token: None,
    };
    sse_service::to_sse_stream(receivers, None, handshake, StreamKind::Overlay)
}

#[utoipa::path(
    get,
    path = "/sse/host",
    tag = "sse",
    responses(
        (status = 200, description = "Host SSE stream carrying the host token", content_type = "text/event-stream", body = String),
        (status = 401, description = "Another host stream is already active")
    )
)]
/// Stream every realtime topic to the host view, claiming the host token.
pub async fn host_stream(
    State(state): State<SharedState>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let token = sse_service::claim_host_token(&state).await?;
    info!("new host SSE connection");
    let receivers = sse_service::subscribe_all(&state);
    let handshake = Handshake {
        stream: "host".into(),
        degraded: state.is_degraded().await,
        token: Some(token),
    };
    Ok(sse_service::to_sse_stream(
        receivers,
        None,
        handshake,
        StreamKind::Host(state),
    ))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/overlay", get(overlay_stream))
        .route("/sse/host", get(host_stream))
}
