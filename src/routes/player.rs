use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Path, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;
use uuid::Uuid;

use crate::{
    bus::Topic,
    dto::{events::Handshake, game::PlayerSummary},
    error::AppError,
    services::{
        presence_service,
        sse_service::{self, StreamKind},
    },
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/player/{id}/events",
    tag = "player",
    params(("id" = String, Path, description = "Player identifier")),
    responses(
        (status = 200, description = "Per-player SSE stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown player")
    )
)]
/// Stream game events to one player's device, filtered to events that
/// concern them.
pub async fn player_stream(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    presence_service::attach_player(&state, id).await?;
    info!(player_id = %id, "new player SSE connection");

    let receivers = vec![state.bus().subscribe(Topic::GameEvents)];
    let filter = Box::new(move |event: &crate::dto::events::ServerEvent| {
        presence_service::event_concerns_player(id, event)
    });
    let handshake = Handshake {
        stream: "player".into(),
        degraded: state.is_degraded().await,
        token: None,
    };
    Ok(sse_service::to_sse_stream(
        receivers,
        Some(filter),
        handshake,
        StreamKind::Player {
            state,
            player_id: id,
        },
    ))
}

#[utoipa::path(
    get,
    path = "/player/{id}",
    tag = "player",
    params(("id" = String, Path, description = "Player identifier")),
    responses(
        (status = 200, description = "Player projection", body = PlayerSummary),
        (status = 404, description = "Unknown player")
    )
)]
/// Read-only projection of one player for their own device.
pub async fn get_player(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PlayerSummary>, AppError> {
    let summary = state
        .read_session(|session| {
            session.and_then(|session| {
                session
                    .player(id)
                    .map(|player| PlayerSummary::from_session(session, player))
            })
        })
        .await
        .ok_or_else(|| AppError::NotFound("unknown player".into()))?;
    Ok(Json(summary))
}

/// Configure the player-facing endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/player/{id}/events", get(player_stream))
        .route("/player/{id}", get(get_player))
}
