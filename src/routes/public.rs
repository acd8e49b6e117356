use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    dto::{
        game::{PublicGameSummary, RoundProgress, TimerSnapshot, WheelSnapshot},
        host::{VerifyPasswordRequest, VerifyPasswordResponse},
    },
    error::AppError,
    services::{host_service, round_service, snapshot_service, timer_service, wheel_service},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/public/game",
    tag = "public",
    responses(
        (status = 200, description = "Answer-free session projection", body = PublicGameSummary),
        (status = 404, description = "No active game session")
    )
)]
/// Read-only session projection for the overlay and spectators.
pub async fn get_game(
    State(state): State<SharedState>,
) -> Result<Json<PublicGameSummary>, AppError> {
    Ok(Json(host_service::public_summary(&state).await?))
}

#[utoipa::path(
    get,
    path = "/public/round",
    tag = "public",
    responses((status = 200, description = "Round machine state and progress", body = RoundProgress))
)]
/// Current round, version, and advancement progress.
pub async fn get_round(State(state): State<SharedState>) -> Json<RoundProgress> {
    Json(round_service::progress(&state).await)
}

#[utoipa::path(
    get,
    path = "/public/timer",
    tag = "public",
    responses((status = 200, description = "Shared countdown state", body = TimerSnapshot))
)]
/// Countdown snapshot for late joiners.
pub async fn get_timer(State(state): State<SharedState>) -> Json<TimerSnapshot> {
    Json(timer_service::snapshot(&state).await)
}

#[utoipa::path(
    get,
    path = "/public/wheel",
    tag = "public",
    responses((status = 200, description = "Wheel coordinator state", body = WheelSnapshot))
)]
/// Wheel snapshot for late joiners.
pub async fn get_wheel(State(state): State<SharedState>) -> Json<WheelSnapshot> {
    Json(wheel_service::snapshot(&state).await)
}

#[utoipa::path(
    post,
    path = "/public/password/verify",
    tag = "public",
    request_body = VerifyPasswordRequest,
    responses((status = 200, description = "Verification outcome", body = VerifyPasswordResponse))
)]
/// Check an attempt against the shared-password gate.
pub async fn verify_password(
    State(state): State<SharedState>,
    Json(payload): Json<VerifyPasswordRequest>,
) -> Result<Json<VerifyPasswordResponse>, AppError> {
    Ok(Json(
        snapshot_service::verify_password(&state, &payload.password).await?,
    ))
}

/// Configure the public read-only endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/public/game", get(get_game))
        .route("/public/round", get(get_round))
        .route("/public/timer", get(get_timer))
        .route("/public/wheel", get(get_wheel))
        .route("/public/password/verify", post(verify_password))
}
