use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        game::{GameSummary, PlayerSummary, QuestionHostView, RoundProgress},
        host::{
            ActionResponse, AdjustLivesRequest, AwardPointsRequest, BlockingEffectRequest,
            BlockingEffectStatus, CompleteSpinRequest, CreateGameRequest, DeductHealthRequest,
            DeductHealthResponse, DrawQuestionRequest, GeneratePlayersRequest,
            ImportQuestionsRequest, ImportReport, IntroRequest, PasswordSettingsRequest,
            PlayerIdRequest, PlayerInput, ActivePlayerRequest, RegisterAnswerRequest,
            SaveEditionRequest, SelectQuestionRequest, SoundRequest, StartTimerRequest,
            UseCardRequest,
        },
    },
    error::AppError,
    services::{
        host_service, round_service, snapshot_service, sse_service, timer_service, wheel_service,
    },
    state::SharedState,
};

const HOST_TOKEN_HEADER: &str = "x-host-token";

/// Host-only endpoints driving the game. Everything behind the host token.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/host/game", get(get_game).post(create_game))
        .route("/host/game/start", post(start_game))
        .route("/host/game/advance", post(advance_round))
        .route("/host/game/finish", post(finish_game))
        .route("/host/game/reset", post(reset_game))
        .route("/host/game/progress", get(get_progress))
        .route("/host/players", post(add_player))
        .route("/host/players/generate", post(generate_players))
        .route("/host/players/{id}", delete(remove_player))
        .route("/host/players/active", post(set_active_player))
        .route("/host/players/points", post(award_points))
        .route("/host/players/health", post(deduct_health))
        .route("/host/players/lives", post(adjust_lives))
        .route("/host/players/eliminate", post(eliminate_player))
        .route("/host/players/answer", post(register_answer))
        .route("/host/questions/select", post(select_question))
        .route("/host/questions/draw", post(draw_question))
        .route("/host/questions/reset-used", post(reset_used_questions))
        .route("/host/questions/restore-used", post(restore_used_questions))
        .route("/host/questions/import", post(import_questions))
        .route("/host/cards/use", post(use_card))
        .route("/host/effects/check", post(check_blocking_effect))
        .route("/host/effects/use", post(use_blocking_effect))
        .route("/host/undo", post(undo))
        .route("/host/wheel/spin", post(spin_wheel))
        .route("/host/wheel/complete", post(complete_spin))
        .route("/host/wheel/reset", post(reset_wheel))
        .route("/host/timer/start", post(start_timer))
        .route("/host/timer/stop", post(stop_timer))
        .route("/host/sound", post(play_sound))
        .route("/host/intro", post(intro_control))
        .route("/host/editions", get(list_editions).post(save_edition))
        .route("/host/editions/{name}/load", post(load_edition))
        .route("/host/editions/{name}", delete(delete_edition))
        .route("/host/backups", get(list_backups).post(save_backup))
        .route("/host/backups/{id}/restore", post(restore_backup))
        .route("/host/backups/{id}", delete(delete_backup))
        .route("/host/password", post(set_password_settings))
        .route_layer(middleware::from_fn_with_state(state, require_host_token))
}

/// Create a new game session from authored content.
#[utoipa::path(
    post,
    path = "/host/game",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    request_body = CreateGameRequest,
    responses((status = 200, description = "Session created", body = GameSummary))
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Json(payload): Json<CreateGameRequest>,
) -> Result<Json<GameSummary>, AppError> {
    payload.validate()?;
    Ok(Json(host_service::create_game(&state, payload).await?))
}

/// Full host view of the current session, answers included.
#[utoipa::path(
    get,
    path = "/host/game",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    responses((status = 200, description = "Current session", body = GameSummary))
)]
pub async fn get_game(State(state): State<SharedState>) -> Result<Json<GameSummary>, AppError> {
    Ok(Json(host_service::game_summary(&state).await?))
}

/// Leave setup and start round one.
#[utoipa::path(
    post,
    path = "/host/game/start",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    responses((status = 200, description = "Round progress after the start", body = RoundProgress))
)]
pub async fn start_game(
    State(state): State<SharedState>,
) -> Result<Json<RoundProgress>, AppError> {
    round_service::start_game(&state).await?;
    Ok(Json(round_service::progress(&state).await))
}

/// Complete the current round, performing the round-one cut when leaving it.
#[utoipa::path(
    post,
    path = "/host/game/advance",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    responses(
        (status = 200, description = "Round progress after the advancement", body = RoundProgress),
        (status = 409, description = "Completion condition not met")
    )
)]
pub async fn advance_round(
    State(state): State<SharedState>,
) -> Result<Json<RoundProgress>, AppError> {
    round_service::advance_round(&state).await?;
    Ok(Json(round_service::progress(&state).await))
}

/// End the game immediately, recording alive players as winners.
#[utoipa::path(
    post,
    path = "/host/game/finish",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    responses((status = 200, description = "Round progress after finishing", body = RoundProgress))
)]
pub async fn finish_game(
    State(state): State<SharedState>,
) -> Result<Json<RoundProgress>, AppError> {
    round_service::finish_game(&state).await?;
    Ok(Json(round_service::progress(&state).await))
}

/// Reset the game back to setup, keeping authored content.
#[utoipa::path(
    post,
    path = "/host/game/reset",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    responses((status = 200, description = "Round progress after the reset", body = RoundProgress))
)]
pub async fn reset_game(State(state): State<SharedState>) -> Result<Json<RoundProgress>, AppError> {
    round_service::reset_game(&state).await?;
    Ok(Json(round_service::progress(&state).await))
}

/// Live round progress: alive count, threshold, and advanceability.
#[utoipa::path(
    get,
    path = "/host/game/progress",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    responses((status = 200, description = "Round progress", body = RoundProgress))
)]
pub async fn get_progress(State(state): State<SharedState>) -> Json<RoundProgress> {
    Json(round_service::progress(&state).await)
}

/// Add one named player to the roster.
#[utoipa::path(
    post,
    path = "/host/players",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    request_body = PlayerInput,
    responses((status = 200, description = "Player added", body = PlayerSummary))
)]
pub async fn add_player(
    State(state): State<SharedState>,
    Json(payload): Json<PlayerInput>,
) -> Result<Json<PlayerSummary>, AppError> {
    payload.validate()?;
    Ok(Json(host_service::add_player(&state, payload.name).await?))
}

/// Add players with generated names.
#[utoipa::path(
    post,
    path = "/host/players/generate",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    request_body = GeneratePlayersRequest,
    responses((status = 200, description = "Players added", body = [PlayerSummary]))
)]
pub async fn generate_players(
    State(state): State<SharedState>,
    Json(payload): Json<GeneratePlayersRequest>,
) -> Result<Json<Vec<PlayerSummary>>, AppError> {
    payload.validate()?;
    Ok(Json(
        host_service::generate_players(&state, payload.count).await?,
    ))
}

/// Remove a player entirely.
#[utoipa::path(
    delete,
    path = "/host/players/{id}",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream"),
    ("id" = String, Path, description = "Player identifier")),
    responses((status = 200, description = "Removal outcome", body = ActionResponse))
)]
pub async fn remove_player(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(host_service::remove_player(&state, id).await?))
}

/// Set or clear the single active player marker.
#[utoipa::path(
    post,
    path = "/host/players/active",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    request_body = ActivePlayerRequest,
    responses((status = 200, description = "Marker outcome", body = ActionResponse))
)]
pub async fn set_active_player(
    State(state): State<SharedState>,
    Json(payload): Json<ActivePlayerRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        host_service::set_active_player(&state, payload.player_id).await?,
    ))
}

/// Award or deduct points for one player.
#[utoipa::path(
    post,
    path = "/host/players/points",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    request_body = AwardPointsRequest,
    responses((status = 200, description = "Scoring outcome", body = ActionResponse))
)]
pub async fn award_points(
    State(state): State<SharedState>,
    Json(payload): Json<AwardPointsRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(host_service::award_points(&state, payload).await?))
}

/// Deduct a health percentage, reporting the clamped result.
#[utoipa::path(
    post,
    path = "/host/players/health",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    request_body = DeductHealthRequest,
    responses((status = 200, description = "Deduction outcome", body = DeductHealthResponse))
)]
pub async fn deduct_health(
    State(state): State<SharedState>,
    Json(payload): Json<DeductHealthRequest>,
) -> Result<Json<DeductHealthResponse>, AppError> {
    payload.validate()?;
    Ok(Json(host_service::deduct_health(&state, payload).await?))
}

/// Adjust a player's lives by a signed delta.
#[utoipa::path(
    post,
    path = "/host/players/lives",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    request_body = AdjustLivesRequest,
    responses((status = 200, description = "Adjustment outcome", body = ActionResponse))
)]
pub async fn adjust_lives(
    State(state): State<SharedState>,
    Json(payload): Json<AdjustLivesRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(host_service::adjust_lives(&state, payload).await?))
}

/// Eliminate a player permanently.
#[utoipa::path(
    post,
    path = "/host/players/eliminate",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    request_body = PlayerIdRequest,
    responses((status = 200, description = "Elimination outcome", body = ActionResponse))
)]
pub async fn eliminate_player(
    State(state): State<SharedState>,
    Json(payload): Json<PlayerIdRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        host_service::eliminate_player(&state, payload.player_id).await?,
    ))
}

/// Record the host verdict on the displayed question.
#[utoipa::path(
    post,
    path = "/host/players/answer",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    request_body = RegisterAnswerRequest,
    responses((status = 200, description = "Verdict outcome", body = ActionResponse))
)]
pub async fn register_answer(
    State(state): State<SharedState>,
    Json(payload): Json<RegisterAnswerRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(host_service::register_answer(&state, payload).await?))
}

/// Put a question on display, or clear it.
#[utoipa::path(
    post,
    path = "/host/questions/select",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    request_body = SelectQuestionRequest,
    responses((status = 200, description = "Selection outcome", body = ActionResponse))
)]
pub async fn select_question(
    State(state): State<SharedState>,
    Json(payload): Json<SelectQuestionRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(host_service::select_question(&state, payload).await?))
}

/// Draw a random unused question from a category and display it.
#[utoipa::path(
    post,
    path = "/host/questions/draw",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    request_body = DrawQuestionRequest,
    responses(
        (status = 200, description = "Question drawn, answer included", body = QuestionHostView),
        (status = 404, description = "Category unknown or exhausted")
    )
)]
pub async fn draw_question(
    State(state): State<SharedState>,
    Json(payload): Json<DrawQuestionRequest>,
) -> Result<Json<QuestionHostView>, AppError> {
    Ok(Json(
        host_service::draw_question(&state, payload.category_id).await?,
    ))
}

/// Make every question eligible again.
#[utoipa::path(
    post,
    path = "/host/questions/reset-used",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    responses((status = 200, description = "Reset outcome", body = ActionResponse))
)]
pub async fn reset_used_questions(
    State(state): State<SharedState>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(host_service::reset_used_questions(&state).await?))
}

/// Re-apply the persisted used-question set to the current session.
#[utoipa::path(
    post,
    path = "/host/questions/restore-used",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    responses(
        (status = 200, description = "Restore outcome", body = ActionResponse),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn restore_used_questions(
    State(state): State<SharedState>,
) -> Result<Json<ActionResponse>, AppError> {
    let restored = snapshot_service::load_used_questions(&state).await?;
    if restored == 0 {
        Ok(Json(ActionResponse::skipped("no used questions persisted")))
    } else {
        Ok(Json(ActionResponse::applied()))
    }
}

/// Merge a batch of authored categories, validating each item individually.
#[utoipa::path(
    post,
    path = "/host/questions/import",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    request_body = ImportQuestionsRequest,
    responses((status = 200, description = "Import report", body = ImportReport))
)]
pub async fn import_questions(
    State(state): State<SharedState>,
    Json(payload): Json<ImportQuestionsRequest>,
) -> Result<Json<ImportReport>, AppError> {
    Ok(Json(host_service::import_questions(&state, payload).await?))
}

/// A player plays one of their cards.
#[utoipa::path(
    post,
    path = "/host/cards/use",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    request_body = UseCardRequest,
    responses((status = 200, description = "Card use outcome", body = ActionResponse))
)]
pub async fn use_card(
    State(state): State<SharedState>,
    Json(payload): Json<UseCardRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(host_service::use_card(&state, payload).await?))
}

/// Query for a stored blocking effect without consuming it.
#[utoipa::path(
    post,
    path = "/host/effects/check",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    request_body = BlockingEffectRequest,
    responses((status = 200, description = "Query outcome", body = BlockingEffectStatus))
)]
pub async fn check_blocking_effect(
    State(state): State<SharedState>,
    Json(payload): Json<BlockingEffectRequest>,
) -> Result<Json<BlockingEffectStatus>, AppError> {
    let present = host_service::has_blocking_effect(&state, &payload).await?;
    Ok(Json(BlockingEffectStatus { present }))
}

/// Consume a stored blocking effect exactly once.
#[utoipa::path(
    post,
    path = "/host/effects/use",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    request_body = BlockingEffectRequest,
    responses((status = 200, description = "Consumption outcome", body = ActionResponse))
)]
pub async fn use_blocking_effect(
    State(state): State<SharedState>,
    Json(payload): Json<BlockingEffectRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        host_service::use_blocking_effect(&state, &payload).await?,
    ))
}

/// Reverse the single most recent mutating action.
#[utoipa::path(
    post,
    path = "/host/undo",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    responses((status = 200, description = "Undo outcome", body = ActionResponse))
)]
pub async fn undo(State(state): State<SharedState>) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(host_service::undo_last_action(&state).await?))
}

/// Trigger a wheel spin.
#[utoipa::path(
    post,
    path = "/host/wheel/spin",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    responses(
        (status = 200, description = "Spin started", body = ActionResponse),
        (status = 409, description = "Spin in flight or cooldown active")
    )
)]
pub async fn spin_wheel(State(state): State<SharedState>) -> Result<Json<ActionResponse>, AppError> {
    wheel_service::trigger_spin(&state).await?;
    Ok(Json(ActionResponse::applied()))
}

/// Finish the spin with the category the wheel landed on.
#[utoipa::path(
    post,
    path = "/host/wheel/complete",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    request_body = CompleteSpinRequest,
    responses((status = 200, description = "Spin completed", body = ActionResponse))
)]
pub async fn complete_spin(
    State(state): State<SharedState>,
    Json(payload): Json<CompleteSpinRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    payload.validate()?;
    wheel_service::complete_spin(&state, payload.category).await?;
    Ok(Json(ActionResponse::applied()))
}

/// Clear the wheel state.
#[utoipa::path(
    post,
    path = "/host/wheel/reset",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    responses((status = 200, description = "Wheel cleared", body = ActionResponse))
)]
pub async fn reset_wheel(State(state): State<SharedState>) -> Json<ActionResponse> {
    wheel_service::reset_wheel(&state).await;
    Json(ActionResponse::applied())
}

/// Start (or restart) the shared countdown.
#[utoipa::path(
    post,
    path = "/host/timer/start",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    request_body = StartTimerRequest,
    responses((status = 200, description = "Countdown started", body = ActionResponse))
)]
pub async fn start_timer(
    State(state): State<SharedState>,
    Json(payload): Json<StartTimerRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    payload.validate()?;
    timer_service::start(&state, payload.seconds).await;
    Ok(Json(ActionResponse::applied()))
}

/// Stop the shared countdown.
#[utoipa::path(
    post,
    path = "/host/timer/stop",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    responses((status = 200, description = "Stop outcome", body = ActionResponse))
)]
pub async fn stop_timer(State(state): State<SharedState>) -> Json<ActionResponse> {
    if timer_service::stop(&state).await {
        Json(ActionResponse::applied())
    } else {
        Json(ActionResponse::skipped("no countdown running"))
    }
}

/// Trigger a named sound cue on the overlay.
#[utoipa::path(
    post,
    path = "/host/sound",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    request_body = SoundRequest,
    responses(
        (status = 200, description = "Cue broadcast", body = ActionResponse),
        (status = 404, description = "Unknown cue")
    )
)]
pub async fn play_sound(
    State(state): State<SharedState>,
    Json(payload): Json<SoundRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(host_service::play_sound(&state, &payload.cue).await?))
}

/// Drive the overlay intro sequence.
#[utoipa::path(
    post,
    path = "/host/intro",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    request_body = IntroRequest,
    responses((status = 200, description = "Control broadcast", body = ActionResponse))
)]
pub async fn intro_control(
    State(state): State<SharedState>,
    Json(payload): Json<IntroRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    payload.validate()?;
    Ok(Json(
        host_service::intro_control(&state, &payload.action).await?,
    ))
}

/// List saved edition names.
#[utoipa::path(
    get,
    path = "/host/editions",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    responses((status = 200, description = "Edition names", body = [String]))
)]
pub async fn list_editions(
    State(state): State<SharedState>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(snapshot_service::list_editions(&state).await?))
}

/// Persist the current session under a named edition key.
#[utoipa::path(
    post,
    path = "/host/editions",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    request_body = SaveEditionRequest,
    responses((status = 200, description = "Edition saved", body = ActionResponse))
)]
pub async fn save_edition(
    State(state): State<SharedState>,
    Json(payload): Json<SaveEditionRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    payload.validate()?;
    snapshot_service::save_edition(&state, &payload.name).await?;
    Ok(Json(ActionResponse::applied()))
}

/// Load a named edition as the current session.
#[utoipa::path(
    post,
    path = "/host/editions/{name}/load",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream"),
    ("name" = String, Path, description = "Edition name")),
    responses((status = 200, description = "Edition loaded", body = GameSummary))
)]
pub async fn load_edition(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<GameSummary>, AppError> {
    Ok(Json(snapshot_service::load_edition(&state, &name).await?))
}

/// Delete a saved edition.
#[utoipa::path(
    delete,
    path = "/host/editions/{name}",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream"),
    ("name" = String, Path, description = "Edition name")),
    responses((status = 200, description = "Edition deleted", body = ActionResponse))
)]
pub async fn delete_edition(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    snapshot_service::delete_edition(&state, &name).await?;
    Ok(Json(ActionResponse::applied()))
}

/// List stored backup ids.
#[utoipa::path(
    get,
    path = "/host/backups",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    responses((status = 200, description = "Backup ids", body = [String]))
)]
pub async fn list_backups(State(state): State<SharedState>) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(snapshot_service::list_backups(&state).await?))
}

/// Snapshot the current session under a fresh backup id.
#[utoipa::path(
    post,
    path = "/host/backups",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    responses((status = 200, description = "Backup id", body = String))
)]
pub async fn save_backup(State(state): State<SharedState>) -> Result<Json<String>, AppError> {
    Ok(Json(snapshot_service::save_backup(&state).await?))
}

/// Restore a backup as the current session.
#[utoipa::path(
    post,
    path = "/host/backups/{id}/restore",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream"),
    ("id" = String, Path, description = "Backup id")),
    responses((status = 200, description = "Backup restored", body = GameSummary))
)]
pub async fn restore_backup(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<GameSummary>, AppError> {
    Ok(Json(snapshot_service::restore_backup(&state, &id).await?))
}

/// Delete a stored backup.
#[utoipa::path(
    delete,
    path = "/host/backups/{id}",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream"),
    ("id" = String, Path, description = "Backup id")),
    responses((status = 200, description = "Backup deleted", body = ActionResponse))
)]
pub async fn delete_backup(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    snapshot_service::delete_backup(&state, &id).await?;
    Ok(Json(ActionResponse::applied()))
}

/// Persist the password gate settings.
#[utoipa::path(
    post,
    path = "/host/password",
    tag = "host",
    params(("X-Host-Token" = String, Header, description = "Host token issued by the /sse/host stream")),
    request_body = PasswordSettingsRequest,
    responses((status = 200, description = "Settings stored", body = ActionResponse))
)]
pub async fn set_password_settings(
    State(state): State<SharedState>,
    Json(payload): Json<PasswordSettingsRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    payload.validate()?;
    snapshot_service::set_password_settings(&state, payload).await?;
    Ok(Json(ActionResponse::applied()))
}

/// Reject requests that do not present the claimed host token.
async fn require_host_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(HOST_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| AppError::Unauthorized("missing host token header `X-Host-Token`".into()))?;

    if sse_service::verify_host_token(&state, &provided).await {
        Ok(next.run(req).await)
    } else {
        Err(AppError::Unauthorized(
            "invalid host token, or no host stream active".into(),
        ))
    }
}
