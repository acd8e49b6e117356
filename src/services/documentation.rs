use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Quiz Royale Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::overlay_stream,
        crate::routes::sse::host_stream,
        crate::routes::player::player_stream,
        crate::routes::player::get_player,
        crate::routes::public::get_game,
        crate::routes::public::get_round,
        crate::routes::public::get_timer,
        crate::routes::public::get_wheel,
        crate::routes::public::verify_password,
        crate::routes::host::create_game,
        crate::routes::host::get_game,
        crate::routes::host::start_game,
        crate::routes::host::advance_round,
        crate::routes::host::finish_game,
        crate::routes::host::reset_game,
        crate::routes::host::get_progress,
        crate::routes::host::add_player,
        crate::routes::host::generate_players,
        crate::routes::host::remove_player,
        crate::routes::host::set_active_player,
        crate::routes::host::award_points,
        crate::routes::host::deduct_health,
        crate::routes::host::adjust_lives,
        crate::routes::host::eliminate_player,
        crate::routes::host::register_answer,
        crate::routes::host::select_question,
        crate::routes::host::draw_question,
        crate::routes::host::reset_used_questions,
        crate::routes::host::restore_used_questions,
        crate::routes::host::import_questions,
        crate::routes::host::use_card,
        crate::routes::host::check_blocking_effect,
        crate::routes::host::use_blocking_effect,
        crate::routes::host::undo,
        crate::routes::host::spin_wheel,
        crate::routes::host::complete_spin,
        crate::routes::host::reset_wheel,
        crate::routes::host::start_timer,
        crate::routes::host::stop_timer,
        crate::routes::host::play_sound,
        crate::routes::host::intro_control,
        crate::routes::host::list_editions,
        crate::routes::host::save_edition,
        crate::routes::host::load_edition,
        crate::routes::host::delete_edition,
        crate::routes::host::list_backups,
        crate::routes::host::save_backup,
        crate::routes::host::restore_backup,
        crate::routes::host::delete_backup,
        crate::routes::host::set_password_settings,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::events::Handshake,
            crate::dto::game::GameSummary,
            crate::dto::game::PublicGameSummary,
            crate::dto::game::PlayerSummary,
            crate::dto::game::QuestionPublic,
            crate::dto::game::QuestionHostView,
            crate::dto::game::CategorySummary,
            crate::dto::game::CardSummary,
            crate::dto::game::AwardRuleSummary,
            crate::dto::game::CardEffectDto,
            crate::dto::game::RoundProgress,
            crate::dto::game::WheelSnapshot,
            crate::dto::game::TimerSnapshot,
            crate::dto::host::CreateGameRequest,
            crate::dto::host::PlayerInput,
            crate::dto::host::CategoryInput,
            crate::dto::host::QuestionInput,
            crate::dto::host::CardInput,
            crate::dto::host::AwardRuleInput,
            crate::dto::host::GeneratePlayersRequest,
            crate::dto::host::AwardPointsRequest,
            crate::dto::host::DeductHealthRequest,
            crate::dto::host::AdjustLivesRequest,
            crate::dto::host::PlayerIdRequest,
            crate::dto::host::ActivePlayerRequest,
            crate::dto::host::RegisterAnswerRequest,
            crate::dto::host::SelectQuestionRequest,
            crate::dto::host::DrawQuestionRequest,
            crate::dto::host::UseCardRequest,
            crate::dto::host::BlockingEffectRequest,
            crate::dto::host::CompleteSpinRequest,
            crate::dto::host::StartTimerRequest,
            crate::dto::host::SoundRequest,
            crate::dto::host::IntroRequest,
            crate::dto::host::ImportQuestionsRequest,
            crate::dto::host::SaveEditionRequest,
            crate::dto::host::PasswordSettingsRequest,
            crate::dto::host::VerifyPasswordRequest,
            crate::dto::host::ActionResponse,
            crate::dto::host::DeductHealthResponse,
            crate::dto::host::ImportReport,
            crate::dto::host::BlockingEffectStatus,
            crate::dto::host::VerifyPasswordResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "player", description = "Player-device endpoints"),
        (name = "public", description = "Read-only public endpoints"),
        (name = "host", description = "Host control endpoints, behind the host token"),
    )
)]
pub struct ApiDoc;
