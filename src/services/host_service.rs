//! Host-driven game mutations: session lifecycle, roster management,
//! scoring, questions, cards, and the undo history.
//!
//! Every mutation captures its prior state on the undo stack before
//! committing and broadcasts the consequences after releasing the session
//! lock, so subscribers never observe a half-applied action.

use indexmap::IndexMap;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        game::{GameSummary, PlayerSummary, PublicGameSummary, QuestionHostView, QuestionPublic},
        host::{
            ActionResponse, AdjustLivesRequest, AwardPointsRequest, BlockingEffectRequest,
            CategoryInput, CreateGameRequest, DeductHealthRequest, DeductHealthResponse,
            ImportQuestionsRequest, ImportReport, RegisterAnswerRequest, SelectQuestionRequest,
            UseCardRequest,
        },
    },
    error::{ServiceError, ServiceResult},
    services::{card_service, event_service, snapshot_service},
    state::{
        SharedState,
        game::{CardAwardRule, Category, GameSession, Question, SpecialCard},
        machine::Round,
        undo::UndoAction,
    },
};

/// Run a closure against the current session, failing when none exists.
async fn with_session<F, R>(state: &SharedState, mutator: F) -> ServiceResult<R>
where
    F: FnOnce(&mut GameSession) -> ServiceResult<R>,
{
    state
        .write_session(|slot| match slot.as_mut() {
            Some(session) => mutator(session),
            None => Err(ServiceError::NotFound("no active game session".into())),
        })
        .await
}

/// Create a brand-new session from authored content. Only allowed in setup.
pub async fn create_game(state: &SharedState, request: CreateGameRequest) -> ServiceResult<GameSummary> {
    if state.current_round().await != Round::Setup {
        return Err(ServiceError::InvalidState(
            "a game is already in progress; reset first".into(),
        ));
    }

    let mut session = GameSession::new(request.name);
    for player in request.players {
        session.add_player(player.name);
    }
    session.categories = request.categories.into_iter().map(category_from_input).collect();

    let mut cards: IndexMap<Uuid, SpecialCard> = IndexMap::new();
    let mut card_ids_by_name: IndexMap<String, Uuid> = IndexMap::new();
    for input in request.cards {
        if let Some(cue) = &input.sound {
            if !state.config().has_sound_cue(cue) {
                return Err(ServiceError::InvalidInput(format!(
                    "card '{}' references unknown sound cue '{cue}'",
                    input.name
                )));
            }
        }
        let card = SpecialCard {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            kind: input.kind,
            points: input.points,
            sound: input.sound,
        };
        card_ids_by_name.insert(card.name.clone(), card.id);
        cards.insert(card.id, card);
    }
    session.cards = cards;

    for rule in request.award_rules {
        let Some(&card_id) = card_ids_by_name.get(&rule.card_name) else {
            return Err(ServiceError::InvalidInput(format!(
                "award rule references unknown card '{}'",
                rule.card_name
            )));
        };
        if rule.probability.is_some_and(|probability| probability > 100) {
            return Err(ServiceError::InvalidInput(
                "award probability must be at most 100".into(),
            ));
        }
        session.award_rules.push(CardAwardRule {
            id: Uuid::new_v4(),
            card_id,
            condition: rule.condition,
            threshold: rule.threshold,
            probability: rule.probability,
            rounds: rule.rounds,
        });
    }

    let summary = GameSummary::from(&session);
    info!(
        game = %session.name,
        players = session.players.len(),
        categories = session.categories.len(),
        "game session created"
    );
    state.write_session(|slot| *slot = Some(session)).await;
    state.undo().lock().await.clear();

    state
        .read_session(|session| {
            if let Some(session) = session {
                event_service::broadcast_game_session(state, session);
            }
        })
        .await;
    Ok(summary)
}

/// Full host view of the current session.
pub async fn game_summary(state: &SharedState) -> ServiceResult<GameSummary> {
    state
        .read_session(|session| {
            session
                .map(GameSummary::from)
                .ok_or_else(|| ServiceError::NotFound("no active game session".into()))
        })
        .await
}

/// Public (answer-free) view of the current session.
pub async fn public_summary(state: &SharedState) -> ServiceResult<PublicGameSummary> {
    state
        .read_session(|session| {
            session
                .map(PublicGameSummary::from)
                .ok_or_else(|| ServiceError::NotFound("no active game session".into()))
        })
        .await
}

/// Add one named player to the roster.
pub async fn add_player(state: &SharedState, name: String) -> ServiceResult<PlayerSummary> {
    let summary = with_session(state, |session| {
        let id = session.add_player(name);
        let player = session.player(id).cloned();
        Ok(player.map(|player| PlayerSummary::from_session(session, &player)))
    })
    .await?
    .ok_or_else(|| ServiceError::InvalidInput("player vanished after insert".into()))?;

    event_service::broadcast_player_updated(state, summary.clone());
    Ok(summary)
}

/// Add `count` players with generated names.
pub async fn generate_players(state: &SharedState, count: usize) -> ServiceResult<Vec<PlayerSummary>> {
    let summaries = with_session(state, |session| {
        let ids = session.add_generated_players(count, &mut rand::rng());
        Ok(ids
            .into_iter()
            .filter_map(|id| {
                let player = session.player(id).cloned()?;
                Some(PlayerSummary::from_session(session, &player))
            })
            .collect::<Vec<_>>())
    })
    .await?;

    for summary in &summaries {
        event_service::broadcast_player_updated(state, summary.clone());
    }
    Ok(summaries)
}

/// Remove a player entirely from the roster.
pub async fn remove_player(state: &SharedState, player_id: Uuid) -> ServiceResult<ActionResponse> {
    let removed = with_session(state, |session| Ok(session.remove_player(player_id))).await?;
    if !removed {
        return Ok(ActionResponse::skipped("unknown player"));
    }
    state
        .read_session(|session| {
            if let Some(session) = session {
                event_service::broadcast_game_session(state, session);
            }
        })
        .await;
    Ok(ActionResponse::applied())
}

/// Award (or deduct, with a negative delta) points.
///
/// Unknown and eliminated players are silent no-ops reported as skipped.
/// A successful award re-evaluates points milestone rules.
pub async fn award_points(
    state: &SharedState,
    request: AwardPointsRequest,
) -> ServiceResult<ActionResponse> {
    let round = state.current_round().await;
    let allow_negative = state.config().rules.allow_negative_points;

    let outcome = with_session(state, |session| {
        let Some(previous) = session.award_points(request.player_id, request.points, allow_negative)
        else {
            return Ok(None);
        };
        let granted =
            card_service::evaluate_points_milestone(session, request.player_id, round, &mut rand::rng());
        let summary = player_summary(session, request.player_id);
        Ok(Some((previous, granted, summary)))
    })
    .await?;

    let Some((previous, granted, summary)) = outcome else {
        return Ok(ActionResponse::skipped("unknown or eliminated player"));
    };

    state.undo().lock().await.record(UndoAction::Points {
        player_id: request.player_id,
        previous_points: previous,
    });
    event_service::broadcast_points(state, request.player_id, request.points);
    for card_id in granted {
        event_service::broadcast_card_received(state, request.player_id, card_id);
    }
    if let Some(summary) = summary {
        event_service::broadcast_player_updated(state, summary);
    }
    Ok(ActionResponse::applied())
}

/// Record the host verdict on the displayed question for one player.
///
/// A correct answer awards the question's points and advances the streak;
/// an incorrect one resets the streak and scores nothing by itself.
pub async fn register_answer(
    state: &SharedState,
    request: RegisterAnswerRequest,
) -> ServiceResult<ActionResponse> {
    let round = state.current_round().await;
    let allow_negative = state.config().rules.allow_negative_points;

    let outcome = with_session(state, |session| {
        if !request.correct {
            if session.player(request.player_id).is_none() {
                return Ok(None);
            }
            card_service::register_incorrect_answer(session, request.player_id);
            return Ok(Some((0, None, Vec::new(), player_summary(session, request.player_id))));
        }

        let points = session
            .current_question
            .as_ref()
            .map(|question| question.points)
            .unwrap_or(0);
        let previous = if points != 0 {
            let Some(previous) = session.award_points(request.player_id, points, allow_negative)
            else {
                return Ok(None);
            };
            Some(previous)
        } else {
            if session.player(request.player_id).is_none()
                || session.player(request.player_id).is_some_and(|player| player.eliminated)
            {
                return Ok(None);
            }
            None
        };
        let granted =
            card_service::register_correct_answer(session, request.player_id, round, &mut rand::rng());
        Ok(Some((points, previous, granted, player_summary(session, request.player_id))))
    })
    .await?;

    let Some((points, previous, granted, summary)) = outcome else {
        return Ok(ActionResponse::skipped("unknown or eliminated player"));
    };

    if let Some(previous) = previous {
        state.undo().lock().await.record(UndoAction::Points {
            player_id: request.player_id,
            previous_points: previous,
        });
        event_service::broadcast_points(state, request.player_id, points);
    }
    for card_id in granted {
        event_service::broadcast_card_received(state, request.player_id, card_id);
    }
    if let Some(summary) = summary {
        event_service::broadcast_player_updated(state, summary);
    }
    Ok(ActionResponse::applied())
}

/// Deduct a health percentage, reporting the post-clamp value.
///
/// Reaching zero does not eliminate: the host chains the elimination
/// explicitly if the round rules call for it.
pub async fn deduct_health(
    state: &SharedState,
    request: DeductHealthRequest,
) -> ServiceResult<DeductHealthResponse> {
    let outcome = with_session(state, |session| {
        let change = session.deduct_health(request.player_id, request.percentage);
        let summary = change.and_then(|_| player_summary(session, request.player_id));
        Ok(change.map(|change| (change, summary)))
    })
    .await?;

    let Some((change, summary)) = outcome else {
        return Ok(DeductHealthResponse {
            applied: false,
            health: None,
        });
    };

    state.undo().lock().await.record(UndoAction::Health {
        player_id: request.player_id,
        previous_health: change.previous,
    });
    if let Some(summary) = summary {
        event_service::broadcast_player_updated(state, summary);
    }
    Ok(DeductHealthResponse {
        applied: true,
        health: Some(change.current),
    })
}

/// Adjust a player's lives by a signed delta.
pub async fn adjust_lives(
    state: &SharedState,
    request: AdjustLivesRequest,
) -> ServiceResult<ActionResponse> {
    let outcome = with_session(state, |session| {
        let previous = session.adjust_lives(request.player_id, request.delta);
        let summary = previous.and_then(|_| player_summary(session, request.player_id));
        Ok(previous.map(|previous| (previous, summary)))
    })
    .await?;

    let Some((previous, summary)) = outcome else {
        return Ok(ActionResponse::skipped("unknown or eliminated player"));
    };

    state.undo().lock().await.record(UndoAction::Lives {
        player_id: request.player_id,
        previous_lives: previous,
    });
    if let Some(summary) = summary {
        event_service::broadcast_player_updated(state, summary);
    }
    Ok(ActionResponse::applied())
}

/// Eliminate a player permanently. Idempotent: a second call is skipped and
/// records nothing, so undoing later actions never resurrects them.
pub async fn eliminate_player(state: &SharedState, player_id: Uuid) -> ServiceResult<ActionResponse> {
    let outcome = with_session(state, |session| {
        let flipped = session.eliminate(player_id);
        let summary = player_summary(session, player_id);
        Ok((flipped, summary))
    })
    .await?;

    match outcome {
        (Some(true), summary) => {
            state
                .undo()
                .lock()
                .await
                .record(UndoAction::Elimination { player_id });
            event_service::broadcast_player_eliminated(state, player_id);
            if let Some(summary) = summary {
                event_service::broadcast_player_updated(state, summary);
            }
            Ok(ActionResponse::applied())
        }
        (Some(false), _) => Ok(ActionResponse::skipped("player already eliminated")),
        (None, _) => Ok(ActionResponse::skipped("unknown player")),
    }
}

/// Set or clear the single active player marker.
pub async fn set_active_player(
    state: &SharedState,
    player_id: Option<Uuid>,
) -> ServiceResult<ActionResponse> {
    let accepted = with_session(state, |session| Ok(session.set_active_player(player_id))).await?;
    if !accepted {
        return Ok(ActionResponse::skipped("unknown player"));
    }
    state
        .read_session(|session| {
            if let Some(session) = session {
                event_service::broadcast_game_session(state, session);
            }
        })
        .await;
    Ok(ActionResponse::applied())
}

/// Put a question on display (or clear it) and mark it used.
pub async fn select_question(
    state: &SharedState,
    request: SelectQuestionRequest,
) -> ServiceResult<ActionResponse> {
    let outcome = with_session(state, |session| {
        let question = match request.question_id {
            Some(question_id) => match session.find_question(question_id) {
                Some(question) => Some(question),
                None => return Ok(None),
            },
            None => None,
        };
        Ok(Some(apply_question_selection(session, question)))
    })
    .await?;

    let Some(selection) = outcome else {
        return Ok(ActionResponse::skipped("unknown question"));
    };

    finish_question_selection(state, selection).await;
    Ok(ActionResponse::applied())
}

/// Draw a random unused question from a category, display it, and return the
/// host view (with the answer).
pub async fn draw_question(
    state: &SharedState,
    category_id: Uuid,
) -> ServiceResult<QuestionHostView> {
    let outcome = with_session(state, |session| {
        if !session.categories.iter().any(|category| category.id == category_id) {
            return Err(ServiceError::NotFound("unknown category".into()));
        }
        let Some(question) = session.random_unused_question(category_id, &mut rand::rng()) else {
            return Err(ServiceError::NotFound(
                "category has no unused questions left".into(),
            ));
        };
        let view = QuestionHostView::from(&question);
        let selection = apply_question_selection(session, Some(question));
        Ok((view, selection))
    })
    .await?;

    let (view, selection) = outcome;
    finish_question_selection(state, selection).await;
    Ok(view)
}

/// Forget which questions were shown, making every question eligible again.
pub async fn reset_used_questions(state: &SharedState) -> ServiceResult<ActionResponse> {
    with_session(state, |session| {
        session.reset_used_questions();
        Ok(())
    })
    .await?;
    snapshot_service::persist_used_questions(state).await;
    Ok(ActionResponse::applied())
}

/// A player plays a card from their hand.
pub async fn use_card(state: &SharedState, request: UseCardRequest) -> ServiceResult<ActionResponse> {
    let allow_negative = state.config().rules.allow_negative_points;
    let outcome = with_session(state, |session| {
        let previous_cards = match session.player(request.player_id) {
            Some(player) => player.cards.clone(),
            None => return Ok(None),
        };
        let Some(card) = card_service::use_player_card(session, request.player_id, request.card_id)
        else {
            return Ok(None);
        };
        let effect =
            card_service::create_card_effect(&card, request.player_id, request.target_player_id);
        card_service::apply_effect(session, &effect, allow_negative);

        let source = player_summary(session, request.player_id);
        let target = request
            .target_player_id
            .and_then(|target| player_summary(session, target));
        Ok(Some((previous_cards, effect, source, target)))
    })
    .await?;

    let Some((previous_cards, effect, source, target)) = outcome else {
        return Ok(ActionResponse::skipped("player does not hold that card"));
    };

    state.undo().lock().await.record(UndoAction::CardUse {
        player_id: request.player_id,
        previous_cards,
    });
    event_service::broadcast_card_used(state, request.player_id, request.card_id);
    event_service::broadcast_card_effect(state, (&effect).into());
    if let Some(summary) = source {
        event_service::broadcast_player_updated(state, summary);
    }
    if let Some(summary) = target {
        event_service::broadcast_player_updated(state, summary);
    }
    Ok(ActionResponse::applied())
}

/// Whether a stored blocking effect exists. Read-only.
pub async fn has_blocking_effect(
    state: &SharedState,
    request: &BlockingEffectRequest,
) -> ServiceResult<bool> {
    state
        .read_session(|session| {
            session
                .map(|session| {
                    card_service::has_blocking_effect(
                        session,
                        request.player_id,
                        request.kind,
                        request.target_player_id,
                    )
                })
                .ok_or_else(|| ServiceError::NotFound("no active game session".into()))
        })
        .await
}

/// Consume a stored blocking effect exactly once.
pub async fn use_blocking_effect(
    state: &SharedState,
    request: &BlockingEffectRequest,
) -> ServiceResult<ActionResponse> {
    let consumed = with_session(state, |session| {
        Ok(card_service::use_blocking_effect(
            session,
            request.player_id,
            request.kind,
            request.target_player_id,
        ))
    })
    .await?;
    if consumed {
        Ok(ActionResponse::applied())
    } else {
        Ok(ActionResponse::skipped("no matching blocking effect"))
    }
}

/// Reverse the single most recent mutating action.
///
/// The restore is last-write-wins: mutations interleaved since the capture
/// are overwritten, not reconciled.
pub async fn undo_last_action(state: &SharedState) -> ServiceResult<ActionResponse> {
    let Some(entry) = state.undo().lock().await.pop() else {
        return Ok(ActionResponse::skipped("nothing to undo"));
    };

    let touched = with_session(state, |session| {
        let touched = match entry.action {
            UndoAction::Points {
                player_id,
                previous_points,
            } => session
                .restore_points(player_id, previous_points)
                .then_some(player_id),
            UndoAction::Health {
                player_id,
                previous_health,
            } => session
                .restore_health(player_id, previous_health)
                .then_some(player_id),
            UndoAction::Lives {
                player_id,
                previous_lives,
            } => session
                .restore_lives(player_id, previous_lives)
                .then_some(player_id),
            UndoAction::Elimination { player_id } => {
                session.restore_eliminated(player_id).then_some(player_id)
            }
            UndoAction::CardUse {
                player_id,
                previous_cards,
            } => session
                .restore_hand(player_id, previous_cards)
                .then_some(player_id),
            UndoAction::QuestionSelection {
                previous_question,
                marked_used,
            } => {
                session.current_question = previous_question;
                if let Some(question_id) = marked_used {
                    session.used_questions.remove(&question_id);
                }
                None
            }
        };
        Ok((touched, touched.and_then(|id| player_summary(session, id))))
    })
    .await?;

    let (touched, summary) = touched;
    if let Some(summary) = summary {
        event_service::broadcast_player_updated(state, summary);
    } else if touched.is_none() {
        // Question restores refresh the whole projection.
        state
            .read_session(|session| {
                if let Some(session) = session {
                    event_service::broadcast_game_session(state, session);
                }
            })
            .await;
    }
    Ok(ActionResponse::applied())
}

/// Trigger a named sound cue on the overlay.
pub async fn play_sound(state: &SharedState, cue: &str) -> ServiceResult<ActionResponse> {
    if !state.config().has_sound_cue(cue) {
        return Err(ServiceError::NotFound(format!("unknown sound cue '{cue}'")));
    }
    event_service::broadcast_sound(state, cue);
    Ok(ActionResponse::applied())
}

/// Drive the overlay intro sequence.
pub async fn intro_control(state: &SharedState, action: &str) -> ServiceResult<ActionResponse> {
    event_service::broadcast_intro(state, action);
    Ok(ActionResponse::applied())
}

/// Merge a batch of authored categories into the session, validating each
/// item individually so one bad question never sinks the batch.
pub async fn import_questions(
    state: &SharedState,
    request: ImportQuestionsRequest,
) -> ServiceResult<ImportReport> {
    let mut applied = 0;
    let mut rejected = 0;
    let mut errors = Vec::new();

    let mut accepted: Vec<Category> = Vec::new();
    for input in request.categories {
        match input.validate() {
            Ok(()) => {
                applied += input.questions.len();
                accepted.push(category_from_input(input));
            }
            Err(err) => {
                rejected += 1;
                errors.push(format!("category rejected: {err}"));
            }
        }
    }

    with_session(state, |session| {
        for category in accepted {
            // Same name and round means the same wheel segment: merge.
            match session
                .categories
                .iter_mut()
                .find(|existing| existing.name == category.name && existing.round == category.round)
            {
                Some(existing) => existing.questions.extend(category.questions),
                None => session.categories.push(category),
            }
        }
        Ok(())
    })
    .await?;

    if rejected > 0 {
        warn!(applied, rejected, "question import partially rejected");
    } else {
        info!(applied, "question import applied");
    }
    Ok(ImportReport {
        applied,
        rejected,
        errors,
    })
}

/// Everything broadcasting a question selection needs, captured inside the
/// session lock.
struct QuestionSelection {
    shown: Option<QuestionPublic>,
    active_player: Option<Uuid>,
}

fn apply_question_selection(
    session: &mut GameSession,
    question: Option<Question>,
) -> (QuestionSelection, UndoAction) {
    let marked_used = question
        .as_ref()
        .map(|question| question.id)
        .filter(|id| !session.used_questions.contains(id));
    let shown = question.as_ref().map(QuestionPublic::from);
    let previous = session.select_question(question);
    let selection = QuestionSelection {
        shown,
        active_player: session.active_player_id,
    };
    let undo = UndoAction::QuestionSelection {
        previous_question: previous,
        marked_used,
    };
    (selection, undo)
}

async fn finish_question_selection(state: &SharedState, outcome: (QuestionSelection, UndoAction)) {
    let (selection, undo) = outcome;
    state.undo().lock().await.record(undo);
    match selection.shown {
        Some(question) => {
            event_service::broadcast_question_received(state, question, selection.active_player);
        }
        None => event_service::broadcast_question_skipped(state),
    }
    snapshot_service::persist_used_questions(state).await;
}

fn category_from_input(input: CategoryInput) -> Category {
    Category {
        id: Uuid::new_v4(),
        name: input.name,
        round: input.round,
        questions: input
            .questions
            .into_iter()
            .map(|question| Question {
                id: Uuid::new_v4(),
                prompt: question.prompt,
                options: question.options,
                correct_answer: question.correct_answer,
                difficulty: question.difficulty,
                points: question.points,
            })
            .collect(),
    }
}

fn player_summary(session: &GameSession, player_id: Uuid) -> Option<PlayerSummary> {
    session
        .player(player_id)
        .map(|player| PlayerSummary::from_session(session, player))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dto::host::{CardInput, PlayerInput, QuestionInput},
        state::{AppState, game::CardKind},
    };

    fn base_request() -> CreateGameRequest {
        CreateGameRequest {
            name: "spring edition".into(),
            players: vec![
                PlayerInput { name: "ada".into() },
                PlayerInput { name: "grace".into() },
            ],
            categories: vec![CategoryInput {
                name: "science".into(),
                round: Round::RoundOne,
                questions: vec![QuestionInput {
                    prompt: "?".into(),
                    options: vec![],
                    correct_answer: "!".into(),
                    difficulty: crate::state::game::Difficulty::Easy,
                    points: 100,
                }],
            }],
            cards: vec![CardInput {
                name: "shield".into(),
                description: "blocks".into(),
                kind: CardKind::Shield,
                points: None,
                sound: None,
            }],
            award_rules: vec![],
        }
    }

    async fn state_with_game() -> (SharedState, Vec<Uuid>) {
        let state = AppState::new(AppConfig::default());
        let summary = create_game(&state, base_request()).await.unwrap();
        let ids = summary.players.iter().map(|player| player.id).collect();
        (state, ids)
    }

    #[tokio::test]
    async fn create_game_resolves_award_rules_by_card_name() {
        let state = AppState::new(AppConfig::default());
        let mut request = base_request();
        request.award_rules = vec![crate::dto::host::AwardRuleInput {
            card_name: "shield".into(),
            condition: crate::state::game::AwardCondition::LowestScore,
            threshold: 0,
            probability: None,
            rounds: vec![],
        }];

        let summary = create_game(&state, request).await.unwrap();
        assert_eq!(summary.award_rules.len(), 1);
        assert_eq!(summary.award_rules[0].card_id, summary.cards[0].id);
    }

    #[tokio::test]
    async fn create_game_rejects_unknown_rule_card() {
        let state = AppState::new(AppConfig::default());
        let mut request = base_request();
        request.award_rules = vec![crate::dto::host::AwardRuleInput {
            card_name: "ghost".into(),
            condition: crate::state::game::AwardCondition::LowestScore,
            threshold: 0,
            probability: None,
            rounds: vec![],
        }];

        let err = create_game(&state, request).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn award_points_is_undoable() {
        let (state, ids) = state_with_game().await;
        let request = AwardPointsRequest {
            player_id: ids[0],
            points: 150,
        };
        assert!(award_points(&state, request).await.unwrap().applied);

        undo_last_action(&state).await.unwrap();
        let points = state
            .read_session(|session| session.unwrap().player(ids[0]).unwrap().points)
            .await;
        assert_eq!(points, 0);
    }

    #[tokio::test]
    async fn second_undo_finds_nothing() {
        let (state, ids) = state_with_game().await;
        award_points(
            &state,
            AwardPointsRequest {
                player_id: ids[0],
                points: 50,
            },
        )
        .await
        .unwrap();

        assert!(undo_last_action(&state).await.unwrap().applied);
        let response = undo_last_action(&state).await.unwrap();
        assert!(!response.applied);
    }

    #[tokio::test]
    async fn undo_restores_health_lives_and_elimination() {
        let (state, ids) = state_with_game().await;
        let target = ids[0];

        deduct_health(
            &state,
            DeductHealthRequest {
                player_id: target,
                percentage: 30,
            },
        )
        .await
        .unwrap();
        undo_last_action(&state).await.unwrap();

        adjust_lives(
            &state,
            AdjustLivesRequest {
                player_id: target,
                delta: 2,
            },
        )
        .await
        .unwrap();
        undo_last_action(&state).await.unwrap();

        eliminate_player(&state, target).await.unwrap();
        undo_last_action(&state).await.unwrap();

        state
            .read_session(|session| {
                let player = session.unwrap().player(target).unwrap().clone();
                assert_eq!(player.health, 100);
                assert_eq!(player.lives, 1);
                assert!(!player.eliminated);
            })
            .await;
    }

    #[tokio::test]
    async fn undo_question_selection_unmarks_fresh_use_only() {
        let (state, _) = state_with_game().await;
        let question_id = state
            .read_session(|session| session.unwrap().categories[0].questions[0].id)
            .await;

        select_question(
            &state,
            SelectQuestionRequest {
                question_id: Some(question_id),
            },
        )
        .await
        .unwrap();
        undo_last_action(&state).await.unwrap();

        state
            .read_session(|session| {
                let session = session.unwrap();
                assert!(session.current_question.is_none());
                assert!(!session.used_questions.contains(&question_id));
            })
            .await;

        // Select once for real, then re-select: the second undo must not
        // unmark the id the first selection burned.
        select_question(
            &state,
            SelectQuestionRequest {
                question_id: Some(question_id),
            },
        )
        .await
        .unwrap();
        select_question(
            &state,
            SelectQuestionRequest {
                question_id: Some(question_id),
            },
        )
        .await
        .unwrap();
        undo_last_action(&state).await.unwrap();
        state
            .read_session(|session| {
                assert!(session.unwrap().used_questions.contains(&question_id));
            })
            .await;
    }

    #[tokio::test]
    async fn correct_answer_awards_question_points() {
        let (state, ids) = state_with_game().await;
        let question_id = state
            .read_session(|session| session.unwrap().categories[0].questions[0].id)
            .await;
        select_question(
            &state,
            SelectQuestionRequest {
                question_id: Some(question_id),
            },
        )
        .await
        .unwrap();

        register_answer(
            &state,
            RegisterAnswerRequest {
                player_id: ids[0],
                correct: true,
            },
        )
        .await
        .unwrap();
        let (points, streak) = state
            .read_session(|session| {
                let session = session.unwrap();
                (
                    session.player(ids[0]).unwrap().points,
                    session.streaks.get(&ids[0]).copied(),
                )
            })
            .await;
        assert_eq!(points, 100);
        assert_eq!(streak, Some(1));

        register_answer(
            &state,
            RegisterAnswerRequest {
                player_id: ids[0],
                correct: false,
            },
        )
        .await
        .unwrap();
        let streak = state
            .read_session(|session| session.unwrap().streaks.get(&ids[0]).copied())
            .await;
        assert_eq!(streak, Some(0));
    }

    #[tokio::test]
    async fn undoing_a_card_use_restores_the_hand() {
        let (state, ids) = state_with_game().await;
        let card_id = state
            .write_session(|slot| {
                let session = slot.as_mut().unwrap();
                let card_id = *session.cards.keys().next().unwrap();
                session.give_card(ids[0], card_id);
                card_id
            })
            .await;

        use_card(
            &state,
            UseCardRequest {
                player_id: ids[0],
                card_id,
                target_player_id: None,
            },
        )
        .await
        .unwrap();
        state
            .read_session(|session| {
                let session = session.unwrap();
                assert!(session.player(ids[0]).unwrap().cards.is_empty());
                // Shield is blocking: it was stored, not resolved.
                assert_eq!(session.blocking_effects.len(), 1);
            })
            .await;

        undo_last_action(&state).await.unwrap();
        state
            .read_session(|session| {
                assert_eq!(session.unwrap().player(ids[0]).unwrap().cards, vec![card_id]);
            })
            .await;
    }

    #[tokio::test]
    async fn import_rejects_invalid_items_individually() {
        let (state, _) = state_with_game().await;
        let report = import_questions(
            &state,
            ImportQuestionsRequest {
                categories: vec![
                    CategoryInput {
                        name: "music".into(),
                        round: Round::RoundTwo,
                        questions: vec![QuestionInput {
                            prompt: "?".into(),
                            options: vec![],
                            correct_answer: "!".into(),
                            difficulty: crate::state::game::Difficulty::Hard,
                            points: 200,
                        }],
                    },
                    CategoryInput {
                        name: String::new(),
                        round: Round::RoundOne,
                        questions: vec![],
                    },
                ],
            },
        )
        .await
        .unwrap();

        assert_eq!(report.applied, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.errors.len(), 1);
    }

    #[tokio::test]
    async fn unknown_sound_cue_is_rejected() {
        let (state, _) = state_with_game().await;
        assert!(play_sound(&state, "correct_answer").await.is_ok());
        assert!(matches!(
            play_sound(&state, "nope").await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
