//! Round progression: completion thresholds, the round-one ranking cut,
//! the lucky loser, winner recording, and the full game reset.

use tracing::info;
use uuid::Uuid;

use crate::{
    config::GameRules,
    dto::{
        events::RoundChangedEvent,
        game::{PlayerSummary, RoundProgress},
    },
    error::{ServiceError, ServiceResult},
    services::{card_service, event_service, timer_service, wheel_service},
    state::{
        SharedState,
        game::GameSession,
        machine::{Round, RoundEvent},
    },
};

/// Alive-player count at which the given round may complete, `None` when the
/// round has no completion threshold (setup, finished).
pub fn advance_threshold(round: Round, rules: &GameRules) -> Option<usize> {
    match round {
        Round::RoundOne => Some(rules.eliminate_count + 1),
        Round::RoundTwo => Some(3),
        Round::RoundThree => Some(1),
        Round::Setup | Round::Finished => None,
    }
}

/// Live progress report for the host view.
pub async fn progress(state: &SharedState) -> RoundProgress {
    let snapshot = state.round_snapshot().await;
    let alive = state
        .read_session(|session| session.map(GameSession::alive_count).unwrap_or(0))
        .await;
    let threshold = advance_threshold(snapshot.round, &state.config().rules);
    RoundProgress {
        round: snapshot.round,
        version: snapshot.version,
        alive,
        advance_threshold: threshold,
        can_advance: threshold.is_some_and(|threshold| alive <= threshold),
    }
}

/// Leave setup and start round one. Requires a session with players.
pub async fn start_game(state: &SharedState) -> ServiceResult<Round> {
    let has_players = state
        .read_session(|session| session.is_some_and(|session| !session.players.is_empty()))
        .await;
    if !has_players {
        return Err(ServiceError::InvalidState(
            "cannot start a game without players".into(),
        ));
    }

    let round = state.apply_round_event(RoundEvent::Start).await?;
    info!(?round, "game started");
    broadcast_transition(state, None).await;
    Ok(round)
}

/// Complete the current round and move to the next one.
///
/// Round one additionally performs the ranking cut: alive players are ranked
/// by points (descending, roster order breaking ties) and everyone below the
/// survivor line is eliminated, keeping one lucky loser when configured.
/// Leaving round three records the remaining players as winners.
pub async fn advance_round(state: &SharedState) -> ServiceResult<Round> {
    let rules = state.config().rules.clone();
    let current = state.current_round().await;
    let Some(threshold) = advance_threshold(current, &rules) else {
        return Err(ServiceError::InvalidState(format!(
            "round {current:?} has no advancement"
        )));
    };

    let mut cut_players: Vec<Uuid> = Vec::new();
    let mut lowest_awards: Vec<(Uuid, Uuid)> = Vec::new();
    let mut survivor_awards: Vec<(Uuid, Uuid)> = Vec::new();
    let next = {
        // Validate and cut first; the machine transition only runs once the
        // roster work committed.
        state
            .write_session(|slot| {
                let session = slot
                    .as_mut()
                    .ok_or_else(|| ServiceError::NotFound("no active game session".into()))?;
                if session.alive_count() > threshold {
                    return Err(ServiceError::InvalidState(format!(
                        "round not complete: {} players alive, threshold is {threshold}",
                        session.alive_count()
                    )));
                }

                // Consolation rules for the trailing player resolve against
                // the round that just ended, before anyone is cut.
                lowest_awards =
                    card_service::evaluate_lowest_score(session, current, &mut rand::rng());
                if current == Round::RoundOne {
                    cut_players = cut_to_survivors(session, &rules);
                }
                Ok::<(), ServiceError>(())
            })
            .await?;

        let next = state.apply_round_event(RoundEvent::Advance).await?;

        state
            .write_session(|slot| {
                if let Some(session) = slot.as_mut() {
                    survivor_awards = card_service::register_round_advancement(
                        session,
                        next,
                        &mut rand::rng(),
                    );
                    if next == Round::Finished {
                        session.winners = session.alive_players().map(|player| player.id).collect();
                    }
                }
            })
            .await;
        next
    };

    info!(?current, ?next, cut = cut_players.len(), "round advanced");
    for player_id in cut_players {
        event_service::broadcast_player_eliminated(state, player_id);
    }
    for (player_id, card_id) in lowest_awards.into_iter().chain(survivor_awards) {
        event_service::broadcast_card_received(state, player_id, card_id);
    }
    let scoreboard = (next == Round::Finished).then_some(());
    broadcast_transition(state, scoreboard).await;
    Ok(next)
}

/// End the game immediately, recording the alive players as winners.
pub async fn finish_game(state: &SharedState) -> ServiceResult<Round> {
    let round = state.apply_round_event(RoundEvent::Finish).await?;
    state
        .write_session(|slot| {
            if let Some(session) = slot.as_mut() {
                session.winners = session.alive_players().map(|player| player.id).collect();
            }
        })
        .await;
    info!("game finished by host");
    broadcast_transition(state, Some(())).await;
    Ok(round)
}

/// Reset the whole game back to setup.
///
/// Authored content (categories, the card catalog, award rules) survives;
/// roster, scores, used sets, winners, undo history, wheel, and timer do not.
pub async fn reset_game(state: &SharedState) -> ServiceResult<Round> {
    let round = state.apply_round_event(RoundEvent::Reset).await?;

    state
        .write_session(|slot| {
            if let Some(session) = slot.as_mut() {
                session.players.clear();
                session.active_player_id = None;
                session.current_question = None;
                session.used_questions.clear();
                session.used_cards.clear();
                session.streaks.clear();
                session.winners.clear();
                session.blocking_effects.clear();
            }
        })
        .await;
    state.undo().lock().await.clear();
    state.presence().clear();
    timer_service::stop(state).await;
    wheel_service::reset_wheel(state).await;

    info!("game reset to setup");
    broadcast_transition(state, None).await;
    state
        .read_session(|session| {
            if let Some(session) = session {
                event_service::broadcast_game_session(state, session);
            }
        })
        .await;
    Ok(round)
}

/// Broadcast the current round machine state, optionally with the final
/// scoreboard attached.
async fn broadcast_transition(state: &SharedState, with_scoreboard: Option<()>) {
    let snapshot = state.round_snapshot().await;
    let (alive, scoreboard) = state
        .read_session(|session| match session {
            Some(session) => {
                let scoreboard = with_scoreboard.map(|()| {
                    let mut board: Vec<PlayerSummary> = session
                        .players
                        .values()
                        .map(|player| PlayerSummary::from_session(session, player))
                        .collect();
                    board.sort_by(|a, b| b.points.cmp(&a.points));
                    board
                });
                (session.alive_count(), scoreboard)
            }
            None => (0, None),
        })
        .await;
    let event = RoundChangedEvent {
        round: snapshot.round,
        version: snapshot.version,
        alive,
        scoreboard,
    };
    event_service::broadcast_round_changed(state, &event);
}

/// Rank alive players by points (stable, so roster order breaks ties) and
/// eliminate everyone below the survivor line. Returns the eliminated ids.
fn cut_to_survivors(session: &mut GameSession, rules: &GameRules) -> Vec<Uuid> {
    let mut ranked: Vec<(Uuid, i32)> = session
        .alive_players()
        .map(|player| (player.id, player.points))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let mut keep = rules.round_two_survivors;
    if rules.lucky_loser {
        // The highest-ranked player below the cut line stays in.
        keep += 1;
    }

    let eliminated: Vec<Uuid> = ranked.iter().skip(keep).map(|(id, _)| *id).collect();
    for &id in &eliminated {
        session.eliminate(id);
    }
    eliminated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::AppState};

    async fn state_with_players(count: usize) -> (SharedState, Vec<Uuid>) {
        let state = AppState::new(AppConfig::default());
        let ids = state
            .write_session(|slot| {
                let mut session = GameSession::new("test".into());
                let ids: Vec<Uuid> = (0..count)
                    .map(|index| session.add_player(format!("p{index}")))
                    .collect();
                *slot = Some(session);
                ids
            })
            .await;
        (state, ids)
    }

    #[tokio::test]
    async fn round_one_rejects_advancement_above_threshold() {
        // Ten players, four to eliminate: advancement unlocks at five alive.
        let (state, ids) = state_with_players(10).await;
        start_game(&state).await.unwrap();

        for &id in ids.iter().take(4) {
            state
                .write_session(|slot| slot.as_mut().unwrap().eliminate(id))
                .await;
        }
        // Six alive: one short of the threshold.
        let err = advance_round(&state).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        state
            .write_session(|slot| slot.as_mut().unwrap().eliminate(ids[4]))
            .await;
        assert!(progress(&state).await.can_advance);
        assert_eq!(advance_round(&state).await.unwrap(), Round::RoundTwo);
    }

    #[tokio::test]
    async fn round_one_cut_keeps_survivors_and_lucky_loser() {
        let (state, ids) = state_with_players(10).await;
        start_game(&state).await.unwrap();

        state
            .write_session(|slot| {
                let session = slot.as_mut().unwrap();
                for (index, &id) in ids.iter().enumerate() {
                    session.award_points(id, (10 - index as i32) * 10, true);
                }
                // Knock the game down to the threshold of five alive.
                for &id in ids.iter().skip(5) {
                    session.eliminate(id);
                }
            })
            .await;

        advance_round(&state).await.unwrap();
        // Four survivors plus the lucky loser means nobody extra got cut
        // out of the five alive.
        let alive = state
            .read_session(|session| session.unwrap().alive_count())
            .await;
        assert_eq!(alive, 5);
    }

    #[tokio::test]
    async fn round_one_cut_eliminates_below_the_line() {
        let mut config = AppConfig::default();
        config.rules.lucky_loser = false;
        let state = AppState::new(config);
        let ids = state
            .write_session(|slot| {
                let mut session = GameSession::new("test".into());
                let ids: Vec<Uuid> = (0..5).map(|i| session.add_player(format!("p{i}"))).collect();
                for (index, &id) in ids.iter().enumerate() {
                    session.award_points(id, 100 - index as i32 * 10, true);
                }
                *slot = Some(session);
                ids
            })
            .await;
        start_game(&state).await.unwrap();

        advance_round(&state).await.unwrap();
        let (alive, eliminated) = state
            .read_session(|session| {
                let session = session.unwrap();
                (
                    session.alive_count(),
                    session.player(ids[4]).unwrap().eliminated,
                )
            })
            .await;
        // Four survivors, the lowest-ranked fifth player cut.
        assert_eq!(alive, 4);
        assert!(eliminated);
    }

    #[tokio::test]
    async fn advancement_awards_lowest_score_rules_before_the_cut() {
        let (state, ids) = state_with_players(3).await;
        let card_id = state
            .write_session(|slot| {
                let session = slot.as_mut().unwrap();
                session.award_points(ids[0], 10, true);
                session.award_points(ids[1], 30, true);
                session.award_points(ids[2], 20, true);
                let card = crate::state::game::SpecialCard {
                    id: Uuid::new_v4(),
                    name: "consolation".into(),
                    description: String::new(),
                    kind: crate::state::game::CardKind::Shield,
                    points: None,
                    sound: None,
                };
                let card_id = card.id;
                session.cards.insert(card_id, card);
                session.award_rules.push(crate::state::game::CardAwardRule {
                    id: Uuid::new_v4(),
                    card_id,
                    condition: crate::state::game::AwardCondition::LowestScore,
                    threshold: 0,
                    probability: None,
                    rounds: Vec::new(),
                });
                card_id
            })
            .await;
        start_game(&state).await.unwrap();

        advance_round(&state).await.unwrap();
        let cards = state
            .read_session(|session| session.unwrap().player(ids[0]).unwrap().cards.clone())
            .await;
        assert_eq!(cards, vec![card_id]);
    }

    #[tokio::test]
    async fn finishing_records_winners_with_ties_preserved() {
        let (state, ids) = state_with_players(3).await;
        start_game(&state).await.unwrap();

        finish_game(&state).await.unwrap();
        let winners = state
            .read_session(|session| session.unwrap().winners.clone())
            .await;
        assert_eq!(winners, ids);
        assert_eq!(state.current_round().await, Round::Finished);
    }

    #[tokio::test]
    async fn reset_clears_volatile_state_but_keeps_authored_content() {
        let (state, ids) = state_with_players(3).await;
        state
            .write_session(|slot| {
                let session = slot.as_mut().unwrap();
                session.categories.push(crate::state::game::Category {
                    id: Uuid::new_v4(),
                    name: "science".into(),
                    round: Round::RoundOne,
                    questions: Vec::new(),
                });
                session.used_cards.insert(Uuid::new_v4());
                session.winners.push(ids[0]);
            })
            .await;
        start_game(&state).await.unwrap();
        timer_service::start(&state, 30).await;

        reset_game(&state).await.unwrap();

        assert_eq!(state.current_round().await, Round::Setup);
        assert!(!state.timer().lock().await.is_running());
        assert!(state.undo().lock().await.is_empty());
        state
            .read_session(|session| {
                let session = session.unwrap();
                assert!(session.players.is_empty());
                assert!(session.used_cards.is_empty());
                assert!(session.winners.is_empty());
                assert_eq!(session.categories.len(), 1);
            })
            .await;
    }

    #[tokio::test]
    async fn progress_reports_round_two_threshold() {
        let (state, ids) = state_with_players(5).await;
        start_game(&state).await.unwrap();
        advance_round(&state).await.unwrap();

        let report = progress(&state).await;
        assert_eq!(report.round, Round::RoundTwo);
        assert_eq!(report.advance_threshold, Some(3));
        assert!(!report.can_advance);

        for &id in ids.iter().take(2) {
            state
                .write_session(|slot| slot.as_mut().unwrap().eliminate(id))
                .await;
        }
        assert!(progress(&state).await.can_advance);
    }
}
