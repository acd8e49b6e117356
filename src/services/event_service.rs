use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    bus::Topic,
    dto::{
        events::{
            CardEffectEvent, GameEventKind, GameEventPayload, PlayerUpdatedEvent,
            RoundChangedEvent, ServerEvent, TimerStateEvent, WheelSyncEvent,
        },
        game::{CardEffectDto, PlayerSummary, PublicGameSummary, QuestionPublic},
    },
    state::{SharedState, game::GameSession},
};

/// Envelope name for typed game events on the `game_events` topic.
pub const EVENT_NEW_EVENT: &str = "new_event";
/// Envelope name for wheel synchronization on the `wheel_events` topic.
pub const EVENT_WHEEL_SYNC: &str = "sync";
/// Envelope name for effect application on the `card_effects` topic.
pub const EVENT_APPLY_EFFECT: &str = "apply_effect";
/// Envelope name for round machine transitions.
pub const EVENT_ROUND_CHANGED: &str = "round_changed";
/// Envelope name for single-player projection refreshes.
pub const EVENT_PLAYER_UPDATED: &str = "player_updated";
/// Envelope name for whole-session projection refreshes.
pub const EVENT_GAME_SESSION: &str = "game_session";
/// Envelope name for periodic countdown state.
pub const EVENT_TIMER_STATE: &str = "timer_state";

/// Publish a typed game event envelope.
pub fn send_game_event(state: &SharedState, payload: &GameEventPayload) {
    send_event(state, Topic::GameEvents, EVENT_NEW_EVENT, payload);
}

/// Broadcast a point change; the kind is derived from the delta's sign.
pub fn broadcast_points(state: &SharedState, player_id: Uuid, delta: i32) {
    let kind = if delta < 0 {
        GameEventKind::PointsDeducted
    } else {
        GameEventKind::PointsAwarded
    };
    let mut payload = GameEventPayload::of_kind(kind).for_player(player_id);
    payload.points = Some(delta);
    send_game_event(state, &payload);
}

/// Broadcast a permanent elimination.
pub fn broadcast_player_eliminated(state: &SharedState, player_id: Uuid) {
    let payload = GameEventPayload::of_kind(GameEventKind::PlayerEliminated).for_player(player_id);
    send_game_event(state, &payload);
}

/// Broadcast a countdown start, carrying the full duration so late joiners
/// can reconstruct the remaining time.
pub fn broadcast_timer_started(state: &SharedState, seconds: u64) {
    let mut payload = GameEventPayload::of_kind(GameEventKind::TimerStarted);
    payload.seconds = Some(seconds);
    send_game_event(state, &payload);
}

/// Broadcast a countdown stop (manual or completed).
pub fn broadcast_timer_stopped(state: &SharedState) {
    let payload = GameEventPayload::of_kind(GameEventKind::TimerStopped);
    send_game_event(state, &payload);
}

/// Broadcast the periodic countdown state all clients derive their display from.
pub fn broadcast_timer_state(state: &SharedState, running: bool, remaining_ms: u64) {
    let payload = TimerStateEvent {
        running,
        remaining_ms,
    };
    send_event(state, Topic::GameEvents, EVENT_TIMER_STATE, &payload);
}

/// Broadcast a question reveal, optionally targeted at the active player.
pub fn broadcast_question_received(
    state: &SharedState,
    question: QuestionPublic,
    player_id: Option<Uuid>,
) {
    let mut payload = GameEventPayload::of_kind(GameEventKind::QuestionReceived);
    payload.player_id = player_id;
    payload.question = Some(question);
    send_game_event(state, &payload);
}

/// Broadcast that the displayed question was skipped.
pub fn broadcast_question_skipped(state: &SharedState) {
    let payload = GameEventPayload::of_kind(GameEventKind::QuestionSkipped);
    send_game_event(state, &payload);
}

/// Broadcast a card landing in a player's hand.
pub fn broadcast_card_received(state: &SharedState, player_id: Uuid, card_id: Uuid) {
    let mut payload = GameEventPayload::of_kind(GameEventKind::CardReceived).for_player(player_id);
    payload.card_id = Some(card_id);
    send_game_event(state, &payload);
}

/// Broadcast a card being played.
pub fn broadcast_card_used(state: &SharedState, player_id: Uuid, card_id: Uuid) {
    let mut payload = GameEventPayload::of_kind(GameEventKind::CardUsed).for_player(player_id);
    payload.card_id = Some(card_id);
    send_game_event(state, &payload);
}

/// Broadcast that a player view attached.
pub fn broadcast_player_joined(state: &SharedState, player_id: Uuid) {
    let payload = GameEventPayload::of_kind(GameEventKind::PlayerJoined).for_player(player_id);
    send_game_event(state, &payload);
}

/// Broadcast a heartbeat ping for a connected player view.
pub fn broadcast_player_ping(state: &SharedState, player_id: Uuid) {
    let payload = GameEventPayload::of_kind(GameEventKind::PlayerPing).for_player(player_id);
    send_game_event(state, &payload);
}

/// Broadcast a named sound cue for the overlay.
pub fn broadcast_sound(state: &SharedState, cue: &str) {
    let mut payload = GameEventPayload::of_kind(GameEventKind::SoundControl);
    payload.cue = Some(cue.to_string());
    send_game_event(state, &payload);
}

/// Broadcast an intro-sequence control verb for the overlay.
pub fn broadcast_intro(state: &SharedState, action: &str) {
    let mut payload = GameEventPayload::of_kind(GameEventKind::IntroControl);
    payload.action = Some(action.to_string());
    send_game_event(state, &payload);
}

/// Publish a wheel synchronization envelope.
pub fn broadcast_wheel(state: &SharedState, event: &WheelSyncEvent) {
    send_event(state, Topic::WheelEvents, EVENT_WHEEL_SYNC, event);
}

/// Publish a card effect application envelope.
pub fn broadcast_card_effect(state: &SharedState, effect: CardEffectDto) {
    let payload = CardEffectEvent::new(effect);
    send_event(state, Topic::CardEffects, EVENT_APPLY_EFFECT, &payload);
}

/// Broadcast a round machine transition.
pub fn broadcast_round_changed(state: &SharedState, event: &RoundChangedEvent) {
    send_event(state, Topic::GameEvents, EVENT_ROUND_CHANGED, event);
}

/// Broadcast a refreshed projection for a single player.
pub fn broadcast_player_updated(state: &SharedState, player: PlayerSummary) {
    let payload = PlayerUpdatedEvent { player };
    send_event(state, Topic::GameEvents, EVENT_PLAYER_UPDATED, &payload);
}

/// Broadcast the whole public session projection.
pub fn broadcast_game_session(state: &SharedState, session: &GameSession) {
    let summary: PublicGameSummary = session.into();
    send_event(state, Topic::GameEvents, EVENT_GAME_SESSION, &summary);
}

fn send_event(state: &SharedState, topic: Topic, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.bus().publish(topic, event),
        Err(err) => warn!(event, error = %err, "failed to serialize broadcast payload"),
    }
}
