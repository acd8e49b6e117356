//! Player view connections: per-player SSE attachment, event filtering,
//! and the server-side heartbeat.

use std::time::Instant;

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::{
    dto::events::ServerEvent,
    error::{ServiceError, ServiceResult},
    services::event_service,
    state::{PlayerPresence, SharedState},
};

/// Whether a `new_event` envelope concerns the given player.
///
/// Untargeted events (no `player_id` field) are broadcast to every player
/// view; targeted ones only reach their addressee.
pub fn event_concerns_player(player_id: Uuid, event: &ServerEvent) -> bool {
    if event.event.as_deref() != Some(event_service::EVENT_NEW_EVENT) {
        // Projection refreshes, round changes, timer state: everyone sees them.
        return true;
    }
    let Ok(payload) = serde_json::from_str::<Value>(&event.data) else {
        return true;
    };
    match payload.get("player_id").and_then(Value::as_str) {
        Some(target) => target == player_id.to_string(),
        None => true,
    }
}

/// Register a player view connection.
///
/// Verifies the player exists, records presence, announces the join, and
/// spawns the heartbeat task that pings for as long as the presence entry
/// lives (the SSE teardown removes it).
pub async fn attach_player(state: &SharedState, player_id: Uuid) -> ServiceResult<()> {
    let known = state
        .read_session(|session| {
            session.is_some_and(|session| session.player(player_id).is_some())
        })
        .await;
    if !known {
        return Err(ServiceError::NotFound("unknown player".into()));
    }

    let now = Instant::now();
    state.presence().insert(
        player_id,
        PlayerPresence {
            connected_at: now,
            last_ping: now,
        },
    );
    event_service::broadcast_player_joined(state, player_id);

    let heartbeat_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(heartbeat_state.config().heartbeat_interval);
        interval.tick().await;
        loop {
            interval.tick().await;
            let Some(mut entry) = heartbeat_state.presence().get_mut(&player_id) else {
                debug!(%player_id, "presence gone, heartbeat task stopping");
                return;
            };
            entry.last_ping = Instant::now();
            drop(entry);
            event_service::broadcast_player_ping(&heartbeat_state, player_id);
        }
    });
    Ok(())
}

/// Projection of one player's connection state.
pub async fn is_connected(state: &SharedState, player_id: Uuid) -> bool {
    state.presence().contains_key(&player_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dto::events::{GameEventKind, GameEventPayload},
        state::{AppState, game::GameSession},
    };

    fn envelope(payload: &GameEventPayload) -> ServerEvent {
        ServerEvent::json(Some(event_service::EVENT_NEW_EVENT.to_string()), payload).unwrap()
    }

    #[test]
    fn targeted_events_only_reach_their_player() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();

        let mine = envelope(&GameEventPayload::of_kind(GameEventKind::PointsAwarded).for_player(me));
        let theirs =
            envelope(&GameEventPayload::of_kind(GameEventKind::PointsAwarded).for_player(other));
        let untargeted = envelope(&GameEventPayload::of_kind(GameEventKind::TimerStarted));

        assert!(event_concerns_player(me, &mine));
        assert!(!event_concerns_player(me, &theirs));
        assert!(event_concerns_player(me, &untargeted));
    }

    #[test]
    fn non_game_event_envelopes_pass_through() {
        let me = Uuid::new_v4();
        let event = ServerEvent::new(Some("round_changed".into()), "{}".into());
        assert!(event_concerns_player(me, &event));
    }

    #[tokio::test]
    async fn attach_rejects_unknown_players() {
        let state = AppState::new(AppConfig::default());
        state
            .write_session(|slot| *slot = Some(GameSession::new("test".into())))
            .await;

        let err = attach_player(&state, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn attach_records_presence_and_announces_the_join() {
        let state = AppState::new(AppConfig::default());
        let player_id = state
            .write_session(|slot| {
                let mut session = GameSession::new("test".into());
                let id = session.add_player("ada".into());
                *slot = Some(session);
                id
            })
            .await;
        let mut rx = state.bus().subscribe(crate::bus::Topic::GameEvents);

        attach_player(&state, player_id).await.unwrap();
        assert!(is_connected(&state, player_id).await);

        let joined = rx.recv().await.unwrap();
        assert!(joined.data.contains("player_joined"));
    }
}
