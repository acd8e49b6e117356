use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::{
        game::{CardEffectDto, PlayerSummary, QuestionPublic},
        now_millis,
    },
    state::machine::Round,
};

/// Dispatched payload carried across bus topics and SSE streams.
#[derive(Clone, Debug)]
pub struct ServerEvent {
    /// SSE event name, `None` for unnamed data-only events.
    pub event: Option<String>,
    /// Serialized JSON payload.
    pub data: String,
}

impl ServerEvent {
    /// Build an event from a pre-serialized payload.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

/// Discriminant of the game event envelope (`new_event` payloads).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GameEventKind {
    /// Points added to a player.
    PointsAwarded,
    /// Points removed from a player.
    PointsDeducted,
    /// Player left the game permanently.
    PlayerEliminated,
    /// Countdown started; `seconds` carries the full duration so late
    /// subscribers can reconstruct the remaining time.
    TimerStarted,
    /// Countdown stopped or completed.
    TimerStopped,
    /// A question was put on display.
    QuestionReceived,
    /// The current question was skipped without scoring.
    QuestionSkipped,
    /// A special card landed in a player's hand.
    CardReceived,
    /// A player used one of their cards.
    CardUsed,
    /// A player view connected.
    PlayerJoined,
    /// Periodic liveness ping for a connected player view.
    PlayerPing,
    /// Host drives the overlay intro sequence.
    IntroControl,
    /// Host triggers a named sound cue on the overlay.
    SoundControl,
}

/// Envelope published on the `game_events` topic as `new_event`.
///
/// Fields are optional because each kind only populates the ones it needs;
/// player views filter on `player_id`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct GameEventPayload {
    /// Event discriminant.
    #[serde(rename = "type")]
    pub kind: GameEventKind,
    /// Player the event concerns, when targeted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<Uuid>,
    /// Point delta for scoring events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<i32>,
    /// Countdown duration for timer events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds: Option<u64>,
    /// Question payload for question events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionPublic>,
    /// Card id for card events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_id: Option<Uuid>,
    /// Sound cue name for sound control.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cue: Option<String>,
    /// Free-form action verb for intro control.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Milliseconds since epoch at publish time.
    pub timestamp: u64,
}

impl GameEventPayload {
    /// Start an envelope of the given kind with only the timestamp set.
    pub fn of_kind(kind: GameEventKind) -> Self {
        Self {
            kind,
            player_id: None,
            points: None,
            seconds: None,
            question: None,
            card_id: None,
            cue: None,
            action: None,
            timestamp: now_millis(),
        }
    }

    /// Target the envelope at a specific player.
    pub fn for_player(mut self, player_id: Uuid) -> Self {
        self.player_id = Some(player_id);
        self
    }
}

/// Discriminant of wheel synchronization envelopes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WheelSyncKind {
    /// A spin started.
    WheelSpin,
    /// The wheel stopped. Always published before the category reveal so
    /// subscribers never observe "spinning + already selected".
    WheelStop,
    /// The selected category is revealed.
    CategorySelected,
    /// Wheel state cleared.
    WheelReset,
}

/// Envelope published on the `wheel_events` topic as `sync`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct WheelSyncEvent {
    /// Event discriminant.
    #[serde(rename = "type")]
    pub kind: WheelSyncKind,
    /// Category name, only present on [`WheelSyncKind::CategorySelected`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Milliseconds since epoch at publish time.
    pub timestamp: u64,
}

impl WheelSyncEvent {
    /// Build an envelope of the given kind.
    pub fn of_kind(kind: WheelSyncKind) -> Self {
        Self {
            kind,
            category: None,
            timestamp: now_millis(),
        }
    }
}

/// Envelope published on the `card_effects` topic as `apply_effect`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CardEffectEvent {
    /// Constant discriminant, always `apply_effect`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The effect to apply.
    pub effect: CardEffectDto,
    /// Milliseconds since epoch at publish time.
    pub timestamp: u64,
}

impl CardEffectEvent {
    /// Wrap an effect into its broadcast envelope.
    pub fn new(effect: CardEffectDto) -> Self {
        Self {
            kind: "apply_effect".into(),
            effect,
            timestamp: now_millis(),
        }
    }
}

/// Broadcast whenever the round machine transitions.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct RoundChangedEvent {
    /// New round.
    pub round: Round,
    /// Round machine version after the transition.
    pub version: usize,
    /// Non-eliminated player count after the transition.
    pub alive: usize,
    /// Final scoreboard, present only when the game finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoreboard: Option<Vec<PlayerSummary>>,
}

/// Broadcast whenever a single player's mutable fields changed.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PlayerUpdatedEvent {
    /// Updated projection.
    pub player: PlayerSummary,
}

/// Periodic countdown state shared so every client derives the same display.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TimerStateEvent {
    /// Whether the countdown is running.
    pub running: bool,
    /// Remaining time in milliseconds, wall-clock derived.
    pub remaining_ms: u64,
}

/// Initial metadata sent to an SSE client when it connects.
#[derive(Debug, Serialize, ToSchema)]
pub struct Handshake {
    /// Identifier of the SSE stream (`overlay`, `host`, or `player`).
    pub stream: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
    /// Host token returned when the stream is privileged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}
