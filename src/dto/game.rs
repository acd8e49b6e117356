use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::format_system_time,
    state::{
        game::{
            CardAwardRule, CardEffect, CardKind, Category, Difficulty, GameSession, Player,
            Question, SpecialCard,
        },
        machine::Round,
    },
};

/// Projection of a player exposed to REST/SSE clients.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PlayerSummary {
    /// Player id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Current score.
    pub points: i32,
    /// Current health percentage.
    pub health: u8,
    /// Remaining lives.
    pub lives: u32,
    /// Whether the player is out of the game.
    pub eliminated: bool,
    /// Ids of the held special cards.
    pub cards: Vec<Uuid>,
    /// Whether this player currently holds the active marker.
    pub active: bool,
}

impl PlayerSummary {
    /// Build the projection, deriving the active flag from the session.
    pub fn from_session(session: &GameSession, player: &Player) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            points: player.points,
            health: player.health,
            lives: player.lives,
            eliminated: player.eliminated,
            cards: player.cards.clone(),
            active: session.active_player_id == Some(player.id),
        }
    }
}

/// Question projection shown to players and the overlay: no answer included.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct QuestionPublic {
    /// Question id.
    pub id: Uuid,
    /// Prompt text.
    pub prompt: String,
    /// Multiple-choice options, empty for open questions.
    pub options: Vec<String>,
    /// Difficulty tag.
    pub difficulty: Difficulty,
    /// Points at stake.
    pub points: i32,
}

impl From<&Question> for QuestionPublic {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id,
            prompt: question.prompt.clone(),
            options: question.options.clone(),
            difficulty: question.difficulty,
            points: question.points,
        }
    }
}

/// Question projection for the host, including the expected answer.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct QuestionHostView {
    /// Public part of the question.
    #[serde(flatten)]
    pub public: QuestionPublic,
    /// The expected answer.
    pub correct_answer: String,
}

impl From<&Question> for QuestionHostView {
    fn from(question: &Question) -> Self {
        Self {
            public: question.into(),
            correct_answer: question.correct_answer.clone(),
        }
    }
}

/// Category projection with usage counters.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct CategorySummary {
    /// Category id.
    pub id: Uuid,
    /// Display name / wheel label.
    pub name: String,
    /// Round the category belongs to.
    pub round: Round,
    /// Total authored questions.
    pub total_questions: usize,
    /// Questions not yet shown this session.
    pub remaining_questions: usize,
}

impl CategorySummary {
    /// Build the projection, counting remaining questions from the used set.
    pub fn from_session(session: &GameSession, category: &Category) -> Self {
        let remaining = category
            .questions
            .iter()
            .filter(|question| !session.used_questions.contains(&question.id))
            .count();
        Self {
            id: category.id,
            name: category.name.clone(),
            round: category.round,
            total_questions: category.questions.len(),
            remaining_questions: remaining,
        }
    }
}

/// Catalog card projection.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CardSummary {
    /// Card id.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Rules text.
    pub description: String,
    /// Effect class.
    pub kind: CardKind,
    /// Sound cue played when the card resolves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
}

impl From<&SpecialCard> for CardSummary {
    fn from(card: &SpecialCard) -> Self {
        Self {
            id: card.id,
            name: card.name.clone(),
            description: card.description.clone(),
            kind: card.kind,
            sound: card.sound.clone(),
        }
    }
}

/// Award rule projection for the host view.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct AwardRuleSummary {
    /// Rule id.
    pub id: Uuid,
    /// Card granted by the rule.
    pub card_id: Uuid,
    /// Trigger condition.
    pub condition: crate::state::game::AwardCondition,
    /// Condition threshold.
    pub threshold: i32,
    /// Award probability in percent, if randomized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<u8>,
    /// Rounds the rule applies to (empty = all).
    pub rounds: Vec<Round>,
}

impl From<&CardAwardRule> for AwardRuleSummary {
    fn from(rule: &CardAwardRule) -> Self {
        Self {
            id: rule.id,
            card_id: rule.card_id,
            condition: rule.condition,
            threshold: rule.threshold,
            probability: rule.probability,
            rounds: rule.rounds.clone(),
        }
    }
}

/// Wire form of a card effect.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CardEffectDto {
    /// Effect class.
    pub kind: CardKind,
    /// Player who used the card.
    pub source_player_id: Uuid,
    /// Optional target player.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_player_id: Option<Uuid>,
    /// Point delta for bonus effects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<i32>,
    /// Sound cue to play.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
}

impl From<&CardEffect> for CardEffectDto {
    fn from(effect: &CardEffect) -> Self {
        Self {
            kind: effect.kind,
            source_player_id: effect.source_player_id,
            target_player_id: effect.target_player_id,
            points: effect.points,
            sound: effect.sound.clone(),
        }
    }
}

/// Full host-facing view of the running session.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameSummary {
    /// Session id.
    pub id: Uuid,
    /// Edition display name.
    pub name: String,
    /// Creation timestamp, RFC3339.
    pub created_at: String,
    /// Players in roster order.
    pub players: Vec<PlayerSummary>,
    /// Categories with usage counters.
    pub categories: Vec<CategorySummary>,
    /// Card catalog.
    pub cards: Vec<CardSummary>,
    /// Award rules.
    pub award_rules: Vec<AwardRuleSummary>,
    /// Currently displayed question, host view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_question: Option<QuestionHostView>,
    /// Winners, present once the game finished.
    pub winners: Vec<Uuid>,
}

impl From<&GameSession> for GameSummary {
    fn from(session: &GameSession) -> Self {
        Self {
            id: session.id,
            name: session.name.clone(),
            created_at: format_system_time(session.created_at),
            players: session
                .players
                .values()
                .map(|player| PlayerSummary::from_session(session, player))
                .collect(),
            categories: session
                .categories
                .iter()
                .map(|category| CategorySummary::from_session(session, category))
                .collect(),
            cards: session.cards.values().map(Into::into).collect(),
            award_rules: session.award_rules.iter().map(Into::into).collect(),
            current_question: session.current_question.as_ref().map(Into::into),
            winners: session.winners.clone(),
        }
    }
}

/// Read-only projection served to the overlay and spectators.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicGameSummary {
    /// Edition display name.
    pub name: String,
    /// Players in roster order.
    pub players: Vec<PlayerSummary>,
    /// Categories with usage counters.
    pub categories: Vec<CategorySummary>,
    /// Currently displayed question, without the answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_question: Option<QuestionPublic>,
    /// Winners, present once the game finished.
    pub winners: Vec<Uuid>,
}

impl From<&GameSession> for PublicGameSummary {
    fn from(session: &GameSession) -> Self {
        Self {
            name: session.name.clone(),
            players: session
                .players
                .values()
                .map(|player| PlayerSummary::from_session(session, player))
                .collect(),
            categories: session
                .categories
                .iter()
                .map(|category| CategorySummary::from_session(session, category))
                .collect(),
            current_question: session.current_question.as_ref().map(Into::into),
            winners: session.winners.clone(),
        }
    }
}

/// Live round progress derived from the roster, served to the host so it can
/// decide when to trigger an advancement.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundProgress {
    /// Current round.
    pub round: Round,
    /// Round machine version.
    pub version: usize,
    /// Non-eliminated player count.
    pub alive: usize,
    /// Alive-count threshold at which the round can complete, if the current
    /// round has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advance_threshold: Option<usize>,
    /// Whether the completion condition currently holds.
    pub can_advance: bool,
}

/// Snapshot of the wheel coordinator, served for late joiners.
#[derive(Debug, Serialize, ToSchema)]
pub struct WheelSnapshot {
    /// Whether a spin is in flight.
    pub spinning: bool,
    /// Category selected by the last completed spin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_category: Option<String>,
}

/// Snapshot of the shared countdown, served for late joiners.
#[derive(Debug, Serialize, ToSchema)]
pub struct TimerSnapshot {
    /// Whether a countdown is running.
    pub running: bool,
    /// Remaining time in milliseconds, zero when idle.
    pub remaining_ms: u64,
}
