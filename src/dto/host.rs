use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::state::{
    game::{AwardCondition, CardKind, Difficulty},
    machine::Round,
};

/// Payload used to bootstrap a brand-new game session.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    /// Edition display name.
    #[validate(length(min = 1, message = "game name must not be empty"))]
    pub name: String,
    /// Initial roster; players can also be added later during setup.
    #[serde(default)]
    #[validate(nested)]
    pub players: Vec<PlayerInput>,
    /// Authored categories and questions.
    #[serde(default)]
    #[validate(nested)]
    pub categories: Vec<CategoryInput>,
    /// Special card catalog.
    #[serde(default)]
    #[validate(nested)]
    pub cards: Vec<CardInput>,
    /// Card award rules; `card_name` must match a catalog card.
    #[serde(default)]
    pub award_rules: Vec<AwardRuleInput>,
}

/// Incoming player definition.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PlayerInput {
    /// Display name.
    #[validate(length(min = 1, message = "player name must not be empty"))]
    pub name: String,
}

/// Incoming category definition with its questions.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CategoryInput {
    /// Display name / wheel label.
    #[validate(length(min = 1, message = "category name must not be empty"))]
    pub name: String,
    /// Round the category is played in.
    pub round: Round,
    /// Questions belonging to the category.
    #[serde(default)]
    #[validate(nested)]
    pub questions: Vec<QuestionInput>,
}

/// Incoming question definition.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct QuestionInput {
    /// Prompt text.
    #[validate(length(min = 1, message = "question prompt must not be empty"))]
    pub prompt: String,
    /// Optional multiple-choice options.
    #[serde(default)]
    pub options: Vec<String>,
    /// Expected answer.
    #[validate(length(min = 1, message = "correct answer must not be empty"))]
    pub correct_answer: String,
    /// Difficulty tag.
    pub difficulty: Difficulty,
    /// Points at stake.
    #[validate(range(min = 1, message = "question points must be strictly positive"))]
    pub points: i32,
}

/// Incoming special card definition.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CardInput {
    /// Display name, referenced by award rules.
    #[validate(length(min = 1, message = "card name must not be empty"))]
    pub name: String,
    /// Rules text.
    #[serde(default)]
    pub description: String,
    /// Effect class.
    pub kind: CardKind,
    /// Bonus points, only meaningful for bonus cards.
    #[serde(default)]
    pub points: Option<i32>,
    /// Sound cue played when the card resolves.
    #[serde(default)]
    pub sound: Option<String>,
}

/// Incoming award rule, binding a card (by name) to a trigger condition.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AwardRuleInput {
    /// Name of the catalog card to grant.
    pub card_name: String,
    /// Trigger condition.
    pub condition: AwardCondition,
    /// Threshold interpreted per condition.
    pub threshold: i32,
    /// Optional award probability in percent (0–100).
    #[serde(default)]
    pub probability: Option<u8>,
    /// Rounds the rule applies to; empty means every round.
    #[serde(default)]
    pub rounds: Vec<Round>,
}

/// Ask the backend to generate players with random names.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct GeneratePlayersRequest {
    /// Number of players to create.
    #[validate(range(min = 1, max = 30))]
    pub count: usize,
}

/// Point award or deduction for one player.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AwardPointsRequest {
    /// Target player.
    pub player_id: Uuid,
    /// Delta, negative for deductions.
    pub points: i32,
}

/// Health deduction for one player.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct DeductHealthRequest {
    /// Target player.
    pub player_id: Uuid,
    /// Percentage to remove; the result clamps at zero.
    #[validate(range(max = 100))]
    pub percentage: u8,
}

/// Lives adjustment for one player.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustLivesRequest {
    /// Target player.
    pub player_id: Uuid,
    /// Delta, negative to remove lives; the result clamps at zero.
    pub delta: i32,
}

/// Operations that only need a player reference.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PlayerIdRequest {
    /// Target player.
    pub player_id: Uuid,
}

/// Set or clear the single active player.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ActivePlayerRequest {
    /// New active player, `None` to clear the marker.
    #[serde(default)]
    pub player_id: Option<Uuid>,
}

/// Host verdict on the active question for one player.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterAnswerRequest {
    /// Answering player.
    pub player_id: Uuid,
    /// Whether the answer was accepted.
    pub correct: bool,
}

/// Put a question on display (`None` clears it, e.g. for a skip).
#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectQuestionRequest {
    /// Question to display, `None` for an empty display.
    #[serde(default)]
    pub question_id: Option<Uuid>,
}

/// Draw a random unused question from a category.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DrawQuestionRequest {
    /// Source category.
    pub category_id: Uuid,
}

/// A player plays one of their cards.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UseCardRequest {
    /// Card owner.
    pub player_id: Uuid,
    /// Card being played.
    pub card_id: Uuid,
    /// Optional player the effect is aimed at.
    #[serde(default)]
    pub target_player_id: Option<Uuid>,
}

/// Consume (or query) a stored blocking effect.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BlockingEffectRequest {
    /// Player whose stored effect is addressed.
    pub player_id: Uuid,
    /// Effect class looked up.
    pub kind: CardKind,
    /// Optional target scope; a target-scoped effect is preferred when given.
    #[serde(default)]
    pub target_player_id: Option<Uuid>,
}

/// Finish the wheel spin with the category the wheel landed on.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CompleteSpinRequest {
    /// Selected category label.
    #[validate(length(min = 1, message = "category must not be empty"))]
    pub category: String,
}

/// Start the shared countdown.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct StartTimerRequest {
    /// Duration in seconds.
    #[validate(range(min = 1, max = 3600))]
    pub seconds: u64,
}

/// Trigger a named sound cue on the overlay.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SoundRequest {
    /// Cue name; must exist in the configured catalog.
    pub cue: String,
}

/// Drive the overlay intro sequence.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct IntroRequest {
    /// Free-form action verb (`start`, `stop`, `next_slide`, ...).
    #[validate(length(min = 1, message = "action must not be empty"))]
    pub action: String,
}

/// Batch import of authored categories and questions.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ImportQuestionsRequest {
    /// Categories to merge into the session. Items are validated
    /// individually; invalid ones are skipped, not the whole batch.
    pub categories: Vec<CategoryInput>,
}

/// Persist the current session under a named edition key.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SaveEditionRequest {
    /// Edition name, becomes part of the storage key.
    #[validate(length(min = 1, max = 64, message = "edition name must be 1-64 characters"))]
    pub name: String,
}

/// Password gate configuration persisted alongside the shared secret.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct PasswordSettingsRequest {
    /// Whether the gate is enforced.
    pub enabled: bool,
    /// Shared secret.
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: String,
    /// Allowed failed attempts before lockout.
    #[validate(range(min = 1, max = 100))]
    pub max_attempts: u32,
    /// Hours a successful unlock stays valid.
    #[validate(range(min = 1, max = 720))]
    pub expiry_hours: u32,
}

/// Attempt to pass the shared-password gate.
#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyPasswordRequest {
    /// Password attempt.
    pub password: String,
}

/// Generic acknowledgement for host actions.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Whether the mutation was applied. `false` covers the silent no-op
    /// cases (unknown player, eliminated player, hand full, ...).
    pub applied: bool,
    /// Optional human-readable detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ActionResponse {
    /// Applied without commentary.
    pub fn applied() -> Self {
        Self {
            applied: true,
            message: None,
        }
    }

    /// Skipped, with the reason.
    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            applied: false,
            message: Some(message.into()),
        }
    }
}

/// Result of a health deduction, reporting the post-clamp value so the host
/// can decide whether to chain an elimination.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeductHealthResponse {
    /// Whether the deduction landed.
    pub applied: bool,
    /// Health after the deduction, absent for a no-op.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<u8>,
}

/// Aggregate outcome of a batch question import.
#[derive(Debug, Serialize, ToSchema)]
pub struct ImportReport {
    /// Questions merged into the session.
    pub applied: usize,
    /// Items dropped by per-item validation.
    pub rejected: usize,
    /// One message per rejected item.
    pub errors: Vec<String>,
}

/// Whether a stored blocking effect matches a query.
#[derive(Debug, Serialize, ToSchema)]
pub struct BlockingEffectStatus {
    /// A matching effect is stored (and still unconsumed).
    pub present: bool,
}

/// Outcome of a password verification attempt.
#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyPasswordResponse {
    /// Whether access is granted.
    pub granted: bool,
}
