use std::collections::{HashMap, HashSet};
use std::time::SystemTime;

use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::machine::Round;

/// Maximum number of special cards a player can hold at once.
pub const MAX_HAND_SIZE: usize = 3;
/// Upper bound for player health; deductions clamp to `0..=MAX_HEALTH`.
pub const MAX_HEALTH: u8 = 100;

/// A contestant tracked during a game session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Stable identifier for the session.
    pub id: Uuid,
    /// Display name chosen by the host or generated randomly.
    pub name: String,
    /// Current score. May go negative depending on the round rules.
    pub points: i32,
    /// Health percentage, clamped to `0..=100`.
    pub health: u8,
    /// Remaining lives.
    pub lives: u32,
    /// Terminal for the rest of the game; only a full reset removes it
    /// (by removing the player entirely).
    pub eliminated: bool,
    /// Ids of the special cards currently held, at most [`MAX_HAND_SIZE`].
    pub cards: Vec<Uuid>,
}

impl Player {
    /// Build a fresh, alive player with full health and one life.
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            points: 0,
            health: MAX_HEALTH,
            lives: 1,
            eliminated: false,
            cards: Vec::new(),
        }
    }
}

/// Difficulty tag carried by questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Easy question.
    Easy,
    /// Medium question.
    Medium,
    /// Hard question.
    Hard,
}

/// A single authored question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Stable identifier, also the key of the used-question set.
    pub id: Uuid,
    /// Prompt text shown to players.
    pub prompt: String,
    /// Optional multiple-choice options.
    pub options: Vec<String>,
    /// The expected answer, only ever shown to the host.
    pub correct_answer: String,
    /// Difficulty tag.
    pub difficulty: Difficulty,
    /// Points awarded for a correct answer.
    pub points: i32,
}

/// A group of questions tagged with the round it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Stable identifier.
    pub id: Uuid,
    /// Display name, also used as the wheel segment label.
    pub name: String,
    /// Round this category is played in.
    pub round: Round,
    /// Questions available in this category.
    pub questions: Vec<Question>,
}

/// Gameplay effect class of a special card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    /// Blocks the next negative outcome against the holder.
    Shield,
    /// Redirects the next negative outcome back at its source.
    Reflect,
    /// Cancels an opponent card as it is played.
    Counter,
    /// Grants bonus points immediately.
    Bonus,
    /// Grants an extra life immediately.
    Life,
    /// Skips the current question.
    Skip,
}

impl CardKind {
    /// Blocking kinds are retained until consumed; the rest resolve on use.
    pub fn is_blocking(self) -> bool {
        matches!(self, CardKind::Shield | CardKind::Reflect | CardKind::Counter)
    }
}

/// Catalog entry describing a special card template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialCard {
    /// Stable identifier; a given id is awarded at most once per game.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Flavour/rules text shown on the card.
    pub description: String,
    /// Effect class applied when the card is used.
    pub kind: CardKind,
    /// Points granted by [`CardKind::Bonus`] cards.
    pub points: Option<i32>,
    /// Optional sound cue played by the overlay when the card resolves.
    pub sound: Option<String>,
}

/// Condition under which an award rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AwardCondition {
    /// Player's total points reached the rule threshold.
    PointsMilestone,
    /// Player answered `threshold` questions correctly in a row.
    ConsecutiveCorrect,
    /// Player entered the new round without being eliminated.
    SurviveRound,
    /// Player currently has the minimum points among alive players.
    LowestScore,
}

/// Binds a catalog card to an award condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardAwardRule {
    /// Stable identifier.
    pub id: Uuid,
    /// Catalog card granted when the rule fires.
    pub card_id: Uuid,
    /// Trigger condition.
    pub condition: AwardCondition,
    /// Threshold interpreted per condition (points, streak length, ...).
    pub threshold: i32,
    /// Optional award probability in percent; `None` means always.
    pub probability: Option<u8>,
    /// Rounds during which the rule applies. Empty means every round.
    pub rounds: Vec<Round>,
}

impl CardAwardRule {
    /// Whether the rule is in effect during `round`.
    pub fn applies_in(&self, round: Round) -> bool {
        self.rounds.is_empty() || self.rounds.contains(&round)
    }
}

/// Ephemeral effect produced when a card is used. Blocking effects are
/// retained keyed by their source player until consumed exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardEffect {
    /// Effect class.
    pub kind: CardKind,
    /// Player who used the card.
    pub source_player_id: Uuid,
    /// Optional player the effect is aimed at.
    pub target_player_id: Option<Uuid>,
    /// Point delta carried by bonus effects.
    pub points: Option<i32>,
    /// Sound cue to play when the effect resolves.
    pub sound: Option<String>,
}

/// Outcome of a health deduction, reported so callers can decide whether to
/// chain an explicit elimination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthChange {
    /// Health before the deduction.
    pub previous: u8,
    /// Health after clamping to `0..=100`.
    pub current: u8,
}

/// Aggregated authoritative state for one game session. Owned exclusively by
/// the host process; every other client sees read-only projections derived
/// from broadcasts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    /// Primary key of the session.
    pub id: Uuid,
    /// Display name of the edition being played.
    pub name: String,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Participating players in host insertion order. Insertion order is
    /// load-bearing: it is the documented tie-break for ranking cuts and
    /// the lowest-score rule.
    pub players: IndexMap<Uuid, Player>,
    /// At most one player holds the "active" marker.
    pub active_player_id: Option<Uuid>,
    /// Question currently displayed, `None` when nothing is shown.
    pub current_question: Option<Question>,
    /// Authored categories grouped by round.
    pub categories: Vec<Category>,
    /// Special card catalog.
    pub cards: IndexMap<Uuid, SpecialCard>,
    /// Card award rules evaluated on scoring events.
    pub award_rules: Vec<CardAwardRule>,
    /// Question ids already shown this session.
    pub used_questions: HashSet<Uuid>,
    /// Card ids already awarded this session.
    pub used_cards: HashSet<Uuid>,
    /// Per-player consecutive correct answer streaks.
    pub streaks: HashMap<Uuid, u32>,
    /// Winners recorded when the game finished. Ties are preserved.
    pub winners: Vec<Uuid>,
    /// Pending blocking effects, each consumable exactly once.
    #[serde(skip, default)]
    pub blocking_effects: Vec<CardEffect>,
}

impl GameSession {
    /// Build a new empty session with the provided display name.
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            created_at: SystemTime::now(),
            players: IndexMap::new(),
            active_player_id: None,
            current_question: None,
            categories: Vec::new(),
            cards: IndexMap::new(),
            award_rules: Vec::new(),
            used_questions: HashSet::new(),
            used_cards: HashSet::new(),
            streaks: HashMap::new(),
            winners: Vec::new(),
            blocking_effects: Vec::new(),
        }
    }

    /// Register a new player, returning their id.
    pub fn add_player(&mut self, name: String) -> Uuid {
        let player = Player::new(name);
        let id = player.id;
        self.players.insert(id, player);
        id
    }

    /// Register `count` players with generated names, returning their ids.
    pub fn add_generated_players(&mut self, count: usize, rng: &mut impl Rng) -> Vec<Uuid> {
        (0..count)
            .map(|_| self.add_player(generated_name(rng)))
            .collect()
    }

    /// Remove a player entirely. Clears the active marker when it pointed at
    /// them. Returns false for unknown ids.
    pub fn remove_player(&mut self, id: Uuid) -> bool {
        // shift_remove keeps the insertion order of the remaining roster.
        let removed = self.players.shift_remove(&id).is_some();
        if removed && self.active_player_id == Some(id) {
            self.active_player_id = None;
        }
        removed
    }

    /// Look up a player by id.
    pub fn player(&self, id: Uuid) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Mutable access to a player that is still in the game. Eliminated
    /// players are invisible to normal mutations.
    fn alive_player_mut(&mut self, id: Uuid) -> Option<&mut Player> {
        self.players.get_mut(&id).filter(|player| !player.eliminated)
    }

    /// Add `delta` (possibly negative) to a player's points.
    ///
    /// Returns the previous value for undo capture, or `None` when the player
    /// is unknown or eliminated (silent no-op).
    pub fn award_points(&mut self, id: Uuid, delta: i32, allow_negative: bool) -> Option<i32> {
        let player = self.alive_player_mut(id)?;
        let previous = player.points;
        let next = previous.saturating_add(delta);
        player.points = if allow_negative { next } else { next.max(0) };
        Some(previous)
    }

    /// Deduct a health percentage, clamping the result to `0..=100`.
    ///
    /// Reaching zero does NOT eliminate the player: the caller decides
    /// whether to chain [`GameSession::eliminate`] explicitly.
    pub fn deduct_health(&mut self, id: Uuid, percentage: u8) -> Option<HealthChange> {
        let player = self.alive_player_mut(id)?;
        let previous = player.health;
        player.health = previous.saturating_sub(percentage).min(MAX_HEALTH);
        Some(HealthChange {
            previous,
            current: player.health,
        })
    }

    /// Adjust a player's lives by `delta`, clamping at zero.
    /// Returns the previous value, or `None` for unknown/eliminated players.
    pub fn adjust_lives(&mut self, id: Uuid, delta: i32) -> Option<u32> {
        let player = self.alive_player_mut(id)?;
        let previous = player.lives;
        player.lives = previous.saturating_add_signed(delta);
        Some(previous)
    }

    /// Mark a player eliminated. Idempotent: `Some(false)` means the player
    /// was already out, `None` means the id is unknown.
    pub fn eliminate(&mut self, id: Uuid) -> Option<bool> {
        let player = self.players.get_mut(&id)?;
        if player.eliminated {
            return Some(false);
        }
        player.eliminated = true;
        if self.active_player_id == Some(id) {
            self.active_player_id = None;
        }
        Some(true)
    }

    /// Restore a player's points. Only the undo path calls this.
    pub fn restore_points(&mut self, id: Uuid, points: i32) -> bool {
        match self.players.get_mut(&id) {
            Some(player) => {
                player.points = points;
                true
            }
            None => false,
        }
    }

    /// Restore a player's health. Only the undo path calls this.
    pub fn restore_health(&mut self, id: Uuid, health: u8) -> bool {
        match self.players.get_mut(&id) {
            Some(player) => {
                player.health = health.min(MAX_HEALTH);
                true
            }
            None => false,
        }
    }

    /// Restore a player's lives. Only the undo path calls this.
    pub fn restore_lives(&mut self, id: Uuid, lives: u32) -> bool {
        match self.players.get_mut(&id) {
            Some(player) => {
                player.lives = lives;
                true
            }
            None => false,
        }
    }

    /// Restore an elimination flag. Only the undo path calls this.
    pub fn restore_eliminated(&mut self, id: Uuid) -> bool {
        match self.players.get_mut(&id) {
            Some(player) => {
                player.eliminated = false;
                true
            }
            None => false,
        }
    }

    /// Set (or clear, with `None`) the single active player. Setting a new
    /// one implicitly clears the previous marker. Unknown ids are rejected.
    pub fn set_active_player(&mut self, id: Option<Uuid>) -> bool {
        match id {
            Some(id) if !self.players.contains_key(&id) => false,
            other => {
                self.active_player_id = other;
                true
            }
        }
    }

    /// Iterate over non-eliminated players in roster order.
    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|player| !player.eliminated)
    }

    /// Number of non-eliminated players.
    pub fn alive_count(&self) -> usize {
        self.alive_players().count()
    }

    /// The alive player with the minimum points. Ties break in roster order.
    pub fn lowest_score_alive(&self) -> Option<Uuid> {
        let mut lowest: Option<&Player> = None;
        for player in self.alive_players() {
            match lowest {
                Some(current) if player.points >= current.points => {}
                _ => lowest = Some(player),
            }
        }
        lowest.map(|player| player.id)
    }

    /// Place a card in a player's hand. Fails (returning false) when the
    /// player is unknown or eliminated, or already holds [`MAX_HAND_SIZE`].
    pub fn give_card(&mut self, id: Uuid, card_id: Uuid) -> bool {
        match self.alive_player_mut(id) {
            Some(player) if player.cards.len() < MAX_HAND_SIZE => {
                player.cards.push(card_id);
                true
            }
            _ => false,
        }
    }

    /// Remove a card from a player's hand. Returns false when the player does
    /// not currently hold it.
    pub fn take_card(&mut self, id: Uuid, card_id: Uuid) -> bool {
        let Some(player) = self.players.get_mut(&id) else {
            return false;
        };
        match player.cards.iter().position(|held| *held == card_id) {
            Some(index) => {
                player.cards.remove(index);
                true
            }
            None => false,
        }
    }

    /// Replace a player's hand wholesale. Only the undo path calls this.
    pub fn restore_hand(&mut self, id: Uuid, cards: Vec<Uuid>) -> bool {
        match self.players.get_mut(&id) {
            Some(player) => {
                player.cards = cards;
                true
            }
            None => false,
        }
    }

    /// Set the current question (`None` clears the display). A non-null
    /// selection marks the question id as used. Returns the previous
    /// question for undo capture.
    pub fn select_question(&mut self, question: Option<Question>) -> Option<Question> {
        if let Some(ref question) = question {
            self.used_questions.insert(question.id);
        }
        std::mem::replace(&mut self.current_question, question)
    }

    /// Find an authored question by id across all categories.
    pub fn find_question(&self, question_id: Uuid) -> Option<Question> {
        self.categories
            .iter()
            .flat_map(|category| category.questions.iter())
            .find(|question| question.id == question_id)
            .cloned()
    }

    /// Draw a random question from a category that has not been shown yet.
    pub fn random_unused_question(
        &self,
        category_id: Uuid,
        rng: &mut impl Rng,
    ) -> Option<Question> {
        let category = self
            .categories
            .iter()
            .find(|category| category.id == category_id)?;
        let candidates: Vec<&Question> = category
            .questions
            .iter()
            .filter(|question| !self.used_questions.contains(&question.id))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let index = rng.random_range(0..candidates.len());
        Some(candidates[index].clone())
    }

    /// Forget which questions were shown, making every question eligible again.
    pub fn reset_used_questions(&mut self) {
        self.used_questions.clear();
    }
}

/// Small name pool for host-triggered random roster generation.
fn generated_name(rng: &mut impl Rng) -> String {
    const FIRST: [&str; 8] = [
        "Swift", "Lucky", "Clever", "Bold", "Quiet", "Fierce", "Merry", "Sly",
    ];
    const SECOND: [&str; 8] = [
        "Fox", "Falcon", "Badger", "Otter", "Raven", "Lynx", "Heron", "Mole",
    ];
    let first = FIRST[rng.random_range(0..FIRST.len())];
    let second = SECOND[rng.random_range(0..SECOND.len())];
    format!("{first} {second}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_players(names: &[&str]) -> (GameSession, Vec<Uuid>) {
        let mut session = GameSession::new("test".into());
        let ids = names
            .iter()
            .map(|name| session.add_player((*name).into()))
            .collect();
        (session, ids)
    }

    #[test]
    fn health_deduction_clamps_at_zero() {
        let (mut session, ids) = session_with_players(&["p1"]);
        let p1 = ids[0];

        assert_eq!(session.deduct_health(p1, 40).unwrap().current, 60);
        assert_eq!(session.deduct_health(p1, 40).unwrap().current, 20);
        let change = session.deduct_health(p1, 40).unwrap();
        assert_eq!(change.previous, 20);
        assert_eq!(change.current, 0);
        // Zero health does not eliminate by itself.
        assert!(!session.player(p1).unwrap().eliminated);
    }

    #[test]
    fn eliminated_players_reject_all_normal_mutations() {
        let (mut session, ids) = session_with_players(&["p1"]);
        let p1 = ids[0];
        assert_eq!(session.eliminate(p1), Some(true));
        assert_eq!(session.eliminate(p1), Some(false));

        assert_eq!(session.award_points(p1, 10, true), None);
        assert_eq!(session.deduct_health(p1, 10), None);
        assert_eq!(session.adjust_lives(p1, 1), None);
        assert!(!session.give_card(p1, Uuid::new_v4()));
        assert_eq!(session.player(p1).unwrap().points, 0);
    }

    #[test]
    fn unknown_player_mutations_are_silent_noops() {
        let (mut session, _) = session_with_players(&["p1"]);
        let ghost = Uuid::new_v4();

        assert_eq!(session.award_points(ghost, 10, true), None);
        assert_eq!(session.deduct_health(ghost, 10), None);
        assert_eq!(session.eliminate(ghost), None);
        assert!(!session.set_active_player(Some(ghost)));
    }

    #[test]
    fn hand_is_capped_at_three_cards() {
        let (mut session, ids) = session_with_players(&["p1"]);
        let p1 = ids[0];
        for _ in 0..3 {
            assert!(session.give_card(p1, Uuid::new_v4()));
        }
        assert!(!session.give_card(p1, Uuid::new_v4()));
        assert_eq!(session.player(p1).unwrap().cards.len(), 3);
    }

    #[test]
    fn negative_points_respect_round_rules() {
        let (mut session, ids) = session_with_players(&["p1"]);
        let p1 = ids[0];

        session.award_points(p1, -30, false);
        assert_eq!(session.player(p1).unwrap().points, 0);

        session.award_points(p1, -30, true);
        assert_eq!(session.player(p1).unwrap().points, -30);
    }

    #[test]
    fn setting_active_player_clears_previous_marker() {
        let (mut session, ids) = session_with_players(&["p1", "p2"]);

        assert!(session.set_active_player(Some(ids[0])));
        assert!(session.set_active_player(Some(ids[1])));
        assert_eq!(session.active_player_id, Some(ids[1]));

        assert!(session.set_active_player(None));
        assert_eq!(session.active_player_id, None);
    }

    #[test]
    fn lowest_score_breaks_ties_in_roster_order() {
        let (mut session, ids) = session_with_players(&["a", "b", "c"]);
        session.award_points(ids[0], 10, true);
        session.award_points(ids[1], 30, true);
        session.award_points(ids[2], 20, true);
        assert_eq!(session.lowest_score_alive(), Some(ids[0]));

        // Tie between a and c once c drops to 10: first in roster order wins.
        session.award_points(ids[2], -10, true);
        assert_eq!(session.lowest_score_alive(), Some(ids[0]));
    }

    #[test]
    fn selecting_a_question_marks_it_used() {
        let mut session = GameSession::new("test".into());
        let question = Question {
            id: Uuid::new_v4(),
            prompt: "?".into(),
            options: vec![],
            correct_answer: "!".into(),
            difficulty: Difficulty::Easy,
            points: 100,
        };
        let question_id = question.id;

        assert!(session.select_question(Some(question)).is_none());
        assert!(session.used_questions.contains(&question_id));

        // Clearing the display leaves the used set untouched.
        assert!(session.select_question(None).is_some());
        assert!(session.used_questions.contains(&question_id));

        session.reset_used_questions();
        assert!(session.used_questions.is_empty());
    }

    #[test]
    fn random_draw_skips_used_questions() {
        let mut session = GameSession::new("test".into());
        let questions: Vec<Question> = (0..3)
            .map(|index| Question {
                id: Uuid::new_v4(),
                prompt: format!("q{index}"),
                options: vec![],
                correct_answer: "a".into(),
                difficulty: Difficulty::Medium,
                points: 100,
            })
            .collect();
        let category = Category {
            id: Uuid::new_v4(),
            name: "history".into(),
            round: Round::RoundOne,
            questions: questions.clone(),
        };
        let category_id = category.id;
        session.categories.push(category);

        let mut rng = rand::rng();
        for _ in 0..3 {
            let drawn = session.random_unused_question(category_id, &mut rng).unwrap();
            session.select_question(Some(drawn));
        }
        assert!(session.random_unused_question(category_id, &mut rng).is_none());
    }

    #[test]
    fn removing_a_player_clears_their_active_marker() {
        let (mut session, ids) = session_with_players(&["p1", "p2"]);
        session.set_active_player(Some(ids[0]));
        assert!(session.remove_player(ids[0]));
        assert_eq!(session.active_player_id, None);
        assert!(!session.remove_player(ids[0]));
    }
}
