//! Special card awarding and resolution.
//!
//! Everything here is a pure mutation of the session; broadcasting the
//! consequences is left to the callers so they can order events around
//! their own lock scopes.

use rand::Rng;
use uuid::Uuid;

use crate::state::{
    game::{AwardCondition, CardAwardRule, CardEffect, CardKind, GameSession, SpecialCard},
    machine::Round,
};

/// Outcome of evaluating one award rule for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwardOutcome {
    /// The card landed in the player's hand.
    Granted(Uuid),
    /// The card was already awarded this game. Each card id is unique per
    /// session.
    AlreadyAwarded,
    /// The player's hand is full. The card stays available for later: a
    /// capped hand does not consume the card's once-per-game token.
    HandFull,
    /// The probability roll failed.
    LostRoll,
    /// The rule points at a card missing from the catalog.
    UnknownCard,
}

/// Try to award the rule's card to a player.
pub fn award_card(
    session: &mut GameSession,
    player_id: Uuid,
    rule: &CardAwardRule,
    rng: &mut impl Rng,
) -> AwardOutcome {
    if !session.cards.contains_key(&rule.card_id) {
        return AwardOutcome::UnknownCard;
    }
    if session.used_cards.contains(&rule.card_id) {
        return AwardOutcome::AlreadyAwarded;
    }
    if let Some(probability) = rule.probability {
        if probability < 100 && rng.random_range(0..100u8) >= probability {
            return AwardOutcome::LostRoll;
        }
    }
    if !session.give_card(player_id, rule.card_id) {
        return AwardOutcome::HandFull;
    }
    session.used_cards.insert(rule.card_id);
    AwardOutcome::Granted(rule.card_id)
}

/// Record a correct answer for the player and evaluate the streak and
/// points milestone rules. Returns the ids of every card granted.
pub fn register_correct_answer(
    session: &mut GameSession,
    player_id: Uuid,
    round: Round,
    rng: &mut impl Rng,
) -> Vec<Uuid> {
    let streak = session
        .streaks
        .entry(player_id)
        .and_modify(|streak| *streak += 1)
        .or_insert(1);
    let streak = *streak;

    let mut granted = Vec::new();
    let rules: Vec<CardAwardRule> = session.award_rules.clone();
    for rule in rules.iter().filter(|rule| rule.applies_in(round)) {
        let fired = match rule.condition {
            AwardCondition::ConsecutiveCorrect => {
                streak >= rule.threshold.max(0) as u32
            }
            AwardCondition::PointsMilestone => session
                .player(player_id)
                .is_some_and(|player| player.points >= rule.threshold),
            _ => false,
        };
        if fired {
            if let AwardOutcome::Granted(card_id) = award_card(session, player_id, rule, rng) {
                granted.push(card_id);
            }
        }
    }
    granted
}

/// Record an incorrect answer: the player's streak resets to zero.
pub fn register_incorrect_answer(session: &mut GameSession, player_id: Uuid) {
    session.streaks.insert(player_id, 0);
}

/// Evaluate points milestone rules after a direct point award (outside the
/// answer flow). Returns the ids of every card granted.
pub fn evaluate_points_milestone(
    session: &mut GameSession,
    player_id: Uuid,
    round: Round,
    rng: &mut impl Rng,
) -> Vec<Uuid> {
    let mut granted = Vec::new();
    let rules: Vec<CardAwardRule> = session.award_rules.clone();
    for rule in rules.iter().filter(|rule| rule.applies_in(round)) {
        if rule.condition != AwardCondition::PointsMilestone {
            continue;
        }
        let reached = session
            .player(player_id)
            .is_some_and(|player| player.points >= rule.threshold);
        if reached {
            if let AwardOutcome::Granted(card_id) = award_card(session, player_id, rule, rng) {
                granted.push(card_id);
            }
        }
    }
    granted
}

/// Evaluate survive-round rules for every alive player entering `round`.
/// Returns `(player, card)` pairs for every grant.
pub fn register_round_advancement(
    session: &mut GameSession,
    round: Round,
    rng: &mut impl Rng,
) -> Vec<(Uuid, Uuid)> {
    let alive: Vec<Uuid> = session.alive_players().map(|player| player.id).collect();
    let rules: Vec<CardAwardRule> = session
        .award_rules
        .iter()
        .filter(|rule| {
            rule.condition == AwardCondition::SurviveRound
                && rule.applies_in(round)
        })
        .cloned()
        .collect();

    let mut granted = Vec::new();
    for rule in &rules {
        for &player_id in &alive {
            if let AwardOutcome::Granted(card_id) = award_card(session, player_id, rule, rng) {
                granted.push((player_id, card_id));
            }
        }
    }
    granted
}

/// Evaluate lowest-score rules against the current scoreboard.
/// Returns `(player, card)` pairs for every grant.
pub fn evaluate_lowest_score(
    session: &mut GameSession,
    round: Round,
    rng: &mut impl Rng,
) -> Vec<(Uuid, Uuid)> {
    let Some(lowest) = session.lowest_score_alive() else {
        return Vec::new();
    };
    let rules: Vec<CardAwardRule> = session
        .award_rules
        .iter()
        .filter(|rule| {
            rule.condition == AwardCondition::LowestScore
                && rule.applies_in(round)
        })
        .cloned()
        .collect();

    let mut granted = Vec::new();
    for rule in &rules {
        if let AwardOutcome::Granted(card_id) = award_card(session, lowest, rule, rng) {
            granted.push((lowest, card_id));
        }
    }
    granted
}

/// Take a card out of a player's hand and return its catalog template.
/// `None` when the player does not hold the card (or the template vanished).
pub fn use_player_card(
    session: &mut GameSession,
    player_id: Uuid,
    card_id: Uuid,
) -> Option<SpecialCard> {
    if !session.take_card(player_id, card_id) {
        return None;
    }
    session.cards.get(&card_id).cloned()
}

/// Materialize the effect a card produces when played.
pub fn create_card_effect(
    card: &SpecialCard,
    source_player_id: Uuid,
    target_player_id: Option<Uuid>,
) -> CardEffect {
    CardEffect {
        kind: card.kind,
        source_player_id,
        target_player_id,
        points: card.points,
        sound: card.sound.clone(),
    }
}

/// Apply an effect to the session.
///
/// Blocking effects are stored for later consumption; immediate effects
/// resolve right away. Returns whether the session changed.
pub fn apply_effect(session: &mut GameSession, effect: &CardEffect, allow_negative: bool) -> bool {
    if effect.kind.is_blocking() {
        session.blocking_effects.push(effect.clone());
        return true;
    }
    match effect.kind {
        CardKind::Bonus => {
            let delta = effect.points.unwrap_or(0);
            session
                .award_points(effect.source_player_id, delta, allow_negative)
                .is_some()
        }
        CardKind::Life => session.adjust_lives(effect.source_player_id, 1).is_some(),
        CardKind::Skip => {
            session.select_question(None);
            true
        }
        // Blocking kinds are handled above.
        _ => false,
    }
}

/// Whether the player holds a stored blocking effect of `kind`, optionally
/// scoped to a target. Read-only: nothing is consumed.
pub fn has_blocking_effect(
    session: &GameSession,
    player_id: Uuid,
    kind: CardKind,
    target_player_id: Option<Uuid>,
) -> bool {
    find_blocking_effect(session, player_id, kind, target_player_id).is_some()
}

/// Consume the most specific stored blocking effect for the player.
///
/// A target-scoped lookup prefers an effect stored against that exact
/// target and falls back to an unscoped one. Exactly one effect is removed
/// per call; a second identical call finds nothing.
pub fn use_blocking_effect(
    session: &mut GameSession,
    player_id: Uuid,
    kind: CardKind,
    target_player_id: Option<Uuid>,
) -> bool {
    match find_blocking_effect(session, player_id, kind, target_player_id) {
        Some(index) => {
            session.blocking_effects.remove(index);
            true
        }
        None => false,
    }
}

fn find_blocking_effect(
    session: &GameSession,
    player_id: Uuid,
    kind: CardKind,
    target_player_id: Option<Uuid>,
) -> Option<usize> {
    let matches_base = |effect: &CardEffect| {
        effect.kind == kind && effect.source_player_id == player_id
    };
    if let Some(target) = target_player_id {
        let scoped = session
            .blocking_effects
            .iter()
            .position(|effect| matches_base(effect) && effect.target_player_id == Some(target));
        if scoped.is_some() {
            return scoped;
        }
    }
    session
        .blocking_effects
        .iter()
        .position(|effect| matches_base(effect) && effect.target_player_id.is_none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::AwardCondition;

    fn session_with_card(kind: CardKind) -> (GameSession, Uuid, Uuid) {
        let mut session = GameSession::new("test".into());
        let player_id = session.add_player("p1".into());
        let card = SpecialCard {
            id: Uuid::new_v4(),
            name: "card".into(),
            description: String::new(),
            kind,
            points: Some(50),
            sound: None,
        };
        let card_id = card.id;
        session.cards.insert(card_id, card);
        (session, player_id, card_id)
    }

    fn rule_for(card_id: Uuid, condition: AwardCondition, threshold: i32) -> CardAwardRule {
        CardAwardRule {
            id: Uuid::new_v4(),
            card_id,
            condition,
            threshold,
            probability: None,
            rounds: Vec::new(),
        }
    }

    #[test]
    fn a_card_is_awarded_at_most_once_per_game() {
        let (mut session, p1, card_id) = session_with_card(CardKind::Bonus);
        let p2 = session.add_player("p2".into());
        let rule = rule_for(card_id, AwardCondition::PointsMilestone, 0);
        let mut rng = rand::rng();

        assert_eq!(
            award_card(&mut session, p1, &rule, &mut rng),
            AwardOutcome::Granted(card_id)
        );
        assert_eq!(
            award_card(&mut session, p2, &rule, &mut rng),
            AwardOutcome::AlreadyAwarded
        );
    }

    #[test]
    fn a_full_hand_does_not_burn_the_award() {
        let (mut session, p1, card_id) = session_with_card(CardKind::Shield);
        for _ in 0..3 {
            assert!(session.give_card(p1, Uuid::new_v4()));
        }
        let rule = rule_for(card_id, AwardCondition::PointsMilestone, 0);
        let mut rng = rand::rng();

        assert_eq!(
            award_card(&mut session, p1, &rule, &mut rng),
            AwardOutcome::HandFull
        );
        // The card stays grantable once the hand has room again.
        session.take_card(p1, session.player(p1).unwrap().cards[0]);
        assert_eq!(
            award_card(&mut session, p1, &rule, &mut rng),
            AwardOutcome::Granted(card_id)
        );
    }

    #[test]
    fn zero_probability_never_awards() {
        let (mut session, p1, card_id) = session_with_card(CardKind::Bonus);
        let mut rule = rule_for(card_id, AwardCondition::PointsMilestone, 0);
        rule.probability = Some(0);
        let mut rng = rand::rng();

        for _ in 0..20 {
            assert_eq!(
                award_card(&mut session, p1, &rule, &mut rng),
                AwardOutcome::LostRoll
            );
        }
    }

    #[test]
    fn streak_rules_fire_at_threshold_and_reset_on_miss() {
        let (mut session, p1, card_id) = session_with_card(CardKind::Life);
        session
            .award_rules
            .push(rule_for(card_id, AwardCondition::ConsecutiveCorrect, 3));
        let mut rng = rand::rng();

        assert!(register_correct_answer(&mut session, p1, Round::RoundOne, &mut rng).is_empty());
        assert!(register_correct_answer(&mut session, p1, Round::RoundOne, &mut rng).is_empty());
        register_incorrect_answer(&mut session, p1);
        assert!(register_correct_answer(&mut session, p1, Round::RoundOne, &mut rng).is_empty());
        assert!(register_correct_answer(&mut session, p1, Round::RoundOne, &mut rng).is_empty());
        let granted = register_correct_answer(&mut session, p1, Round::RoundOne, &mut rng);
        assert_eq!(granted, vec![card_id]);
    }

    #[test]
    fn round_scoped_rules_ignore_other_rounds() {
        let (mut session, p1, card_id) = session_with_card(CardKind::Bonus);
        let mut rule = rule_for(card_id, AwardCondition::ConsecutiveCorrect, 1);
        rule.rounds = vec![Round::RoundTwo];
        session.award_rules.push(rule);
        let mut rng = rand::rng();

        assert!(register_correct_answer(&mut session, p1, Round::RoundOne, &mut rng).is_empty());
        assert_eq!(
            register_correct_answer(&mut session, p1, Round::RoundTwo, &mut rng),
            vec![card_id]
        );
    }

    #[test]
    fn lowest_score_award_goes_to_the_trailing_player() {
        let (mut session, p1, card_id) = session_with_card(CardKind::Shield);
        let p2 = session.add_player("p2".into());
        session.award_points(p1, 100, true);
        session.award_points(p2, 10, true);
        session
            .award_rules
            .push(rule_for(card_id, AwardCondition::LowestScore, 0));
        let mut rng = rand::rng();

        let granted = evaluate_lowest_score(&mut session, Round::RoundOne, &mut rng);
        assert_eq!(granted, vec![(p2, card_id)]);
    }

    #[test]
    fn survive_round_awards_every_alive_player_until_cards_run_out() {
        let (mut session, p1, card_id) = session_with_card(CardKind::Bonus);
        let p2 = session.add_player("p2".into());
        session.eliminate(p2).unwrap();
        session
            .award_rules
            .push(rule_for(card_id, AwardCondition::SurviveRound, 0));
        let mut rng = rand::rng();

        let granted = register_round_advancement(&mut session, Round::RoundTwo, &mut rng);
        assert_eq!(granted, vec![(p1, card_id)]);
    }

    #[test]
    fn bonus_effect_adds_points_to_the_source() {
        let (mut session, p1, card_id) = session_with_card(CardKind::Bonus);
        session.give_card(p1, card_id);

        let card = use_player_card(&mut session, p1, card_id).unwrap();
        let effect = create_card_effect(&card, p1, None);
        assert!(apply_effect(&mut session, &effect, true));
        assert_eq!(session.player(p1).unwrap().points, 50);
        // The card left the hand.
        assert!(session.player(p1).unwrap().cards.is_empty());
    }

    #[test]
    fn skip_effect_clears_the_displayed_question() {
        let (mut session, p1, card_id) = session_with_card(CardKind::Skip);
        session.give_card(p1, card_id);
        let question = crate::state::game::Question {
            id: Uuid::new_v4(),
            prompt: "?".into(),
            options: vec![],
            correct_answer: "!".into(),
            difficulty: crate::state::game::Difficulty::Easy,
            points: 100,
        };
        session.select_question(Some(question));

        let card = use_player_card(&mut session, p1, card_id).unwrap();
        let effect = create_card_effect(&card, p1, None);
        assert!(apply_effect(&mut session, &effect, true));
        assert!(session.current_question.is_none());
    }

    #[test]
    fn blocking_effects_are_consumed_exactly_once() {
        let (mut session, p1, card_id) = session_with_card(CardKind::Shield);
        session.give_card(p1, card_id);
        let card = use_player_card(&mut session, p1, card_id).unwrap();
        let effect = create_card_effect(&card, p1, None);
        apply_effect(&mut session, &effect, true);

        assert!(has_blocking_effect(&session, p1, CardKind::Shield, None));
        assert!(use_blocking_effect(&mut session, p1, CardKind::Shield, None));
        assert!(!use_blocking_effect(&mut session, p1, CardKind::Shield, None));
        assert!(!has_blocking_effect(&session, p1, CardKind::Shield, None));
    }

    #[test]
    fn target_scoped_blocking_effect_is_preferred() {
        let (mut session, p1, _) = session_with_card(CardKind::Reflect);
        let p2 = session.add_player("p2".into());
        let unscoped = CardEffect {
            kind: CardKind::Reflect,
            source_player_id: p1,
            target_player_id: None,
            points: None,
            sound: None,
        };
        let scoped = CardEffect {
            target_player_id: Some(p2),
            ..unscoped.clone()
        };
        session.blocking_effects.push(unscoped);
        session.blocking_effects.push(scoped);

        // The scoped effect is consumed first.
        assert!(use_blocking_effect(&mut session, p1, CardKind::Reflect, Some(p2)));
        assert_eq!(session.blocking_effects.len(), 1);
        assert!(session.blocking_effects[0].target_player_id.is_none());

        // The remaining unscoped effect still answers a scoped lookup.
        assert!(use_blocking_effect(&mut session, p1, CardKind::Reflect, Some(p2)));
        assert!(session.blocking_effects.is_empty());
    }
}
