use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The five mutually exclusive game phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Round {
    /// Roster and content editing; no gameplay running.
    Setup,
    /// Opening round played with the full roster.
    RoundOne,
    /// Middle round played by the round-one survivors.
    RoundTwo,
    /// Final round, played down to the last player standing.
    RoundThree,
    /// Winners recorded; scoreboard displayed until reset.
    Finished,
}

impl Round {
    /// The round that follows `self` during normal advancement, if any.
    pub fn next(self) -> Option<Round> {
        match self {
            Round::Setup => Some(Round::RoundOne),
            Round::RoundOne => Some(Round::RoundTwo),
            Round::RoundTwo => Some(Round::RoundThree),
            Round::RoundThree => Some(Round::Finished),
            Round::Finished => None,
        }
    }

    /// Whether gameplay mutations (points, health, cards) are meaningful.
    pub fn is_playing(self) -> bool {
        matches!(self, Round::RoundOne | Round::RoundTwo | Round::RoundThree)
    }
}

/// Events that can be applied to the round state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEvent {
    /// Host starts the game from setup.
    Start,
    /// Host advances to the next round after the completion condition holds.
    Advance,
    /// Host finishes the game, recording winners.
    Finish,
    /// Host resets everything back to setup. Valid from any phase.
    Reset,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The round the machine was in when the invalid event was received.
    pub from: Round,
    /// The event that cannot be applied from this round.
    pub event: RoundEvent,
}

/// Snapshot of the round machine handed to projections and broadcasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSnapshot {
    /// Current round.
    pub round: Round,
    /// Version number, incremented on every applied transition.
    pub version: usize,
}

/// Authoritative round state machine.
///
/// Transitions are host-triggered, never automatic: completion conditions are
/// evaluated against the roster by the round service, which then applies the
/// matching event here. The reset edge is the only way back to [`Round::Setup`].
#[derive(Debug, Clone)]
pub struct RoundMachine {
    round: Round,
    version: usize,
}

impl Default for RoundMachine {
    fn default() -> Self {
        Self {
            round: Round::Setup,
            version: 0,
        }
    }
}

impl RoundMachine {
    /// Create a new machine initialised in setup.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current round.
    pub fn round(&self) -> Round {
        self.round
    }

    /// Create a snapshot of the current machine state.
    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            round: self.round,
            version: self.version,
        }
    }

    /// Apply an event, moving the machine to the next round.
    /// Returns the new round after the transition.
    pub fn apply(&mut self, event: RoundEvent) -> Result<Round, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.round = next;
        self.version += 1;
        Ok(next)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: RoundEvent) -> Result<Round, InvalidTransition> {
        let next = match (self.round, event) {
            (Round::Setup, RoundEvent::Start) => Round::RoundOne,
            (Round::RoundOne, RoundEvent::Advance) => Round::RoundTwo,
            (Round::RoundTwo, RoundEvent::Advance) => Round::RoundThree,
            (Round::RoundThree, RoundEvent::Advance) => Round::Finished,
            (round, RoundEvent::Finish) if round.is_playing() => Round::Finished,
            (_, RoundEvent::Reset) => Round::Setup,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_setup() {
        let machine = RoundMachine::new();
        assert_eq!(machine.round(), Round::Setup);
        assert_eq!(machine.snapshot().version, 0);
    }

    #[test]
    fn full_happy_path_through_game() {
        let mut machine = RoundMachine::new();

        assert_eq!(machine.apply(RoundEvent::Start).unwrap(), Round::RoundOne);
        assert_eq!(machine.apply(RoundEvent::Advance).unwrap(), Round::RoundTwo);
        assert_eq!(
            machine.apply(RoundEvent::Advance).unwrap(),
            Round::RoundThree
        );
        assert_eq!(machine.apply(RoundEvent::Advance).unwrap(), Round::Finished);
        assert_eq!(machine.apply(RoundEvent::Reset).unwrap(), Round::Setup);
        assert_eq!(machine.snapshot().version, 5);
    }

    #[test]
    fn finish_is_valid_from_any_playing_round() {
        for advances in 0..3 {
            let mut machine = RoundMachine::new();
            machine.apply(RoundEvent::Start).unwrap();
            for _ in 0..advances {
                machine.apply(RoundEvent::Advance).unwrap();
            }
            assert_eq!(machine.apply(RoundEvent::Finish).unwrap(), Round::Finished);
        }
    }

    #[test]
    fn finish_rejected_during_setup() {
        let mut machine = RoundMachine::new();
        let err = machine.apply(RoundEvent::Finish).unwrap_err();
        assert_eq!(err.from, Round::Setup);
        assert_eq!(err.event, RoundEvent::Finish);
    }

    #[test]
    fn reset_is_valid_from_every_round() {
        let mut machine = RoundMachine::new();
        assert_eq!(machine.apply(RoundEvent::Reset).unwrap(), Round::Setup);

        machine.apply(RoundEvent::Start).unwrap();
        assert_eq!(machine.apply(RoundEvent::Reset).unwrap(), Round::Setup);

        machine.apply(RoundEvent::Start).unwrap();
        machine.apply(RoundEvent::Finish).unwrap();
        assert_eq!(machine.apply(RoundEvent::Reset).unwrap(), Round::Setup);
    }

    #[test]
    fn advance_rejected_once_finished() {
        let mut machine = RoundMachine::new();
        machine.apply(RoundEvent::Start).unwrap();
        machine.apply(RoundEvent::Finish).unwrap();

        let err = machine.apply(RoundEvent::Advance).unwrap_err();
        assert_eq!(err.from, Round::Finished);
    }

    #[test]
    fn invalid_transition_leaves_state_untouched() {
        let mut machine = RoundMachine::new();
        let before = machine.snapshot();
        machine.apply(RoundEvent::Advance).unwrap_err();
        assert_eq!(machine.snapshot(), before);
    }
}
