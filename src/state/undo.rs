use std::collections::VecDeque;
use std::time::SystemTime;

use uuid::Uuid;

use crate::state::game::Question;

/// Maximum number of reversible actions retained.
pub const UNDO_CAPACITY: usize = 20;

/// Prior state captured immediately before a mutating host action commits.
/// Each variant holds exactly the fields needed to reverse one step.
#[derive(Debug, Clone)]
pub enum UndoAction {
    /// A points award/deduction; restores the previous total.
    Points {
        /// Affected player.
        player_id: Uuid,
        /// Points before the mutation.
        previous_points: i32,
    },
    /// A health deduction; restores the previous percentage.
    Health {
        /// Affected player.
        player_id: Uuid,
        /// Health before the mutation.
        previous_health: u8,
    },
    /// A lives adjustment; restores the previous count.
    Lives {
        /// Affected player.
        player_id: Uuid,
        /// Lives before the mutation.
        previous_lives: u32,
    },
    /// An elimination; clears the flag again. Only captured when the flag
    /// actually flipped, so restoring never resurrects a player eliminated
    /// twice.
    Elimination {
        /// Affected player.
        player_id: Uuid,
    },
    /// A card activation; restores the full prior hand.
    CardUse {
        /// Affected player.
        player_id: Uuid,
        /// Hand contents before the card left it.
        previous_cards: Vec<Uuid>,
    },
    /// A question selection; restores the previously displayed question and
    /// un-marks the newly used id, if any.
    QuestionSelection {
        /// Question displayed before the selection (`None` = empty display).
        previous_question: Option<Question>,
        /// Id added to the used-question set by the selection being undone.
        marked_used: Option<Uuid>,
    },
}

/// One recorded entry of the undo history.
#[derive(Debug, Clone)]
pub struct UndoEntry {
    /// Captured prior state.
    pub action: UndoAction,
    /// When the mutation was recorded.
    pub recorded_at: SystemTime,
}

/// Bounded history of mutating actions, newest last.
///
/// Only the single most recent entry is reversible; undoing pops it and does
/// not push a redo entry. Interleaved mutations between capture and undo are
/// not reconciled: the restore is last-write-wins, which is a documented
/// limitation of the single-level design.
#[derive(Debug, Default)]
pub struct UndoStack {
    entries: VecDeque<UndoEntry>,
}

impl UndoStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mutation, evicting the oldest entry past [`UNDO_CAPACITY`].
    pub fn record(&mut self, action: UndoAction) {
        if self.entries.len() == UNDO_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(UndoEntry {
            action,
            recorded_at: SystemTime::now(),
        });
    }

    /// Take the most recent entry, if any.
    pub fn pop(&mut self) -> Option<UndoEntry> {
        self.entries.pop_back()
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entry is recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop the whole history (game reset).
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_returns_newest_first() {
        let mut stack = UndoStack::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        stack.record(UndoAction::Points {
            player_id: first,
            previous_points: 0,
        });
        stack.record(UndoAction::Points {
            player_id: second,
            previous_points: 10,
        });

        match stack.pop().unwrap().action {
            UndoAction::Points { player_id, .. } => assert_eq!(player_id, second),
            other => panic!("unexpected action: {other:?}"),
        }
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn capacity_evicts_oldest_entries() {
        let mut stack = UndoStack::new();
        for points in 0..(UNDO_CAPACITY as i32 + 5) {
            stack.record(UndoAction::Points {
                player_id: Uuid::new_v4(),
                previous_points: points,
            });
        }
        assert_eq!(stack.len(), UNDO_CAPACITY);

        // Oldest surviving entry is number 5.
        let oldest = stack.entries.front().unwrap();
        match oldest.action {
            UndoAction::Points {
                previous_points, ..
            } => assert_eq!(previous_points, 5),
            ref other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn pop_on_empty_stack_is_a_noop() {
        let mut stack = UndoStack::new();
        assert!(stack.pop().is_none());
        assert!(stack.is_empty());
    }
}
