use std::collections::VecDeque;

use crate::types::Turn;

pub const DEFAULT_WINDOW_CAPACITY: usize = 10;

/// Fixed-capacity FIFO of turns. Appending past capacity drops the oldest
/// entry; existing entries are never edited.
#[derive(Debug, Clone)]
pub struct ConversationWindow {
    turns: VecDeque<Turn>,
    capacity: usize,
}

impl Default for ConversationWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

impl ConversationWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            turns: VecDeque::new(),
            capacity,
        }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.capacity {
            self.turns.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    /// What `snapshot` would return after appending `turn`, without
    /// mutating the window.
    pub fn preview_with(&self, turn: Turn) -> Vec<Turn> {
        let skip = (self.turns.len() + 1).saturating_sub(self.capacity);
        self.turns
            .iter()
            .skip(skip)
            .cloned()
            .chain(std::iter::once(turn))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.back()
    }
}
