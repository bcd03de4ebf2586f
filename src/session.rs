//! Bounded chat transcript for the interactive `chat` command.
//!
//! The session is a record for display only: answers are always computed
//! from the current question and its retrieved context, never from earlier
//! turns.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Keeps the most recent `max_turns` turns; older ones are dropped.
#[derive(Debug)]
pub struct ChatSession {
    turns: VecDeque<ConversationTurn>,
    max_turns: usize,
}

impl ChatSession {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(max_turns.min(64)),
            max_turns: max_turns.max(1),
        }
    }

    pub fn record(&mut self, role: Role, text: impl Into<String>) {
        if self.turns.len() == self.max_turns {
            self.turns.pop_front();
        }
        self.turns.push_back(ConversationTurn {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
