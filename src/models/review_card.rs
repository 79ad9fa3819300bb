//! Wrapper for words that tracks progress within a review session.
use super::Word;
use chrono::{DateTime, Utc};

#[derive(Clone)]
pub struct ReviewCard {
    pub word: Word,
    pub is_learned: bool,
    pub last_learned_at: Option<DateTime<Utc>>,
}

impl ReviewCard {
    pub fn new(word: Word) -> Self {
        Self {
            word,
            is_learned: false,
            last_learned_at: None,
        }
    }

    pub fn mark_as_learned(&mut self, at: DateTime<Utc>) {
        self.is_learned = true;
        self.last_learned_at = Some(at);
    }
}
