//! Review session management for spaced repetition practice.
//! Handles multi-round word review; the first grade of each word is stored as its review.

use super::{ReviewCard, Word};
use crate::database::db;
use crate::error::{Result, VocabError};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Grades at or above this count as recalled for the session.
pub const PASSING_QUALITY: i32 = 3;

/// Manages a review session with multiple rounds.
/// Words that aren't recalled (grade < 3) are repeated in subsequent rounds.
pub struct ReviewSession {
    pub all_cards: Vec<ReviewCard>,
    pub current_round_cards: Vec<usize>,
    pub current_index: usize,
    pub show_definition: bool,
    pub conn: Arc<Mutex<Connection>>,
    pub round_number: usize,
}

impl ReviewSession {
    /// Creates a new review session from words that are due for review.
    pub fn new_from_due_words(words: Vec<Word>, conn: Arc<Mutex<Connection>>) -> Self {
        let cards: Vec<_> = words.into_iter().map(ReviewCard::new).collect();
        let indices: Vec<usize> = (0..cards.len()).collect();

        info!(words = cards.len(), "review session started");
        Self {
            all_cards: cards,
            current_round_cards: indices,
            current_index: 0,
            show_definition: false,
            conn,
            round_number: 1,
        }
    }

    pub fn current_card(&self) -> Option<&ReviewCard> {
        self.current_round_cards
            .get(self.current_index)
            .and_then(|&idx| self.all_cards.get(idx))
    }

    pub fn toggle_definition(&mut self) {
        self.show_definition = !self.show_definition;
    }

    pub fn next_word(&mut self) {
        if self.current_index + 1 < self.current_round_cards.len() {
            self.current_index += 1;
            self.show_definition = false;
        } else {
            self.start_next_round();
        }
    }

    /// Starts a new round with words that weren't recalled.
    /// If none remain, the session is complete.
    fn start_next_round(&mut self) {
        let failed_indices: Vec<usize> = self
            .current_round_cards
            .iter()
            .copied()
            .filter(|&idx| {
                self.all_cards
                    .get(idx)
                    .map(|card| !card.is_learned)
                    .unwrap_or(false)
            })
            .collect();

        if !failed_indices.is_empty() {
            self.current_round_cards = failed_indices;
            self.current_index = 0;
            self.show_definition = false;
            self.round_number += 1;
            debug!(
                round = self.round_number,
                words = self.current_round_cards.len(),
                "starting retry round"
            );
        }
    }

    /// Grades the current word.
    /// Only first-round grades are stored as reviews; retry rounds are practice
    /// and leave the schedule untouched. Words graded >= 3 are marked as learned
    /// for this session.
    pub fn grade_current_word(&mut self, quality: i32) -> Result<()> {
        let Some(&actual_idx) = self.current_round_cards.get(self.current_index) else {
            return Ok(());
        };
        let Some(card) = self.all_cards.get_mut(actual_idx) else {
            return Ok(());
        };

        let conn = self.conn.lock().map_err(|_| VocabError::LockPoisoned)?;
        let now = db::get_current_date(&conn)?;
        if self.round_number == 1 {
            card.word = db::review_word(card.word.id, quality, now, &conn)?;
        } else {
            debug!(id = card.word.id, quality, "practice grade not stored");
        }

        if quality >= PASSING_QUALITY {
            card.mark_as_learned(now);
        } else {
            card.is_learned = false;
        }
        Ok(())
    }

    pub fn learned_count(&self) -> usize {
        self.current_round_cards
            .iter()
            .filter(|&&idx| {
                self.all_cards
                    .get(idx)
                    .map(|card| card.is_learned)
                    .unwrap_or(false)
            })
            .count()
    }

    pub fn total_count(&self) -> usize {
        self.current_round_cards.len()
    }

    pub fn remaining_count(&self) -> usize {
        self.total_count() - self.learned_count()
    }

    /// Returns true when the round is empty or every word in it was recalled.
    pub fn is_completed(&self) -> bool {
        self.current_round_cards.is_empty() || self.learned_count() == self.total_count()
    }

    pub fn phase_message(&self) -> String {
        if self.round_number == 1 {
            format!("Round {}: {} words", self.round_number, self.total_count())
        } else {
            format!(
                "Round {} (Review): {} words to retry",
                self.round_number,
                self.total_count()
            )
        }
    }
}
