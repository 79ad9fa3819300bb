//! A vocabulary word with its notes and review schedule
use super::SchedulingState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Word {
    pub id: i64,
    pub text: String,
    pub definition: Option<String>,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub scheduling: SchedulingState,
}

/// Fields needed to create a word. Scheduling always starts from the defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewWord {
    pub text: String,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

impl NewWord {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            definition: None,
            source: None,
        }
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Clone, Debug, Default)]
pub struct WordUpdate {
    pub text: Option<String>,
    pub definition: Option<String>,
    pub source: Option<String>,
}

/// One page of a word listing, with the total number of matches.
#[derive(Clone, Debug, Default)]
pub struct WordPage {
    pub total: usize,
    pub items: Vec<Word>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub reviewed: usize,
    pub due_today: usize,
}
