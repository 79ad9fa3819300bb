pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod validation;

pub use error::{Result, VocabError};
pub use models::{NewWord, ReviewSession, SchedulingState, Stats, Word, WordPage, WordUpdate};
pub use models::scheduler::record_review;
