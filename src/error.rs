use thiserror::Error;

#[derive(Error, Debug)]
pub enum VocabError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("word not found: {0}")]
    NotFound(i64),

    #[error("word already exists: {0}")]
    Duplicate(String),

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(i64),

    #[error("Database connection lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, VocabError>;
