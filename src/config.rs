use std::path::PathBuf;

const DEFAULT_DB_PATH: &str = "data/words.db";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub log_level: String,
    pub seed_sample_words: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let database_path = std::env::var("WORD_DB_URL")
            .ok()
            .and_then(|value| parse_database_url(&value))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let seed_sample_words = std::env::var("WORD_SEED_SAMPLE")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        Self {
            database_path,
            log_level,
            seed_sample_words,
        }
    }
}

/// Accepts a plain file path or a `sqlite:///path` URL.
fn parse_database_url(value: &str) -> Option<PathBuf> {
    let value = value.trim();
    let path = value.strip_prefix("sqlite:///").unwrap_or(value);
    if path.is_empty() {
        None
    } else {
        Some(PathBuf::from(path))
    }
}
