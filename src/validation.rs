//! Input checks applied before anything reaches the database.
//!
//! The scheduler clamps quality on its own; `validate_quality` exists so that
//! callers facing a user can reject bad grades with a clear message instead.

use crate::error::{Result, VocabError};

pub const MAX_TEXT_LEN: usize = 256;
pub const MAX_DEFINITION_LEN: usize = 2048;
pub const MAX_SOURCE_LEN: usize = 1024;

/// Trims the word text and checks it is non-empty and not too long.
pub fn validate_word_text(text: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(VocabError::Validation {
            message: "Word text cannot be empty".to_string(),
        });
    }
    if trimmed.chars().count() > MAX_TEXT_LEN {
        return Err(VocabError::Validation {
            message: format!("Word text cannot exceed {} characters", MAX_TEXT_LEN),
        });
    }
    Ok(trimmed.to_string())
}

pub fn validate_quality(quality: i32) -> Result<i32> {
    if !(0..=5).contains(&quality) {
        return Err(VocabError::Validation {
            message: "Quality must be between 0 and 5".to_string(),
        });
    }
    Ok(quality)
}

pub fn validate_optional_text(text: Option<&str>, max_length: usize) -> Result<Option<String>> {
    match text {
        None => Ok(None),
        Some(t) if t.chars().count() > max_length => Err(VocabError::Validation {
            message: format!("Text cannot exceed {} characters", max_length),
        }),
        Some(t) => Ok(Some(t.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_text_is_trimmed() {
        assert_eq!(validate_word_text("  hello ").unwrap(), "hello");
    }

    #[test]
    fn test_blank_word_text_rejected() {
        assert!(matches!(
            validate_word_text("   "),
            Err(VocabError::Validation { .. })
        ));
    }

    #[test]
    fn test_long_word_text_rejected() {
        let text = "a".repeat(MAX_TEXT_LEN + 1);
        assert!(validate_word_text(&text).is_err());
        assert!(validate_word_text(&"a".repeat(MAX_TEXT_LEN)).is_ok());
    }

    #[test]
    fn test_quality_range() {
        for q in 0..=5 {
            assert_eq!(validate_quality(q).unwrap(), q);
        }
        assert!(validate_quality(-1).is_err());
        assert!(validate_quality(6).is_err());
    }

    #[test]
    fn test_optional_text() {
        assert_eq!(validate_optional_text(None, 10).unwrap(), None);
        assert_eq!(
            validate_optional_text(Some("note"), 10).unwrap(),
            Some("note".to_string())
        );
        assert!(validate_optional_text(Some("way too long"), 5).is_err());
    }
}
