//! JSON import/export of the vocabulary list.
//! Exports carry each word's schedule; imports only read text, definition and source.

use crate::error::Result;
use crate::models::{NewWord, Word};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

#[derive(Serialize)]
struct VocabularyExport<'a> {
    words: &'a [Word],
}

/// Shape accepted on import. Extra fields (ids, schedule) are ignored.
#[derive(Debug, Deserialize)]
pub struct VocabularyFile {
    pub words: Vec<NewWord>,
}

/// Exports words to a JSON file at the specified path.
pub fn export_json_to_path(words: &[Word], path: &Path) -> Result<()> {
    let json_string = serde_json::to_string_pretty(&VocabularyExport { words })?;
    let mut file = File::create(path)?;
    file.write_all(json_string.as_bytes())?;
    info!(count = words.len(), path = %path.display(), "vocabulary exported");
    Ok(())
}

/// Reads a vocabulary file.
/// Returns an error if the file doesn't exist or contains invalid JSON.
pub fn import_json(path: &Path) -> Result<VocabularyFile> {
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let vocabulary: VocabularyFile = serde_json::from_str(&contents)?;

    info!(count = vocabulary.words.len(), path = %path.display(), "vocabulary file read");
    Ok(vocabulary)
}
