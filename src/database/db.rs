//! Database operations for the vocabulary tracker
//!
//! Handles SQLite initialization, CRUD operations for words, the persisted
//! current date, and storage of each word's review schedule.
//!
//! Writes run in IMMEDIATE transactions: the write lock is taken before the
//! row is read, so concurrent reviews of one word (even from separate
//! connections) queue on SQLite's lock instead of losing an increment. A
//! writer that waits longer than the connection's busy timeout gets
//! `SQLITE_BUSY`.

use crate::error::{Result, VocabError};
use crate::models::scheduler::record_review;
use crate::models::{NewWord, SchedulingState, Stats, Word, WordPage, WordUpdate};
use crate::validation::{
    MAX_DEFINITION_LEN, MAX_SOURCE_LEN, validate_optional_text, validate_quality,
    validate_word_text,
};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params};
use std::path::Path;
use tracing::{debug, info, warn};

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 200;

const WORD_COLUMNS: &str = "id, text, definition, source, created_at, last_reviewed, review_count, easiness, due_date";

/// Outcome of bulk-adding words, e.g. from an imported file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// Opens (or creates) the SQLite database at `path` with the required tables
///
/// Sets the current date to now if not already initialized.
pub fn init_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    create_schema(&conn)?;
    info!(path = %path.display(), "database ready");
    Ok(conn)
}

/// In-memory database with the same schema, used by tests.
pub fn init_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS words (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            text TEXT NOT NULL UNIQUE,
            definition TEXT,
            source TEXT,
            created_at INTEGER NOT NULL,
            last_reviewed INTEGER,
            review_count INTEGER NOT NULL DEFAULT 0,
            easiness REAL NOT NULL DEFAULT 2.5,
            due_date INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_words_due_date ON words(due_date);
        CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;

    // Initialize current_date if not exists
    conn.execute(
        "INSERT OR IGNORE INTO app_state (key, value) VALUES ('current_date', ?1)",
        params![Utc::now().timestamp().to_string()],
    )?;

    Ok(())
}

fn write_transaction(conn: &Connection) -> Result<Transaction<'_>> {
    Ok(Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?)
}

fn from_timestamp(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or(VocabError::InvalidTimestamp(secs))
}

fn column_timestamp(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<i64>>(idx)? {
        None => Ok(None),
        Some(secs) => DateTime::from_timestamp(secs, 0)
            .map(Some)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, secs)),
    }
}

fn word_from_row(row: &Row) -> rusqlite::Result<Word> {
    let created_at = column_timestamp(row, 4)?
        .ok_or(rusqlite::Error::InvalidColumnType(
            4,
            "created_at".to_string(),
            rusqlite::types::Type::Null,
        ))?;

    Ok(Word {
        id: row.get(0)?,
        text: row.get(1)?,
        definition: row.get(2)?,
        source: row.get(3)?,
        created_at,
        scheduling: SchedulingState {
            last_reviewed_at: column_timestamp(row, 5)?,
            review_count: row.get(6)?,
            easiness_factor: row.get(7)?,
            due_date: column_timestamp(row, 8)?,
        },
    })
}

/// Retrieves the persisted current date, the "now" used for reviews
pub fn get_current_date(conn: &Connection) -> Result<DateTime<Utc>> {
    let value: String = conn.query_row(
        "SELECT value FROM app_state WHERE key = 'current_date'",
        [],
        |row| row.get(0),
    )?;

    let secs = value.parse::<i64>().map_err(|_| VocabError::Config {
        message: format!("stored current_date is not a timestamp: '{}'", value),
    })?;
    from_timestamp(secs)
}

pub fn set_current_date(date: DateTime<Utc>, conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO app_state (key, value) VALUES ('current_date', ?1)",
        params![date.timestamp().to_string()],
    )?;
    Ok(())
}

/// Advances current date by 24 hours (for stepping through the review schedule)
pub fn advance_day(conn: &Connection) -> Result<DateTime<Utc>> {
    let next_day = get_current_date(conn)? + Duration::days(1);
    set_current_date(next_day, conn)?;
    debug!(date = %next_day, "advanced current date");
    Ok(next_day)
}

/// Adds a word with default review data
///
/// Fails with `Duplicate` if a word with the same (trimmed) text exists.
pub fn create_word(new_word: &NewWord, now: DateTime<Utc>, conn: &Connection) -> Result<Word> {
    let tx = write_transaction(conn)?;
    let word = insert_word(new_word, now, &tx)?;
    tx.commit()?;

    info!(id = word.id, text = %word.text, "word created");
    Ok(word)
}

/// Validates and inserts a word; the caller owns the transaction.
fn insert_word(new_word: &NewWord, now: DateTime<Utc>, conn: &Connection) -> Result<Word> {
    let text = validate_word_text(&new_word.text)?;
    let definition = validate_optional_text(new_word.definition.as_deref(), MAX_DEFINITION_LEN)?;
    let source = validate_optional_text(new_word.source.as_deref(), MAX_SOURCE_LEN)?;

    if get_word_by_text(&text, conn)?.is_some() {
        return Err(VocabError::Duplicate(text));
    }

    let scheduling = SchedulingState::default();
    conn.execute(
        "INSERT INTO words (text, definition, source, created_at, review_count, easiness)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            text,
            definition,
            source,
            now.timestamp(),
            scheduling.review_count,
            scheduling.easiness_factor
        ],
    )?;

    Ok(Word {
        id: conn.last_insert_rowid(),
        text,
        definition,
        source,
        created_at: from_timestamp(now.timestamp())?,
        scheduling,
    })
}

pub fn get_word(id: i64, conn: &Connection) -> Result<Word> {
    conn.query_row(
        &format!("SELECT {} FROM words WHERE id = ?1", WORD_COLUMNS),
        params![id],
        word_from_row,
    )
    .optional()?
    .ok_or(VocabError::NotFound(id))
}

pub fn get_word_by_text(text: &str, conn: &Connection) -> Result<Option<Word>> {
    let word = conn
        .query_row(
            &format!("SELECT {} FROM words WHERE text = ?1", WORD_COLUMNS),
            params![text],
            word_from_row,
        )
        .optional()?;
    Ok(word)
}

fn like_pattern(query: Option<&str>) -> Option<String> {
    let query = query.map(str::trim).filter(|q| !q.is_empty())?;
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{}%", escaped))
}

/// Lists words matching `query` (case-insensitive substring of the text)
///
/// Words are ordered by due date, never-reviewed words last, then by text.
/// `total` counts all matches regardless of paging.
pub fn list_words(
    query: Option<&str>,
    skip: usize,
    limit: usize,
    conn: &Connection,
) -> Result<WordPage> {
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(VocabError::Validation {
            message: format!("limit must be between 1 and {}", MAX_PAGE_SIZE),
        });
    }
    let pattern = like_pattern(query);

    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM words WHERE (?1 IS NULL OR text LIKE ?1 ESCAPE '\\')",
        params![pattern],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM words
         WHERE (?1 IS NULL OR text LIKE ?1 ESCAPE '\\')
         ORDER BY due_date IS NULL, due_date ASC, text ASC
         LIMIT ?2 OFFSET ?3",
        WORD_COLUMNS
    ))?;
    let items = stmt
        .query_map(params![pattern, limit as i64, skip as i64], word_from_row)?
        .collect::<rusqlite::Result<Vec<Word>>>()?;

    debug!(?query, skip, limit, total, "listed words");
    Ok(WordPage {
        total: total as usize,
        items,
    })
}

/// Every word, in creation order
pub fn all_words(conn: &Connection) -> Result<Vec<Word>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM words ORDER BY id", WORD_COLUMNS))?;
    let words = stmt
        .query_map([], word_from_row)?
        .collect::<rusqlite::Result<Vec<Word>>>()?;
    Ok(words)
}

/// Applies a partial update to the word's text, definition, or source
///
/// Renaming onto the text of another word fails with `Duplicate`.
pub fn update_word(id: i64, update: &WordUpdate, conn: &Connection) -> Result<Word> {
    let tx = write_transaction(conn)?;
    let mut word = get_word(id, &tx)?;

    if let Some(text) = &update.text {
        let text = validate_word_text(text)?;
        if let Some(other) = get_word_by_text(&text, &tx)? {
            if other.id != id {
                return Err(VocabError::Duplicate(text));
            }
        }
        word.text = text;
    }
    if let Some(definition) = validate_optional_text(update.definition.as_deref(), MAX_DEFINITION_LEN)? {
        word.definition = Some(definition);
    }
    if let Some(source) = validate_optional_text(update.source.as_deref(), MAX_SOURCE_LEN)? {
        word.source = Some(source);
    }

    tx.execute(
        "UPDATE words SET text = ?1, definition = ?2, source = ?3 WHERE id = ?4",
        params![word.text, word.definition, word.source, id],
    )?;
    tx.commit()?;

    info!(id, text = %word.text, "word updated");
    Ok(word)
}

pub fn delete_word(id: i64, conn: &Connection) -> Result<()> {
    let deleted = conn.execute("DELETE FROM words WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(VocabError::NotFound(id));
    }
    info!(id, "word deleted");
    Ok(())
}

/// Records a review of a word and stores its new schedule
///
/// Quality outside 0-5 is rejected here with a validation error.
pub fn review_word(id: i64, quality: i32, now: DateTime<Utc>, conn: &Connection) -> Result<Word> {
    let quality = validate_quality(quality)?;

    let tx = write_transaction(conn)?;
    let mut word = get_word(id, &tx)?;
    word.scheduling = record_review(&word.scheduling, quality, now);

    let state = &word.scheduling;
    tx.execute(
        "UPDATE words
         SET last_reviewed = ?1, review_count = ?2, easiness = ?3, due_date = ?4
         WHERE id = ?5",
        params![
            state.last_reviewed_at.map(|t| t.timestamp()),
            state.review_count,
            state.easiness_factor,
            state.due_date.map(|t| t.timestamp()),
            id
        ],
    )?;
    tx.commit()?;

    info!(
        id,
        quality,
        review_count = state.review_count,
        easiness = state.easiness_factor,
        due = ?state.due_date,
        "word reviewed"
    );
    Ok(word)
}

/// Words due for review at `now`
///
/// Overdue words come first (oldest due date first), then words never reviewed.
pub fn due_words(now: DateTime<Utc>, conn: &Connection) -> Result<Vec<Word>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM words
         WHERE due_date IS NULL OR due_date <= ?1
         ORDER BY due_date IS NULL, due_date ASC, id ASC",
        WORD_COLUMNS
    ))?;
    let words = stmt
        .query_map(params![now.timestamp()], word_from_row)?
        .collect::<rusqlite::Result<Vec<Word>>>()?;
    Ok(words)
}

pub fn stats(now: DateTime<Utc>, conn: &Connection) -> Result<Stats> {
    let (total, reviewed, due_today): (i64, i64, i64) = conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(review_count > 0), 0),
                COALESCE(SUM(due_date IS NOT NULL AND due_date <= ?1), 0)
         FROM words",
        params![now.timestamp()],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    Ok(Stats {
        total: total as usize,
        reviewed: reviewed as usize,
        due_today: due_today as usize,
    })
}

/// Creates every word that does not exist yet; duplicates are skipped
///
/// All-or-nothing: any other error (e.g. an invalid entry) rolls back the
/// whole import.
pub fn import_words(words: &[NewWord], now: DateTime<Utc>, conn: &Connection) -> Result<ImportSummary> {
    let tx = write_transaction(conn)?;
    let mut summary = ImportSummary::default();
    for word in words {
        match insert_word(word, now, &tx) {
            Ok(_) => summary.imported += 1,
            Err(VocabError::Duplicate(text)) => {
                debug!(text = %text, "skipping existing word");
                summary.skipped += 1;
            }
            Err(e) => {
                warn!(text = %word.text, error = %e, "import rolled back");
                return Err(e);
            }
        }
    }
    tx.commit()?;

    info!(
        imported = summary.imported,
        skipped = summary.skipped,
        "words imported"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn jan_first() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn setup() -> Connection {
        let conn = init_in_memory().unwrap();
        set_current_date(jan_first(), &conn).unwrap();
        conn
    }

    fn add(text: &str, conn: &Connection) -> Word {
        create_word(&NewWord::new(text), jan_first(), conn).unwrap()
    }

    #[test]
    fn test_create_and_get_word() {
        let conn = setup();
        let new = NewWord::new("  hello ")
            .with_definition("greeting")
            .with_source("test");
        let created = create_word(&new, jan_first(), &conn).unwrap();
        assert_eq!(created.text, "hello");

        let fetched = get_word(created.id, &conn).unwrap();
        assert_eq!(fetched.text, "hello");
        assert_eq!(fetched.definition.as_deref(), Some("greeting"));
        assert_eq!(fetched.source.as_deref(), Some("test"));
        assert_eq!(fetched.created_at, jan_first());
        assert_eq!(fetched.scheduling, SchedulingState::default());
    }

    #[test]
    fn test_duplicate_word_rejected() {
        let conn = setup();
        add("hello", &conn);
        let result = create_word(&NewWord::new("hello"), jan_first(), &conn);
        assert!(matches!(result, Err(VocabError::Duplicate(_))));
    }

    #[test]
    fn test_missing_word_is_not_found() {
        let conn = setup();
        assert!(matches!(get_word(42, &conn), Err(VocabError::NotFound(42))));
        assert!(matches!(delete_word(42, &conn), Err(VocabError::NotFound(42))));
        assert!(matches!(
            review_word(42, 3, jan_first(), &conn),
            Err(VocabError::NotFound(42))
        ));
        assert!(get_word_by_text("nothing", &conn).unwrap().is_none());
    }

    #[test]
    fn test_list_and_search() {
        let conn = setup();
        for text in ["alpha", "beta", "Alphabet"] {
            add(text, &conn);
        }

        let page = list_words(None, 0, 10, &conn).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 3);

        let page = list_words(Some("alpha"), 0, 10, &conn).unwrap();
        assert_eq!(page.total, 2);
        assert!(page.items.iter().any(|w| w.text == "alpha"));
        assert!(page.items.iter().any(|w| w.text == "Alphabet"));

        let page = list_words(Some("   "), 0, 10, &conn).unwrap();
        assert_eq!(page.total, 3);
    }

    #[test]
    fn test_search_treats_wildcards_literally() {
        let conn = setup();
        add("100%", &conn);
        add("1000", &conn);

        let page = list_words(Some("0%"), 0, 10, &conn).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].text, "100%");
    }

    #[test]
    fn test_list_paging_and_order() {
        let conn = setup();
        let c = add("c", &conn);
        add("a", &conn);
        add("b", &conn);
        review_word(c.id, 4, jan_first(), &conn).unwrap();

        let page = list_words(None, 0, 2, &conn).unwrap();
        assert_eq!(page.total, 3);
        let texts: Vec<_> = page.items.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["c", "a"]);

        let page = list_words(None, 2, 2, &conn).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].text, "b");
    }

    #[test]
    fn test_list_limit_bounds() {
        let conn = setup();
        assert!(list_words(None, 0, 0, &conn).is_err());
        assert!(list_words(None, 0, MAX_PAGE_SIZE + 1, &conn).is_err());
        assert!(list_words(None, 0, MAX_PAGE_SIZE, &conn).is_ok());
    }

    #[test]
    fn test_update_word_and_uniqueness() {
        let conn = setup();
        let one = add("one", &conn);
        let two = add("two", &conn);

        let rename = WordUpdate {
            text: Some("two".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            update_word(one.id, &rename, &conn),
            Err(VocabError::Duplicate(_))
        ));

        let define = WordUpdate {
            definition: Some("number".to_string()),
            ..Default::default()
        };
        let updated = update_word(two.id, &define, &conn).unwrap();
        assert_eq!(updated.definition.as_deref(), Some("number"));
        assert_eq!(updated.text, "two");

        // Renaming a word to its own text is allowed
        let same = WordUpdate {
            text: Some(" two ".to_string()),
            ..Default::default()
        };
        assert!(update_word(two.id, &same, &conn).is_ok());
    }

    #[test]
    fn test_delete_word() {
        let conn = setup();
        let word = add("bye", &conn);
        delete_word(word.id, &conn).unwrap();
        assert!(matches!(get_word(word.id, &conn), Err(VocabError::NotFound(_))));
    }

    #[test]
    fn test_review_persists_schedule() {
        let conn = setup();
        let word = add("reviewme", &conn);

        let reviewed = review_word(word.id, 3, jan_first(), &conn).unwrap();
        assert_eq!(reviewed.scheduling.review_count, 1);
        assert!(reviewed.scheduling.easiness_factor >= 1.3);
        assert_eq!(reviewed.scheduling.last_reviewed_at, Some(jan_first()));
        assert_eq!(
            reviewed.scheduling.due_date,
            Some(jan_first() + Duration::days(1))
        );

        let stored = get_word(word.id, &conn).unwrap();
        assert_eq!(stored.scheduling, reviewed.scheduling);
    }

    #[test]
    fn test_review_rejects_out_of_range_quality() {
        let conn = setup();
        let word = add("strict", &conn);
        assert!(matches!(
            review_word(word.id, 6, jan_first(), &conn),
            Err(VocabError::Validation { .. })
        ));
        assert_eq!(get_word(word.id, &conn).unwrap().scheduling.review_count, 0);
    }

    #[test]
    fn test_stats() {
        let conn = setup();
        let a = add("a", &conn);
        add("b", &conn);
        add("c", &conn);
        review_word(a.id, 5, jan_first(), &conn).unwrap();

        let today = stats(jan_first(), &conn).unwrap();
        assert_eq!(
            today,
            Stats {
                total: 3,
                reviewed: 1,
                due_today: 0
            }
        );

        let tomorrow = stats(jan_first() + Duration::days(1), &conn).unwrap();
        assert_eq!(tomorrow.due_today, 1);
    }

    #[test]
    fn test_due_words() {
        let conn = setup();
        let a = add("a", &conn);
        let b = add("b", &conn);
        add("c", &conn);
        review_word(a.id, 5, jan_first(), &conn).unwrap();
        review_word(b.id, 5, jan_first(), &conn).unwrap();
        review_word(b.id, 5, jan_first(), &conn).unwrap();

        let due: Vec<_> = due_words(jan_first(), &conn)
            .unwrap()
            .into_iter()
            .map(|w| w.text)
            .collect();
        assert_eq!(due, vec!["c"]);

        let due: Vec<_> = due_words(jan_first() + Duration::days(1), &conn)
            .unwrap()
            .into_iter()
            .map(|w| w.text)
            .collect();
        assert_eq!(due, vec!["a", "c"]);
    }

    #[test]
    fn test_current_date() {
        let conn = setup();
        assert_eq!(get_current_date(&conn).unwrap(), jan_first());
        let next = advance_day(&conn).unwrap();
        assert_eq!(next, jan_first() + Duration::days(1));
        assert_eq!(get_current_date(&conn).unwrap(), next);
    }

    #[test]
    fn test_import_words_skips_duplicates() {
        let conn = setup();
        add("alpha", &conn);
        let words = vec![NewWord::new("alpha"), NewWord::new("beta"), NewWord::new("gamma")];

        let summary = import_words(&words, jan_first(), &conn).unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                imported: 2,
                skipped: 1
            }
        );
        assert_eq!(all_words(&conn).unwrap().len(), 3);
    }

    #[test]
    fn test_import_with_invalid_entry_stores_nothing() {
        let conn = setup();
        let long = "x".repeat(300);
        for bad in ["   ", long.as_str()] {
            let words = vec![NewWord::new("alpha"), NewWord::new(bad), NewWord::new("beta")];
            let result = import_words(&words, jan_first(), &conn);
            assert!(matches!(result, Err(VocabError::Validation { .. })));
            assert!(all_words(&conn).unwrap().is_empty());
        }
    }

    #[test]
    fn test_concurrent_reviews_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.db");
        let id = {
            let conn = init_database(&path).unwrap();
            add("shared", &conn).id
        };

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let conn = init_database(&path).unwrap();
                    for _ in 0..10 {
                        review_word(id, 4, jan_first(), &conn).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let conn = init_database(&path).unwrap();
        assert_eq!(get_word(id, &conn).unwrap().scheduling.review_count, 40);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("words.db");

        {
            let conn = init_database(&path).unwrap();
            add("kept", &conn);
        }
        let conn = init_database(&path).unwrap();
        assert!(get_word_by_text("kept", &conn).unwrap().is_some());
    }
}
