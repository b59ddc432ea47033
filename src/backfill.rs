//! `languageKey` back-fill.
//!
//! Adds the `languageKey` column to `scriptures` when missing, then fills it
//! for every row where it is null or blank:
//!
//! - the version tag inside the index names a Bible, whose configured
//!   language decides the branch;
//! - English rows get the index copied verbatim;
//! - other languages get the index with its book name replaced by the
//!   localized name from `[books.<LANGUAGE>]`.
//!
//! Rows that cannot be resolved are skipped and left blank, so running the
//! back-fill again touches exactly the rows that are still blank.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::config::{self, Config};
use crate::store::{Order, RowFilter, Store};

fn mnemonic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(([^()]+)\s+([A-Z0-9_-]+)\)").expect("valid regex"))
}

fn book_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\(\s*([1-3]?\s*[A-Za-z]+(?:\s+[A-Za-z]+)*)\b").expect("valid regex")
    })
}

/// Version tag of an index such as `(1 John 4:8 WEBUS)`.
pub fn extract_mnemonic(index: &str) -> Option<&str> {
    mnemonic_re()
        .captures(index)
        .and_then(|c| c.get(2))
        .map(|m| m.as_str())
}

/// Leading book-name token of an index, e.g. `Song of Solomon`.
pub fn extract_book(index: &str) -> Option<&str> {
    book_re()
        .captures(index)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Replace the book name of an index with its localized form.
///
/// Returns `None` when the index has no recognizable book token or the book
/// is missing from the table.
pub fn localize_index(index: &str, books: &HashMap<String, String>) -> Option<String> {
    let book = extract_book(index)?;
    let localized = books.get(book)?;
    Some(index.replace(book, localized))
}

/// Remembers the language of the last mnemonic looked up.
///
/// Rows are processed in id order and neighbours usually share a version, so
/// one entry is enough to avoid most config lookups.
#[derive(Debug, Default)]
pub struct LanguageCache {
    last: Option<(String, Option<String>)>,
    enabled: bool,
}

impl LanguageCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            last: None,
            enabled,
        }
    }

    pub fn language_for(&mut self, config: &Config, mnemonic: &str) -> Option<String> {
        if self.enabled {
            if let Some((cached, language)) = &self.last {
                if cached == mnemonic {
                    return language.clone();
                }
            }
        }

        let language = config.bible(mnemonic).map(|b| b.language.clone());
        if self.enabled {
            self.last = Some((mnemonic.to_string(), language.clone()));
        }
        language
    }
}

/// Why a row was left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoMnemonic,
    UnknownBible(String),
    NoBookTable(String),
    UnknownBook,
}

/// Value to store in `languageKey` for one index, or the reason there is none.
pub fn language_key_for(
    config: &Config,
    cache: &mut LanguageCache,
    index: &str,
) -> Result<String, SkipReason> {
    let mnemonic = extract_mnemonic(index).ok_or(SkipReason::NoMnemonic)?;
    let language = cache
        .language_for(config, mnemonic)
        .ok_or_else(|| SkipReason::UnknownBible(mnemonic.to_string()))?;

    // English rows keep the index as-is.
    if config::is_english(&language) {
        return Ok(index.to_string());
    }

    let books = config
        .book_map(&language)
        .ok_or_else(|| SkipReason::NoBookTable(language.clone()))?;
    localize_index(index, books).ok_or(SkipReason::UnknownBook)
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackfillReport {
    pub column_added: bool,
    pub scanned: u64,
    pub updated: u64,
    pub skipped: u64,
}

/// Add the column if needed and fill every blank `languageKey`.
pub async fn backfill_language_keys(store: &mut Store, config: &Config) -> Result<BackfillReport> {
    let column_added = store
        .ensure_language_column()
        .await
        .context("Failed to add languageKey column")?;

    let rows = store
        .scan(&RowFilter::MissingLanguage, Order::IdAsc, None)
        .await?;

    let mut report = BackfillReport {
        column_added,
        ..Default::default()
    };
    let mut cache = LanguageCache::new(true);

    for row in &rows {
        report.scanned += 1;
        match language_key_for(config, &mut cache, &row.scripture_index) {
            Ok(value) => {
                store
                    .set_language_key(row.id, &value)
                    .await
                    .with_context(|| format!("Failed to update row {}", row.id))?;
                report.updated += 1;
            }
            Err(reason) => {
                tracing::debug!(id = row.id, index = %row.scripture_index, ?reason, "skipping row");
                report.skipped += 1;
            }
        }
    }

    Ok(report)
}

/// CLI entry point for `fohs migrate`.
pub async fn run_migrate(config: &Config) -> Result<()> {
    let mut store = Store::open(&config.db.path)
        .await
        .with_context(|| format!("Could not open database: {}", config.db.path.display()))?;

    let report = backfill_language_keys(&mut store, config).await?;

    println!("migrate {}", store.path().display());
    if report.column_added {
        println!("  added column: languageKey");
    } else {
        println!("  column languageKey already exists");
    }
    println!("  rows scanned: {}", report.scanned);
    println!("  rows updated: {}", report.updated);
    println!("  rows skipped: {}", report.skipped);
    println!("ok");

    store.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn config() -> Config {
        parse_config(
            r#"
[db]
path = "unused.sqlite"

[[bibles]]
mnemonic = "WEBUS"
language = "ENGLISH"

[[bibles]]
mnemonic = "REINAVAL"
language = "SPANISH"

[[bibles]]
mnemonic = "LSG"
language = "FRENCH"

[books.SPANISH]
"John" = "Juan"
"1 John" = "1 Juan"
"Song of Solomon" = "Cantares"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_extract_mnemonic() {
        assert_eq!(extract_mnemonic("(John 3:16 WEBUS)"), Some("WEBUS"));
        assert_eq!(extract_mnemonic("(1 John 4:8 REINA_VAL-60)"), Some("REINA_VAL-60"));
        assert_eq!(extract_mnemonic("John 3:16 WEBUS"), None);
        assert_eq!(extract_mnemonic("(John 3:16 webus)"), None);
    }

    #[test]
    fn test_extract_book() {
        assert_eq!(extract_book("(John 3:16 WEBUS)"), Some("John"));
        assert_eq!(extract_book("(1 John 4:8 WEBUS)"), Some("1 John"));
        assert_eq!(extract_book("(Song of Solomon 2:1 WEBUS)"), Some("Song of Solomon"));
    }

    #[test]
    fn test_english_copies_index() {
        let config = config();
        let mut cache = LanguageCache::new(true);
        assert_eq!(
            language_key_for(&config, &mut cache, "(John 3:16 WEBUS)"),
            Ok("(John 3:16 WEBUS)".to_string())
        );
    }

    #[test]
    fn test_spanish_localizes_book() {
        let config = config();
        let mut cache = LanguageCache::new(true);
        assert_eq!(
            language_key_for(&config, &mut cache, "(1 John 4:8 REINAVAL)"),
            Ok("(1 Juan 4:8 REINAVAL)".to_string())
        );
        assert_eq!(
            language_key_for(&config, &mut cache, "(Song of Solomon 2:1 REINAVAL)"),
            Ok("(Cantares 2:1 REINAVAL)".to_string())
        );
    }

    #[test]
    fn test_skip_reasons() {
        let config = config();
        let mut cache = LanguageCache::new(true);
        assert_eq!(
            language_key_for(&config, &mut cache, "(Ruth 1:16 REINAVAL)"),
            Err(SkipReason::UnknownBook)
        );
        assert_eq!(
            language_key_for(&config, &mut cache, "(John 3:16 KJV)"),
            Err(SkipReason::UnknownBible("KJV".to_string()))
        );
        assert_eq!(
            language_key_for(&config, &mut cache, "(Jean 3:16 LSG)"),
            Err(SkipReason::NoBookTable("FRENCH".to_string()))
        );
        assert_eq!(
            language_key_for(&config, &mut cache, "no index here"),
            Err(SkipReason::NoMnemonic)
        );
    }

    #[test]
    fn test_cache_does_not_change_results() {
        let config = config();
        let indices = [
            "(John 3:16 REINAVAL)",
            "(1 John 4:8 REINAVAL)",
            "(John 3:16 WEBUS)",
            "(John 15:12 REINAVAL)",
            "(John 3:16 KJV)",
        ];
        let mut cached = LanguageCache::new(true);
        let mut uncached = LanguageCache::new(false);
        for index in indices {
            assert_eq!(
                language_key_for(&config, &mut cached, index),
                language_key_for(&config, &mut uncached, index),
                "{}",
                index
            );
        }
    }
}
