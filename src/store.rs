//! Access to the `scriptures` table.
//!
//! [`Store`] is the only place that speaks SQL about scripture rows. Reads are
//! expressed as a [`RowFilter`]; writes are independent single-row statements.
//! Stores created before the `languageKey` migration are still readable: the
//! column is selected as `NULL` until it exists.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};

use crate::db::{self, OpenMode};
use crate::error::StoreError;
use crate::migrate;
use crate::models::{NewScripture, ScriptureRecord};

/// Predicate over `scriptures` rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowFilter {
    All,
    /// Index ends with `<tag>)`.
    VersionTag(String),
    /// Index contains the text anywhere.
    Mentions(String),
    /// `languageKey` is null or blank.
    MissingLanguage,
    /// `text` or `fohs` is null or blank, optionally within one version.
    Incomplete(Option<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    IdAsc,
    IdDesc,
}

pub struct Store {
    pool: SqlitePool,
    path: PathBuf,
    has_language_key: bool,
}

impl Store {
    /// Open an existing store for reading and writing.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        Self::connect(path, OpenMode::Existing).await
    }

    /// Open an existing store; writes fail.
    pub async fn open_read_only(path: &Path) -> Result<Self, StoreError> {
        Self::connect(path, OpenMode::ReadOnly).await
    }

    /// Open or create a store and make sure the `scriptures` table exists.
    pub async fn create(path: &Path) -> Result<Self, StoreError> {
        let pool = db::connect(path, OpenMode::Create).await?;
        migrate::create_schema(&pool).await?;
        Self::from_pool(pool, path).await
    }

    async fn connect(path: &Path, mode: OpenMode) -> Result<Self, StoreError> {
        let pool = db::connect(path, mode).await?;
        Self::from_pool(pool, path).await
    }

    async fn from_pool(pool: SqlitePool, path: &Path) -> Result<Self, StoreError> {
        let has_language_key =
            migrate::has_column(&pool, migrate::TABLE, migrate::LANGUAGE_KEY_COL).await?;
        Ok(Self {
            pool,
            path: path.to_path_buf(),
            has_language_key,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Add the `languageKey` column if missing. Returns whether it was added.
    pub async fn ensure_language_column(&mut self) -> Result<bool, StoreError> {
        let added = migrate::add_language_column(&self.pool).await?;
        self.has_language_key = true;
        Ok(added)
    }

    fn select_columns(&self) -> &'static str {
        if self.has_language_key {
            "id, scriptureIndex AS scripture_index, fohsKey AS fohs_key, fohs, text, \
             languageKey AS language_key"
        } else {
            "id, scriptureIndex AS scripture_index, fohsKey AS fohs_key, fohs, text, \
             NULL AS language_key"
        }
    }

    /// First row for `(scriptureIndex, fohsKey)`; duplicates are tolerated.
    pub async fn get(
        &self,
        scripture_index: &str,
        fohs_key: &str,
    ) -> Result<Option<ScriptureRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM scriptures WHERE scriptureIndex = ? AND fohsKey = ? LIMIT 1",
            self.select_columns()
        );
        let row = sqlx::query(&sql)
            .bind(scripture_index)
            .bind(fohs_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(record_from_row))
    }

    pub async fn scan(
        &self,
        filter: &RowFilter,
        order: Order,
        limit: Option<usize>,
    ) -> Result<Vec<ScriptureRecord>, StoreError> {
        let (clause, binds) = self.where_clause(filter);
        let mut sql = format!(
            "SELECT {} FROM scriptures{} ORDER BY id {}",
            self.select_columns(),
            clause,
            match order {
                Order::IdAsc => "ASC",
                Order::IdDesc => "DESC",
            }
        );
        if let Some(lim) = limit {
            sql.push_str(&format!(" LIMIT {}", lim));
        }

        let mut query = sqlx::query(&sql);
        for b in &binds {
            query = query.bind(b.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(record_from_row).collect())
    }

    pub async fn count(&self, filter: &RowFilter) -> Result<i64, StoreError> {
        let (clause, binds) = self.where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM scriptures{}", clause);
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for b in &binds {
            query = query.bind(b.as_str());
        }
        Ok(query.fetch_one(&self.pool).await?)
    }

    fn where_clause(&self, filter: &RowFilter) -> (String, Vec<String>) {
        match filter {
            RowFilter::All => (String::new(), Vec::new()),
            RowFilter::VersionTag(tag) => (
                " WHERE scriptureIndex GLOB ?".to_string(),
                vec![tag_pattern(tag)],
            ),
            RowFilter::Mentions(text) => (
                " WHERE instr(scriptureIndex, ?) > 0".to_string(),
                vec![text.clone()],
            ),
            RowFilter::MissingLanguage => {
                if self.has_language_key {
                    (format!(" WHERE {}", blank_sql("languageKey")), Vec::new())
                } else {
                    (String::new(), Vec::new())
                }
            }
            RowFilter::Incomplete(tag) => {
                let incomplete = format!("({} OR {})", blank_sql("text"), blank_sql("fohs"));
                match tag {
                    Some(tag) => (
                        format!(" WHERE scriptureIndex GLOB ? AND {}", incomplete),
                        vec![tag_pattern(tag)],
                    ),
                    None => (format!(" WHERE {}", incomplete), Vec::new()),
                }
            }
        }
    }

    /// Insert a new row and return its id.
    pub async fn insert(&self, row: &NewScripture) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO scriptures (scriptureIndex, fohsKey, fohs, text) VALUES (?, ?, ?, ?)",
        )
        .bind(&row.scripture_index)
        .bind(&row.fohs_key)
        .bind(&row.fohs)
        .bind(&row.text)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Overwrite `text` and `fohs` for a `(scriptureIndex, fohsKey)` pair.
    pub async fn update_text(
        &self,
        scripture_index: &str,
        fohs_key: &str,
        text: &str,
        fohs: &str,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE scriptures SET text = ?, fohs = ? WHERE scriptureIndex = ? AND fohsKey = ?",
        )
        .bind(text)
        .bind(fohs)
        .bind(scripture_index)
        .bind(fohs_key)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn set_language_key(&self, id: i64, value: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE scriptures SET languageKey = ? WHERE id = ?")
            .bind(value)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Distinct fohs keys among rows of one version.
    pub async fn fohs_keys_for(&self, tag: &str) -> Result<Vec<String>, StoreError> {
        let keys = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT fohsKey FROM scriptures WHERE scriptureIndex GLOB ? ORDER BY fohsKey",
        )
        .bind(tag_pattern(tag))
        .fetch_all(&self.pool)
        .await?;
        Ok(keys)
    }

    pub async fn distinct_indices(&self) -> Result<Vec<String>, StoreError> {
        let indices =
            sqlx::query_scalar::<_, String>("SELECT DISTINCT scriptureIndex FROM scriptures")
                .fetch_all(&self.pool)
                .await?;
        Ok(indices)
    }

    pub async fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        let tables = sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tables)
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// Code points `char::is_whitespace` accepts, so SQL blank checks agree
/// with [`crate::models::is_blank`].
const WHITESPACE: &[u32] = &[
    9, 10, 11, 12, 13, 32, 133, 160, 5760, 8192, 8193, 8194, 8195, 8196, 8197, 8198, 8199, 8200,
    8201, 8202, 8232, 8233, 8239, 8287, 12288,
];

/// `col` is NULL or only whitespace.
fn blank_sql(col: &str) -> String {
    let chars = WHITESPACE
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("({col} IS NULL OR TRIM({col}, char({chars})) = '')")
}

/// GLOB pattern matching indices that end with `<tag>)`. GLOB is case
/// sensitive; its metacharacters in the tag are matched literally.
fn tag_pattern(tag: &str) -> String {
    let mut pattern = String::from("*");
    for c in tag.chars() {
        match c {
            '*' | '?' | '[' => {
                pattern.push('[');
                pattern.push(c);
                pattern.push(']');
            }
            _ => pattern.push(c),
        }
    }
    pattern.push(')');
    pattern
}

fn record_from_row(row: &SqliteRow) -> ScriptureRecord {
    ScriptureRecord {
        id: row.get("id"),
        scripture_index: row.get("scripture_index"),
        fohs_key: row.get("fohs_key"),
        fohs: row.get("fohs"),
        text: row.get("text"),
        language_key: row.get("language_key"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store_with(tmp: &TempDir, rows: &[(&str, &str, &str)]) -> Store {
        let store = Store::create(&tmp.path().join("fohs.sqlite")).await.unwrap();
        for (index, fohs, text) in rows {
            store
                .insert(&NewScripture {
                    scripture_index: index.to_string(),
                    fohs_key: "LOVE".to_string(),
                    fohs: fohs.to_string(),
                    text: text.to_string(),
                })
                .await
                .unwrap();
        }
        store
    }

    #[test]
    fn test_tag_pattern_escapes_glob_metacharacters() {
        assert_eq!(tag_pattern("FSPAN"), "*FSPAN)");
        assert_eq!(tag_pattern("F*?[X"), "*F[*][?][[]X)");
    }

    #[tokio::test]
    async fn test_whitespace_only_language_key_is_missing() {
        let tmp = TempDir::new().unwrap();
        let store = store_with(
            &tmp,
            &[
                ("(1 John 4:8 FSPAN)", "Amor", "Dios es amor"),
                ("(John 3:16 FSPAN)", "Amor", "Porque de tal manera"),
                ("(John 1:1 FSPAN)", "Amor", "En el principio"),
            ],
        )
        .await;
        store.set_language_key(1, "\n\t").await.unwrap();
        store.set_language_key(2, "(Juan 3:16 FSPAN)").await.unwrap();
        store.set_language_key(3, "\u{a0}").await.unwrap();

        let missing = store
            .scan(&RowFilter::MissingLanguage, Order::IdAsc, None)
            .await
            .unwrap();
        let ids: Vec<i64> = missing.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(missing
            .iter()
            .all(|r| crate::models::is_blank(r.language_key.as_deref())));
    }

    #[tokio::test]
    async fn test_whitespace_only_text_is_incomplete() {
        let tmp = TempDir::new().unwrap();
        let store = store_with(
            &tmp,
            &[
                ("(1 John 4:8 WEBUS)", "Love", "\n"),
                ("(John 3:16 WEBUS)", "\t ", "For God so loved the world"),
                ("(John 1:1 WEBUS)", "Love", "In the beginning"),
                ("(1 John 4:8 FSPAN)", "Amor", "\r\n"),
            ],
        )
        .await;

        let all = store.count(&RowFilter::Incomplete(None)).await.unwrap();
        assert_eq!(all, 3);

        let rows = store
            .scan(
                &RowFilter::Incomplete(Some("WEBUS".to_string())),
                Order::IdAsc,
                None,
            )
            .await
            .unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(rows.iter().all(|r| !r.is_complete()));
    }

    #[tokio::test]
    async fn test_version_tag_matches_literally() {
        let tmp = TempDir::new().unwrap();
        let store = store_with(
            &tmp,
            &[
                ("(John 3:16 FSPAN)", "Amor", "Porque de tal manera"),
                ("(John 3:16 WEBUS)", "Love", "For God so loved"),
                ("(John 3:16 XFSPAN)", "Amor", "Porque"),
            ],
        )
        .await;

        let tagged = |tag: &str| RowFilter::VersionTag(tag.to_string());
        assert_eq!(store.count(&tagged("FS_AN")).await.unwrap(), 0);
        assert_eq!(store.count(&tagged("FS%")).await.unwrap(), 0);
        assert_eq!(store.count(&tagged("webus")).await.unwrap(), 0);
        assert_eq!(store.count(&tagged("F?PAN")).await.unwrap(), 0);
        assert_eq!(store.count(&tagged("WEBUS")).await.unwrap(), 1);
        // Tag match is by suffix, so a longer tag ending the same way counts.
        assert_eq!(store.count(&tagged("FSPAN")).await.unwrap(), 2);

        assert!(store.fohs_keys_for("FS_AN").await.unwrap().is_empty());
        assert_eq!(store.fohs_keys_for("WEBUS").await.unwrap(), vec!["LOVE"]);

        let mentions = |text: &str| RowFilter::Mentions(text.to_string());
        assert_eq!(store.count(&mentions("3:16 W")).await.unwrap(), 1);
        assert_eq!(store.count(&mentions("%")).await.unwrap(), 0);
        assert_eq!(store.count(&mentions("John_3")).await.unwrap(), 0);
    }
}
