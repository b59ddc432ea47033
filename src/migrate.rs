//! Schema creation and the `languageKey` column migration.

use sqlx::{Row, SqlitePool};

pub const TABLE: &str = "scriptures";
pub const LANGUAGE_KEY_COL: &str = "languageKey";

/// Create the `scriptures` table if it does not exist.
pub async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scriptures (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            scriptureIndex TEXT NOT NULL,
            fohsKey TEXT NOT NULL,
            fohs TEXT,
            text TEXT,
            languageKey TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_scriptures_index_key ON scriptures(scriptureIndex, fohsKey)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Column names of a table, in declaration order.
pub async fn columns_of(pool: &SqlitePool, table: &str) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", quote_ident(table)))
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(|r| r.get::<String, _>("name")).collect())
}

pub async fn has_column(pool: &SqlitePool, table: &str, column: &str) -> Result<bool, sqlx::Error> {
    let columns = columns_of(pool, table).await?;
    Ok(columns.iter().any(|c| c.eq_ignore_ascii_case(column)))
}

/// Add `languageKey` to `scriptures`. Returns `false` if it was already there.
pub async fn add_language_column(pool: &SqlitePool) -> Result<bool, sqlx::Error> {
    if has_column(pool, TABLE, LANGUAGE_KEY_COL).await? {
        return Ok(false);
    }

    sqlx::query(&format!(
        "ALTER TABLE {} ADD COLUMN {} TEXT",
        TABLE, LANGUAGE_KEY_COL
    ))
    .execute(pool)
    .await?;

    Ok(true)
}

/// Quote an identifier for interpolation into SQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
