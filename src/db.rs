use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;

use crate::error::StoreError;

/// How a database file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Create the file (and parent directory) if it does not exist.
    Create,
    /// The file must already exist.
    Existing,
    /// The file must already exist; writes are rejected.
    ReadOnly,
}

pub async fn connect(db_path: &Path, mode: OpenMode) -> Result<SqlitePool, StoreError> {
    match mode {
        OpenMode::Create => {
            // Ensure parent directory exists
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| StoreError::Sqlx(e.into()))?;
                }
            }
        }
        OpenMode::Existing | OpenMode::ReadOnly => {
            if !db_path.is_file() {
                return Err(StoreError::Missing(db_path.to_path_buf()));
            }
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(mode == OpenMode::Create)
        .read_only(mode == OpenMode::ReadOnly);

    // One connection keeps every statement strictly sequential.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    Ok(pool)
}
