//! Durable tag list: a small SQLite store holding the working record list
//! between runs. Records are stored as JSON rows (pictures as data URIs),
//! position-ordered.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, params};
use tracing::debug;

use crate::types::TagRecord;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("failed to create store directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid tag record JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Store location: `TAGDECK_STORE_PATH` if set, otherwise the platform
/// data directory.
pub fn default_path() -> PathBuf {
    if let Ok(path) = std::env::var("TAGDECK_STORE_PATH") {
        return PathBuf::from(path);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tagdeck")
        .join("taglist.sqlite3")
}

pub fn open(path: &Path) -> Result<Connection, StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
            path: parent.display().to_string(),
            source,
        })?;
    }
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    migrate(&conn)?;
    Ok(conn)
}

fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS tag_list (
            position    INTEGER PRIMARY KEY,
            path        TEXT NOT NULL,
            fields_json TEXT NOT NULL
        );
        PRAGMA user_version = 1;",
    )
}

/// Replace the stored list with `records`, in one transaction.
pub fn save_tag_list(conn: &mut Connection, records: &[TagRecord]) -> Result<(), StoreError> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM tag_list", [])?;
    for (position, record) in records.iter().enumerate() {
        let fields_json = serde_json::to_string(record)?;
        tx.execute(
            "INSERT INTO tag_list (position, path, fields_json) VALUES (?1, ?2, ?3)",
            params![position as i64, record.path().unwrap_or(""), fields_json],
        )?;
    }
    tx.commit()?;
    debug!(count = records.len(), "saved tag list");
    Ok(())
}

/// Load the stored list in saved order.
pub fn load_tag_list(conn: &Connection) -> Result<Vec<TagRecord>, StoreError> {
    let mut stmt = conn.prepare("SELECT fields_json FROM tag_list ORDER BY position")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut records = Vec::new();
    for row in rows {
        records.push(serde_json::from_str(&row?)?);
    }
    Ok(records)
}
