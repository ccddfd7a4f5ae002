//! libSQL-backed local replica and handle storage.

use std::sync::Arc;

use chrono::Utc;
use libsql::{params, Connection};

use super::{HandleStore, LocalStore};
use crate::db::Database;
use crate::error::Result;
use crate::models::Record;

/// Key under which the serialized record is stored
pub const RECORD_KEY: &str = "memo_data";

/// Key under which the remote gist id is cached
pub const GIST_HANDLE_KEY: &str = "gist_id";

/// Local replica stored as one JSON blob in the `replica_state` table.
#[derive(Clone)]
pub struct LibSqlLocalStore {
    db: Arc<Database>,
    key: String,
}

impl LibSqlLocalStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self::with_key(db, RECORD_KEY)
    }

    pub fn with_key(db: Arc<Database>, key: impl Into<String>) -> Self {
        Self {
            db,
            key: key.into(),
        }
    }
}

impl LocalStore for LibSqlLocalStore {
    async fn load(&self) -> Result<Option<Record>> {
        let Some(raw) = get_value(self.db.connection(), &self.key).await? else {
            return Ok(None);
        };
        Record::from_json(&raw).map(Some)
    }

    async fn save(&self, record: &Record) -> Result<()> {
        let raw = record.to_json()?;
        set_value(self.db.connection(), &self.key, &raw).await
    }

    async fn clear(&self) -> Result<()> {
        delete_value(self.db.connection(), &self.key).await
    }
}

/// Remote handle cached next to the local replica.
#[derive(Clone)]
pub struct LibSqlHandleStore {
    db: Arc<Database>,
    key: String,
}

impl LibSqlHandleStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self::with_key(db, GIST_HANDLE_KEY)
    }

    pub fn with_key(db: Arc<Database>, key: impl Into<String>) -> Self {
        Self {
            db,
            key: key.into(),
        }
    }
}

impl HandleStore for LibSqlHandleStore {
    async fn load_handle(&self) -> Result<Option<String>> {
        get_value(self.db.connection(), &self.key).await
    }

    async fn save_handle(&self, handle: &str) -> Result<()> {
        set_value(self.db.connection(), &self.key, handle).await
    }

    async fn clear_handle(&self) -> Result<()> {
        delete_value(self.db.connection(), &self.key).await
    }
}

async fn get_value(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut rows = conn
        .query("SELECT value FROM replica_state WHERE key = ?1", [key])
        .await?;

    if let Some(row) = rows.next().await? {
        Ok(Some(row.get::<String>(0)?))
    } else {
        Ok(None)
    }
}

/// Single-statement upsert; a concurrent reader sees either the old or the
/// new value, never a partial one.
async fn set_value(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO replica_state (key, value, updated_at) VALUES (?1, ?2, ?3)",
        params![key, value, Utc::now().timestamp_millis()],
    )
    .await?;
    Ok(())
}

async fn delete_value(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM replica_state WHERE key = ?1", [key])
        .await?;
    Ok(())
}
