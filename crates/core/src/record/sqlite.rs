//! SQLite-backed record store implementation.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode};

use super::{RecordError, RecordStore, TorrentRecord};

/// SQLite-backed record store.
///
/// The `UNIQUE` constraint on `hash_string` is the serialization point for
/// concurrent adds of the same content: the loser observes a Conflict.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Open (or create) the database file and ensure the schema exists.
    pub fn new(path: &Path) -> Result<Self, RecordError> {
        let conn = Connection::open(path).map_err(|e| RecordError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, useful for testing.
    pub fn in_memory() -> Result<Self, RecordError> {
        let conn =
            Connection::open_in_memory().map_err(|e| RecordError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), RecordError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS torrent_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                hash_string TEXT NOT NULL UNIQUE,
                created_name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_torrent_records_owner ON torrent_records(owner_id);
            "#,
        )
        .map_err(|e| RecordError::Database(e.to_string()))?;

        Ok(())
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<TorrentRecord> {
        let id: i64 = row.get(0)?;
        let owner_id: String = row.get(1)?;
        let hash_string: String = row.get(2)?;
        let created_name: String = row.get(3)?;
        let created_at_str: String = row.get(4)?;

        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(TorrentRecord {
            id,
            owner_id,
            hash_string,
            created_name,
            created_at,
        })
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn get_all(&self) -> Result<Vec<TorrentRecord>, RecordError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT id, owner_id, hash_string, created_name, created_at
                 FROM torrent_records ORDER BY id",
            )
            .map_err(|e| RecordError::Database(e.to_string()))?;

        let records = stmt
            .query_map([], Self::row_to_record)
            .map_err(|e| RecordError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RecordError::Database(e.to_string()))?;

        Ok(records)
    }

    async fn get(&self, id: i64) -> Result<Option<TorrentRecord>, RecordError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT id, owner_id, hash_string, created_name, created_at
                 FROM torrent_records WHERE id = ?1",
            )
            .map_err(|e| RecordError::Database(e.to_string()))?;

        let mut rows = stmt
            .query_map(params![id], Self::row_to_record)
            .map_err(|e| RecordError::Database(e.to_string()))?;

        match rows.next() {
            Some(Ok(record)) => Ok(Some(record)),
            Some(Err(e)) => Err(RecordError::Database(e.to_string())),
            None => Ok(None),
        }
    }

    async fn create(
        &self,
        owner_id: &str,
        hash_string: &str,
        name: &str,
    ) -> Result<TorrentRecord, RecordError> {
        let conn = self.conn.lock().unwrap();
        let created_at = Utc::now();

        conn.execute(
            "INSERT INTO torrent_records (owner_id, hash_string, created_name, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![owner_id, hash_string, name, created_at.to_rfc3339()],
        )
        .map_err(|e| match &e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == ErrorCode::ConstraintViolation =>
            {
                RecordError::Conflict(hash_string.to_string())
            }
            _ => RecordError::Database(e.to_string()),
        })?;

        Ok(TorrentRecord {
            id: conn.last_insert_rowid(),
            owner_id: owner_id.to_string(),
            hash_string: hash_string.to_string(),
            created_name: name.to_string(),
            created_at,
        })
    }

    async fn remove(&self, id: i64) -> Result<bool, RecordError> {
        let conn = self.conn.lock().unwrap();

        let deleted = conn
            .execute("DELETE FROM torrent_records WHERE id = ?1", params![id])
            .map_err(|e| RecordError::Database(e.to_string()))?;

        Ok(deleted > 0)
    }
}
