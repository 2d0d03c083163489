//! Persisted torrent ownership records.
//!
//! A record ties a content hash to the principal who added it. It carries no
//! transfer state; that stays in the engine and is merged in at read time.

mod sqlite;

pub use sqlite::SqliteRecordStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during record store operations.
#[derive(Debug, Error)]
pub enum RecordError {
    /// A record for this content hash already exists. There is exactly one
    /// owner record per hash, regardless of who tries to add it again.
    #[error("A record for hash {0} already exists")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Persisted identity and ownership entry for one torrent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentRecord {
    /// Store-assigned identifier.
    pub id: i64,
    /// Principal that created the record.
    pub owner_id: String,
    /// Content hash, unique across all records.
    pub hash_string: String,
    /// Display name captured at creation time. The engine's current name
    /// wins whenever both are available.
    pub created_name: String,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

/// Trait for record storage backends.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All records, oldest first.
    async fn get_all(&self) -> Result<Vec<TorrentRecord>, RecordError>;

    /// One record by id, or `None` if absent.
    async fn get(&self, id: i64) -> Result<Option<TorrentRecord>, RecordError>;

    /// Create a record. Fails with [`RecordError::Conflict`] when a record
    /// with the same hash already exists; the duplicate is never merged.
    async fn create(
        &self,
        owner_id: &str,
        hash_string: &str,
        name: &str,
    ) -> Result<TorrentRecord, RecordError>;

    /// Delete a record by id. Returns whether a record was deleted.
    async fn remove(&self, id: i64) -> Result<bool, RecordError>;
}
