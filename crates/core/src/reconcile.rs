//! Merging persisted records with live engine status.
//!
//! The engine is the source of truth for everything about a transfer; the
//! record store is the source of truth for identity and ownership. The two
//! never claim the same field, so the merge is a plain union keyed by
//! content hash.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::engine::{EngineClient, EngineError, EngineStats, FileEntry, TorrentActivity};
use crate::record::{RecordError, RecordStore, TorrentRecord};

/// Errors that can occur while building a merged view.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A record exists but the engine reports no status for its hash. The
    /// engine may have restarted or the hash may be stale; either way this
    /// is a data-consistency fault, not a user error, and it must not be
    /// papered over with zeroed fields or a silently shortened listing.
    #[error("Engine reports no status for {hash_string}")]
    EngineFault { hash_string: String },

    #[error(transparent)]
    Store(#[from] RecordError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Request-scoped union of one record and its engine status.
#[derive(Debug, Clone, Serialize)]
pub struct MergedTorrentView {
    // Identity, from the record.
    pub id: i64,
    pub owner_id: String,
    pub hash_string: String,
    pub created_at: chrono::DateTime<chrono::Utc>,

    // Everything below comes from the engine and overwrites whatever was
    // captured at creation time.
    pub name: String,
    pub activity: TorrentActivity,
    pub total_size: u64,
    pub percent_done: f64,
    pub downloaded_bytes: u64,
    pub uploaded_bytes: u64,
    pub bytes_completed: u64,
    pub rate_download: u64,
    pub rate_upload: u64,
    pub files: Vec<FileEntry>,
}

fn merge(record: TorrentRecord, stats: EngineStats) -> MergedTorrentView {
    MergedTorrentView {
        id: record.id,
        owner_id: record.owner_id,
        hash_string: record.hash_string,
        created_at: record.created_at,
        name: stats.name,
        activity: stats.activity,
        total_size: stats.total_size,
        percent_done: stats.percent_done,
        downloaded_bytes: stats.downloaded_bytes,
        uploaded_bytes: stats.uploaded_bytes,
        bytes_completed: stats.bytes_completed,
        rate_download: stats.rate_download,
        rate_upload: stats.rate_upload,
        files: stats.files,
    }
}

/// Combines record store entries with engine status snapshots.
///
/// Stateless and read-only: every call re-fetches both sides.
pub struct Reconciler {
    records: Arc<dyn RecordStore>,
    engine: Arc<dyn EngineClient>,
}

impl Reconciler {
    pub fn new(records: Arc<dyn RecordStore>, engine: Arc<dyn EngineClient>) -> Self {
        Self { records, engine }
    }

    /// Merged view of every record.
    ///
    /// Records and engine stats are fetched concurrently; there is no
    /// ordering dependency between the two queries. Any record whose hash
    /// the engine does not report fails the whole call.
    pub async fn list_merged(&self) -> Result<Vec<MergedTorrentView>, ReconcileError> {
        let (records, stats) =
            tokio::join!(self.records.get_all(), self.engine.stats_for_all());
        let records = records?;
        let stats = stats?;

        let mut by_hash: HashMap<String, EngineStats> = stats
            .into_iter()
            .map(|s| (s.hash_string.clone(), s))
            .collect();

        records
            .into_iter()
            .map(|record| {
                let stats = by_hash.remove(&record.hash_string).ok_or_else(|| {
                    ReconcileError::EngineFault {
                        hash_string: record.hash_string.clone(),
                    }
                })?;
                Ok(merge(record, stats))
            })
            .collect()
    }

    /// Merged view of one record, or `None` when the id is unknown.
    ///
    /// An unknown id and a missing engine status are different outcomes:
    /// the first is a plain not-found, the second an upstream fault.
    pub async fn get_merged(
        &self,
        id: i64,
    ) -> Result<Option<MergedTorrentView>, ReconcileError> {
        let Some(record) = self.records.get(id).await? else {
            return Ok(None);
        };

        let stats = self
            .engine
            .stats_for(&record.hash_string)
            .await?
            .ok_or_else(|| ReconcileError::EngineFault {
                hash_string: record.hash_string.clone(),
            })?;

        Ok(Some(merge(record, stats)))
    }
}
