//! Types for download engine operations.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to the download engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Engine rejected credentials: {0}")]
    Unauthorized(String),

    #[error("Invalid torrent data: {0}")]
    InvalidTorrent(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// What the engine is currently doing with a torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentActivity {
    /// No transfer in progress.
    Stopped,
    /// Verifying file integrity.
    Checking,
    /// Waiting for a download or seed slot.
    Queued,
    /// Downloading from peers.
    Downloading,
    /// Seeding to peers.
    Seeding,
    /// Engine reported a state this system does not model.
    Unknown,
}

impl TorrentActivity {
    /// String representation used in API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentActivity::Stopped => "stopped",
            TorrentActivity::Checking => "checking",
            TorrentActivity::Queued => "queued",
            TorrentActivity::Downloading => "downloading",
            TorrentActivity::Seeding => "seeding",
            TorrentActivity::Unknown => "unknown",
        }
    }
}

/// One file inside a torrent, in the engine's declared order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path of the file relative to the torrent's download directory.
    pub name: String,
    /// Total size in bytes.
    pub size_bytes: u64,
    /// Completion fraction (0.0 - 1.0).
    pub progress: f64,
}

/// Live status of one torrent as reported by the engine.
///
/// Keyed by `hash_string`; the engine is authoritative for every field here.
/// Nothing in this struct is persisted, it is re-fetched per query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    /// Info hash (lowercase hex).
    pub hash_string: String,
    /// Torrent name as the engine knows it.
    pub name: String,
    /// Current activity.
    pub activity: TorrentActivity,
    /// Total size in bytes.
    pub total_size: u64,
    /// Download progress (0.0 - 1.0).
    pub percent_done: f64,
    /// Bytes ever downloaded (includes discarded data).
    pub downloaded_bytes: u64,
    /// Bytes ever uploaded.
    pub uploaded_bytes: u64,
    /// Verified bytes currently on disk.
    pub bytes_completed: u64,
    /// Current download speed in bytes/second.
    pub rate_download: u64,
    /// Current upload speed in bytes/second.
    pub rate_upload: u64,
    /// Files in the torrent, in the engine's order.
    pub files: Vec<FileEntry>,
}

/// Result of handing a torrent to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestedTorrent {
    /// Engine-assigned info hash.
    pub hash_string: String,
    /// Display name the engine derived from the metadata.
    pub name: String,
}

/// Trait for download engine backends.
///
/// All calls go over the network and may be slow; no timeout beyond the
/// backend's own HTTP timeout is imposed here. Implementations must be
/// substitutable with a test double.
#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Check that the engine is reachable and accepts our credentials.
    async fn probe(&self) -> Result<(), EngineError>;

    /// Live status of every torrent the engine currently tracks.
    async fn stats_for_all(&self) -> Result<Vec<EngineStats>, EngineError>;

    /// Live status of one torrent.
    ///
    /// `Ok(None)` means the engine does not track this hash. That is a
    /// representable state, not an error: the engine may have restarted or
    /// the hash may be stale.
    async fn stats_for(&self, hash_string: &str) -> Result<Option<EngineStats>, EngineError>;

    /// Hand a `.torrent` file on disk to the engine.
    ///
    /// Re-adding content the engine already tracks is not an error; the
    /// engine deduplicates by hash and reports the existing torrent.
    async fn ingest_file(&self, path: &Path) -> Result<IngestedTorrent, EngineError>;

    /// Hand a magnet link or remote `.torrent` URL to the engine.
    async fn ingest_url(&self, uri: &str) -> Result<IngestedTorrent, EngineError>;

    /// Stop and drop a torrent from the engine.
    ///
    /// Stopping a hash the engine does not track must succeed, so that a
    /// failed remove can be retried.
    async fn stop(&self, hash_string: &str) -> Result<(), EngineError>;
}
