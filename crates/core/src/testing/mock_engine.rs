//! Mock download engine for testing.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::engine::{EngineClient, EngineError, EngineStats, IngestedTorrent};

use super::fixtures;

/// Mock implementation of the [`EngineClient`] trait.
///
/// Behavior is scripted per test:
/// - `script_ingest` sets what the next ingest reports back
/// - `set_stats` / `clear_stats` control what stats queries see
/// - `fail_next` makes the next call fail with a given error
/// - `stopped` / `ingested` expose recorded calls for assertions
#[derive(Debug, Default)]
pub struct MockEngineClient {
    /// Stats by hash, what the "daemon" currently tracks.
    torrents: Arc<RwLock<HashMap<String, EngineStats>>>,
    /// Queued results for upcoming ingest calls.
    pending_ingests: Arc<RwLock<Vec<IngestedTorrent>>>,
    /// If set, the next operation fails with this error.
    next_error: Arc<RwLock<Option<EngineError>>>,
    /// Hashes passed to `stop`, in call order.
    stops: Arc<RwLock<Vec<String>>>,
    /// URIs and paths passed to ingest calls, in call order.
    ingests: Arc<RwLock<Vec<String>>>,
    /// Counter for generated hashes when no ingest is scripted.
    counter: Arc<RwLock<u32>>,
}

impl MockEngineClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the identity the next ingest call reports.
    pub async fn script_ingest(&self, hash_string: &str, name: &str) {
        self.pending_ingests.write().await.push(IngestedTorrent {
            hash_string: hash_string.to_string(),
            name: name.to_string(),
        });
    }

    /// Insert or replace the stats the engine reports for a hash.
    pub async fn set_stats(&self, stats: EngineStats) {
        self.torrents
            .write()
            .await
            .insert(stats.hash_string.clone(), stats);
    }

    /// Forget a hash, as if the daemon restarted without it.
    pub async fn clear_stats(&self, hash_string: &str) {
        self.torrents.write().await.remove(hash_string);
    }

    /// Make the next operation fail.
    pub async fn fail_next(&self, error: EngineError) {
        *self.next_error.write().await = Some(error);
    }

    /// Hashes stopped so far.
    pub async fn stopped(&self) -> Vec<String> {
        self.stops.read().await.clone()
    }

    /// Ingest inputs (paths and URIs) seen so far.
    pub async fn ingested(&self) -> Vec<String> {
        self.ingests.read().await.clone()
    }

    async fn take_error(&self) -> Result<(), EngineError> {
        match self.next_error.write().await.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn ingest(&self, input: String) -> Result<IngestedTorrent, EngineError> {
        self.take_error().await?;
        self.ingests.write().await.push(input);

        let ingested = {
            let mut pending = self.pending_ingests.write().await;
            if pending.is_empty() {
                let mut counter = self.counter.write().await;
                *counter += 1;
                IngestedTorrent {
                    hash_string: format!("{:040x}", *counter),
                    name: format!("mock-torrent-{}", *counter),
                }
            } else {
                pending.remove(0)
            }
        };

        // Mirror a real daemon: an ingested torrent shows up in stats.
        let mut torrents = self.torrents.write().await;
        torrents
            .entry(ingested.hash_string.clone())
            .or_insert_with(|| fixtures::stats(&ingested.hash_string, &ingested.name, 0.0));

        Ok(ingested)
    }
}

#[async_trait]
impl EngineClient for MockEngineClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self) -> Result<(), EngineError> {
        self.take_error().await
    }

    async fn stats_for_all(&self) -> Result<Vec<EngineStats>, EngineError> {
        self.take_error().await?;
        Ok(self.torrents.read().await.values().cloned().collect())
    }

    async fn stats_for(&self, hash_string: &str) -> Result<Option<EngineStats>, EngineError> {
        self.take_error().await?;
        Ok(self.torrents.read().await.get(hash_string).cloned())
    }

    async fn ingest_file(&self, path: &Path) -> Result<IngestedTorrent, EngineError> {
        self.ingest(path.display().to_string()).await
    }

    async fn ingest_url(&self, uri: &str) -> Result<IngestedTorrent, EngineError> {
        self.ingest(uri.to_string()).await
    }

    async fn stop(&self, hash_string: &str) -> Result<(), EngineError> {
        self.take_error().await?;
        self.stops.write().await.push(hash_string.to_string());
        // Stopping an untracked hash stays silent, like the real daemon.
        self.torrents.write().await.remove(hash_string);
        Ok(())
    }
}
