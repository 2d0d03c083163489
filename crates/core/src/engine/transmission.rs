//! Transmission RPC engine implementation.
//!
//! Talks to a `transmission-daemon` over its JSON-RPC endpoint. Transmission
//! uses a CSRF session header: the first request gets a 409 carrying the
//! session id, which is then replayed on every call until it expires.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::EngineConfig;

use super::{
    EngineClient, EngineError, EngineStats, FileEntry, IngestedTorrent, TorrentActivity,
};

const SESSION_HEADER: &str = "X-Transmission-Session-Id";

/// Fields requested from `torrent-get`. Kept in one place so list and
/// single-torrent queries return the same shape.
const TORRENT_FIELDS: &[&str] = &[
    "hashString",
    "name",
    "status",
    "totalSize",
    "percentDone",
    "downloadedEver",
    "uploadedEver",
    "rateDownload",
    "rateUpload",
    "files",
];

/// Transmission RPC client.
pub struct TransmissionEngine {
    client: Client,
    config: EngineConfig,
    /// CSRF session id (refreshed on 409).
    session_id: RwLock<Option<String>>,
}

impl TransmissionEngine {
    /// Create a new Transmission client from configuration.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| EngineError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            config,
            session_id: RwLock::new(None),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/transmission/rpc", self.config.url.trim_end_matches('/'))
    }

    async fn send_raw(
        &self,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, EngineError> {
        let mut request = self.client.post(self.endpoint()).json(body);

        if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            request = request.basic_auth(user, Some(pass));
        }

        if let Some(session) = self.session_id.read().await.as_deref() {
            request = request.header(SESSION_HEADER, session);
        }

        request.send().await.map_err(|e| {
            if e.is_timeout() {
                EngineError::Timeout
            } else if e.is_connect() {
                EngineError::ConnectionFailed(e.to_string())
            } else {
                EngineError::Rpc(e.to_string())
            }
        })
    }

    /// Issue one RPC call, transparently handling the 409 session handshake.
    async fn rpc<T: DeserializeOwned>(
        &self,
        method: &str,
        arguments: serde_json::Value,
    ) -> Result<T, EngineError> {
        let body = json!({ "method": method, "arguments": arguments });

        let mut response = self.send_raw(&body).await?;

        if response.status() == StatusCode::CONFLICT {
            let session = response
                .headers()
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| {
                    EngineError::Rpc("409 without a session id header".to_string())
                })?;

            debug!(method, "transmission session refreshed");
            *self.session_id.write().await = Some(session);
            response = self.send_raw(&body).await?;
        }

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(EngineError::Unauthorized(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(EngineError::Rpc(format!("HTTP {}", status)));
        }

        let envelope: RpcEnvelope<T> = response
            .json()
            .await
            .map_err(|e| EngineError::Rpc(e.to_string()))?;

        if envelope.result != "success" {
            return Err(EngineError::Rpc(envelope.result));
        }

        envelope
            .arguments
            .ok_or_else(|| EngineError::Rpc("response carried no arguments".to_string()))
    }

    async fn ingest(&self, arguments: serde_json::Value) -> Result<IngestedTorrent, EngineError> {
        let added: TorrentAddArgs = self.rpc("torrent-add", arguments).await?;

        // Transmission reports an already-tracked torrent under a separate
        // key; either way we get the hash and name back.
        let torrent = added.added.or(added.duplicate).ok_or_else(|| {
            EngineError::Rpc("torrent-add returned neither added nor duplicate".to_string())
        })?;

        Ok(IngestedTorrent {
            hash_string: torrent.hash_string,
            name: torrent.name,
        })
    }
}

#[async_trait]
impl EngineClient for TransmissionEngine {
    fn name(&self) -> &str {
        "transmission"
    }

    async fn probe(&self) -> Result<(), EngineError> {
        let _: serde_json::Value = self.rpc("session-get", json!({})).await?;
        Ok(())
    }

    async fn stats_for_all(&self) -> Result<Vec<EngineStats>, EngineError> {
        let args: TorrentGetArgs = self
            .rpc("torrent-get", json!({ "fields": TORRENT_FIELDS }))
            .await?;

        Ok(args.torrents.into_iter().map(RpcTorrent::into_stats).collect())
    }

    async fn stats_for(&self, hash_string: &str) -> Result<Option<EngineStats>, EngineError> {
        let args: TorrentGetArgs = self
            .rpc(
                "torrent-get",
                json!({ "ids": [hash_string], "fields": TORRENT_FIELDS }),
            )
            .await?;

        // Transmission silently omits ids it does not track.
        Ok(args.torrents.into_iter().next().map(RpcTorrent::into_stats))
    }

    async fn ingest_file(&self, path: &Path) -> Result<IngestedTorrent, EngineError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| EngineError::InvalidTorrent(format!("{}: {}", path.display(), e)))?;

        self.ingest(json!({ "metainfo": BASE64.encode(&data) })).await
    }

    async fn ingest_url(&self, uri: &str) -> Result<IngestedTorrent, EngineError> {
        self.ingest(json!({ "filename": uri })).await
    }

    async fn stop(&self, hash_string: &str) -> Result<(), EngineError> {
        // torrent-remove on an unknown id succeeds, which keeps remove
        // retryable after a crash between engine stop and record delete.
        let _: serde_json::Value = self
            .rpc(
                "torrent-remove",
                json!({ "ids": [hash_string], "delete-local-data": false }),
            )
            .await?;

        info!(hash_string, "torrent stopped and dropped from engine");
        Ok(())
    }
}

// ============================================================================
// RPC wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    result: String,
    arguments: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TorrentGetArgs {
    #[serde(default)]
    torrents: Vec<RpcTorrent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTorrent {
    hash_string: String,
    name: String,
    status: i64,
    total_size: u64,
    percent_done: f64,
    downloaded_ever: u64,
    uploaded_ever: u64,
    rate_download: u64,
    rate_upload: u64,
    #[serde(default)]
    files: Vec<RpcFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcFile {
    name: String,
    length: u64,
    bytes_completed: u64,
}

#[derive(Debug, Deserialize)]
struct TorrentAddArgs {
    #[serde(rename = "torrent-added")]
    added: Option<RpcAddedTorrent>,
    #[serde(rename = "torrent-duplicate")]
    duplicate: Option<RpcAddedTorrent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcAddedTorrent {
    hash_string: String,
    name: String,
}

impl RpcTorrent {
    fn into_stats(self) -> EngineStats {
        let bytes_completed = if self.files.is_empty() {
            self.downloaded_ever
        } else {
            self.files.iter().map(|f| f.bytes_completed).sum()
        };

        let files = self
            .files
            .into_iter()
            .map(|f| FileEntry {
                progress: if f.length > 0 {
                    f.bytes_completed as f64 / f.length as f64
                } else {
                    1.0
                },
                name: f.name,
                size_bytes: f.length,
            })
            .collect();

        EngineStats {
            activity: activity_from_status(self.status),
            hash_string: self.hash_string,
            name: self.name,
            total_size: self.total_size,
            percent_done: self.percent_done,
            downloaded_bytes: self.downloaded_ever,
            uploaded_bytes: self.uploaded_ever,
            bytes_completed,
            rate_download: self.rate_download,
            rate_upload: self.rate_upload,
            files,
        }
    }
}

/// Map Transmission's numeric status codes to activities.
fn activity_from_status(status: i64) -> TorrentActivity {
    match status {
        0 => TorrentActivity::Stopped,
        1 | 2 => TorrentActivity::Checking,
        3 | 5 => TorrentActivity::Queued,
        4 => TorrentActivity::Downloading,
        6 => TorrentActivity::Seeding,
        _ => TorrentActivity::Unknown,
    }
}
