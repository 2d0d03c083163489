//! Torrent lifecycle orchestration.
//!
//! The coordinator keeps the engine and the record store consistent across
//! add and remove, and grants file-scope tokens after resolving their scope
//! against both. There is no two-phase commit across the engine/record
//! boundary; instead both sides are idempotent and every operation is safe
//! to re-invoke after a partial failure.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::engine::{EngineClient, EngineError, IngestedTorrent};
use crate::metrics::{TOKENS_ISSUED_TOTAL, TORRENT_ADDS_TOTAL, TORRENT_REMOVALS_TOTAL};
use crate::record::{RecordError, RecordStore, TorrentRecord};
use crate::token::{TokenError, TokenService};

/// Errors from add/remove operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(RecordError),
}

/// Errors from token grants.
#[derive(Debug, Error)]
pub enum GrantError {
    /// Record exists but the engine has no status for it, so the file list
    /// cannot be resolved.
    #[error("Engine reports no status for {hash_string}")]
    EngineFault { hash_string: String },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] RecordError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Outcome of an add operation.
///
/// A duplicate hash is a normal, re-invokable outcome rather than an error:
/// the engine deduplicates identical content on its side, and the record
/// layer enforces one owner record per hash. The engine-side add is never
/// rolled back.
#[derive(Debug, Clone)]
pub enum AddOutcome {
    /// A new record was created for the ingested torrent.
    Created(TorrentRecord),
    /// A record for this content hash already exists (whoever owns it).
    AlreadyExists { hash_string: String },
}

/// Orchestrates add/remove and token grants across the engine, the record
/// store and the token service.
pub struct TorrentCoordinator {
    engine: Arc<dyn EngineClient>,
    records: Arc<dyn RecordStore>,
    tokens: Arc<TokenService>,
}

impl TorrentCoordinator {
    pub fn new(
        engine: Arc<dyn EngineClient>,
        records: Arc<dyn RecordStore>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            engine,
            records,
            tokens,
        }
    }

    /// Add a torrent from a `.torrent` file on disk, owned by `owner_id`.
    pub async fn add_from_file(
        &self,
        owner_id: &str,
        path: &Path,
    ) -> Result<AddOutcome, LifecycleError> {
        let ingested = self.engine.ingest_file(path).await?;
        self.register(owner_id, ingested).await
    }

    /// Add a torrent from a magnet link or remote URL, owned by `owner_id`.
    pub async fn add_from_url(
        &self,
        owner_id: &str,
        uri: &str,
    ) -> Result<AddOutcome, LifecycleError> {
        let ingested = self.engine.ingest_url(uri).await?;
        self.register(owner_id, ingested).await
    }

    /// Engine ingest has already happened; persist the ownership record.
    /// The store's uniqueness constraint resolves racing adds of the same
    /// content: the loser sees AlreadyExists.
    async fn register(
        &self,
        owner_id: &str,
        ingested: IngestedTorrent,
    ) -> Result<AddOutcome, LifecycleError> {
        match self
            .records
            .create(owner_id, &ingested.hash_string, &ingested.name)
            .await
        {
            Ok(record) => {
                TORRENT_ADDS_TOTAL.with_label_values(&["created"]).inc();
                info!(
                    hash_string = %record.hash_string,
                    owner_id,
                    "torrent added"
                );
                Ok(AddOutcome::Created(record))
            }
            Err(RecordError::Conflict(hash_string)) => {
                TORRENT_ADDS_TOTAL
                    .with_label_values(&["already_exists"])
                    .inc();
                debug!(%hash_string, "duplicate add, record already exists");
                Ok(AddOutcome::AlreadyExists { hash_string })
            }
            Err(e) => {
                TORRENT_ADDS_TOTAL.with_label_values(&["failed"]).inc();
                Err(LifecycleError::Store(e))
            }
        }
    }

    /// Remove a torrent. Returns `Ok(false)` when the id is unknown, which
    /// makes a repeated remove a no-op rather than an error.
    ///
    /// Engine stop runs first, record delete second: a crash in between
    /// leaves an orphaned record that a retried remove cleans up, never an
    /// ownerless transfer still running in the engine.
    pub async fn remove(&self, id: i64) -> Result<bool, LifecycleError> {
        let Some(record) = self.records.get(id).await.map_err(LifecycleError::Store)? else {
            TORRENT_REMOVALS_TOTAL.with_label_values(&["not_found"]).inc();
            return Ok(false);
        };

        self.engine.stop(&record.hash_string).await?;
        self.records
            .remove(record.id)
            .await
            .map_err(LifecycleError::Store)?;

        TORRENT_REMOVALS_TOTAL.with_label_values(&["removed"]).inc();
        info!(hash_string = %record.hash_string, "torrent removed");
        Ok(true)
    }

    /// Grant a token scoped to one file of a torrent, addressed by index
    /// into the engine's file list.
    ///
    /// `Ok(None)` covers both an unknown record id and an out-of-range
    /// index; both are resolved before anything is signed.
    pub async fn grant_file_token(
        &self,
        id: i64,
        file_index: usize,
    ) -> Result<Option<String>, GrantError> {
        let Some(record) = self.records.get(id).await? else {
            return Ok(None);
        };

        let stats = self
            .engine
            .stats_for(&record.hash_string)
            .await?
            .ok_or_else(|| GrantError::EngineFault {
                hash_string: record.hash_string.clone(),
            })?;

        let Some(file) = stats.files.get(file_index) else {
            return Ok(None);
        };

        let token = self.tokens.issue(&record.hash_string, &file.name)?;
        TOKENS_ISSUED_TOTAL.with_label_values(&["file"]).inc();
        debug!(hash_string = %record.hash_string, file_index, "file token issued");
        Ok(Some(token))
    }

    /// Grant a token covering the whole torrent. The scope path defaults to
    /// the record's created name when the caller supplies none.
    //
    // TODO: constrain a caller-supplied path to paths enumerable under the
    // torrent; today it is signed as given.
    pub async fn grant_item_token(
        &self,
        id: i64,
        path: Option<String>,
    ) -> Result<Option<String>, GrantError> {
        let Some(record) = self.records.get(id).await? else {
            return Ok(None);
        };

        let scope = path.unwrap_or_else(|| record.created_name.clone());
        let token = self.tokens.issue(&record.hash_string, &scope)?;
        TOKENS_ISSUED_TOTAL.with_label_values(&["item"]).inc();
        debug!(hash_string = %record.hash_string, "item token issued");
        Ok(Some(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SqliteRecordStore;
    use crate::testing::{fixtures, MockEngineClient};

    struct Harness {
        records: Arc<SqliteRecordStore>,
        engine: Arc<MockEngineClient>,
        tokens: Arc<TokenService>,
        coordinator: TorrentCoordinator,
    }

    fn harness() -> Harness {
        let records = Arc::new(SqliteRecordStore::in_memory().unwrap());
        let engine = Arc::new(MockEngineClient::new());
        let tokens = Arc::new(TokenService::new("unit-test-signing-key-0123456789"));
        let coordinator = TorrentCoordinator::new(
            Arc::clone(&engine) as Arc<dyn EngineClient>,
            Arc::clone(&records) as Arc<dyn RecordStore>,
            Arc::clone(&tokens),
        );
        Harness {
            records,
            engine,
            tokens,
            coordinator,
        }
    }

    #[tokio::test]
    async fn test_add_from_url_creates_record_with_engine_identity() {
        let h = harness();
        h.engine.script_ingest("abc123", "Foo").await;

        let outcome = h
            .coordinator
            .add_from_url("alice", "magnet:?xt=urn:btih:abc123")
            .await
            .unwrap();

        let record = match outcome {
            AddOutcome::Created(r) => r,
            other => panic!("expected Created, got {:?}", other),
        };
        assert_eq!(record.hash_string, "abc123");
        assert_eq!(record.created_name, "Foo");
        assert_eq!(record.owner_id, "alice");
    }

    #[tokio::test]
    async fn test_duplicate_add_reports_existing_without_rollback() {
        let h = harness();
        h.engine.script_ingest("abc123", "Foo").await;

        h.coordinator
            .add_from_url("alice", "magnet:?xt=urn:btih:abc123")
            .await
            .unwrap();

        h.engine.script_ingest("abc123", "Foo").await;
        let outcome = h
            .coordinator
            .add_from_url("bob", "magnet:?xt=urn:btih:abc123")
            .await
            .unwrap();

        assert!(
            matches!(outcome, AddOutcome::AlreadyExists { ref hash_string } if hash_string == "abc123")
        );

        // One record, the original owner's; the engine still tracks the
        // torrent (no rollback of the harmless duplicate ingest).
        let all = h.records.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].owner_id, "alice");
        assert!(h.engine.stats_for("abc123").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remove_stops_engine_then_deletes_record() {
        let h = harness();
        h.engine.script_ingest("abc123", "Foo").await;

        let record = match h
            .coordinator
            .add_from_url("alice", "magnet:?xt=urn:btih:abc123")
            .await
            .unwrap()
        {
            AddOutcome::Created(r) => r,
            other => panic!("expected Created, got {:?}", other),
        };

        assert!(h.coordinator.remove(record.id).await.unwrap());
        assert_eq!(h.engine.stopped().await, vec!["abc123".to_string()]);
        assert!(h.records.get(record.id).await.unwrap().is_none());

        // Second remove is a clean not-found.
        assert!(!h.coordinator.remove(record.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_engine_stop_keeps_record() {
        let h = harness();
        h.engine.script_ingest("abc123", "Foo").await;

        let record = match h
            .coordinator
            .add_from_url("alice", "magnet:?xt=urn:btih:abc123")
            .await
            .unwrap()
        {
            AddOutcome::Created(r) => r,
            other => panic!("expected Created, got {:?}", other),
        };

        h.engine.fail_next(EngineError::Timeout).await;
        assert!(h.coordinator.remove(record.id).await.is_err());

        // The record survives the partial failure; a retry finishes the job.
        assert!(h.records.get(record.id).await.unwrap().is_some());
        assert!(h.coordinator.remove(record.id).await.unwrap());
        assert!(h.records.get(record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_unknown_id_is_not_found() {
        let h = harness();
        assert!(!h.coordinator.remove(999).await.unwrap());
        assert!(h.engine.stopped().await.is_empty());
    }

    #[tokio::test]
    async fn test_grant_file_token_resolves_path_from_engine() {
        let h = harness();
        h.engine.script_ingest("abc123", "Foo").await;
        h.engine.set_stats(fixtures::stats("abc123", "Foo", 0.5)).await;

        let record = match h
            .coordinator
            .add_from_url("alice", "magnet:?xt=urn:btih:abc123")
            .await
            .unwrap()
        {
            AddOutcome::Created(r) => r,
            other => panic!("expected Created, got {:?}", other),
        };

        let token = h
            .coordinator
            .grant_file_token(record.id, 0)
            .await
            .unwrap()
            .unwrap();

        let grant = h.tokens.verify(&token).unwrap();
        assert_eq!(grant.hash_string, "abc123");
        assert_eq!(grant.file_path, "Foo/file0");
    }

    #[tokio::test]
    async fn test_grant_file_token_out_of_range_index_is_none() {
        let h = harness();
        h.engine.script_ingest("abc123", "Foo").await;
        h.engine.set_stats(fixtures::stats("abc123", "Foo", 0.5)).await;

        let record = match h
            .coordinator
            .add_from_url("alice", "magnet:?xt=urn:btih:abc123")
            .await
            .unwrap()
        {
            AddOutcome::Created(r) => r,
            other => panic!("expected Created, got {:?}", other),
        };

        assert!(h
            .coordinator
            .grant_file_token(record.id, 99)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_grant_file_token_unknown_record_is_none() {
        let h = harness();
        assert!(h.coordinator.grant_file_token(999, 0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_grant_file_token_without_engine_status_is_fault() {
        let h = harness();
        h.engine.script_ingest("abc123", "Foo").await;

        let record = match h
            .coordinator
            .add_from_url("alice", "magnet:?xt=urn:btih:abc123")
            .await
            .unwrap()
        {
            AddOutcome::Created(r) => r,
            other => panic!("expected Created, got {:?}", other),
        };

        // Engine forgot the torrent (restart); the file list is unresolvable.
        h.engine.clear_stats("abc123").await;

        let err = h.coordinator.grant_file_token(record.id, 0).await.unwrap_err();
        assert!(
            matches!(err, GrantError::EngineFault { ref hash_string } if hash_string == "abc123")
        );
    }

    #[tokio::test]
    async fn test_grant_item_token_defaults_to_created_name() {
        let h = harness();
        h.engine.script_ingest("abc123", "Foo").await;

        let record = match h
            .coordinator
            .add_from_url("alice", "magnet:?xt=urn:btih:abc123")
            .await
            .unwrap()
        {
            AddOutcome::Created(r) => r,
            other => panic!("expected Created, got {:?}", other),
        };

        let token = h
            .coordinator
            .grant_item_token(record.id, None)
            .await
            .unwrap()
            .unwrap();
        let grant = h.tokens.verify(&token).unwrap();
        assert_eq!(grant.file_path, "Foo");

        let token = h
            .coordinator
            .grant_item_token(record.id, Some("Foo/sub".to_string()))
            .await
            .unwrap()
            .unwrap();
        let grant = h.tokens.verify(&token).unwrap();
        assert_eq!(grant.file_path, "Foo/sub");
    }
}
