pub mod auth;
pub mod config;
pub mod engine;
pub mod lifecycle;
pub mod metrics;
pub mod reconcile;
pub mod record;
pub mod testing;
pub mod token;

pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthContext, AuthError, Authenticator,
    NoneAuthenticator, Principal,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthConfig, AuthMethod, Config,
    ConfigError, DatabaseConfig, EngineConfig, SanitizedConfig, ServerConfig, TokenConfig,
};
pub use engine::{
    EngineClient, EngineError, EngineStats, FileEntry, IngestedTorrent, TorrentActivity,
    TransmissionEngine,
};
pub use lifecycle::{AddOutcome, GrantError, LifecycleError, TorrentCoordinator};
pub use reconcile::{MergedTorrentView, ReconcileError, Reconciler};
pub use record::{RecordError, RecordStore, SqliteRecordStore, TorrentRecord};
pub use token::{FileGrant, TokenError, TokenService, TOKEN_TTL_HOURS};
