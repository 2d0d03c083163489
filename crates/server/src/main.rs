use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use driftwood_core::{
    create_authenticator, load_config, validate_config, Authenticator, EngineClient, Reconciler,
    RecordStore, SqliteRecordStore, TokenService, TorrentCoordinator, TransmissionEngine,
};

use driftwood_server::api::create_router;
use driftwood_server::state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("DRIFTWOOD_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Auth method: {}", config.auth.method.as_str());
    info!("Database path: {:?}", config.database.path);
    info!("Engine URL: {}", config.engine.url);

    // Create authenticator
    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    // Create record store
    let records: Arc<dyn RecordStore> = Arc::new(
        SqliteRecordStore::new(&config.database.path)
            .context("Failed to create record store")?,
    );
    info!("Record store initialized");

    // Create engine client
    let engine: Arc<dyn EngineClient> = Arc::new(
        TransmissionEngine::new(config.engine.clone())
            .context("Failed to create engine client")?,
    );

    // An unreachable engine is not fatal at boot: records stay serviceable
    // and listing surfaces the fault per request.
    match engine.probe().await {
        Ok(()) => info!("Engine reachable ({})", engine.name()),
        Err(e) => warn!("Engine not reachable at startup: {}", e),
    }

    // Create token service
    let tokens = Arc::new(TokenService::new(&config.token.signing_key));

    // Wire up the core
    let reconciler = Reconciler::new(Arc::clone(&records), Arc::clone(&engine));
    let coordinator = TorrentCoordinator::new(
        Arc::clone(&engine),
        Arc::clone(&records),
        Arc::clone(&tokens),
    );

    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        reconciler,
        coordinator,
        tokens,
    ));

    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
