use std::sync::Arc;

use driftwood_core::{
    Authenticator, Config, Reconciler, SanitizedConfig, TokenService, TorrentCoordinator,
};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    reconciler: Reconciler,
    coordinator: TorrentCoordinator,
    tokens: Arc<TokenService>,
}

impl AppState {
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        reconciler: Reconciler,
        coordinator: TorrentCoordinator,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            config,
            authenticator,
            reconciler,
            coordinator,
            tokens,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn coordinator(&self) -> &TorrentCoordinator {
        &self.coordinator
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }
}
