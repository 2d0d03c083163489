//! Request authentication.
//!
//! The authenticated principal is what torrent records get scoped to: the
//! `Principal::id` of whoever adds a torrent becomes its `owner_id`.

mod api_key;
mod none;

pub use api_key::ApiKeyAuthenticator;
pub use none::NoneAuthenticator;

use std::collections::HashMap;
use std::net::IpAddr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{AuthConfig, AuthMethod};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Request material an authenticator may inspect.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Header names lowercased.
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

/// An authenticated caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// Stable identifier; recorded as `owner_id` on created torrents.
    pub id: String,
    /// Which method authenticated this principal.
    pub method: String,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self {
            id: "anonymous".to_string(),
            method: "none".to_string(),
        }
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Authenticate a request and return the calling principal.
    async fn authenticate(&self, context: &AuthContext) -> Result<Principal, AuthError>;

    /// Name of this authentication method.
    fn method_name(&self) -> &'static str;
}

/// Build the authenticator selected by configuration.
pub fn create_authenticator(config: &AuthConfig) -> Result<Box<dyn Authenticator>, AuthError> {
    match config.method {
        AuthMethod::None => Ok(Box::new(NoneAuthenticator::new())),
        AuthMethod::ApiKey => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                AuthError::ConfigurationError(
                    "api_key must be set when using api_key auth".to_string(),
                )
            })?;
            Ok(Box::new(ApiKeyAuthenticator::new(api_key)))
        }
    }
}
