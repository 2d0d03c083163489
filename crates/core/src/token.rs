//! File-scoped capability tokens.
//!
//! A token authorizes retrieval of one file from one torrent for a fixed
//! window, without re-authenticating the caller. It carries no principal:
//! presenting the token is the authorization. Verification checks signature,
//! shape and expiry only; whether the torrent still exists is re-checked by
//! whatever serves the file.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use crate::metrics::TOKEN_REJECTIONS_TOTAL;

type HmacSha256 = Hmac<Sha256>;

/// How long an issued token stays valid. There is no renewal; callers
/// request a fresh token instead.
pub const TOKEN_TTL_HOURS: i64 = 24;

/// Errors that can occur when verifying or signing a token.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token is malformed")]
    Malformed,

    #[error("Token signature mismatch")]
    SignatureMismatch,

    #[error("Token expired")]
    Expired,

    #[error("Failed to sign claims: {0}")]
    Signing(String),
}

impl TokenError {
    /// Stable label for the rejection metric.
    fn reason(&self) -> &'static str {
        match self {
            TokenError::Malformed => "malformed",
            TokenError::SignatureMismatch => "signature_mismatch",
            TokenError::Expired => "expired",
            TokenError::Signing(_) => "signing",
        }
    }
}

/// The scope a verified token grants access to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileGrant {
    /// Content hash of the torrent.
    pub hash_string: String,
    /// Path of the granted file, or the torrent's display name for
    /// whole-item grants.
    pub file_path: String,
}

/// Signed claim set. `jti` identifies the token so a denylist could be
/// bolted on without changing the wire format.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    hash_string: String,
    file_path: String,
    jti: String,
    iat: i64,
    exp: i64,
}

/// Issues and verifies signed, expiring file-scope tokens.
///
/// The signing key is process-wide configuration injected at startup. Tokens
/// are `base64url(claims).base64url(hmac-sha256(claims))`.
pub struct TokenService {
    key: Vec<u8>,
}

impl TokenService {
    pub fn new(signing_key: &str) -> Self {
        Self {
            key: signing_key.as_bytes().to_vec(),
        }
    }

    /// Sign a claim tuple. The caller must already have resolved the hash
    /// and path against a live record and engine file list; nothing is
    /// re-validated here.
    pub fn issue(&self, hash_string: &str, file_path: &str) -> Result<String, TokenError> {
        self.issue_at(hash_string, file_path, Utc::now())
    }

    fn issue_at(
        &self,
        hash_string: &str,
        file_path: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            hash_string: hash_string.to_string(),
            file_path: file_path.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };

        let payload =
            serde_json::to_vec(&claims).map_err(|e| TokenError::Signing(e.to_string()))?;

        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        mac.update(&payload);
        let signature = mac.finalize().into_bytes();

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Verify a presented token and return its grant.
    ///
    /// Rejects bad signatures, expired tokens and malformed claims. Engine
    /// state is deliberately not consulted: a token stays structurally valid
    /// even if the torrent has since been removed.
    pub fn verify(&self, token: &str) -> Result<FileGrant, TokenError> {
        let result = self.verify_at(token, Utc::now());
        if let Err(ref e) = result {
            TOKEN_REJECTIONS_TOTAL.with_label_values(&[e.reason()]).inc();
        }
        result
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<FileGrant, TokenError> {
        let (payload_b64, signature_b64) =
            token.split_once('.').ok_or(TokenError::Malformed)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Malformed)?;

        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        mac.update(&payload);
        // Constant-time comparison.
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::SignatureMismatch)?;

        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(FileGrant {
            hash_string: claims.hash_string,
            file_path: claims.file_path,
        })
    }
}
