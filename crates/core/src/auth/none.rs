use async_trait::async_trait;

use super::{AuthContext, AuthError, Authenticator, Principal};

/// Authenticator that accepts every request as anonymous.
/// Must be selected explicitly in configuration.
pub struct NoneAuthenticator;

impl NoneAuthenticator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoneAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Authenticator for NoneAuthenticator {
    async fn authenticate(&self, _context: &AuthContext) -> Result<Principal, AuthError> {
        Ok(Principal::anonymous())
    }

    fn method_name(&self) -> &'static str {
        "none"
    }
}
