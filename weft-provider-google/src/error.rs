//! Error type for Google auth and provider internals.

use thiserror::Error;

/// Errors specific to token acquisition, separate from [`weft_llm::ProviderError`]
/// which callers of [`crate::GoogleProvider`] actually see — auth failures are
/// mapped into `ProviderError::AuthFailed` at the call boundary.
#[derive(Debug, Error)]
pub enum GoogleError {
    /// The service-account key was malformed or the private key couldn't be parsed.
    #[error("invalid service account key: {0}")]
    InvalidKey(String),
    /// The token endpoint rejected the assertion or was unreachable.
    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(String),
}
