//! The in-memory secret wrapper and its error type.

use thiserror::Error;
use weft_core::ErrorCode;
use zeroize::Zeroizing;

/// Errors from secret storage and resolution.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SecretError {
    /// The secret was not found for this org.
    #[error("secret not found: {0}")]
    NotFound(String),

    /// The referenced key-encryption-key is not registered.
    #[error("key-encryption-key not found: {0}")]
    KeyNotFound(String),

    /// Encryption or decryption failed (bad ciphertext, tampered tag, wrong key).
    #[error("cipher operation failed: {0}")]
    CipherFailed(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ErrorCode for SecretError {
    fn code(&self) -> &'static str {
        match self {
            SecretError::NotFound(_) => "SECRET_NOT_FOUND",
            SecretError::KeyNotFound(_) => "SECRET_KEK_NOT_FOUND",
            SecretError::CipherFailed(_) => "SECRET_CIPHER_FAILED",
            SecretError::Other(_) => "SECRET_OTHER",
        }
    }
}

/// An opaque secret value. Cannot be logged, serialized, or cloned.
/// Memory is zeroed on drop via [`Zeroizing`].
///
/// The only way to access the bytes is through [`SecretValue::with_bytes`],
/// which enforces scoped exposure — the secret is only visible inside the
/// closure, never held as a plain `Vec<u8>` or `String` by the caller.
pub struct SecretValue {
    inner: Zeroizing<Vec<u8>>,
}

impl SecretValue {
    /// Create a new secret value. The input vector is moved, not copied.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            inner: Zeroizing::new(bytes),
        }
    }

    /// Scoped exposure. The secret bytes are only accessible inside the closure.
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.inner)
    }

    /// Returns the length of the secret in bytes.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

// Intentionally: no Display, no Clone, no Serialize, no PartialEq.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_is_redacted() {
        let secret = SecretValue::new(b"sk-live-abc123".to_vec());
        let debug = format!("{:?}", secret);
        assert_eq!(debug, "[REDACTED]");
        assert!(!debug.contains("sk-live"));
    }

    #[test]
    fn with_bytes_exposes_content() {
        let secret = SecretValue::new(b"my-api-key".to_vec());
        secret.with_bytes(|bytes| assert_eq!(bytes, b"my-api-key"));
    }

    #[test]
    fn len_and_is_empty() {
        let secret = SecretValue::new(b"12345".to_vec());
        assert_eq!(secret.len(), 5);
        assert!(!secret.is_empty());
        assert!(SecretValue::new(vec![]).is_empty());
    }
}
