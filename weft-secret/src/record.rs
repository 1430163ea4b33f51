//! The at-rest representation of a [`Secret`](crate) entity.

use weft_core::{OrgId, SecretId};

/// An encrypted secret as it is persisted by a durable store.
///
/// Plaintext never appears here; the ciphertext and nonce are opaque bytes
/// produced by a [`CipherProvider`](crate::cipher::CipherProvider) and only
/// meaningful to whichever `kek_id` sealed them.
#[derive(Debug, Clone)]
pub struct EncryptedSecretRecord {
    /// Owning organization.
    pub org: OrgId,
    /// Unique identifier for this secret.
    pub id: SecretId,
    /// Human-readable name, unique within the org (e.g. `"github_token"`).
    pub name: String,
    /// Which key-encryption-key sealed this record.
    pub kek_id: String,
    /// GCM nonce used for this record's encryption.
    pub nonce: Vec<u8>,
    /// Ciphertext, including the GCM authentication tag.
    pub ciphertext: Vec<u8>,
}
