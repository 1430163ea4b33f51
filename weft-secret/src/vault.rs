//! Sealing and unsealing [`Secret`](crate::record::EncryptedSecretRecord) records.
//!
//! This is the layer a durable store calls into: it never touches plaintext
//! or `kek_id` selection directly, it goes through [`SecretVault`].

use crate::cipher::CipherProvider;
use crate::record::EncryptedSecretRecord;
use crate::value::{SecretError, SecretValue};
use std::sync::Arc;
use weft_core::{OrgId, SecretId};

/// Seals plaintext secrets for storage and unseals them back to
/// [`SecretValue`] on resolution.
///
/// Holds the active `kek_id` new secrets are sealed under. Rotating to a new
/// KEK only changes which id new writes use; existing records keep the
/// `kek_id` they were sealed with, so decryption of old secrets keeps working
/// as long as the old key stays registered with the [`CipherProvider`].
pub struct SecretVault {
    cipher: Arc<dyn CipherProvider>,
    active_kek_id: String,
}

impl SecretVault {
    /// Create a vault that seals new secrets under `active_kek_id`.
    pub fn new(cipher: Arc<dyn CipherProvider>, active_kek_id: impl Into<String>) -> Self {
        Self {
            cipher,
            active_kek_id: active_kek_id.into(),
        }
    }

    /// Encrypt `plaintext` into a record ready for storage.
    pub async fn seal(
        &self,
        org: OrgId,
        id: SecretId,
        name: impl Into<String>,
        plaintext: &[u8],
    ) -> Result<EncryptedSecretRecord, SecretError> {
        let sealed = self.cipher.encrypt(&self.active_kek_id, plaintext).await?;
        Ok(EncryptedSecretRecord {
            org,
            id,
            name: name.into(),
            kek_id: self.active_kek_id.clone(),
            nonce: sealed.nonce,
            ciphertext: sealed.ciphertext,
        })
    }

    /// Decrypt a stored record back into a [`SecretValue`].
    pub async fn unseal(&self, record: &EncryptedSecretRecord) -> Result<SecretValue, SecretError> {
        let sealed = crate::cipher::SealedBytes {
            nonce: record.nonce.clone(),
            ciphertext: record.ciphertext.clone(),
        };
        let plaintext = self.cipher.decrypt(&record.kek_id, &sealed).await?;
        Ok(SecretValue::new(plaintext))
    }
}
