//! Envelope encryption for secrets at rest.
//!
//! [`CipherProvider`] mirrors the teacher's `CryptoProvider` shape — callers
//! pass an opaque `kek_id` and never see the underlying key material — but
//! scopes the operation to the one thing secret storage actually needs:
//! encrypt-then-store, decrypt-on-resolve. Signing and verification are out
//! of scope here; a future KMS-backed provider would still implement this
//! same trait.

use crate::value::SecretError;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// The ciphertext and nonce produced by [`CipherProvider::encrypt`], ready
/// to be persisted alongside the `kek_id` that produced it.
#[derive(Debug, Clone)]
pub struct SealedBytes {
    /// The 96-bit GCM nonce, generated fresh for every encryption.
    pub nonce: Vec<u8>,
    /// The ciphertext, including the authentication tag.
    pub ciphertext: Vec<u8>,
}

/// Encrypts and decrypts secret payloads against a named key-encryption-key.
///
/// `kek_id` is opaque to callers: a local provider treats it as a map key,
/// a KMS-backed provider would treat it as a key ARN or resource ID.
#[async_trait]
pub trait CipherProvider: Send + Sync {
    /// Encrypt `plaintext` under the key-encryption-key named `kek_id`.
    async fn encrypt(&self, kek_id: &str, plaintext: &[u8]) -> Result<SealedBytes, SecretError>;

    /// Decrypt `sealed` using the key-encryption-key named `kek_id`.
    async fn decrypt(&self, kek_id: &str, sealed: &SealedBytes) -> Result<Vec<u8>, SecretError>;
}

/// Default in-process `CipherProvider` backed by AES-256-GCM.
///
/// Keys are 256-bit and held in memory only; this is the provider used when
/// no external KMS is configured. Production deployments that need key
/// rotation or HSM-backed keys supply their own [`CipherProvider`].
pub struct LocalAesGcmCipher {
    keys: RwLock<HashMap<String, Key<Aes256Gcm>>>,
}

impl LocalAesGcmCipher {
    /// Create a provider with no keys registered.
    pub fn new() -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Register a 32-byte key under `kek_id`, generating a fresh random key.
    ///
    /// Returns the generated key bytes so the caller can persist them
    /// out-of-band (e.g. in an ops secret manager for disaster recovery).
    pub fn generate_kek(&self, kek_id: impl Into<String>) -> [u8; 32] {
        let key = Aes256Gcm::generate_key(OsRng);
        let bytes: [u8; 32] = key.into();
        self.keys
            .write()
            .expect("kek map lock poisoned")
            .insert(kek_id.into(), bytes.into());
        bytes
    }

    /// Register an existing 32-byte key under `kek_id`.
    pub fn install_kek(&self, kek_id: impl Into<String>, key_bytes: [u8; 32]) {
        self.keys
            .write()
            .expect("kek map lock poisoned")
            .insert(kek_id.into(), key_bytes.into());
    }
}

impl Default for LocalAesGcmCipher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CipherProvider for LocalAesGcmCipher {
    async fn encrypt(&self, kek_id: &str, plaintext: &[u8]) -> Result<SealedBytes, SecretError> {
        let keys = self.keys.read().expect("kek map lock poisoned");
        let key = keys
            .get(kek_id)
            .ok_or_else(|| SecretError::KeyNotFound(kek_id.to_string()))?;
        let cipher = Aes256Gcm::new(key);
        let nonce = Aes256Gcm::generate_nonce(OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| SecretError::CipherFailed(e.to_string()))?;
        Ok(SealedBytes {
            nonce: nonce.to_vec(),
            ciphertext,
        })
    }

    async fn decrypt(&self, kek_id: &str, sealed: &SealedBytes) -> Result<Vec<u8>, SecretError> {
        let keys = self.keys.read().expect("kek map lock poisoned");
        let key = keys
            .get(kek_id)
            .ok_or_else(|| SecretError::KeyNotFound(kek_id.to_string()))?;
        let cipher = Aes256Gcm::new(key);
        let nonce = Nonce::from_slice(&sealed.nonce);
        cipher
            .decrypt(nonce, sealed.ciphertext.as_ref())
            .map_err(|e| SecretError::CipherFailed(e.to_string()))
    }
}
