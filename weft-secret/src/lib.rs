//! # weft-secret — encrypted credential storage
//!
//! Org-scoped secrets (API keys, OAuth tokens, connector credentials) are
//! sealed with AES-256-GCM before they ever reach a durable store, and
//! unsealed only into a [`SecretValue`] that refuses to be logged, cloned,
//! or serialized. The encryption boundary is the [`CipherProvider`] trait,
//! which mirrors the teacher's `CryptoProvider` shape so a KMS-backed
//! provider can stand in for [`LocalAesGcmCipher`] without touching callers.

#![deny(missing_docs)]

pub mod cipher;
pub mod record;
pub mod value;
pub mod vault;

pub use cipher::{CipherProvider, LocalAesGcmCipher, SealedBytes};
pub use record::EncryptedSecretRecord;
pub use value::{SecretError, SecretValue};
pub use vault::SecretVault;
