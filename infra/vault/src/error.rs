//! # Vault Errors
//!
//! Every failure of the keyring and the envelope pipeline. Decryption deliberately
//! collapses into [`VaultError::DecryptionFailed`] so callers cannot tell a wrong key
//! from a tampered payload.

use std::borrow::Cow;

#[mshield_derive::mshield_error]
pub enum VaultError {
    /// The handle was never issued, was revoked, or holds no private key.
    #[error("Key not found{}: {key_id}", format_context(context))]
    KeyNotFound { key_id: String, context: Option<Cow<'static, str>> },

    /// Uniform outcome for every failed decryption.
    #[error("Decryption failed{}", format_context(context))]
    DecryptionFailed { context: Option<Cow<'static, str>> },

    /// Key material could not be produced. The keyring is left untouched.
    #[error("Key generation failed{}: {message}", format_context(context))]
    GenerationFailed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Private key export denied{}: {key_id}", format_context(context))]
    ExportDenied { key_id: String, context: Option<Cow<'static, str>> },

    /// Malformed PEM or a key the keyring refuses to register.
    #[error("Invalid key{}: {message}", format_context(context))]
    InvalidKey { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Encryption failed{}: {message}", format_context(context))]
    EncryptionFailed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Envelope encoding error{}: {source}", format_context(context))]
    Encoding { source: postcard::Error, context: Option<Cow<'static, str>> },

    #[error("Envelope JSON error{}: {source}", format_context(context))]
    Json { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("Internal vault error{}: {message}", format_context(context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl VaultError {
    pub(crate) fn key_not_found(key_id: impl Into<String>) -> Self {
        Self::KeyNotFound { key_id: key_id.into(), context: None }
    }

    pub(crate) const fn decryption_failed() -> Self {
        Self::DecryptionFailed { context: None }
    }
}
