use aead::{AeadInOut, KeyInit};
use aes_gcm::Aes256Gcm;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chacha20poly1305::ChaCha20Poly1305;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

// --- Ciphers ---

pub type Aes = Aes256Gcm;
pub type ChaCha = ChaCha20Poly1305;

/// An AEAD usable for both key wrapping and payload sealing.
///
/// `SUITE` is written into every envelope as its version byte, so an envelope sealed
/// with one cipher is rejected by a keyring configured with another.
pub trait EnvelopeCipher: AeadInOut + KeyInit + Send + Sync + 'static {
    const SUITE: u8;
    const NAME: &'static str;
}

impl EnvelopeCipher for Aes {
    const SUITE: u8 = 1;
    const NAME: &'static str = "X25519-HKDF-SHA256/AES-256-GCM";
}

impl EnvelopeCipher for ChaCha {
    const SUITE: u8 = 2;
    const NAME: &'static str = "X25519-HKDF-SHA256/ChaCha20-Poly1305";
}

/// Size of X25519 scalars and points.
pub(crate) const KEY_LEN: usize = 32;
/// 96-bit AEAD nonce, shared by both supported ciphers.
pub(crate) const NONCE_LEN: usize = 12;
/// 128-bit AEAD tag, shared by both supported ciphers.
pub(crate) const TAG_LEN: usize = 16;

// --- Keys ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    /// Curve25519 Diffie-Hellman, used as a KEM to wrap data keys.
    #[default]
    X25519,
}

impl KeyAlgorithm {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::X25519 => "X25519",
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque key identifier: a fingerprint of the public key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(String);

impl KeyId {
    const PREFIX: &'static str = "kid-";

    /// `kid-` followed by the URL-safe Base64 of the first 9 bytes of SHA-256(public key).
    #[must_use]
    pub fn from_public_key(public: &[u8; KEY_LEN]) -> Self {
        let digest = Sha256::digest(public);
        let mut id = String::with_capacity(Self::PREFIX.len() + 12);
        id.push_str(Self::PREFIX);
        URL_SAFE_NO_PAD.encode_string(&digest[..9], &mut id);
        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for KeyId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for KeyId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for KeyId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Whether the keyring holds the private half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    KeyPair,
    /// Imported recipient key: usable for encryption only.
    PublicOnly,
}

/// Caller-facing view of a key. Never carries secret material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyHandle {
    pub id: KeyId,
    pub algorithm: KeyAlgorithm,
    pub kind: KeyKind,
    pub created_at: DateTime<Utc>,
}

impl KeyHandle {
    #[must_use]
    pub fn can_decrypt(&self) -> bool {
        self.kind == KeyKind::KeyPair
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_ids_are_stable_fingerprints() {
        let a = KeyId::from_public_key(&[7u8; KEY_LEN]);
        let b = KeyId::from_public_key(&[7u8; KEY_LEN]);
        let c = KeyId::from_public_key(&[8u8; KEY_LEN]);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.as_str().starts_with("kid-"));
        assert_eq!(a.as_str().len(), 16);
    }

    #[test]
    fn cipher_suites_are_distinct() {
        assert_ne!(Aes::SUITE, ChaCha::SUITE);
    }
}
