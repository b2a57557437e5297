//! Key lifecycle management and hybrid envelope encryption.
//!
//! A [`Keyring`] owns X25519 key pairs and hands out [`KeyHandle`]s. Messages are sealed
//! to a recipient key as an [`EncryptedEnvelope`]: a fresh data key encrypts the padded
//! payload, and an ephemeral X25519 exchange wraps that data key.
//!
//! ## Envelope Format
//!
//! ```text
//! version     = cipher suite (1 = AES-256-GCM, 2 = ChaCha20-Poly1305)
//! nonce       = 96-bit payload nonce
//! wrapped_key = eph_pub(32) || wrap_nonce(12) || sealed_dek(32) || tag(16)
//! ciphertext  = AEAD(pad64(plaintext)) || tag(16)
//! ```
//!
//! Both AEAD calls bind `version || key_id` as associated data, so an envelope cannot be
//! replayed against another key or another suite.
//!
//! ## Failure Model
//!
//! Decryption fails closed. A handle that is unknown, revoked, or public-only yields
//! [`VaultError::KeyNotFound`]; anything else that goes wrong while opening an envelope
//! yields [`VaultError::DecryptionFailed`] with no further detail.
//!
//! ## Examples
//!
//! ```rust
//! use mshield_vault::prelude::*;
//!
//! # fn main() -> Result<(), VaultError> {
//! let keyring = Keyring::<Aes>::default();
//! let handle = keyring.generate(KeyAlgorithm::X25519)?;
//!
//! let pem = keyring.export_public_key(&handle.id)?;
//! assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
//!
//! let envelope = keyring.encrypt(b"hello", &handle.id)?;
//! let plaintext = keyring.decrypt(&envelope, &handle.id)?;
//! assert_eq!(plaintext.as_slice(), b"hello");
//! # Ok(())
//! # }
//! ```

mod envelope;
mod error;
mod keyring;
pub mod pem;
mod types;

pub use envelope::{EncryptedEnvelope, PAD_BLOCK};
pub use error::{VaultError, VaultErrorExt};
pub use keyring::{KeyMaterial, Keyring};
pub use types::{KeyAlgorithm, KeyHandle, KeyId, KeyKind};
pub use zeroize::Zeroizing;

pub mod prelude {
    pub use crate::envelope::EncryptedEnvelope;
    pub use crate::error::{VaultError, VaultErrorExt};
    pub use crate::keyring::{KeyMaterial, Keyring};
    pub use crate::types::{Aes, ChaCha, KeyAlgorithm, KeyHandle, KeyId, KeyKind};
}

pub mod algorithms {
    pub use crate::types::{Aes, ChaCha, EnvelopeCipher};
}
