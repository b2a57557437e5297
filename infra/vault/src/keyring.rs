//! # Keyring
//!
//! Owns every private key in the process. Callers hold [`KeyHandle`]s and [`KeyId`]s;
//! raw private bytes leave only through [`Keyring::export_private_key`].
//!
//! ## Locking
//!
//! The registry lock guards lookup, insert and removal only. Each key lives in its own
//! slot behind a separate `RwLock`: encryptions and decryptions on one key share the slot,
//! revocation takes it exclusively, and different keys never contend.

use crate::envelope::{self, EncryptedEnvelope};
use crate::error::VaultError;
use crate::pem;
use crate::types::{Aes, EnvelopeCipher, KEY_LEN, KeyAlgorithm, KeyHandle, KeyId, KeyKind};
use chrono::Utc;
use fxhash::{FxHashMap, FxHashSet};
use mshield_domain::config::KeyringConfig;
use parking_lot::RwLock;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, warn};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

/// Freshly generated key pair that has not been registered yet.
///
/// Generation and registration are split so that the expensive half can run on a
/// worker thread while the keyring is only touched once the material exists. Dropping
/// an unregistered `KeyMaterial` wipes the secret.
pub struct KeyMaterial {
    algorithm: KeyAlgorithm,
    secret: StaticSecret,
    public: PublicKey,
}

impl KeyMaterial {
    pub fn generate(algorithm: KeyAlgorithm) -> Result<Self, VaultError> {
        match algorithm {
            KeyAlgorithm::X25519 => {
                let mut seed = Zeroizing::new([0u8; KEY_LEN]);
                getrandom::fill(&mut seed[..]).map_err(|e| VaultError::GenerationFailed {
                    message: format!("System RNG unavailable: {e}").into(),
                    context: Some(algorithm.as_str().into()),
                })?;
                let secret = StaticSecret::from(*seed);
                let public = PublicKey::from(&secret);
                Ok(Self { algorithm, secret, public })
            }
        }
    }

    #[must_use]
    pub fn id(&self) -> KeyId {
        KeyId::from_public_key(self.public.as_bytes())
    }

    #[must_use]
    pub const fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("id", &self.id())
            .field("algorithm", &self.algorithm)
            .field("secret", &"<redacted>")
            .finish()
    }
}

struct KeySlot {
    handle: KeyHandle,
    public: PublicKey,
    /// `None` for imported recipient keys and after revocation.
    secret: Option<StaticSecret>,
    revoked: bool,
}

impl KeySlot {
    fn live(&self) -> Option<&Self> {
        (!self.revoked).then_some(self)
    }
}

#[derive(Default)]
struct Registry {
    slots: FxHashMap<KeyId, Arc<RwLock<KeySlot>>>,
    revoked: FxHashSet<KeyId>,
}

struct KeyringInner {
    registry: RwLock<Registry>,
    allow_private_export: bool,
}

/// Thread-safe key store and envelope endpoint.
///
/// Cloning is cheap; clones share the same keys. The cipher parameter selects the AEAD
/// used for new envelopes and the only suite accepted on decryption.
pub struct Keyring<C: EnvelopeCipher = Aes> {
    inner: Arc<KeyringInner>,
    _cipher: PhantomData<fn() -> C>,
}

impl<C: EnvelopeCipher> Clone for Keyring<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner), _cipher: PhantomData }
    }
}

impl<C: EnvelopeCipher> fmt::Debug for Keyring<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyring")
            .field("cipher", &C::NAME)
            .field("keys", &self.len())
            .field("allow_private_export", &self.inner.allow_private_export)
            .finish()
    }
}

impl<C: EnvelopeCipher> Default for Keyring<C> {
    fn default() -> Self {
        Self::new(false)
    }
}

impl<C: EnvelopeCipher> Keyring<C> {
    #[must_use]
    pub fn new(allow_private_export: bool) -> Self {
        Self {
            inner: Arc::new(KeyringInner {
                registry: RwLock::new(Registry::default()),
                allow_private_export,
            }),
            _cipher: PhantomData,
        }
    }

    #[must_use]
    pub fn from_config(config: &KeyringConfig) -> Self {
        debug!(cipher = C::NAME, allow_private_export = config.allow_private_export, "Creating keyring");
        Self::new(config.allow_private_export)
    }

    /// Generates and registers a key pair on the calling thread.
    pub fn generate(&self, algorithm: KeyAlgorithm) -> Result<KeyHandle, VaultError> {
        let material = KeyMaterial::generate(algorithm)?;
        self.insert(material)
    }

    /// Registers previously generated material.
    pub fn insert(&self, material: KeyMaterial) -> Result<KeyHandle, VaultError> {
        let handle = KeyHandle {
            id: material.id(),
            algorithm: material.algorithm,
            kind: KeyKind::KeyPair,
            created_at: Utc::now(),
        };

        let mut registry = self.inner.registry.write();
        if registry.revoked.contains(&handle.id) || registry.slots.contains_key(&handle.id) {
            return Err(VaultError::GenerationFailed {
                message: format!("Key id collision: {}", handle.id).into(),
                context: None,
            });
        }
        registry.slots.insert(
            handle.id.clone(),
            Arc::new(RwLock::new(KeySlot {
                handle: handle.clone(),
                public: material.public,
                secret: Some(material.secret),
                revoked: false,
            })),
        );
        drop(registry);

        info!(key_id = %handle.id, algorithm = %handle.algorithm, "Key pair generated");
        Ok(handle)
    }

    /// Registers a recipient's public key for encryption only.
    ///
    /// Importing a key that is already present returns the existing handle.
    pub fn import_public_key(&self, pem: &str) -> Result<KeyHandle, VaultError> {
        let public = PublicKey::from(pem::decode_public_key(pem)?);
        let id = KeyId::from_public_key(public.as_bytes());

        let mut registry = self.inner.registry.write();
        if registry.revoked.contains(&id) {
            return Err(VaultError::InvalidKey {
                message: format!("Key {id} was revoked and cannot be re-imported").into(),
                context: None,
            });
        }
        if let Some(slot) = registry.slots.get(&id).cloned() {
            drop(registry);
            return Ok(slot.read().handle.clone());
        }

        let handle = KeyHandle {
            id: id.clone(),
            algorithm: KeyAlgorithm::X25519,
            kind: KeyKind::PublicOnly,
            created_at: Utc::now(),
        };
        registry.slots.insert(
            id,
            Arc::new(RwLock::new(KeySlot {
                handle: handle.clone(),
                public,
                secret: None,
                revoked: false,
            })),
        );
        drop(registry);

        info!(key_id = %handle.id, "Public key imported");
        Ok(handle)
    }

    pub fn export_public_key(&self, id: &KeyId) -> Result<String, VaultError> {
        let slot = self.slot(id)?;
        let slot = slot.read();
        let slot = slot.live().ok_or_else(|| VaultError::key_not_found(id.as_str()))?;
        Ok(pem::encode_public_key(slot.public.as_bytes()))
    }

    /// PKCS#8 PEM of the private key. Denied unless the keyring allows private export.
    pub fn export_private_key(&self, id: &KeyId) -> Result<Zeroizing<String>, VaultError> {
        warn!(key_id = %id, allowed = self.inner.allow_private_export, "Private key export requested");
        self.ensure_export_allowed(id)?;

        let slot = self.slot(id)?;
        let slot = slot.read();
        private_pem(slot.live().and_then(|s| s.secret.as_ref()), id)
    }

    /// Exports the private key and revokes it in one step. No other operation on the key
    /// can observe it between the two; other keys are not blocked meanwhile.
    pub fn export_private_key_and_forget(&self, id: &KeyId) -> Result<Zeroizing<String>, VaultError> {
        warn!(key_id = %id, allowed = self.inner.allow_private_export, "Private key export-and-forget requested");
        self.ensure_export_allowed(id)?;

        let slot = self.slot(id)?;
        let mut guard = slot.write();
        let pem = private_pem(guard.live().and_then(|s| s.secret.as_ref()), id)?;
        guard.secret = None;
        guard.revoked = true;
        drop(guard);

        let mut registry = self.inner.registry.write();
        if registry.slots.get(id).is_some_and(|current| Arc::ptr_eq(current, &slot)) {
            registry.slots.remove(id);
        }
        registry.revoked.insert(id.clone());
        drop(registry);

        info!(key_id = %id, "Key exported and revoked");
        Ok(pem)
    }

    /// Moves the key to its terminal revoked state and wipes the secret.
    pub fn revoke(&self, id: &KeyId) -> Result<(), VaultError> {
        let slot = {
            let mut registry = self.inner.registry.write();
            let slot = registry.slots.remove(id).ok_or_else(|| VaultError::key_not_found(id.as_str()))?;
            registry.revoked.insert(id.clone());
            slot
        };

        let mut slot = slot.write();
        slot.secret = None;
        slot.revoked = true;
        drop(slot);

        info!(key_id = %id, "Key revoked");
        Ok(())
    }

    pub fn encrypt(&self, plaintext: &[u8], recipient: &KeyId) -> Result<EncryptedEnvelope, VaultError> {
        let slot = self.slot(recipient)?;
        let slot = slot.read();
        let slot = slot.live().ok_or_else(|| VaultError::key_not_found(recipient.as_str()))?;

        let envelope = envelope::seal::<C>(&slot.public, recipient, plaintext)?;
        debug!(key_id = %recipient, bytes = plaintext.len(), "Envelope sealed");
        Ok(envelope)
    }

    /// Returns [`VaultError::KeyNotFound`] when `id` has no live private key; every other
    /// failure is [`VaultError::DecryptionFailed`].
    pub fn decrypt(
        &self,
        envelope: &EncryptedEnvelope,
        id: &KeyId,
    ) -> Result<Zeroizing<Vec<u8>>, VaultError> {
        let slot = self.slot(id)?;
        let slot = slot.read();
        let (secret, public) = slot
            .live()
            .and_then(|s| s.secret.as_ref().map(|secret| (secret, &s.public)))
            .ok_or_else(|| VaultError::key_not_found(id.as_str()))?;

        let plaintext = envelope::open::<C>(secret, public, id, envelope)?;
        debug!(key_id = %id, bytes = plaintext.len(), "Envelope opened");
        Ok(plaintext)
    }

    pub fn info(&self, id: &KeyId) -> Result<KeyHandle, VaultError> {
        let slot = self.slot(id)?;
        let handle = slot.read().handle.clone();
        Ok(handle)
    }

    /// Live keys ordered by id.
    #[must_use]
    pub fn list(&self) -> Vec<KeyHandle> {
        let slots: Vec<_> = self.inner.registry.read().slots.values().cloned().collect();
        let mut handles: Vec<_> = slots.iter().map(|slot| slot.read().handle.clone()).collect();
        handles.sort_by(|a, b| a.id.cmp(&b.id));
        handles
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.registry.read().slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_revoked(&self, id: &KeyId) -> bool {
        self.inner.registry.read().revoked.contains(id)
    }

    fn slot(&self, id: &KeyId) -> Result<Arc<RwLock<KeySlot>>, VaultError> {
        self.inner.registry.read().slots.get(id).cloned().ok_or_else(|| VaultError::key_not_found(id.as_str()))
    }

    fn ensure_export_allowed(&self, id: &KeyId) -> Result<(), VaultError> {
        if self.inner.allow_private_export {
            Ok(())
        } else {
            Err(VaultError::ExportDenied { key_id: id.to_string(), context: None })
        }
    }
}

fn private_pem(secret: Option<&StaticSecret>, id: &KeyId) -> Result<Zeroizing<String>, VaultError> {
    let secret = secret.ok_or_else(|| VaultError::key_not_found(id.as_str()))?;
    let bytes = Zeroizing::new(secret.to_bytes());
    Ok(pem::encode_private_key(&bytes))
}
