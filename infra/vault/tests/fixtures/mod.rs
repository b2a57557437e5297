#![allow(dead_code)]

use mshield_vault::prelude::*;

/// Keyring with private export enabled and one generated key pair.
/// # Panics
/// * If key generation fails.
#[must_use]
pub fn exportable_keyring() -> (Keyring, KeyHandle) {
    let keyring = Keyring::new(true);
    let handle = keyring.generate(KeyAlgorithm::X25519).expect("key generation failed");
    (keyring, handle)
}

/// Keyring with the default export policy and `n` generated key pairs.
/// # Panics
/// * If key generation fails.
#[must_use]
pub fn keyring_with_keys<C: mshield_vault::algorithms::EnvelopeCipher>(n: usize) -> (Keyring<C>, Vec<KeyHandle>) {
    let keyring = Keyring::<C>::default();
    let handles = (0..n).map(|_| keyring.generate(KeyAlgorithm::X25519).expect("key generation failed")).collect();
    (keyring, handles)
}
