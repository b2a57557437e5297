//! Hybrid envelope encryption.
//!
//! ```text
//! DEK          = random 256-bit data key, fresh per envelope
//! AAD          = [version] || key_id
//! ciphertext   = AEAD(DEK, nonce, AAD, pad64(plaintext)) || tag
//! eph          = fresh X25519 key pair
//! KEK          = HKDF-SHA256(ikm = X25519(eph, recipient), salt = eph_pub || recipient_pub, info)
//! wrapped_key  = eph_pub(32) || wrap_nonce(12) || AEAD(KEK, wrap_nonce, AAD, DEK) || tag(16)
//! ```
//!
//! Plaintext is padded (ISO/IEC 7816-4) to a multiple of [`PAD_BLOCK`] bytes, so the
//! ciphertext length reveals only the padded length.

use crate::error::{VaultError, VaultErrorExt};
use crate::types::{EnvelopeCipher, KEY_LEN, KeyId, NONCE_LEN, TAG_LEN};
use aead::inout::InOutBuf;
use aead::{Key, Nonce, Tag};
use getrandom::fill;
use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

/// Padding granularity in bytes.
pub const PAD_BLOCK: usize = 64;
const PAD_MARKER: u8 = 0x80;
const KEK_INFO: &[u8] = b"mshield/v1/kek";
const WRAPPED_KEY_LEN: usize = KEY_LEN + NONCE_LEN + KEY_LEN + TAG_LEN;

/// A sealed message addressed to one key.
///
/// Byte fields travel as Base64 in human-readable formats (JSON) and as raw bytes in
/// binary ones (postcard).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedEnvelope {
    /// Cipher suite, see [`EnvelopeCipher::SUITE`].
    pub version: u8,
    pub key_id: KeyId,
    #[serde(with = "bytes_as_base64")]
    pub nonce: Vec<u8>,
    #[serde(with = "bytes_as_base64")]
    pub wrapped_key: Vec<u8>,
    #[serde(with = "bytes_as_base64")]
    pub ciphertext: Vec<u8>,
}

impl EncryptedEnvelope {
    /// Serializes the envelope into a compact binary format using Postcard.
    pub fn encode_bin(&self) -> Result<Vec<u8>, VaultError> {
        postcard::to_stdvec(self).context("Encoding envelope")
    }

    pub fn decode_bin(bytes: &[u8]) -> Result<Self, VaultError> {
        postcard::from_bytes(bytes).context("Decoding envelope")
    }

    pub fn to_json(&self) -> Result<String, VaultError> {
        serde_json::to_string(self).context("Encoding envelope")
    }

    /// # Errors
    /// Returns [`VaultError::Json`] for malformed JSON or invalid Base64.
    pub fn from_json(json: &str) -> Result<Self, VaultError> {
        serde_json::from_str(json).context("Decoding envelope")
    }
}

pub(crate) fn seal<C: EnvelopeCipher>(
    recipient: &PublicKey,
    key_id: &KeyId,
    plaintext: &[u8],
) -> Result<EncryptedEnvelope, VaultError> {
    let aad = associated_data(C::SUITE, key_id);

    let mut dek = Zeroizing::new([0u8; KEY_LEN]);
    fill(&mut dek[..]).map_err(|e| rng_failure(&e))?;

    let nonce = random_nonce::<C>()?;
    let mut ciphertext = pad(plaintext);
    let tag = cipher::<C>(&dek)?
        .encrypt_inout_detached(&nonce, &aad, InOutBuf::from(&mut ciphertext[..]))
        .map_err(|_| encryption_failure("AEAD sealing of payload failed"))?;
    ciphertext.extend_from_slice(&tag);

    let wrapped_key = wrap_key::<C>(recipient, &dek, &aad)?;

    Ok(EncryptedEnvelope {
        version: C::SUITE,
        key_id: key_id.clone(),
        nonce: nonce.to_vec(),
        wrapped_key,
        ciphertext,
    })
}

/// Every failure maps to [`VaultError::DecryptionFailed`].
pub(crate) fn open<C: EnvelopeCipher>(
    secret: &StaticSecret,
    public: &PublicKey,
    key_id: &KeyId,
    envelope: &EncryptedEnvelope,
) -> Result<Zeroizing<Vec<u8>>, VaultError> {
    if envelope.version != C::SUITE || envelope.key_id != *key_id {
        return Err(VaultError::decryption_failed());
    }
    if envelope.ciphertext.len() < TAG_LEN + PAD_BLOCK {
        return Err(VaultError::decryption_failed());
    }

    let aad = associated_data(envelope.version, key_id);
    let dek = unwrap_key::<C>(secret, public, &envelope.wrapped_key, &aad)?;

    let nonce = Nonce::<C>::try_from(envelope.nonce.as_slice())
        .map_err(|_| VaultError::decryption_failed())?;
    let (body, tag) = envelope.ciphertext.split_at(envelope.ciphertext.len() - TAG_LEN);
    let tag = Tag::<C>::try_from(tag).map_err(|_| VaultError::decryption_failed())?;

    let mut buf = Zeroizing::new(body.to_vec());
    cipher::<C>(&dek)
        .map_err(|_| VaultError::decryption_failed())?
        .decrypt_inout_detached(&nonce, &aad, InOutBuf::from(&mut buf[..]), &tag)
        .map_err(|_| VaultError::decryption_failed())?;

    let len = unpad(&buf).ok_or_else(VaultError::decryption_failed)?;
    buf.truncate(len);
    Ok(buf)
}

fn wrap_key<C: EnvelopeCipher>(
    recipient: &PublicKey,
    dek: &[u8; KEY_LEN],
    aad: &[u8],
) -> Result<Vec<u8>, VaultError> {
    let mut seed = Zeroizing::new([0u8; KEY_LEN]);
    fill(&mut seed[..]).map_err(|e| rng_failure(&e))?;
    let ephemeral = StaticSecret::from(*seed);
    let ephemeral_public = PublicKey::from(&ephemeral);

    let shared = ephemeral.diffie_hellman(recipient);
    if !shared.was_contributory() {
        return Err(encryption_failure("recipient public key is a low-order point"));
    }
    let kek = derive_kek(shared.as_bytes(), &ephemeral_public, recipient)?;

    let nonce = random_nonce::<C>()?;
    let mut sealed = dek.to_vec();
    let tag = cipher::<C>(&kek)?
        .encrypt_inout_detached(&nonce, aad, InOutBuf::from(&mut sealed[..]))
        .map_err(|_| encryption_failure("AEAD wrapping of data key failed"))?;

    let mut wrapped = Vec::with_capacity(WRAPPED_KEY_LEN);
    wrapped.extend_from_slice(ephemeral_public.as_bytes());
    wrapped.extend_from_slice(&nonce);
    wrapped.extend_from_slice(&sealed);
    wrapped.extend_from_slice(&tag);
    Ok(wrapped)
}

fn unwrap_key<C: EnvelopeCipher>(
    secret: &StaticSecret,
    public: &PublicKey,
    wrapped: &[u8],
    aad: &[u8],
) -> Result<Zeroizing<[u8; KEY_LEN]>, VaultError> {
    if wrapped.len() != WRAPPED_KEY_LEN {
        return Err(VaultError::decryption_failed());
    }
    let (ephemeral, rest) = wrapped.split_at(KEY_LEN);
    let (nonce, rest) = rest.split_at(NONCE_LEN);
    let (sealed, tag) = rest.split_at(KEY_LEN);

    let ephemeral: [u8; KEY_LEN] =
        ephemeral.try_into().map_err(|_| VaultError::decryption_failed())?;
    let ephemeral = PublicKey::from(ephemeral);
    let shared = secret.diffie_hellman(&ephemeral);
    if !shared.was_contributory() {
        return Err(VaultError::decryption_failed());
    }
    let kek = derive_kek(shared.as_bytes(), &ephemeral, public)
        .map_err(|_| VaultError::decryption_failed())?;

    let nonce = Nonce::<C>::try_from(nonce).map_err(|_| VaultError::decryption_failed())?;
    let tag = Tag::<C>::try_from(tag).map_err(|_| VaultError::decryption_failed())?;

    let mut dek = Zeroizing::new([0u8; KEY_LEN]);
    dek.copy_from_slice(sealed);
    cipher::<C>(&kek)
        .map_err(|_| VaultError::decryption_failed())?
        .decrypt_inout_detached(&nonce, aad, InOutBuf::from(&mut dek[..]), &tag)
        .map_err(|_| VaultError::decryption_failed())?;
    Ok(dek)
}

fn derive_kek(
    shared: &[u8; KEY_LEN],
    ephemeral: &PublicKey,
    recipient: &PublicKey,
) -> Result<Zeroizing<[u8; KEY_LEN]>, VaultError> {
    let mut salt = [0u8; 2 * KEY_LEN];
    salt[..KEY_LEN].copy_from_slice(ephemeral.as_bytes());
    salt[KEY_LEN..].copy_from_slice(recipient.as_bytes());

    let hk = Hkdf::<Sha256>::new(Some(&salt[..]), shared);
    let mut kek = Zeroizing::new([0u8; KEY_LEN]);
    hk.expand(KEK_INFO, &mut kek[..]).map_err(|_| VaultError::Internal {
        message: "HKDF expansion failed".into(),
        context: Some("Deriving key-encryption key".into()),
    })?;
    Ok(kek)
}

fn cipher<C: EnvelopeCipher>(key: &[u8; KEY_LEN]) -> Result<C, VaultError> {
    let key = Key::<C>::try_from(&key[..]).map_err(|_| VaultError::Internal {
        message: format!("Invalid key length {}, must be 32 bytes", key.len()).into(),
        context: Some(C::NAME.into()),
    })?;
    Ok(C::new(&key))
}

fn random_nonce<C: EnvelopeCipher>() -> Result<Nonce<C>, VaultError> {
    let mut nonce = Nonce::<C>::default();
    fill(&mut nonce).map_err(|e| rng_failure(&e))?;
    Ok(nonce)
}

fn associated_data(version: u8, key_id: &KeyId) -> Vec<u8> {
    let mut aad = Vec::with_capacity(1 + key_id.as_str().len());
    aad.push(version);
    aad.extend_from_slice(key_id.as_str().as_bytes());
    aad
}

/// ISO/IEC 7816-4: append `0x80`, then zeros up to the next multiple of [`PAD_BLOCK`].
/// Always adds at least one byte. The result reserves room for the AEAD tag.
fn pad(plaintext: &[u8]) -> Vec<u8> {
    let padded_len = (plaintext.len() / PAD_BLOCK + 1) * PAD_BLOCK;
    let mut out = Vec::with_capacity(padded_len + TAG_LEN);
    out.extend_from_slice(plaintext);
    out.push(PAD_MARKER);
    out.resize(padded_len, 0);
    out
}

/// Length of the original plaintext, or `None` when the padding is malformed.
fn unpad(padded: &[u8]) -> Option<usize> {
    if padded.is_empty() || padded.len() % PAD_BLOCK != 0 {
        return None;
    }
    let marker = padded.iter().rposition(|&b| b != 0)?;
    (padded[marker] == PAD_MARKER && padded.len() - marker <= PAD_BLOCK).then_some(marker)
}

fn rng_failure(err: &getrandom::Error) -> VaultError {
    VaultError::EncryptionFailed {
        message: format!("System RNG unavailable: {err}").into(),
        context: None,
    }
}

fn encryption_failure(message: &'static str) -> VaultError {
    VaultError::EncryptionFailed { message: message.into(), context: None }
}

/// Base64 in human-readable formats, raw bytes otherwise.
#[allow(clippy::redundant_pub_crate)]
mod bytes_as_base64 {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::de::{self, SeqAccess, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    #[allow(clippy::ptr_arg)]
    pub(super) fn serialize<S: Serializer>(v: &Vec<u8>, s: S) -> Result<S::Ok, S::Error> {
        if s.is_human_readable() { s.serialize_str(&STANDARD.encode(v)) } else { s.serialize_bytes(v) }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        if d.is_human_readable() { d.deserialize_str(Base64Visitor) } else { d.deserialize_byte_buf(BytesVisitor) }
    }

    struct Base64Visitor;

    impl Visitor<'_> for Base64Visitor {
        type Value = Vec<u8>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a Base64 string")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            STANDARD.decode(v).map_err(|e| E::custom(format!("Invalid Base64: {e}")))
        }
    }

    struct BytesVisitor;

    impl<'de> Visitor<'de> for BytesVisitor {
        type Value = Vec<u8>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a byte buffer")
        }

        fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
            Ok(v.to_vec())
        }

        fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(byte) = seq.next_element::<u8>()? {
                out.push(byte);
            }
            Ok(out)
        }
    }
}
