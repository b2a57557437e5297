pub mod fixtures;

use fixtures::keyring_with_keys;
use mshield_vault::prelude::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn roundtrip_arbitrary_bytes_with_both_ciphers(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let (aes, aes_keys) = keyring_with_keys::<Aes>(1);
        let envelope = aes.encrypt(&data, &aes_keys[0].id).unwrap();
        let opened = aes.decrypt(&envelope, &aes_keys[0].id).unwrap();
        prop_assert_eq!(opened.as_slice(), data.as_slice());

        let (chacha, chacha_keys) = keyring_with_keys::<ChaCha>(1);
        let envelope = chacha.encrypt(&data, &chacha_keys[0].id).unwrap();
        let opened = chacha.decrypt(&envelope, &chacha_keys[0].id).unwrap();
        prop_assert_eq!(opened.as_slice(), data.as_slice());
    }

    #[test]
    fn ciphertext_length_reveals_only_padded_length(len in 0usize..1024) {
        let (keyring, keys) = keyring_with_keys::<Aes>(1);
        let envelope = keyring.encrypt(&vec![0x42; len], &keys[0].id).unwrap();

        let padded = (len / mshield_vault::PAD_BLOCK + 1) * mshield_vault::PAD_BLOCK;
        prop_assert_eq!(envelope.ciphertext.len(), padded + 16);
    }

    #[test]
    fn flipping_any_bit_fails_decryption(
        data in proptest::collection::vec(any::<u8>(), 1..256),
        field in 0usize..3,
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let (keyring, keys) = keyring_with_keys::<Aes>(1);
        let mut envelope = keyring.encrypt(&data, &keys[0].id).unwrap();

        let target = match field {
            0 => &mut envelope.ciphertext,
            1 => &mut envelope.wrapped_key,
            _ => &mut envelope.nonce,
        };
        let i = position.index(target.len());
        target[i] ^= 1 << bit;

        let err = keyring.decrypt(&envelope, &keys[0].id).unwrap_err();
        prop_assert!(matches!(err, VaultError::DecryptionFailed { .. }), "{}", err);
    }
}
