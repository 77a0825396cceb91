//! Field Encryption Property Tests
//!
//! Validates round trips, passthrough of plain values and the task
//! payload envelope.

use proptest::prelude::*;
use serde_json::Value;

use super::generators::{arb_plaintext, arb_secret, arb_task_config, arb_unencrypted};
use cms_edge::crypto::{ENCRYPTED_CONFIG_KEY, Encryptor, IS_ENCRYPTED_KEY, is_encrypted};
use cms_edge::{CryptoHandle, EncryptionConfig};

fn handle(secret: &str) -> CryptoHandle {
    CryptoHandle::from_config(&EncryptionConfig::default().with_enabled(true).with_key(secret)).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Anything encrypted decrypts to itself under the same secret.
    #[test]
    fn prop_encrypt_decrypt_round_trip(secret in arb_secret(), plaintext in arb_plaintext()) {
        let enc = Encryptor::new(&secret).unwrap();
        let sealed = enc.encrypt(&plaintext).unwrap();
        prop_assert!(is_encrypted(&sealed));
        prop_assert_eq!(enc.decrypt(&sealed).unwrap(), plaintext);
    }

    /// Fresh nonces: the same plaintext never seals to the same blob twice.
    #[test]
    fn prop_encryption_is_randomized(secret in arb_secret(), plaintext in arb_plaintext()) {
        let enc = Encryptor::new(&secret).unwrap();
        prop_assert_ne!(enc.encrypt(&plaintext).unwrap(), enc.encrypt(&plaintext).unwrap());
    }

    /// Values without the tag pass through decryption untouched.
    #[test]
    fn prop_untagged_values_pass_through(secret in arb_secret(), value in arb_unencrypted()) {
        prop_assert_eq!(handle(&secret).decrypt_if_needed(&value).unwrap(), value.clone());
        prop_assert_eq!(CryptoHandle::disabled().decrypt_if_needed(&value).unwrap(), value);
    }

    /// A different secret never opens a blob.
    #[test]
    fn prop_wrong_secret_fails(a in arb_secret(), b in arb_secret(), plaintext in arb_plaintext()) {
        prop_assume!(a != b);
        let sealed = Encryptor::new(&a).unwrap().encrypt(&plaintext).unwrap();
        prop_assert!(Encryptor::new(&b).unwrap().decrypt(&sealed).is_err());
    }

    /// Envelopes keep only routing keys in clear and open to the original.
    #[test]
    fn prop_payload_envelope(secret in arb_secret(), config in arb_task_config()) {
        let h = handle(&secret);
        let envelope = h.encrypt_payload(&config).unwrap();

        prop_assert_eq!(&envelope[IS_ENCRYPTED_KEY], &Value::Bool(true));
        prop_assert!(envelope[ENCRYPTED_CONFIG_KEY].as_str().is_some_and(is_encrypted));
        for key in envelope.keys() {
            prop_assert!(
                [IS_ENCRYPTED_KEY, ENCRYPTED_CONFIG_KEY, "task_id", "task_type"].contains(&key.as_str()),
                "unexpected clear key {}", key
            );
        }
        for key in ["task_id", "task_type"] {
            prop_assert_eq!(envelope.get(key), config.get(key));
        }

        prop_assert_eq!(h.decrypt_payload(envelope).unwrap(), config);
    }

    /// Maps that are not envelopes come back unchanged.
    #[test]
    fn prop_plain_maps_pass_through(secret in arb_secret(), config in arb_task_config()) {
        prop_assert_eq!(handle(&secret).decrypt_payload(config.clone()).unwrap(), config);
    }
}
