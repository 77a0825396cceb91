//! Task Payload Integration Tests
//!
//! A task configuration sealed by one process and opened by another that
//! shares the secret.

use serde_json::{Map, Value, json};

use cms_edge::crypto::{ENCRYPTED_CONFIG_KEY, IS_ENCRYPTED_KEY};
use cms_edge::{CryptoError, CryptoHandle, EncryptionConfig};

fn task_config() -> Map<String, Value> {
    match json!({
        "task_id": 42,
        "task_type": "email",
        "host": "imap.example.com",
        "password": "s3cret",
        "folders": ["INBOX", "Archive"],
    }) {
        Value::Object(map) => map,
        _ => unreachable!("literal is an object"),
    }
}

fn enabled(secret: &str) -> CryptoHandle {
    CryptoHandle::from_config(&EncryptionConfig::default().with_enabled(true).with_key(secret))
        .expect("config is valid")
}

#[test]
fn test_scheduler_sees_routing_keys_only() {
    let producer = enabled("shared-task-secret");
    let envelope = producer.encrypt_payload(&task_config()).expect("seals");

    assert_eq!(envelope[IS_ENCRYPTED_KEY], json!(true));
    assert!(
        envelope[ENCRYPTED_CONFIG_KEY]
            .as_str()
            .is_some_and(|s| s.starts_with("enc:"))
    );
    assert_eq!(envelope["task_id"], json!(42));
    assert_eq!(envelope["task_type"], json!("email"));
    assert!(!envelope.contains_key("password"));
    assert!(!envelope.contains_key("host"));

    // Travels as JSON between processes.
    let wire = serde_json::to_string(&envelope).expect("serializes");
    let received: Map<String, Value> = serde_json::from_str(&wire).expect("parses");

    let consumer = enabled("shared-task-secret");
    assert_eq!(consumer.decrypt_payload(received).expect("opens"), task_config());
}

#[test]
fn test_legacy_plain_config_passes_through() {
    let consumer = enabled("shared-task-secret");
    let legacy = task_config();
    assert_eq!(consumer.decrypt_payload(legacy.clone()).expect("passthrough"), legacy);
}

#[test]
fn test_wrong_secret_cannot_open() {
    let envelope = enabled("secret-a")
        .encrypt_payload(&task_config())
        .expect("seals");
    assert!(enabled("secret-b").decrypt_payload(envelope).is_err());
}

#[test]
fn test_disabled_consumer_rejects_sealed_config() {
    let envelope = enabled("shared-task-secret")
        .encrypt_payload(&task_config())
        .expect("seals");
    let err = CryptoHandle::disabled()
        .decrypt_payload(envelope)
        .expect_err("needs the key");
    assert!(matches!(err, CryptoError::InvalidConfig { .. }));
}
