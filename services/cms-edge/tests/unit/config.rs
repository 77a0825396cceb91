//! Configuration Wiring Unit Tests
//!
//! Settings read from the environment reach the component builders.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use ring::rand::SystemRandom;
use ring::signature::{ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair};

use cms_edge::audit::{AuditSigner, LogAuditSink, QueuedAuditSink, SignerError};
use cms_edge::{AuditOptions, AuthOptions, Config};

fn config(pairs: &[(&str, &str)]) -> Config {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    Config::from_vars(&vars).unwrap()
}

/// Writes a fresh PKCS#8 key and returns its path and DER bytes.
fn signing_key_file() -> (PathBuf, Vec<u8>) {
    let der = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &SystemRandom::new())
        .unwrap()
        .as_ref()
        .to_vec();
    let path = std::env::temp_dir().join(format!("cms-edge-audit-{}.pem", uuid::Uuid::new_v4()));
    std::fs::write(&path, pem::encode(&pem::Pem::new("PRIVATE KEY", der.clone()))).unwrap();
    (path, der)
}

#[test]
fn test_audit_options_load_configured_key() {
    let (path, der) = signing_key_file();
    let config = config(&[
        ("AUDIT_SIGNING_KEY_PATH", path.to_str().unwrap()),
        ("AUDIT_REQUIRE_SIGNING_KEY", "true"),
        ("LOGIN_OPERATION", "/app.v1.Auth/Login"),
        ("LOGOUT_OPERATION", "/app.v1.Auth/Logout"),
    ]);

    let options = AuditOptions::from_config(&config).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(options.login_operation, "/app.v1.Auth/Login");
    assert_eq!(options.logout_operation, "/app.v1.Auth/Logout");
    let signer = options.signer.unwrap();
    assert!(!signer.is_ephemeral());
    assert_eq!(signer.public_key(), AuditSigner::from_pkcs8_der(&der).unwrap().public_key());
}

#[test]
fn test_audit_options_fall_back_to_ephemeral_key() {
    let options = AuditOptions::from_config(&config(&[])).unwrap();
    assert!(options.signer.is_some_and(|s| s.is_ephemeral()));
}

#[test]
fn test_audit_options_fail_on_unreadable_key() {
    let config = config(&[
        ("AUDIT_SIGNING_KEY_PATH", "/nonexistent/cms-edge/audit.pem"),
        ("AUDIT_REQUIRE_SIGNING_KEY", "true"),
    ]);
    assert!(matches!(AuditOptions::from_config(&config), Err(SignerError::Io(_))));
}

#[test]
fn test_auth_options_take_whitelist() {
    let options = AuthOptions::from_config(&config(&[(
        "AUTH_WHITELIST",
        "/admin.service.v1.AuthenticationService/Login",
    )]));
    assert!(options.is_whitelisted("/admin.service.v1.AuthenticationService/Login"));
    assert!(!options.is_whitelisted("/admin.service.v1.UserService/Get"));
}

#[tokio::test]
async fn test_queue_capacity_from_config() {
    let queue = QueuedAuditSink::from_config(
        Arc::new(LogAuditSink),
        &config(&[("AUDIT_QUEUE_CAPACITY", "32")]),
        None,
    );
    assert_eq!(queue.capacity(), 32);
    queue.close().await;
}
