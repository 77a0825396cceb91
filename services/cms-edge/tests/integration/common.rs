//! Shared fixtures for the integration suite.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header};
use mockall::mock;
use serde_json::{Value, json};
use tokio::sync::mpsc::{self, UnboundedReceiver};

use cms_edge::audit::{AuditSink, SharedAuditSink};
use cms_edge::proto::{ApiAuditLog, LoginAuditLog, UserTokenPayload};
use cms_edge::token::{AccessTokenChecker, SharedChecker, TokenClaims};

pub const USERS_OPERATION: &str = "/admin.service.v1.UserService/Get";
pub const USERS_TEMPLATE: &str = "/admin/v1/users/{id}";
pub const LOGIN_OPERATION: &str = "/admin.service.v1.AuthenticationService/Login";

mock! {
    pub Checker {}

    #[async_trait]
    impl AccessTokenChecker for Checker {
        async fn is_valid_access_token(&self, token: &str, skip_cache: bool) -> Option<UserTokenPayload>;
        async fn is_blocked_access_token(&self, token: &str) -> bool;
    }
}

mock! {
    pub Sink {}

    #[async_trait]
    impl AuditSink for Sink {
        async fn write_api(&self, record: ApiAuditLog) -> anyhow::Result<()>;
        async fn write_login(&self, record: LoginAuditLog) -> anyhow::Result<()>;
    }
}

/// Sign `claims` as an HS256 JWT. The edge never verifies the signature
/// itself, so the key does not matter.
pub fn mint_token(claims: &Value) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(b"integration-secret"),
    )
    .expect("token encodes")
}

/// Claims of user 7 in tenant 2, expiring `exp_offset_secs` from now.
pub fn user_claims(exp_offset_secs: i64) -> Value {
    json!({
        "sub": "alice",
        "uid": 7,
        "tid": 2,
        "ouid": 3,
        "ds": "UNIT_ONLY",
        "roc": ["editor"],
        "exp": Utc::now().timestamp() + exp_offset_secs,
    })
}

/// Checker that accepts any token whose claims parse and have not expired,
/// the way the authentication service would.
pub fn claims_checker() -> SharedChecker {
    let mut checker = MockChecker::new();
    checker.expect_is_valid_access_token().returning(|token, _| {
        let claims = TokenClaims::parse_unverified(token).ok()?;
        if claims.is_expired() {
            return None;
        }
        claims.to_payload().ok()
    });
    checker.expect_is_blocked_access_token().returning(|_| false);
    Arc::new(checker)
}

/// Sink forwarding every record to a channel.
pub struct CapturingSink {
    pub sink: SharedAuditSink,
    pub api: UnboundedReceiver<ApiAuditLog>,
    pub login: UnboundedReceiver<LoginAuditLog>,
}

pub fn capturing_sink() -> CapturingSink {
    let (api_tx, api) = mpsc::unbounded_channel();
    let (login_tx, login) = mpsc::unbounded_channel();

    let mut sink = MockSink::new();
    sink.expect_write_api().returning(move |record| {
        api_tx
            .send(record)
            .map_err(|_| anyhow::anyhow!("api receiver dropped"))
    });
    sink.expect_write_login().returning(move |record| {
        login_tx
            .send(record)
            .map_err(|_| anyhow::anyhow!("login receiver dropped"))
    });

    CapturingSink {
        sink: Arc::new(sink),
        api,
        login,
    }
}

/// Next record from `rx`, failing the test after a few seconds.
pub async fn next_record<T>(rx: &mut UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("record emitted in time")
        .expect("sink channel open")
}
