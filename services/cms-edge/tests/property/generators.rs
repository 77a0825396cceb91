//! Proptest Generators
//!
//! Shared generators for property-based tests.

use proptest::prelude::*;
use serde_json::{Map, Value};

use cms_edge::proto::{
    ActionType, ApiAuditLog, DataScope, LoginAuditLog, OperatorKind, OperatorMetadata, Status,
    UserTokenPayload,
};

/// Generates non-empty encryption secrets
pub fn arb_secret() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9!@#%^&*]{1,48}"
}

/// Generates plaintext, including text that merely looks encrypted
pub fn arb_plaintext() -> impl Strategy<Value = String> {
    prop_oneof![
        any::<String>(),
        "enc:?[a-z]{0,8}",
        Just(String::new()),
    ]
}

/// Generates values that never carry the `enc:` tag
pub fn arb_unencrypted() -> impl Strategy<Value = String> {
    any::<String>().prop_filter("not tagged", |s| !s.starts_with("enc:"))
}

fn arb_json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[ -~]{0,24}".prop_map(Value::String),
    ]
}

/// Generates task configuration maps, sometimes with routing keys
pub fn arb_task_config() -> impl Strategy<Value = Map<String, Value>> {
    (
        prop::collection::btree_map("[a-z][a-z_]{0,12}", arb_json_leaf(), 0..8),
        prop::option::of(any::<u32>()),
        prop::option::of("[a-z]{3,10}"),
    )
        .prop_map(|(fields, task_id, task_type)| {
            let mut map: Map<String, Value> = fields
                .into_iter()
                .filter(|(k, _)| !k.starts_with('_'))
                .collect();
            if let Some(id) = task_id {
                map.insert("task_id".into(), Value::from(id));
            }
            if let Some(kind) = task_type {
                map.insert("task_type".into(), Value::from(kind));
            }
            map
        })
}

/// Generates data scopes
pub fn arb_data_scope() -> impl Strategy<Value = DataScope> {
    prop_oneof![
        Just(DataScope::None),
        Just(DataScope::SelfOnly),
        Just(DataScope::UnitOnly),
        Just(DataScope::UnitAndChild),
        Just(DataScope::All),
    ]
}

/// Generates role or permission code lists
pub fn arb_codes() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z][a-z:_]{1,15}", 0..4)
}

/// Generates operator identities
pub fn arb_operator() -> impl Strategy<Value = OperatorMetadata> {
    (
        prop_oneof![
            Just(OperatorKind::User),
            Just(OperatorKind::Service),
            Just(OperatorKind::System),
        ],
        any::<u64>(),
        any::<u64>(),
        any::<u64>(),
        arb_data_scope(),
        arb_codes(),
        prop::option::of("[a-z0-9-]{1,20}"),
    )
        .prop_map(|(kind, user_id, tenant_id, org_unit_id, scope, role_codes, jti)| OperatorMetadata {
            kind: kind as i32,
            user_id,
            tenant_id,
            org_unit_id,
            data_scope: scope as i32,
            role_codes,
            jti,
            ..Default::default()
        })
}

/// Generates validated token payloads
pub fn arb_token_payload() -> impl Strategy<Value = UserTokenPayload> {
    (
        "[a-z]{1,12}",
        1..u32::MAX,
        prop::option::of(1..u32::MAX),
        arb_codes(),
        prop::option::of(arb_data_scope()),
    )
        .prop_map(|(username, user_id, tenant_id, roles, scope)| UserTokenPayload {
            username: Some(username),
            user_id,
            tenant_id,
            roles,
            data_scope: scope.map(|s| s as i32),
            ..Default::default()
        })
}

/// Generates api records as the auditor fills them
pub fn arb_api_record() -> impl Strategy<Value = ApiAuditLog> {
    (
        prop::option::of(any::<u32>()),
        "[a-z]{0,10}",
        "(GET|POST|PUT|DELETE)",
        "/[a-z/{}]{0,30}",
        100u32..600,
        0u64..10_000,
    )
        .prop_map(|(user_id, username, method, path, status, latency)| ApiAuditLog {
            user_id,
            username,
            http_method: method,
            path,
            status_code: status,
            success: status < 400,
            latency_ms: latency,
            ..Default::default()
        })
}

/// Generates login records before assessment
pub fn arb_login_record() -> impl Strategy<Value = LoginAuditLog> {
    (
        prop::option::of(0..100u32),
        "[a-z]{0,8}",
        prop_oneof![
            Just(String::new()),
            Just("10.1.2.3".to_string()),
            Just("203.0.113.9".to_string()),
            Just("::1".to_string()),
        ],
        any::<bool>(),
        prop_oneof![
            Just(String::new()),
            Just("INCORRECT_PASSWORD".to_string()),
            Just("MFA_REQUIRED".to_string()),
        ],
        prop_oneof![Just(String::new()), Just("FAILED".to_string()), Just("UNVERIFIED".to_string())],
    )
        .prop_map(|(user_id, username, ip, ok, reason, mfa)| {
            let mut log = LoginAuditLog {
                user_id,
                username,
                ip_address: ip,
                failure_reason: reason,
                mfa_status: mfa,
                ..Default::default()
            };
            log.set_action_type(ActionType::Login);
            log.set_status(if ok { Status::Success } else { Status::Failed });
            log
        })
}
