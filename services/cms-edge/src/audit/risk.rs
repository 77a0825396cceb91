//! Stateless login risk heuristics.
//!
//! Score bands and the factor vocabulary are part of the record contract.
//! Changing either requires a record schema version bump.

use std::collections::BTreeSet;
use std::net::IpAddr;

use crate::proto::{LoginAuditLog, RiskLevel, Status};

/// Login failed
pub const FAILED_LOGIN: &str = "FAILED_LOGIN";
/// A username was given but no user id resolved
pub const UNKNOWN_USER: &str = "UNKNOWN_USER";
/// No authenticated user id
pub const ANONYMOUS_LOGIN: &str = "ANONYMOUS_LOGIN";
/// No client id
pub const UNKNOWN_DEVICE: &str = "UNKNOWN_DEVICE";
/// MFA reported failed
pub const MFA_FAILED: &str = "MFA_FAILED";
/// MFA reported unverified
pub const MFA_UNVERIFIED: &str = "MFA_UNVERIFIED";
/// No client address
pub const IP_MISSING: &str = "IP_MISSING";
/// Private or loopback address
pub const INTERNAL_IP: &str = "INTERNAL_IP";
/// Public address
pub const EXTERNAL_IP: &str = "EXTERNAL_IP";
/// Failure reason mentions the password
pub const PASSWORD_FAILURE: &str = "PASSWORD_FAILURE";
/// Failure reason mentions MFA
pub const MFA_FAILURE_REASON: &str = "MFA_FAILURE_REASON";
/// No session id
pub const NO_SESSION: &str = "NO_SESSION";
/// No request id
pub const NO_REQUEST_ID: &str = "NO_REQUEST_ID";
/// Score above 70
pub const HIGH_RISK_SCORE: &str = "HIGH_RISK_SCORE";
/// Score 31 to 70
pub const MEDIUM_RISK_SCORE: &str = "MEDIUM_RISK_SCORE";
/// Score 1 to 30
pub const LOW_RISK_SCORE: &str = "LOW_RISK_SCORE";

/// Loopback, RFC 1918, link-local and unique-local addresses.
#[must_use]
pub fn is_private_ip(ip: &str) -> bool {
    match ip.trim().parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
        Ok(IpAddr::V6(v6)) => v6.is_loopback() || (v6.segments()[0] & 0xfe00) == 0xfc00,
        Err(_) => false,
    }
}

fn has_client_id(log: &LoginAuditLog) -> bool {
    log.device_info
        .as_ref()
        .is_some_and(|d| !d.client_id.is_empty())
}

/// Risk score from 0 to 100.
#[must_use]
pub fn score(log: &LoginAuditLog) -> u32 {
    let mut score: i32 = 0;

    if log.status() == Status::Failed {
        score += 50;
    }
    if log.user_id() == 0 {
        score += if log.username.is_empty() { 20 } else { 10 };
    }
    if !has_client_id(log) {
        score += 10;
    }
    if log.ip_address.is_empty() {
        score += 5;
    } else if is_private_ip(&log.ip_address) {
        score -= 10;
    }

    score.clamp(0, 100).unsigned_abs()
}

/// Band for a score.
#[must_use]
pub const fn level(score: u32) -> RiskLevel {
    match score {
        0..=30 => RiskLevel::Low,
        31..=70 => RiskLevel::Medium,
        _ => RiskLevel::High,
    }
}

/// Sorted, deduplicated factors. Reads `risk_score`, so set that first.
///
/// `ANONYMOUS_LOGIN` marks any login without a resolved user id;
/// `UNKNOWN_USER` is added on top when a username was supplied.
#[must_use]
pub fn factors(log: &LoginAuditLog) -> Vec<String> {
    let mut set = BTreeSet::new();

    if log.status() == Status::Failed {
        set.insert(FAILED_LOGIN);
    }

    if log.user_id() == 0 {
        set.insert(ANONYMOUS_LOGIN);
        if !log.username.is_empty() {
            set.insert(UNKNOWN_USER);
        }
    }

    if !has_client_id(log) {
        set.insert(UNKNOWN_DEVICE);
    }

    let mfa = log.mfa_status.trim().to_uppercase();
    if mfa.contains("FAILED") {
        set.insert(MFA_FAILED);
    }
    if mfa.contains("UNVERIFIED") || mfa.contains("UNVERIFY") {
        set.insert(MFA_UNVERIFIED);
    }

    let ip = log.ip_address.trim();
    if ip.is_empty() {
        set.insert(IP_MISSING);
    } else if is_private_ip(ip) {
        set.insert(INTERNAL_IP);
    } else {
        set.insert(EXTERNAL_IP);
    }

    let reason = log.failure_reason.trim().to_lowercase();
    if ["password", "pwd", "incorrect"].iter().any(|k| reason.contains(k)) {
        set.insert(PASSWORD_FAILURE);
    }
    if reason.contains("mfa") {
        set.insert(MFA_FAILURE_REASON);
    }

    if log.session_id.is_empty() {
        set.insert(NO_SESSION);
    }
    if log.request_id.is_empty() {
        set.insert(NO_REQUEST_ID);
    }

    match log.risk_score {
        71.. => set.insert(HIGH_RISK_SCORE),
        31..=70 => set.insert(MEDIUM_RISK_SCORE),
        1..=30 => set.insert(LOW_RISK_SCORE),
        0 => false,
    };

    set.into_iter().map(str::to_string).collect()
}

/// Fill `risk_score`, `risk_level` and `risk_factors`.
pub fn assess(log: &mut LoginAuditLog) {
    log.risk_score = score(log);
    log.set_risk_level(level(log.risk_score));
    log.risk_factors = factors(log);
}
