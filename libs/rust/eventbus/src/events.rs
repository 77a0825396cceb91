//! Well-known event types and their payloads.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Email received
pub const EMAIL_RECEIVED: &str = "email.received";
/// Email sent
pub const EMAIL_SENT: &str = "email.sent";
/// Email deleted
pub const EMAIL_DELETED: &str = "email.deleted";
/// Email read
pub const EMAIL_READ: &str = "email.read";
/// Email flagged
pub const EMAIL_FLAGGED: &str = "email.flagged";
/// Email processed
pub const EMAIL_PROCESSED: &str = "email.processed";
/// Email processing failed
pub const EMAIL_FAILED: &str = "email.failed";

/// User created
pub const USER_CREATED: &str = "user.created";
/// User updated
pub const USER_UPDATED: &str = "user.updated";
/// User deleted
pub const USER_DELETED: &str = "user.deleted";
/// User logged in
pub const USER_LOGGED_IN: &str = "user.logged_in";
/// User logged out
pub const USER_LOGGED_OUT: &str = "user.logged_out";

/// Task created
pub const TASK_CREATED: &str = "task.created";
/// Task started
pub const TASK_STARTED: &str = "task.started";
/// Task completed
pub const TASK_COMPLETED: &str = "task.completed";
/// Task failed
pub const TASK_FAILED: &str = "task.failed";
/// Task cancelled
pub const TASK_CANCELLED: &str = "task.cancelled";

/// System started
pub const SYSTEM_STARTED: &str = "system.started";
/// System stopped
pub const SYSTEM_STOPPED: &str = "system.stopped";
/// System error
pub const SYSTEM_ERROR: &str = "system.error";

/// Payload of [`EMAIL_RECEIVED`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailReceivedEvent {
    pub email_id: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub mailbox: String,
    pub account_id: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub tenant_id: u32,
}

/// Payload of [`EMAIL_PROCESSED`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailProcessedEvent {
    pub email_id: String,
    pub account_id: String,
    pub mailbox: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// Payload of [`USER_CREATED`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreatedEvent {
    pub user_id: u32,
    pub username: String,
    pub email: String,
}

/// Payload of [`TASK_COMPLETED`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskCompletedEvent {
    pub task_id: String,
    pub task_type: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub result: HashMap<String, serde_json::Value>,
    #[serde(rename = "duration_ms")]
    pub duration: i64,
}

/// Payload of [`SYSTEM_ERROR`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemErrorEvent {
    pub component: String,
    pub error: String,
    pub severity: String,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(v: &u32) -> bool {
    *v == 0
}
