//! Request-scoped view of the caller.
//!
//! Downstream code reads the [`Viewer`] to decide tenant filtering and data
//! scope. It is installed for the duration of a future with
//! [`Viewer::scope`] and read back with [`Viewer::current`].

use std::future::Future;

use crate::proto::{DataScope, ScopeType};

tokio::task_local! {
    static CURRENT_VIEWER: Viewer;
}

/// An authenticated user's view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserViewer {
    uid: u64,
    tid: u64,
    ouid: u64,
    data_scopes: Vec<ScopeType>,
    roles: Vec<String>,
    permissions: Vec<String>,
    trace_id: String,
}

impl UserViewer {
    /// Viewer with a single scope derived from `data_scope`.
    #[must_use]
    pub fn new(uid: u64, tid: u64, ouid: u64, trace_id: impl Into<String>, data_scope: DataScope) -> Self {
        Self::with_data_scopes(uid, tid, ouid, trace_id, vec![data_scope.into()])
    }

    /// Viewer with explicit scope tags.
    #[must_use]
    pub fn with_data_scopes(
        uid: u64,
        tid: u64,
        ouid: u64,
        trace_id: impl Into<String>,
        data_scopes: Vec<ScopeType>,
    ) -> Self {
        Self {
            uid,
            tid,
            ouid,
            data_scopes,
            trace_id: trace_id.into(),
            ..Self::default()
        }
    }

    /// Attach role codes.
    #[must_use]
    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    /// Attach permission codes.
    #[must_use]
    pub fn with_permissions(mut self, permissions: Vec<String>) -> Self {
        self.permissions = permissions;
        self
    }
}

/// Who the current code runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    /// A user request
    User(UserViewer),
    /// A privileged background writer
    System,
}

impl From<UserViewer> for Viewer {
    fn from(viewer: UserViewer) -> Self {
        Self::User(viewer)
    }
}

impl Viewer {
    /// User id, 0 for system.
    #[must_use]
    pub const fn user_id(&self) -> u64 {
        match self {
            Self::User(v) => v.uid,
            Self::System => 0,
        }
    }

    /// Tenant id, 0 for system.
    #[must_use]
    pub const fn tenant_id(&self) -> u64 {
        match self {
            Self::User(v) => v.tid,
            Self::System => 0,
        }
    }

    /// Org unit id, 0 for system.
    #[must_use]
    pub const fn org_unit_id(&self) -> u64 {
        match self {
            Self::User(v) => v.ouid,
            Self::System => 0,
        }
    }

    /// Scope tags used when filtering rows.
    #[must_use]
    pub fn data_scopes(&self) -> &[ScopeType] {
        match self {
            Self::User(v) => &v.data_scopes,
            Self::System => &[],
        }
    }

    /// Role codes.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        match self {
            Self::User(v) => &v.roles,
            Self::System => &[],
        }
    }

    /// Permission codes.
    #[must_use]
    pub fn permissions(&self) -> &[String] {
        match self {
            Self::User(v) => &v.permissions,
            Self::System => &[],
        }
    }

    /// Trace id of the originating request, empty for system.
    #[must_use]
    pub fn trace_id(&self) -> &str {
        match self {
            Self::User(v) => &v.trace_id,
            Self::System => "",
        }
    }

    /// Users defer to the authorization engine; system may do anything.
    #[must_use]
    pub const fn has_permission(&self, _action: &str, _resource: &str) -> bool {
        matches!(self, Self::System)
    }

    /// Platform (administrative) context: tenant 0.
    #[must_use]
    pub const fn is_platform_context(&self) -> bool {
        match self {
            Self::User(v) => v.tid == 0,
            Self::System => true,
        }
    }

    /// Tenant context: non-zero tenant.
    #[must_use]
    pub const fn is_tenant_context(&self) -> bool {
        match self {
            Self::User(v) => v.tid > 0,
            Self::System => false,
        }
    }

    /// Background system task.
    #[must_use]
    pub const fn is_system_context(&self) -> bool {
        matches!(self, Self::System)
    }

    /// Whether ORM hooks should emit audit entries for this viewer.
    #[must_use]
    pub const fn should_audit(&self) -> bool {
        false
    }

    /// Run `fut` with this viewer installed.
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        CURRENT_VIEWER.scope(self, fut).await
    }

    /// Viewer installed by [`scope`](Self::scope), if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        CURRENT_VIEWER.try_with(Clone::clone).ok()
    }
}
