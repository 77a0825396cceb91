//! Identity enums: data scopes granted to a caller.

/// Rows a caller may read, as granted by the identity service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum DataScope {
    /// No data access
    None = 0,
    /// Only rows the caller owns
    SelfOnly = 1,
    /// Rows of the caller's org unit
    UnitOnly = 2,
    /// Rows of the caller's org unit and its children
    UnitAndChild = 3,
    /// Every row in the tenant
    All = 4,
}

impl DataScope {
    /// Canonical name, as carried in the `ds` token claim.
    #[must_use]
    pub const fn as_str_name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::SelfOnly => "SELF",
            Self::UnitOnly => "UNIT_ONLY",
            Self::UnitAndChild => "UNIT_AND_CHILD",
            Self::All => "ALL",
        }
    }

    /// Parse a canonical name.
    #[must_use]
    pub fn from_str_name(value: &str) -> Option<Self> {
        match value {
            "NONE" => Some(Self::None),
            "SELF" => Some(Self::SelfOnly),
            "UNIT_ONLY" => Some(Self::UnitOnly),
            "UNIT_AND_CHILD" => Some(Self::UnitAndChild),
            "ALL" => Some(Self::All),
            _ => None,
        }
    }
}

/// Query-side scope tag a viewer applies when filtering rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ScopeType {
    /// Nothing is visible
    None = 0,
    /// Everything is visible
    All = 1,
    /// Org-unit restricted
    Unit = 2,
    /// Owner restricted
    SelfOnly = 3,
}

impl From<DataScope> for ScopeType {
    fn from(scope: DataScope) -> Self {
        match scope {
            DataScope::All => Self::All,
            DataScope::UnitOnly | DataScope::UnitAndChild => Self::Unit,
            DataScope::SelfOnly => Self::SelfOnly,
            DataScope::None => Self::None,
        }
    }
}

/// Scope list carried in the `x-data-scope` broker header.
#[derive(Clone, PartialEq, prost::Message)]
pub struct DataScopeList {
    /// Scope tags in grant order
    #[prost(enumeration = "ScopeType", repeated, tag = "1")]
    pub scopes: Vec<i32>,
}

impl DataScopeList {
    /// Build from viewer scopes.
    #[must_use]
    pub fn from_scopes(scopes: &[ScopeType]) -> Self {
        Self {
            scopes: scopes.iter().map(|s| *s as i32).collect(),
        }
    }

    /// Known scope tags; unknown values are dropped.
    #[must_use]
    pub fn to_scopes(&self) -> Vec<ScopeType> {
        self.scopes
            .iter()
            .filter_map(|v| ScopeType::try_from(*v).ok())
            .collect()
    }
}
