//! Core multi-tenant types for the workspace shell.

use std::fmt;
use std::str::FromStr;

use crate::errors::GrcError;

/// A tenant ("client") identifier as it appears in `/clients/<id>` URLs.
///
/// Only positive ids are valid; parsing rejects zero and negatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "i64", into = "i64"))]
pub struct ClientId(i64);

impl ClientId {
    pub fn new(id: i64) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for ClientId {
    type Error = GrcError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| GrcError::bad_request(format!("invalid client id: {value}")))
    }
}

impl From<ClientId> for i64 {
    fn from(id: ClientId) -> Self {
        id.0
    }
}

impl FromStr for ClientId {
    type Err = GrcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Digits only: "+7", " 7" and "07x" are not tenant segments.
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GrcError::bad_request(format!("invalid client id: {s:?}")));
        }
        let id: i64 = s
            .parse()
            .map_err(|_| GrcError::bad_request(format!("invalid client id: {s:?}")))?;
        Self::try_from(id)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subscription level gating premium features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PlanTier {
    Free,
    Pro,
    Enterprise,
}

impl PlanTier {
    /// Case-insensitive parse. Unknown tiers are `None`, never a paid tier.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Some(PlanTier::Free),
            "pro" => Some(PlanTier::Pro),
            "enterprise" => Some(PlanTier::Enterprise),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Pro => "pro",
            PlanTier::Enterprise => "enterprise",
        }
    }

    pub fn is_premium(&self) -> bool {
        matches!(self, PlanTier::Pro | PlanTier::Enterprise)
    }
}

/// Deserialize an optional plan tier, mapping unknown strings to `None`.
#[cfg(feature = "serde")]
pub fn lenient_plan_tier<'de, D>(deserializer: D) -> Result<Option<PlanTier>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(PlanTier::parse))
}

/// How a tenant is serviced. Managed tenants get the evidence intake desk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ServiceModel {
    #[default]
    SelfService,
    Managed,
}

/// Global roles that may see the administration area.
pub fn is_global_admin(role: Option<&str>) -> bool {
    matches!(
        role.map(|r| r.trim().to_ascii_lowercase()).as_deref(),
        Some("admin" | "owner" | "super_admin")
    )
}

/// Tenant-scoped roles that may manage a workspace.
pub fn is_tenant_manager(role: Option<&str>) -> bool {
    matches!(
        role.map(|r| r.trim().to_ascii_lowercase()).as_deref(),
        Some("admin" | "owner")
    )
}

/// The currently selected workspace as seen by navigation.
///
/// Owned by [`crate::store::ClientContextStore`]; everyone else reads a
/// snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct WorkspaceContext {
    pub selected_client_id: Option<ClientId>,
    pub plan_tier: Option<PlanTier>,
    pub user_role: Option<String>,
}

impl WorkspaceContext {
    pub fn for_client(id: ClientId) -> Self {
        Self {
            selected_client_id: Some(id),
            ..Self::default()
        }
    }

    pub fn with_plan(mut self, tier: PlanTier) -> Self {
        self.plan_tier = Some(tier);
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.user_role = Some(role.into());
        self
    }

    pub fn has_client(&self) -> bool {
        self.selected_client_id.is_some()
    }
}
