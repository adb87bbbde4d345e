//! The slice of the backend RPC API navigation depends on.
//!
//! Only two procedures matter here (`users.me`, `clients.get`) and only the
//! error code discriminator of their failures; payload details belong to
//! the pages.

use std::fmt;

use async_trait::async_trait;

use crate::errors::{ErrorKind, GrcError};
use crate::tenant::{ClientId, PlanTier, ServiceModel};

/// `error.data.code` of a failed RPC call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RpcCode {
    Unauthorized,
    Forbidden,
    NotFound,
    PreconditionFailed,
    Other(String),
}

impl RpcCode {
    pub fn parse(code: &str) -> Self {
        match code {
            "UNAUTHORIZED" => RpcCode::Unauthorized,
            "FORBIDDEN" => RpcCode::Forbidden,
            "NOT_FOUND" => RpcCode::NotFound,
            "PRECONDITION_FAILED" => RpcCode::PreconditionFailed,
            other => RpcCode::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RpcCode::Unauthorized => "UNAUTHORIZED",
            RpcCode::Forbidden => "FORBIDDEN",
            RpcCode::NotFound => "NOT_FOUND",
            RpcCode::PreconditionFailed => "PRECONDITION_FAILED",
            RpcCode::Other(code) => code,
        }
    }

    pub fn from_status(status: u16) -> Self {
        match status {
            401 => RpcCode::Unauthorized,
            403 => RpcCode::Forbidden,
            404 => RpcCode::NotFound,
            412 => RpcCode::PreconditionFailed,
            _ => RpcCode::Other(ErrorKind::from_status(status).rpc_code().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    pub code: RpcCode,
    pub message: String,
}

impl RpcError {
    pub fn new(code: RpcCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(RpcCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(RpcCode::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RpcCode::NotFound, message)
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::new(RpcCode::PreconditionFailed, message)
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for RpcError {}

impl From<RpcError> for GrcError {
    fn from(err: RpcError) -> Self {
        GrcError::new(ErrorKind::from_rpc_code(err.code.as_str()), err.message)
    }
}

/// `users.me`
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    /// Global (platform) role.
    #[cfg_attr(feature = "serde", serde(default))]
    pub role: Option<String>,
}

/// `clients.get`, as seen by the calling user.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ClientRecord {
    pub id: ClientId,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default, deserialize_with = "crate::tenant::lenient_plan_tier"))]
    pub plan_tier: Option<PlanTier>,
    /// The caller's role inside this tenant.
    #[cfg_attr(feature = "serde", serde(default))]
    pub role: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub service_model: ServiceModel,
}

#[async_trait]
pub trait WorkspaceApi: Send + Sync {
    async fn me(&self) -> Result<UserProfile, RpcError>;
    async fn client(&self, id: ClientId) -> Result<ClientRecord, RpcError>;
}

/// Builds an API client acting for one caller.
pub trait WorkspaceConnector: Send + Sync {
    fn connect(&self, access_token: &str) -> std::sync::Arc<dyn WorkspaceApi>;
}

/// Data-fetch state as the guard sees it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Fetch<T> {
    /// Not requested (e.g. no tenant id known).
    #[default]
    Idle,
    Loading,
    Ready(T),
    Failed(RpcError),
}

impl<T> Fetch<T> {
    pub fn from_result(res: Result<T, RpcError>) -> Self {
        match res {
            Ok(v) => Fetch::Ready(v),
            Err(e) => Fetch::Failed(e),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Fetch::Loading)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Fetch::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&RpcError> {
        match self {
            Fetch::Failed(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_parse_and_map_status() {
        assert_eq!(RpcCode::parse("FORBIDDEN"), RpcCode::Forbidden);
        assert_eq!(RpcCode::parse("TOO_MANY_REQUESTS"), RpcCode::Other("TOO_MANY_REQUESTS".into()));
        assert_eq!(RpcCode::from_status(412), RpcCode::PreconditionFailed);
        assert_eq!(RpcCode::from_status(500), RpcCode::Other("INTERNAL_SERVER_ERROR".into()));
    }

    #[test]
    fn rpc_error_converts_to_grc_error() {
        let grc: GrcError = RpcError::precondition_failed("subscription required").into();
        assert_eq!(grc.kind, ErrorKind::PreconditionFailed);
        assert_eq!(grc.code(), 412);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn client_record_defaults() {
        let rec: ClientRecord = serde_json::from_str(r#"{"id":7,"name":"Acme"}"#).unwrap();
        assert_eq!(rec.plan_tier, None);
        assert_eq!(rec.service_model, ServiceModel::SelfService);

        let rec: ClientRecord = serde_json::from_str(r#"{"id":7,"name":"Acme","planTier":"active"}"#).unwrap();
        assert_eq!(rec.plan_tier, None);
        let rec: ClientRecord = serde_json::from_str(r#"{"id":7,"name":"Acme","planTier":"Enterprise"}"#).unwrap();
        assert_eq!(rec.plan_tier, Some(PlanTier::Enterprise));
        assert!(serde_json::from_str::<ClientRecord>(r#"{"id":0,"name":"x"}"#).is_err());
    }
}
