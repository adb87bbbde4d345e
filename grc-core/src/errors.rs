//! # Errors
//!
//! The shell speaks one structured error type, `GrcError`, shaped after the
//! error envelope the backend RPC layer returns:
//! - consistent status codes + class names
//! - an RPC code discriminator (`UNAUTHORIZED`, `FORBIDDEN`, ...)
//! - can be carried through `anyhow::Error`
//! - transport-agnostic (the HTTP crate decides how to serialize)
//!
//! With feature `serde` you also get `data` / `errors` as `serde_json::Value`
//! and a `to_json()` helper.

use std::fmt;

use anyhow::Error as AnyError;

/// A convenience result type for shell APIs that flow through `anyhow`.
pub type GrcResult<T> = std::result::Result<T, AnyError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,         // 400
    NotAuthenticated,   // 401
    Forbidden,          // 403
    NotFound,           // 404
    Conflict,           // 409
    PreconditionFailed, // 412
    Unprocessable,      // 422
    GeneralError,       // 500
    Unavailable,        // 503
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::NotAuthenticated => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::PreconditionFailed => 412,
            ErrorKind::Unprocessable => 422,
            ErrorKind::GeneralError => 500,
            ErrorKind::Unavailable => 503,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::NotAuthenticated => "NotAuthenticated",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::PreconditionFailed => "PreconditionFailed",
            ErrorKind::Unprocessable => "Unprocessable",
            ErrorKind::GeneralError => "GeneralError",
            ErrorKind::Unavailable => "Unavailable",
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::NotAuthenticated => "not-authenticated",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::PreconditionFailed => "precondition-failed",
            ErrorKind::Unprocessable => "unprocessable",
            ErrorKind::GeneralError => "general-error",
            ErrorKind::Unavailable => "unavailable",
        }
    }

    /// RPC `error.data.code` for this kind.
    pub fn rpc_code(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BAD_REQUEST",
            ErrorKind::NotAuthenticated => "UNAUTHORIZED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::PreconditionFailed => "PRECONDITION_FAILED",
            ErrorKind::Unprocessable => "UNPROCESSABLE_CONTENT",
            ErrorKind::GeneralError => "INTERNAL_SERVER_ERROR",
            ErrorKind::Unavailable => "SERVICE_UNAVAILABLE",
        }
    }

    /// Inverse of [`ErrorKind::rpc_code`]. Unknown codes map to `GeneralError`.
    pub fn from_rpc_code(code: &str) -> Self {
        match code {
            "BAD_REQUEST" | "PARSE_ERROR" => ErrorKind::BadRequest,
            "UNAUTHORIZED" => ErrorKind::NotAuthenticated,
            "FORBIDDEN" => ErrorKind::Forbidden,
            "NOT_FOUND" => ErrorKind::NotFound,
            "CONFLICT" => ErrorKind::Conflict,
            "PRECONDITION_FAILED" => ErrorKind::PreconditionFailed,
            "UNPROCESSABLE_CONTENT" => ErrorKind::Unprocessable,
            "SERVICE_UNAVAILABLE" => ErrorKind::Unavailable,
            _ => ErrorKind::GeneralError,
        }
    }

    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorKind::BadRequest,
            401 => ErrorKind::NotAuthenticated,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            412 => ErrorKind::PreconditionFailed,
            422 => ErrorKind::Unprocessable,
            503 => ErrorKind::Unavailable,
            _ => ErrorKind::GeneralError,
        }
    }
}

#[cfg(feature = "serde")]
pub type ErrorValue = serde_json::Value;

#[cfg(not(feature = "serde"))]
pub type ErrorValue = std::sync::Arc<dyn std::any::Any + Send + Sync>;

/// A structured shell error that can live inside `anyhow::Error`.
#[derive(Debug)]
pub struct GrcError {
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<ErrorValue>,
    pub errors: Option<ErrorValue>,
    pub source: Option<AnyError>,
}

impl GrcError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            errors: None,
            source: None,
        }
    }

    pub fn with_data(mut self, data: ErrorValue) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_errors(mut self, errors: ErrorValue) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    pub fn rpc_code(&self) -> &'static str {
        self.kind.rpc_code()
    }

    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Find a `GrcError` anywhere in an `anyhow` chain.
    pub fn from_anyhow(err: &AnyError) -> Option<&GrcError> {
        err.chain().find_map(|e| e.downcast_ref::<GrcError>())
    }

    /// Turn any error into a GrcError:
    /// - if it's already a GrcError, keep it (lossless)
    /// - otherwise wrap as GeneralError
    pub fn normalize(err: AnyError) -> GrcError {
        match err.downcast::<GrcError>() {
            Ok(grc) => grc,
            Err(other) => GrcError::new(ErrorKind::GeneralError, other.to_string()).with_source(other),
        }
    }

    /// Client-safe copy: drops the inner `source`. General errors also lose
    /// their message so raw internals never reach the browser.
    pub fn sanitize_for_client(&self) -> GrcError {
        let message = if self.kind == ErrorKind::GeneralError {
            "Something went wrong".to_string()
        } else {
            self.message.clone()
        };
        GrcError {
            kind: self.kind,
            message,
            data: self.data.clone(),
            errors: self.errors.clone(),
            source: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthenticated, msg)
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, msg)
    }
    pub fn precondition_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::PreconditionFailed, msg)
    }
    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unprocessable, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, msg)
    }
}

impl fmt::Display for GrcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for GrcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(feature = "serde")]
impl GrcError {
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;

        let mut base = json!({
            "name": self.name(),
            "message": self.message,
            "code": self.code(),
            "className": self.class_name(),
        });

        if let Some(d) = &self.data {
            base["data"] = d.clone();
        }
        if let Some(e) = &self.errors {
            base["errors"] = e.clone();
        }
        base
    }
}

/// Convenience helper for "bail with GrcError".
#[macro_export]
macro_rules! bail_grc {
    ($ctor:ident, $msg:expr) => {
        return Err($crate::errors::GrcError::$ctor($msg).into_anyhow());
    };
    ($ctor:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::GrcError::$ctor(format!($fmt, $($arg)*)).into_anyhow());
    };
}
