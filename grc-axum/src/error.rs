use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use grc_core::errors::GrcError;

#[derive(Debug)]
pub struct ShellError(pub anyhow::Error);

impl From<anyhow::Error> for ShellError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<GrcError> for ShellError {
    fn from(e: GrcError) -> Self {
        Self(e.into_anyhow())
    }
}

impl IntoResponse for ShellError {
    fn into_response(self) -> Response {
        // A GrcError anywhere in the chain keeps its kind and fields.
        if let Some(grc) = GrcError::from_anyhow(&self.0) {
            let safe = grc.sanitize_for_client();
            let status = StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if status.is_server_error() {
                tracing::error!(error = %self.0, "request failed");
            }
            return (status, Json(safe.to_json())).into_response();
        }

        // Anything else is a general error: the fallback screen.
        tracing::error!(error = %self.0, "unhandled error");
        let safe = GrcError::general_error(self.0.to_string()).sanitize_for_client();
        let status = StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(safe.to_json())).into_response()
    }
}
