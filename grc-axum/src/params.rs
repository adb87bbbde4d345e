use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use grc_auth::{bearer_from_header_map, SessionProvider, SessionState};
use grc_core::errors::GrcError;
use grc_core::rpc::WorkspaceApi;
use grc_core::tenant::ClientId;
use serde::Deserialize;
use serde_json::json;

use crate::{ShellError, ShellState};

/// `GET /nav/menu`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuQuery {
    /// Current location path; defaults to the dashboard.
    pub path: Option<String>,
    /// Current query string, with or without the leading `?`.
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub search: String,
}

/// `GET /nav/resolve`
#[derive(Debug, Clone, Deserialize)]
pub struct ResolveQuery {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectClient {
    pub client_id: ClientId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SidebarWidth {
    pub width: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignIn {
    pub access_token: String,
}

pub fn map_json_rejection(rejection: JsonRejection) -> ShellError {
    GrcError::bad_request("Failed to parse the request body as JSON")
        .with_errors(json!({"_schema": [rejection.to_string()]}))
        .into()
}

/// The caller's session: a bearer token on the request wins, otherwise the
/// shell's own signed-in session.
#[derive(Debug, Clone)]
pub struct RequestSession(pub SessionState);

impl RequestSession {
    pub fn state(&self) -> &SessionState {
        &self.0
    }

    /// A backend client acting for this session, when there is one.
    pub fn api(&self, state: &ShellState) -> Option<Arc<dyn WorkspaceApi>> {
        let session = self.0.session()?;
        let connector = state.connector.as_ref()?;
        Some(connector.connect(&session.access_token))
    }
}

impl FromRequestParts<ShellState> for RequestSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &ShellState) -> Result<Self, Self::Rejection> {
        let session = match bearer_from_header_map(&parts.headers) {
            Some(token) => state.sessions.state_for_token(Some(&token)),
            None => state.sessions.current_session().await,
        };
        Ok(Self(session))
    }
}
