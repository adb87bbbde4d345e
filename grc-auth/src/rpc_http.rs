//! `reqwest` client for the backend procedures navigation needs.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use grc_core::rpc::{ClientRecord, RpcCode, RpcError, UserProfile, WorkspaceApi, WorkspaceConnector};
use grc_core::tenant::ClientId;

#[derive(Clone, Debug)]
pub struct HttpWorkspaceApi {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl HttpWorkspaceApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: None,
        }
    }

    /// A copy that calls on behalf of `access_token`.
    pub fn for_token(&self, access_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            ..self.clone()
        }
    }

    fn url(&self, procedure: &str) -> String {
        format!("{}/rpc/{}", self.base_url, procedure)
    }

    async fn call<T: DeserializeOwned>(&self, procedure: &str, input: Option<serde_json::Value>) -> Result<T, RpcError> {
        let mut req = self.client.get(self.url(procedure));
        if let Some(input) = input {
            req = req.query(&[("input", input.to_string())]);
        }
        if let Some(token) = &self.access_token {
            req = req.bearer_auth(token);
        }

        let res = req.send().await.map_err(|e| {
            tracing::warn!(procedure, error = %e, "rpc transport failure");
            RpcError::new(RpcCode::Other("TRANSPORT".to_string()), e.to_string())
        })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| RpcError::new(RpcCode::Other("TRANSPORT".to_string()), e.to_string()))?;

        if !status.is_success() {
            let err = decode_error(status.as_u16(), &body);
            tracing::debug!(procedure, status = status.as_u16(), code = err.code.as_str(), "rpc error");
            return Err(err);
        }

        decode_result(&body)
    }
}

#[async_trait]
impl WorkspaceApi for HttpWorkspaceApi {
    async fn me(&self) -> Result<UserProfile, RpcError> {
        self.call("users.me", None).await
    }

    async fn client(&self, id: ClientId) -> Result<ClientRecord, RpcError> {
        self.call("clients.get", Some(json!({ "id": id.get() }))).await
    }
}

/// Connector that hands out [`HttpWorkspaceApi`] clients sharing one
/// connection pool.
#[derive(Clone, Debug)]
pub struct HttpConnector {
    api: HttpWorkspaceApi,
}

impl HttpConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            api: HttpWorkspaceApi::new(base_url),
        }
    }
}

impl WorkspaceConnector for HttpConnector {
    fn connect(&self, access_token: &str) -> Arc<dyn WorkspaceApi> {
        Arc::new(self.api.for_token(access_token))
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<ErrorData>,
}

#[derive(Deserialize)]
struct ErrorData {
    code: Option<String>,
}

/// `{"error":{"message":..,"data":{"code":..}}}`, falling back to the
/// HTTP status when the body carries no code.
pub fn decode_error(status: u16, body: &str) -> RpcError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => {
            let code = env
                .error
                .data
                .and_then(|d| d.code)
                .map(|c| RpcCode::parse(&c))
                .unwrap_or_else(|| RpcCode::from_status(status));
            RpcError::new(code, env.error.message)
        }
        Err(_) => RpcError::new(RpcCode::from_status(status), format!("HTTP {status}")),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ResultEnvelope<T> {
    Wrapped { result: ResultData<T> },
    Bare(T),
}

#[derive(Deserialize)]
struct ResultData<T> {
    data: T,
}

/// Accepts `{"result":{"data":..}}` as well as a bare payload.
pub fn decode_result<T: DeserializeOwned>(body: &str) -> Result<T, RpcError> {
    match serde_json::from_str::<ResultEnvelope<T>>(body) {
        Ok(ResultEnvelope::Wrapped { result }) => Ok(result.data),
        Ok(ResultEnvelope::Bare(value)) => Ok(value),
        Err(e) => Err(RpcError::new(
            RpcCode::Other("BAD_GATEWAY".to_string()),
            format!("unexpected response body: {e}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_body_code_wins_over_status() {
        let err = decode_error(
            500,
            r#"{"error":{"message":"Subscription required","data":{"code":"PRECONDITION_FAILED"}}}"#,
        );
        assert_eq!(err.code, RpcCode::PreconditionFailed);
        assert_eq!(err.message, "Subscription required");

        let err = decode_error(403, r#"{"error":{"message":"nope"}}"#);
        assert_eq!(err.code, RpcCode::Forbidden);

        let err = decode_error(404, "<html>not found</html>");
        assert_eq!(err.code, RpcCode::NotFound);
    }

    #[test]
    fn result_envelopes() {
        let me: UserProfile =
            decode_result(r#"{"result":{"data":{"id":"u1","email":"u1@example.com","role":"admin"}}}"#).unwrap();
        assert_eq!(me.role.as_deref(), Some("admin"));

        let client: ClientRecord = decode_result(r#"{"id":7,"name":"Acme","planTier":"pro"}"#).unwrap();
        assert_eq!(client.id.get(), 7);

        let err = decode_result::<ClientRecord>("[]").unwrap_err();
        assert_eq!(err.code.as_str(), "BAD_GATEWAY");
    }

    #[test]
    fn urls_and_tokens() {
        let api = HttpWorkspaceApi::new("http://api.local/");
        assert_eq!(api.url("users.me"), "http://api.local/rpc/users.me");
        assert!(api.access_token.is_none());
        assert_eq!(api.for_token("t").access_token.as_deref(), Some("t"));
    }
}
