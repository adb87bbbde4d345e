//! Identity sessions as navigation sees them.
//!
//! A session is either still being resolved (restoring on start-up), absent,
//! or present. Guards redirect only on `Absent`; `Resolving` renders a
//! placeholder.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

use grc_core::errors::GrcError;
use grc_core::guard::SessionPresence;

use crate::core::{default_jwt_provider, JwtProvider};
use crate::options::AuthOptions;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session expired")]
    Expired,

    #[error("Invalid access token: {0}")]
    InvalidToken(String),

    #[error("Authentication not configured: {0}")]
    NotConfigured(String),
}

impl From<SessionError> for GrcError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotConfigured(msg) => GrcError::general_error(msg),
            other => GrcError::not_authenticated(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    fn from_claims(claims: &Value, access_token: &str) -> Result<Self, SessionError> {
        let user_id = claims
            .get("sub")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SessionError::InvalidToken("missing sub claim".to_string()))?;
        let exp = claims
            .get("exp")
            .and_then(Value::as_i64)
            .ok_or_else(|| SessionError::InvalidToken("missing exp claim".to_string()))?;
        let expires_at = Utc
            .timestamp_opt(exp, 0)
            .single()
            .ok_or_else(|| SessionError::InvalidToken(format!("exp out of range: {exp}")))?;

        Ok(Self {
            user_id: user_id.to_string(),
            email: claims.get("email").and_then(Value::as_str).map(String::from),
            access_token: access_token.to_string(),
            expires_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Resolving,
    Absent,
    Present(Session),
}

impl SessionState {
    pub fn presence(&self) -> SessionPresence {
        match self {
            SessionState::Resolving => SessionPresence::Resolving,
            SessionState::Absent => SessionPresence::Absent,
            SessionState::Present(_) => SessionPresence::Present,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Present(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { user_id: String },
    SignedOut,
    Expired,
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_session(&self) -> SessionState;
    async fn sign_in(&self, access_token: &str) -> Result<Session, SessionError>;
    async fn sign_out(&self);
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}

const EVENT_CAPACITY: usize = 16;

/// Session provider backed by HMAC-signed access tokens.
///
/// Starts out `Resolving` until [`JwtSessionProvider::restore`],
/// `sign_in` or `sign_out` settles it.
pub struct JwtSessionProvider {
    options: AuthOptions,
    jwt: Arc<dyn JwtProvider>,
    state: RwLock<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl JwtSessionProvider {
    pub fn new(options: AuthOptions) -> Self {
        Self::with_jwt(options, default_jwt_provider())
    }

    pub fn with_jwt(options: AuthOptions, jwt: Arc<dyn JwtProvider>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            options,
            jwt,
            state: RwLock::new(SessionState::Resolving),
            events,
        }
    }

    pub fn options(&self) -> &AuthOptions {
        &self.options
    }

    /// Verify a token without touching the provider's own session.
    pub fn verify(&self, access_token: &str) -> Result<Session, SessionError> {
        let claims = self.jwt.verify(&self.options.jwt, access_token)?;
        Session::from_claims(&claims, access_token)
    }

    /// Per-request view: `Present` for a valid token, `Absent` otherwise.
    pub fn state_for_token(&self, access_token: Option<&str>) -> SessionState {
        match access_token.map(|t| self.verify(t)) {
            Some(Ok(session)) => SessionState::Present(session),
            Some(Err(err)) => {
                tracing::debug!(%err, "rejected access token");
                SessionState::Absent
            }
            None => SessionState::Absent,
        }
    }

    /// Settle the start-up state from a persisted token, if any.
    pub fn restore(&self, access_token: Option<&str>) -> SessionState {
        let state = self.state_for_token(access_token);
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state.clone();
        state
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl SessionProvider for JwtSessionProvider {
    async fn current_session(&self) -> SessionState {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if let SessionState::Present(session) = &*state {
            if session.is_expired_at(Utc::now()) {
                tracing::debug!(user_id = %session.user_id, "session expired");
                *state = SessionState::Absent;
                drop(state);
                self.emit(SessionEvent::Expired);
                return SessionState::Absent;
            }
        }
        state.clone()
    }

    async fn sign_in(&self, access_token: &str) -> Result<Session, SessionError> {
        let session = self.verify(access_token)?;
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = SessionState::Present(session.clone());
        tracing::debug!(user_id = %session.user_id, "signed in");
        self.emit(SessionEvent::SignedIn {
            user_id: session.user_id.clone(),
        });
        Ok(session)
    }

    async fn sign_out(&self) {
        let was_present = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let was = matches!(*state, SessionState::Present(_));
            *state = SessionState::Absent;
            was
        };
        if was_present {
            self.emit(SessionEvent::SignedOut);
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn claims_map_to_a_session() {
        let s = Session::from_claims(&json!({"sub": "u1", "email": "u1@example.com", "exp": 2_000_000_000}), "tok").unwrap();
        assert_eq!(s.user_id, "u1");
        assert_eq!(s.email.as_deref(), Some("u1@example.com"));
        assert!(!s.is_expired_at(Utc.timestamp_opt(1_000, 0).unwrap()));

        assert!(matches!(
            Session::from_claims(&json!({"exp": 1}), "tok"),
            Err(SessionError::InvalidToken(_))
        ));
    }

    #[test]
    fn session_errors_become_not_authenticated() {
        let grc: GrcError = SessionError::Expired.into();
        assert_eq!(grc.code(), 401);
        let grc: GrcError = SessionError::NotConfigured("no secret".into()).into();
        assert_eq!(grc.code(), 500);
    }

    #[tokio::test]
    async fn starts_resolving_until_restored() {
        let provider = JwtSessionProvider::new(AuthOptions::default());
        assert_eq!(provider.current_session().await, SessionState::Resolving);
        assert_eq!(provider.restore(None), SessionState::Absent);
        assert_eq!(provider.current_session().await.presence(), SessionPresence::Absent);
    }
}
