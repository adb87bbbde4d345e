//! grc-auth: sessions, backend RPC access and the guard runner for the
//! GRC workspace shell.

pub mod core;
pub mod guard;
pub mod options;
pub mod rpc_http;
pub mod session;

pub use crate::core::{bearer_from_header_map, default_jwt_provider, extract_bearer_token, issue_access_token, JwtProvider};
pub use guard::GuardRunner;
pub use options::{AuthOptions, AuthOptionsBuilder, JwtAlgorithm, JwtOptions};
pub use rpc_http::{HttpConnector, HttpWorkspaceApi};
pub use session::{JwtSessionProvider, Session, SessionError, SessionEvent, SessionProvider, SessionState};
