use axum::Router;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use grc_auth::{SessionEvent, SessionProvider};
use grc_core::events::ClearReason;

use crate::{nav, ShellState};

pub struct ShellApp {
    pub state: ShellState,
    pub router: Router<()>,
}

impl Clone for ShellApp {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            router: self.router.clone(),
        }
    }
}

impl ShellApp {
    pub fn new(state: ShellState) -> Self {
        let layers = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id());

        let router = nav::router().with_state(state.clone()).layer(layers);
        Self { state, router }
    }

    pub fn router(&self) -> Router<()> {
        self.router.clone()
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        tokio::spawn(clear_on_session_end(self.state.clone()));

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "workspace shell listening");
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

/// Drop the tenant selection whenever the shell's own session ends.
async fn clear_on_session_end(state: ShellState) {
    use tokio::sync::broadcast::error::RecvError;

    let mut events = state.sessions.subscribe();
    loop {
        match events.recv().await {
            Ok(SessionEvent::SignedOut | SessionEvent::Expired) => {
                state.store.clear(ClearReason::SignedOut);
            }
            Ok(SessionEvent::SignedIn { .. }) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "session events lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

pub fn shell(state: ShellState) -> ShellApp {
    ShellApp::new(state)
}
