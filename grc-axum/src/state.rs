use std::sync::Arc;

use grc_auth::{GuardRunner, JwtSessionProvider};
use grc_core::routes::RouteTable;
use grc_core::rpc::WorkspaceConnector;
use grc_core::store::ClientContextStore;
use grc_core::ShellSettings;

/// Everything a shell handler can reach.
#[derive(Clone)]
pub struct ShellState {
    pub store: Arc<ClientContextStore>,
    pub routes: Arc<RouteTable>,
    pub runner: Arc<GuardRunner>,
    pub sessions: Arc<JwtSessionProvider>,
    /// Backend access; without it premium and management routes fail.
    pub connector: Option<Arc<dyn WorkspaceConnector>>,
    pub settings: Arc<ShellSettings>,
}

impl ShellState {
    pub fn new(
        store: ClientContextStore,
        routes: RouteTable,
        sessions: JwtSessionProvider,
        settings: ShellSettings,
    ) -> Self {
        Self {
            store: Arc::new(store),
            routes: Arc::new(routes),
            runner: Arc::new(GuardRunner::from_settings(&settings)),
            sessions: Arc::new(sessions),
            connector: None,
            settings: Arc::new(settings),
        }
    }

    pub fn with_connector(mut self, connector: Arc<dyn WorkspaceConnector>) -> Self {
        self.connector = Some(connector);
        self
    }
}
