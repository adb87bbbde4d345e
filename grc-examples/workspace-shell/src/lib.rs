pub mod config;

use std::sync::Arc;

use anyhow::Result;
use grc_auth::{HttpConnector, JwtSessionProvider};
use grc_axum::{shell, ShellApp, ShellState};
use grc_core::{default_routes, ClientContextStore, ContextStorage, FileStorage, GrcConfig, MemoryStorage};

pub fn build(cfg: &GrcConfig) -> Result<ShellApp> {
    let settings = config::settings(cfg);
    let auth = config::auth(cfg)?;

    let storage: Arc<dyn ContextStorage> = match &settings.storage_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "persisting workspace context to file");
            Arc::new(FileStorage::new(path.clone()))
        }
        None => Arc::new(MemoryStorage::new()),
    };
    let store = ClientContextStore::load(storage);

    let sessions = JwtSessionProvider::new(auth);
    sessions.restore(None);

    let connector = settings.rpc_base_url.clone().map(HttpConnector::new);
    if connector.is_none() {
        tracing::warn!("rpc.base_url not set; premium and management pages are unavailable");
    }

    let mut state = ShellState::new(store, default_routes()?, sessions, settings);
    if let Some(connector) = connector {
        state = state.with_connector(Arc::new(connector));
    }

    Ok(shell(state))
}
