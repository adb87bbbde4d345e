//! Navigation endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{OriginalUri, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use grc_auth::SessionProvider;
use grc_core::events::ClearReason;
use grc_core::guard::RouteGuardResult;
use grc_core::menu::{best_match, build_menu, filter_menu, page_title, FeatureFlags, RoleFlags};
use grc_core::paths::{resolve, split_path_query};
use grc_core::tenant::ServiceModel;
use serde_json::{json, Value};

use crate::params::{
    map_json_rejection, MenuQuery, RequestSession, ResolveQuery, SelectClient, SidebarWidth, SignIn,
};
use crate::{ShellError, ShellState};

pub fn router() -> Router<ShellState> {
    Router::new()
        .route("/health", get(health))
        .route("/nav/menu", get(menu))
        .route("/nav/resolve", get(resolve_path))
        .route("/workspace", get(workspace).delete(clear_workspace))
        .route("/workspace/select", post(select_client))
        .route("/workspace/sidebar", put(set_sidebar))
        .route("/session", post(sign_in).delete(sign_out))
        .route("/app", get(page))
        .route("/app/{*path}", get(page))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// What the menu needs from the backend: the caller's global role and the
/// selected tenant's service model.
#[derive(Debug, Default)]
struct MenuLookup {
    global_role: Option<String>,
    service_model: ServiceModel,
}

/// Fetches the current user and the selected tenant concurrently. Also
/// syncs plan and tenant role into the store. Failures degrade to the
/// plain menu.
async fn menu_lookup(state: &ShellState, session: &RequestSession) -> MenuLookup {
    let Some(api) = session.api(state) else {
        return MenuLookup::default();
    };
    let client_id = state.store.selected_client_id();
    let client_fetch = async {
        match client_id {
            Some(id) => Some(api.client(id).await),
            None => None,
        }
    };
    let (me, client) = futures::join!(api.me(), client_fetch);

    let global_role = match me {
        Ok(user) => user.role,
        Err(err) => {
            tracing::debug!(%err, "user lookup for menu failed");
            None
        }
    };
    let service_model = match client {
        Some(Ok(client)) => {
            state.store.sync_plan(client.id, client.plan_tier, client.role.clone());
            client.service_model
        }
        Some(Err(err)) => {
            tracing::debug!(client_id = ?client_id, %err, "client lookup for menu failed");
            ServiceModel::default()
        }
        None => ServiceModel::default(),
    };

    MenuLookup {
        global_role,
        service_model,
    }
}

async fn menu(
    State(state): State<ShellState>,
    session: RequestSession,
    Query(q): Query<MenuQuery>,
) -> Result<Json<Value>, ShellError> {
    let location = q.path.unwrap_or_else(|| state.settings.paths.dashboard.clone());
    let (path, embedded_query) = split_path_query(&location);
    let query = if q.query.is_empty() { embedded_query } else { q.query.as_str() };

    state.store.sync_from_path(path);
    let lookup = menu_lookup(&state, &session).await;
    let ctx = state.store.snapshot();

    let features = FeatureFlags {
        premium_modules: state.settings.threat_intel && !state.settings.premium_disabled,
        managed_service: lookup.service_model == ServiceModel::Managed,
    };
    // Administration follows the platform role, never the tenant role.
    let roles = RoleFlags::from_role(lookup.global_role.as_deref());
    let groups = build_menu(&ctx, roles, features);
    let active = best_match(&groups, ctx.selected_client_id, path, query);
    let title = page_title(active.as_ref()).to_string();

    Ok(Json(json!({
        "groups": filter_menu(&groups, &q.search),
        "active": active,
        "title": title,
        "context": ctx,
    })))
}

async fn resolve_path(State(state): State<ShellState>, Query(q): Query<ResolveQuery>) -> Json<Value> {
    let client_id = state.store.selected_client_id();
    Json(json!({
        "path": q.path,
        "resolved": resolve(&q.path, client_id),
        "clientId": client_id,
    }))
}

async fn workspace(State(state): State<ShellState>) -> Json<Value> {
    let store = &state.store;
    Json(json!({
        "context": store.snapshot(),
        "sidebarWidth": store.sidebar_width(),
        "branding": store.branding(),
        "paymentGraceUntil": store.payment_grace_until(),
        "inPaymentGrace": store.in_payment_grace(Utc::now()),
    }))
}

async fn select_client(
    State(state): State<ShellState>,
    body: Result<Json<SelectClient>, JsonRejection>,
) -> Result<Json<Value>, ShellError> {
    let Json(body) = body.map_err(map_json_rejection)?;
    let changed = state.store.select_client(body.client_id);
    Ok(Json(json!({
        "changed": changed,
        "context": state.store.snapshot(),
    })))
}

async fn clear_workspace(State(state): State<ShellState>) -> StatusCode {
    state.store.clear(ClearReason::SwitchOrganization);
    StatusCode::NO_CONTENT
}

async fn set_sidebar(
    State(state): State<ShellState>,
    body: Result<Json<SidebarWidth>, JsonRejection>,
) -> Result<Json<Value>, ShellError> {
    let Json(body) = body.map_err(map_json_rejection)?;
    let width = state.store.set_sidebar_width(body.width);
    Ok(Json(json!({ "sidebarWidth": width })))
}

async fn sign_in(
    State(state): State<ShellState>,
    body: Result<Json<SignIn>, JsonRejection>,
) -> Result<Json<Value>, ShellError> {
    let Json(body) = body.map_err(map_json_rejection)?;
    let session = state.sessions.sign_in(&body.access_token).await.map_err(grc_core::GrcError::from)?;
    Ok(Json(json!({ "session": session })))
}

async fn sign_out(State(state): State<ShellState>) -> StatusCode {
    state.sessions.sign_out().await;
    state.store.clear(ClearReason::SignedOut);
    StatusCode::NO_CONTENT
}

/// Guarded page navigation: the page descriptor, a `303` to where the
/// guard sends the caller, or `202` while the session is still resolving.
async fn page(
    State(state): State<ShellState>,
    session: RequestSession,
    OriginalUri(uri): OriginalUri,
) -> Result<Response, ShellError> {
    let path = uri.path().strip_prefix("/app").unwrap_or(uri.path());
    let path = if path.is_empty() { "/" } else { path };
    let location = match uri.query() {
        Some(q) => format!("{path}?{q}"),
        None => path.to_string(),
    };

    let api = session.api(&state);
    let nav = state
        .runner
        .navigate(&state.routes, &location, session.state(), api.as_deref(), &state.store)
        .await?;

    let res = match nav.result {
        RouteGuardResult::Allow => Json(json!({
            "status": "allow",
            "page": nav.page,
            "context": state.store.snapshot(),
        }))
        .into_response(),
        RouteGuardResult::RedirectTo(target) => {
            let target = format!("/app{target}");
            tracing::debug!(from = %location, to = %target, "guard redirect");
            Redirect::to(&target).into_response()
        }
        RouteGuardResult::Pending => (
            StatusCode::ACCEPTED,
            Json(json!({ "status": "pending", "page": nav.page })),
        )
            .into_response(),
    };
    Ok(res)
}
