use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use grc_auth::{GuardRunner, Session, SessionState};
use grc_core::guard::{GuardPaths, GuardRequirements, RouteGuardResult};
use grc_core::routes::default_routes;
use grc_core::rpc::{ClientRecord, RpcError, UserProfile, WorkspaceApi};
use grc_core::{ClientContextStore, ClientId, GrcError, MemoryStorage, PlanTier, ServiceModel};

struct FakeApi {
    role: Option<&'static str>,
    clients: HashMap<i64, Result<ClientRecord, RpcError>>,
    client_calls: AtomicUsize,
}

impl FakeApi {
    fn new(role: Option<&'static str>) -> Self {
        Self {
            role,
            clients: HashMap::new(),
            client_calls: AtomicUsize::new(0),
        }
    }

    fn with_client(mut self, id: i64, tier: PlanTier, role: Option<&str>) -> Self {
        self.clients.insert(
            id,
            Ok(ClientRecord {
                id: ClientId::new(id).unwrap(),
                name: format!("Client {id}"),
                plan_tier: Some(tier),
                role: role.map(String::from),
                service_model: ServiceModel::SelfService,
            }),
        );
        self
    }

    fn with_error(mut self, id: i64, err: RpcError) -> Self {
        self.clients.insert(id, Err(err));
        self
    }
}

#[async_trait]
impl WorkspaceApi for FakeApi {
    async fn me(&self) -> Result<UserProfile, RpcError> {
        Ok(UserProfile {
            id: "u1".to_string(),
            email: "u1@example.com".to_string(),
            role: self.role.map(String::from),
        })
    }

    async fn client(&self, id: ClientId) -> Result<ClientRecord, RpcError> {
        self.client_calls.fetch_add(1, Ordering::SeqCst);
        self.clients
            .get(&id.get())
            .cloned()
            .unwrap_or_else(|| Err(RpcError::not_found("no such client")))
    }
}

fn signed_in() -> SessionState {
    SessionState::Present(Session {
        user_id: "u1".to_string(),
        email: Some("u1@example.com".to_string()),
        access_token: "token".to_string(),
        expires_at: Utc::now() + Duration::hours(1),
    })
}

fn store() -> ClientContextStore {
    ClientContextStore::load(Arc::new(MemoryStorage::new()))
}

fn runner() -> GuardRunner {
    GuardRunner::new(GuardPaths::default(), false)
}

#[tokio::test]
async fn forbidden_tenant_clears_selection() {
    let api = FakeApi::new(None).with_error(9, RpcError::forbidden("not a member"));
    let store = store();
    store.select_client(ClientId::new(9).unwrap());

    let out = runner()
        .check(&GuardRequirements::PREMIUM, "/clients/9/threat-intel", &signed_in(), Some(&api), &store)
        .await
        .unwrap();

    assert_eq!(out.result, RouteGuardResult::RedirectTo("/clients".into()));
    assert!(out.clear_selection);
    assert_eq!(store.selected_client_id(), None);
}

#[tokio::test]
async fn allowed_navigation_syncs_tenant_and_plan() {
    let api = FakeApi::new(None).with_client(7, PlanTier::Pro, Some("member"));
    let store = store();
    store.select_client(ClientId::new(3).unwrap());

    let out = runner()
        .check(&GuardRequirements::PREMIUM, "/clients/7/threat-intel", &signed_in(), Some(&api), &store)
        .await
        .unwrap();

    assert_eq!(out.result, RouteGuardResult::Allow);
    let ctx = store.snapshot();
    assert_eq!(ctx.selected_client_id, ClientId::new(7));
    assert_eq!(ctx.plan_tier, Some(PlanTier::Pro));
    assert_eq!(ctx.user_role.as_deref(), Some("member"));
}

#[tokio::test]
async fn free_plan_goes_to_upgrade_once() {
    let api = FakeApi::new(None).with_client(7, PlanTier::Free, None);
    let store = store();

    let out = runner()
        .check(&GuardRequirements::PREMIUM, "/clients/7/samm", &signed_in(), Some(&api), &store)
        .await
        .unwrap();
    assert_eq!(out.result, RouteGuardResult::RedirectTo("/upgrade".into()));

    let out = runner()
        .check(&GuardRequirements::PREMIUM, "/upgrade", &signed_in(), Some(&api), &store)
        .await
        .unwrap();
    assert_eq!(out.result, RouteGuardResult::Allow);
}

#[tokio::test]
async fn plain_routes_skip_backend_fetches() {
    let api = FakeApi::new(None);
    let store = store();

    let out = runner()
        .check(&GuardRequirements::AUTHENTICATED, "/clients/7/risks", &signed_in(), Some(&api), &store)
        .await
        .unwrap();
    assert_eq!(out.result, RouteGuardResult::Allow);
    assert_eq!(api.client_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.selected_client_id(), ClientId::new(7));

    let out = runner()
        .check(&GuardRequirements::AUTHENTICATED, "/dashboard", &SessionState::Absent, Some(&api), &store)
        .await
        .unwrap();
    assert_eq!(out.result, RouteGuardResult::RedirectTo("/login".into()));

    let out = runner()
        .check(&GuardRequirements::PREMIUM, "/dashboard", &SessionState::Resolving, None, &store)
        .await
        .unwrap();
    assert_eq!(out.result, RouteGuardResult::Pending);
}

#[tokio::test]
async fn management_without_tenant_uses_global_role() {
    let store = store();
    let admin = FakeApi::new(Some("super_admin"));
    let member = FakeApi::new(Some("member"));

    let out = runner()
        .check(&GuardRequirements::MANAGEMENT, "/reports", &signed_in(), Some(&admin), &store)
        .await
        .unwrap();
    assert_eq!(out.result, RouteGuardResult::Allow);
    assert_eq!(admin.client_calls.load(Ordering::SeqCst), 0);

    let out = runner()
        .check(&GuardRequirements::MANAGEMENT, "/reports", &signed_in(), Some(&member), &store)
        .await
        .unwrap();
    assert_eq!(out.result, RouteGuardResult::RedirectTo("/dashboard".into()));
}

#[tokio::test]
async fn admin_routes_ignore_tenant_ownership() {
    let store = store();
    store.select_client(ClientId::new(7).unwrap());
    let owner = FakeApi::new(Some("member")).with_client(7, PlanTier::Enterprise, Some("owner"));

    let out = runner()
        .check(&GuardRequirements::ADMIN, "/admin/users", &signed_in(), Some(&owner), &store)
        .await
        .unwrap();
    assert_eq!(out.result, RouteGuardResult::RedirectTo("/dashboard".into()));
    assert!(!out.clear_selection);
    assert_eq!(owner.client_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.selected_client_id(), ClientId::new(7));

    let admin = FakeApi::new(Some("super_admin"));
    let out = runner()
        .check(&GuardRequirements::ADMIN, "/admin/users", &signed_in(), Some(&admin), &store)
        .await
        .unwrap();
    assert_eq!(out.result, RouteGuardResult::Allow);
}

#[tokio::test]
async fn missing_api_is_unavailable() {
    let err = runner()
        .check(&GuardRequirements::PREMIUM, "/clients/7/samm", &signed_in(), None, &store())
        .await
        .unwrap_err();
    assert_eq!(GrcError::from_anyhow(&err).map(|e| e.code()), Some(503));
}

#[tokio::test]
async fn navigate_reports_page_and_unknown_paths() {
    let table = default_routes().unwrap();
    let api = FakeApi::new(None).with_client(7, PlanTier::Enterprise, Some("owner"));
    let store = store();

    let nav = runner()
        .navigate(&table, "/clients/7/workflows/approvals", &signed_in(), Some(&api), &store)
        .await
        .unwrap();
    assert_eq!(nav.page.page, "Workflows");
    assert_eq!(nav.page.params.get("*").map(String::as_str), Some("approvals"));
    assert_eq!(nav.result, RouteGuardResult::Allow);

    let err = runner()
        .navigate(&table, "/nope", &signed_in(), Some(&api), &store)
        .await
        .unwrap_err();
    assert_eq!(GrcError::from_anyhow(&err).map(|e| e.code()), Some(404));
}
