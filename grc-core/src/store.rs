//! The client context store: the only shared mutable state of the shell.
//!
//! Lifecycle: `load` from storage -> `sync_from_path` / `sync_plan` as the
//! user navigates -> `clear` on switch organization or authorization
//! failure. Writes that would not change anything are dropped before they
//! persist or emit, so a URL-sync effect reacting to a store event cannot
//! feed itself.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use crate::events::{ClearReason, ContextEvent, ContextEventHub, ContextListener, ListenerId};
use crate::paths::client_id_from_path;
use crate::storage::ContextStorage;
use crate::tenant::{ClientId, PlanTier, WorkspaceContext};

pub const SELECTED_CLIENT_KEY: &str = "selectedClientId";
pub const SIDEBAR_WIDTH_KEY: &str = "sidebarWidth";
pub const PAYMENT_GRACE_KEY: &str = "paymentGracePeriod";
pub const BRANDING_KEY: &str = "branding";

pub const SIDEBAR_MIN_WIDTH: u32 = 200;
pub const SIDEBAR_MAX_WIDTH: u32 = 480;
pub const SIDEBAR_DEFAULT_WIDTH: u32 = 256;

pub struct ClientContextStore {
    storage: Arc<dyn ContextStorage>,
    state: RwLock<WorkspaceContext>,
    events: RwLock<ContextEventHub>,
}

impl ClientContextStore {
    /// Build the store from persisted values. Unreadable storage yields an
    /// empty context.
    pub fn load(storage: Arc<dyn ContextStorage>) -> Self {
        let selected_client_id = match storage.get(SELECTED_CLIENT_KEY) {
            Ok(Some(raw)) => match raw.parse::<ClientId>() {
                Ok(id) => Some(id),
                Err(err) => {
                    tracing::warn!(%err, "ignoring corrupt persisted client selection");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(%err, "workspace storage unavailable, starting without a client");
                None
            }
        };

        Self {
            storage,
            state: RwLock::new(WorkspaceContext {
                selected_client_id,
                ..WorkspaceContext::default()
            }),
            events: RwLock::new(ContextEventHub::new()),
        }
    }

    pub fn snapshot(&self) -> WorkspaceContext {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn selected_client_id(&self) -> Option<ClientId> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .selected_client_id
    }

    pub fn on(&self, listener: ContextListener) -> ListenerId {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .on(listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .off(id)
    }

    /// Select a tenant. Switching tenants drops the previous plan and role.
    /// Returns whether anything changed.
    pub fn select_client(&self, id: ClientId) -> bool {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if state.selected_client_id == Some(id) {
                return false;
            }
            *state = WorkspaceContext::for_client(id);
            // Persist under the lock so storage follows the in-memory order.
            self.persist_selection(Some(id));
        }
        tracing::debug!(client_id = %id, "client selected");
        self.emit(ContextEvent::ClientSelected(id));
        true
    }

    /// Adopt the tenant named by a `/clients/<id>` URL. Paths without a
    /// tenant segment leave the selection alone.
    pub fn sync_from_path(&self, path: &str) -> bool {
        match client_id_from_path(path) {
            Some(id) => self.select_client(id),
            None => false,
        }
    }

    /// Record the plan and role a server response reported for `client_id`.
    /// Reports for a tenant that is no longer selected are ignored.
    pub fn sync_plan(&self, client_id: ClientId, plan_tier: Option<PlanTier>, user_role: Option<String>) -> bool {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if state.selected_client_id != Some(client_id) {
                return false;
            }
            if state.plan_tier == plan_tier && state.user_role == user_role {
                return false;
            }
            state.plan_tier = plan_tier;
            state.user_role = user_role.clone();
        }
        self.emit(ContextEvent::PlanSynced {
            client_id,
            plan_tier,
            user_role,
        });
        true
    }

    pub fn clear(&self, reason: ClearReason) -> bool {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if *state == WorkspaceContext::default() {
                return false;
            }
            *state = WorkspaceContext::default();
            self.persist_selection(None);
        }
        tracing::debug!(?reason, "client selection cleared");
        self.emit(ContextEvent::Cleared(reason));
        true
    }

    pub fn sidebar_width(&self) -> u32 {
        self.read_key(SIDEBAR_WIDTH_KEY)
            .and_then(|raw| raw.parse::<u32>().ok())
            .map(clamp_sidebar)
            .unwrap_or(SIDEBAR_DEFAULT_WIDTH)
    }

    /// Stores the clamped width and returns it.
    pub fn set_sidebar_width(&self, width: u32) -> u32 {
        let width = clamp_sidebar(width);
        self.write_key(SIDEBAR_WIDTH_KEY, Some(&width.to_string()));
        width
    }

    pub fn payment_grace_until(&self) -> Option<DateTime<Utc>> {
        self.read_key(PAYMENT_GRACE_KEY)
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|t| t.with_timezone(&Utc))
    }

    pub fn start_payment_grace(&self, until: DateTime<Utc>) {
        self.write_key(PAYMENT_GRACE_KEY, Some(&until.to_rfc3339()));
    }

    pub fn clear_payment_grace(&self) {
        self.write_key(PAYMENT_GRACE_KEY, None);
    }

    /// True while a recorded grace period has not yet run out.
    pub fn in_payment_grace(&self, now: DateTime<Utc>) -> bool {
        self.payment_grace_until().is_some_and(|until| now < until)
    }

    #[cfg(feature = "serde")]
    pub fn branding(&self) -> Branding {
        Branding::parse_or_default(self.read_key(BRANDING_KEY).as_deref())
    }

    fn persist_selection(&self, id: Option<ClientId>) {
        let value = id.map(|id| id.to_string());
        self.write_key(SELECTED_CLIENT_KEY, value.as_deref());
    }

    fn read_key(&self, key: &str) -> Option<String> {
        self.storage.get(key).unwrap_or_else(|err| {
            tracing::warn!(%err, key, "workspace storage read failed");
            None
        })
    }

    fn write_key(&self, key: &str, value: Option<&str>) {
        let res = match value {
            Some(v) => self.storage.set(key, v),
            None => self.storage.remove(key),
        };
        if let Err(err) = res {
            tracing::warn!(%err, key, "workspace storage write failed");
        }
    }

    fn emit(&self, event: ContextEvent) {
        // No lock is held while listeners run.
        let listeners = self
            .events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot();
        for listener in listeners {
            listener(&event);
        }
    }
}

fn clamp_sidebar(width: u32) -> u32 {
    width.clamp(SIDEBAR_MIN_WIDTH, SIDEBAR_MAX_WIDTH)
}

/// White-label settings stored as JSON. Any parse problem yields the default.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Branding {
    pub product_name: String,
    pub accent_color: String,
    pub logo_url: Option<String>,
}

#[cfg(feature = "serde")]
impl Default for Branding {
    fn default() -> Self {
        Self {
            product_name: "GRC Workspace".to_string(),
            accent_color: "#2563eb".to_string(),
            logo_url: None,
        }
    }
}

#[cfg(feature = "serde")]
impl Branding {
    pub fn parse_or_default(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        serde_json::from_str(raw).unwrap_or_else(|err| {
            tracing::warn!(%err, "unparsable branding, using defaults");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, StorageError, StorageResult};
    use std::sync::Mutex;

    struct UnavailableStorage;

    impl ContextStorage for UnavailableStorage {
        fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Err(StorageError::Unavailable("private mode".to_string()))
        }
        fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::Unavailable("private mode".to_string()))
        }
        fn remove(&self, _key: &str) -> StorageResult<()> {
            Err(StorageError::Unavailable("private mode".to_string()))
        }
    }

    fn id(n: i64) -> ClientId {
        ClientId::new(n).unwrap()
    }

    #[test]
    fn selection_round_trips_through_storage() {
        let storage: Arc<dyn ContextStorage> = Arc::new(MemoryStorage::new());
        let store = ClientContextStore::load(Arc::clone(&storage));
        assert!(store.select_client(id(42)));

        let reloaded = ClientContextStore::load(storage);
        assert_eq!(reloaded.snapshot().selected_client_id, Some(id(42)));
    }

    /// Memory storage whose write of `slow_value` takes a while.
    struct SlowStorage {
        inner: MemoryStorage,
        slow_value: &'static str,
    }

    impl ContextStorage for SlowStorage {
        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            if value == self.slow_value {
                std::thread::sleep(std::time::Duration::from_millis(50));
            }
            self.inner.set(key, value)
        }
        fn remove(&self, key: &str) -> StorageResult<()> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn concurrent_selects_persist_in_memory_order() {
        let storage: Arc<dyn ContextStorage> = Arc::new(SlowStorage {
            inner: MemoryStorage::new(),
            slow_value: "1",
        });
        let store = Arc::new(ClientContextStore::load(Arc::clone(&storage)));

        let first = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || store.select_client(id(1)))
        };
        std::thread::sleep(std::time::Duration::from_millis(10));
        let second = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || store.select_client(id(2)))
        };
        first.join().unwrap();
        second.join().unwrap();

        let in_memory = store.snapshot().selected_client_id;
        let reloaded = ClientContextStore::load(storage).snapshot().selected_client_id;
        assert_eq!(in_memory, Some(id(2)));
        assert_eq!(reloaded, in_memory);
    }

    #[test]
    fn corrupt_or_unavailable_storage_starts_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(SELECTED_CLIENT_KEY, "not-a-number").unwrap();
        assert_eq!(ClientContextStore::load(storage).snapshot(), WorkspaceContext::default());

        let store = ClientContextStore::load(Arc::new(UnavailableStorage));
        assert_eq!(store.snapshot(), WorkspaceContext::default());
        // writes still update the in-memory context
        assert!(store.select_client(id(3)));
        assert_eq!(store.selected_client_id(), Some(id(3)));
        assert_eq!(store.sidebar_width(), SIDEBAR_DEFAULT_WIDTH);
    }

    #[test]
    fn no_op_writes_do_not_emit() {
        let store = ClientContextStore::load(Arc::new(MemoryStorage::new()));
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        store.on(Arc::new(move |e: &ContextEvent| sink.lock().unwrap().push(e.clone())));

        assert!(store.sync_from_path("/clients/9/risks"));
        assert!(!store.sync_from_path("/clients/9/vendors"));
        assert!(!store.sync_from_path("/dashboard"));
        assert!(store.sync_plan(id(9), Some(PlanTier::Pro), Some("owner".into())));
        assert!(!store.sync_plan(id(9), Some(PlanTier::Pro), Some("owner".into())));
        assert!(!store.sync_plan(id(10), Some(PlanTier::Free), None));
        assert!(store.clear(ClearReason::SwitchOrganization));
        assert!(!store.clear(ClearReason::SwitchOrganization));

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], ContextEvent::ClientSelected(id(9)));
        assert_eq!(events[2], ContextEvent::Cleared(ClearReason::SwitchOrganization));
    }

    #[test]
    fn switching_tenant_drops_plan_and_role() {
        let store = ClientContextStore::load(Arc::new(MemoryStorage::new()));
        store.select_client(id(1));
        store.sync_plan(id(1), Some(PlanTier::Enterprise), Some("admin".into()));
        store.select_client(id(2));
        let ctx = store.snapshot();
        assert_eq!(ctx.selected_client_id, Some(id(2)));
        assert_eq!(ctx.plan_tier, None);
        assert_eq!(ctx.user_role, None);
    }

    #[test]
    fn clear_removes_persisted_selection() {
        let storage: Arc<dyn ContextStorage> = Arc::new(MemoryStorage::new());
        let store = ClientContextStore::load(Arc::clone(&storage));
        store.select_client(id(5));
        store.clear(ClearReason::AuthorizationFailure);
        assert_eq!(storage.get(SELECTED_CLIENT_KEY).unwrap(), None);
    }

    #[test]
    fn sidebar_width_is_clamped() {
        let store = ClientContextStore::load(Arc::new(MemoryStorage::new()));
        assert_eq!(store.set_sidebar_width(50), SIDEBAR_MIN_WIDTH);
        assert_eq!(store.set_sidebar_width(320), 320);
        assert_eq!(store.sidebar_width(), 320);
        assert_eq!(store.set_sidebar_width(9000), SIDEBAR_MAX_WIDTH);
    }

    #[test]
    fn payment_grace_window() {
        let store = ClientContextStore::load(Arc::new(MemoryStorage::new()));
        let now = Utc::now();
        assert!(!store.in_payment_grace(now));
        store.start_payment_grace(now + chrono::Duration::minutes(5));
        assert!(store.in_payment_grace(now));
        assert!(!store.in_payment_grace(now + chrono::Duration::minutes(6)));
        store.clear_payment_grace();
        assert_eq!(store.payment_grace_until(), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn branding_falls_back_on_bad_json() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(BRANDING_KEY, "{oops").unwrap();
        let store = ClientContextStore::load(storage.clone());
        assert_eq!(store.branding(), Branding::default());

        storage.set(BRANDING_KEY, r#"{"productName":"Acme Trust"}"#).unwrap();
        let branding = store.branding();
        assert_eq!(branding.product_name, "Acme Trust");
        assert_eq!(branding.accent_color, Branding::default().accent_color);
    }
}
