//! grc-core: framework-agnostic navigation core for the GRC workspace shell.

pub mod config;
pub mod errors;
pub mod events;
pub mod guard;
pub mod matcher;
pub mod menu;
pub mod paths;
pub mod routes;
pub mod rpc;
pub mod storage;
pub mod store;
pub mod tenant;

pub use config::{GrcConfig, GrcConfigSnapshot, ShellSettings};
pub use errors::{ErrorKind, GrcError, GrcResult};
pub use events::{ClearReason, ContextEvent, ContextEventHub, ContextListener, ListenerId};
pub use guard::{
    effective_client_id, evaluate, GuardInputs, GuardOutcome, GuardPaths, GuardRequirements, RouteGuardResult,
    SessionPresence,
};
pub use matcher::{is_active, try_is_active, RouteLocation};
pub use menu::{best_match, build_menu, filter_menu, page_title, ActiveItem, FeatureFlags, MenuGroup, MenuItem, RoleFlags};
pub use paths::resolve;
pub use routes::{default_routes, navigate, MatchedRoute, Navigation, PageDescriptor, RouteDef, RouteTable};
pub use rpc::{ClientRecord, Fetch, RpcCode, RpcError, UserProfile, WorkspaceApi, WorkspaceConnector};
pub use storage::{ContextStorage, MemoryStorage, StorageError};
#[cfg(feature = "serde")]
pub use storage::FileStorage;
pub use store::ClientContextStore;
pub use tenant::{ClientId, PlanTier, ServiceModel, WorkspaceContext};
