//! Route guard evaluation.
//!
//! A guard is an ordered list of checks run by one function. Each check
//! either passes or produces the outcome; the first outcome wins. Loading
//! data is its own state (`Pending`) so nothing redirects before the
//! answers are in.

use crate::errors::GrcError;
use crate::paths::{client_id_from_path, split_path_query};
use crate::rpc::{ClientRecord, Fetch, RpcCode, RpcError, UserProfile};
use crate::tenant::{is_global_admin, is_tenant_manager, ClientId, WorkspaceContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteGuardResult {
    Allow,
    RedirectTo(String),
    Pending,
}

impl RouteGuardResult {
    /// Drop a redirect that points at where the user already is.
    ///
    /// Without this an upgrade page guarded by the premium check would
    /// redirect to itself forever.
    pub fn settle(self, current_path: &str) -> Self {
        match self {
            RouteGuardResult::RedirectTo(target) if same_location(&target, current_path) => RouteGuardResult::Allow,
            other => other,
        }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, RouteGuardResult::Allow)
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            RouteGuardResult::RedirectTo(target) => Some(target),
            _ => None,
        }
    }
}

fn same_location(a: &str, b: &str) -> bool {
    fn norm(p: &str) -> &str {
        let (path, _) = split_path_query(p);
        if path.len() > 1 {
            path.strip_suffix('/').unwrap_or(path)
        } else {
            path
        }
    }
    norm(a) == norm(b)
}

/// What a route asks for. Every other requirement implies authentication.
///
/// `admin` is platform-wide: only a global admin role passes, whatever the
/// caller's role in the selected tenant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GuardRequirements {
    pub authenticated: bool,
    pub premium: bool,
    pub management: bool,
    pub admin: bool,
}

impl GuardRequirements {
    pub const PUBLIC: Self = Self {
        authenticated: false,
        premium: false,
        management: false,
        admin: false,
    };
    pub const AUTHENTICATED: Self = Self {
        authenticated: true,
        ..Self::PUBLIC
    };
    pub const PREMIUM: Self = Self {
        premium: true,
        ..Self::AUTHENTICATED
    };
    pub const MANAGEMENT: Self = Self {
        management: true,
        ..Self::AUTHENTICATED
    };
    pub const PREMIUM_MANAGEMENT: Self = Self {
        premium: true,
        management: true,
        ..Self::AUTHENTICATED
    };
    pub const ADMIN: Self = Self {
        admin: true,
        ..Self::AUTHENTICATED
    };

    pub fn needs_session(&self) -> bool {
        self.authenticated || self.premium || self.management || self.admin
    }

    /// Whether the current user's record must be fetched.
    pub fn needs_records(&self) -> bool {
        self.premium || self.management || self.admin
    }

    /// Whether the tenant record must be fetched as well.
    pub fn needs_tenant(&self) -> bool {
        self.premium || self.management
    }
}

/// Where guards send people.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardPaths {
    pub login: String,
    pub upgrade: String,
    pub clients: String,
    pub dashboard: String,
}

impl Default for GuardPaths {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            upgrade: "/upgrade".to_string(),
            clients: "/clients".to_string(),
            dashboard: "/dashboard".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPresence {
    Resolving,
    Absent,
    Present,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardInputs {
    pub session: SessionPresence,
    pub user: Fetch<UserProfile>,
    pub client: Fetch<ClientRecord>,
    /// Platform-wide switch turning premium features off for non-admins.
    pub premium_disabled: bool,
}

impl GuardInputs {
    pub fn new(session: SessionPresence) -> Self {
        Self {
            session,
            user: Fetch::Idle,
            client: Fetch::Idle,
            premium_disabled: false,
        }
    }

    fn global_role(&self) -> Option<&str> {
        self.user.ready().and_then(|u| u.role.as_deref())
    }

    fn tenant_role(&self) -> Option<&str> {
        self.client.ready().and_then(|c| c.role.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardOutcome {
    pub result: RouteGuardResult,
    /// The selected tenant turned out to be inaccessible.
    pub clear_selection: bool,
}

impl GuardOutcome {
    pub fn allow() -> Self {
        Self::from(RouteGuardResult::Allow)
    }

    pub fn pending() -> Self {
        Self::from(RouteGuardResult::Pending)
    }

    pub fn redirect(target: impl Into<String>) -> Self {
        Self::from(RouteGuardResult::RedirectTo(target.into()))
    }
}

impl From<RouteGuardResult> for GuardOutcome {
    fn from(result: RouteGuardResult) -> Self {
        Self {
            result,
            clear_selection: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GuardCheck {
    Session,
    Records,
    Premium,
    Management,
    Admin,
}

const CHECKS: [GuardCheck; 5] = [
    GuardCheck::Session,
    GuardCheck::Records,
    GuardCheck::Admin,
    GuardCheck::Premium,
    GuardCheck::Management,
];

impl GuardCheck {
    fn run(
        self,
        req: &GuardRequirements,
        inputs: &GuardInputs,
        paths: &GuardPaths,
    ) -> Result<Option<GuardOutcome>, GrcError> {
        match self {
            GuardCheck::Session => Ok(session_check(req, inputs, paths)),
            GuardCheck::Records => records_check(req, inputs, paths),
            GuardCheck::Premium => Ok(premium_check(req, inputs, paths)),
            GuardCheck::Management => Ok(management_check(req, inputs, paths)),
            GuardCheck::Admin => Ok(admin_check(req, inputs, paths)),
        }
    }
}

fn session_check(req: &GuardRequirements, inputs: &GuardInputs, paths: &GuardPaths) -> Option<GuardOutcome> {
    if !req.needs_session() {
        return None;
    }
    match inputs.session {
        SessionPresence::Resolving => Some(GuardOutcome::pending()),
        SessionPresence::Absent => Some(GuardOutcome::redirect(&paths.login)),
        SessionPresence::Present => None,
    }
}

fn records_check(
    req: &GuardRequirements,
    inputs: &GuardInputs,
    paths: &GuardPaths,
) -> Result<Option<GuardOutcome>, GrcError> {
    if !req.needs_records() {
        return Ok(None);
    }
    if matches!(inputs.user, Fetch::Idle | Fetch::Loading) || inputs.client.is_loading() {
        return Ok(Some(GuardOutcome::pending()));
    }

    match inputs.user.error().or(inputs.client.error()) {
        Some(err) => redirect_for_error(err, paths).map(Some),
        None => Ok(None),
    }
}

/// Backend error code -> redirect. Codes navigation does not understand
/// are returned as errors for the top-level error boundary.
pub fn redirect_for_error(err: &RpcError, paths: &GuardPaths) -> Result<GuardOutcome, GrcError> {
    match err.code {
        RpcCode::Unauthorized => Ok(GuardOutcome::redirect(&paths.login)),
        RpcCode::PreconditionFailed => Ok(GuardOutcome::redirect(&paths.upgrade)),
        RpcCode::Forbidden | RpcCode::NotFound => Ok(GuardOutcome {
            result: RouteGuardResult::RedirectTo(paths.clients.clone()),
            clear_selection: true,
        }),
        RpcCode::Other(_) => Err(err.clone().into()),
    }
}

fn premium_check(req: &GuardRequirements, inputs: &GuardInputs, paths: &GuardPaths) -> Option<GuardOutcome> {
    if !req.premium {
        return None;
    }
    let global_admin = is_global_admin(inputs.global_role());
    if inputs.premium_disabled && !global_admin {
        return Some(GuardOutcome::redirect(&paths.upgrade));
    }

    let premium_tier = inputs
        .client
        .ready()
        .and_then(|c| c.plan_tier)
        .is_some_and(|t| t.is_premium());

    if premium_tier || global_admin || is_tenant_manager(inputs.tenant_role()) {
        None
    } else {
        Some(GuardOutcome::redirect(&paths.upgrade))
    }
}

fn management_check(req: &GuardRequirements, inputs: &GuardInputs, paths: &GuardPaths) -> Option<GuardOutcome> {
    if !req.management {
        return None;
    }
    if is_global_admin(inputs.global_role()) || is_tenant_manager(inputs.tenant_role()) {
        None
    } else {
        Some(GuardOutcome::redirect(&paths.dashboard))
    }
}

fn admin_check(req: &GuardRequirements, inputs: &GuardInputs, paths: &GuardPaths) -> Option<GuardOutcome> {
    if !req.admin || is_global_admin(inputs.global_role()) {
        return None;
    }
    Some(GuardOutcome::redirect(&paths.dashboard))
}

/// Run every check in order; the first one with an opinion decides.
pub fn evaluate(req: &GuardRequirements, inputs: &GuardInputs, paths: &GuardPaths) -> Result<GuardOutcome, GrcError> {
    for check in CHECKS {
        if let Some(outcome) = check.run(req, inputs, paths)? {
            return Ok(outcome);
        }
    }
    Ok(GuardOutcome::allow())
}

/// The tenant a guard should check for `path`.
///
/// A tenant segment in the URL wins: during client-side navigation the
/// store may still hold the previous tenant, or none at all.
pub fn effective_client_id(ctx: &WorkspaceContext, path: &str) -> Option<ClientId> {
    client_id_from_path(path).or(ctx.selected_client_id)
}
