//! Abstract menu paths -> tenant-scoped paths.
//!
//! Menu definitions only ever carry abstract paths such as `/risks` or
//! `/governance`. Given the selected client these resolve to concrete
//! routes under `/clients/{id}`. Anything the tables below do not know is
//! a global route and passes through untouched.

use crate::tenant::ClientId;

/// Abstract path -> template. `{id}` is replaced with the client id.
const TENANT_TEMPLATES: &[(&str, &str)] = &[
    ("/workspace", "/clients/{id}"),
    ("/governance", "/clients/{id}/governance"),
    ("/people", "/clients/{id}/people"),
    ("/policies", "/clients/{id}/policies"),
    ("/controls", "/clients/{id}/controls"),
    ("/evidence", "/clients/{id}/evidence"),
    ("/evidence-intake", "/clients/{id}/evidence/intake"),
    ("/audits", "/clients/{id}/audits"),
    ("/assets", "/clients/{id}/assets"),
    ("/tasks", "/clients/{id}/tasks"),
    ("/reports", "/clients/{id}/reports"),
    ("/frameworks", "/clients/{id}/frameworks"),
    ("/threat-intel", "/clients/{id}/threat-intel"),
    ("/ai-governance", "/clients/{id}/ai-governance"),
    ("/trust-center", "/clients/{id}/trust-center"),
    ("/marketing", "/clients/{id}/marketing"),
    ("/workspace-settings", "/clients/{id}/settings"),
];

/// Prefixes whose whole subtree lives under the tenant root.
const TENANT_PREFIXES: &[&str] = &[
    "/risks",
    "/vendors",
    "/business-continuity",
    "/federal",
    "/privacy",
    "/workflows",
    "/cyber",
    "/roadmap",
    "/readiness",
    "/implementation",
];

/// Exact tenant-scoped paths (no subtree).
const TENANT_EXACT: &[&str] = &["/samm", "/asvs", "/metrics"];

/// Split `"/a/b?x=1"` into `("/a/b", "?x=1")`. The query keeps its `?`.
pub fn split_path_query(input: &str) -> (&str, &str) {
    match input.find('?') {
        Some(idx) => input.split_at(idx),
        None => (input, ""),
    }
}

/// `/clients/{id}`
pub fn client_root(id: ClientId) -> String {
    format!("/clients/{id}")
}

/// True when `path` equals `prefix` or continues it with a `/`.
pub(crate) fn has_segment_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Whether an abstract path would be rewritten for a selected client.
pub fn is_tenant_scoped(abstract_path: &str) -> bool {
    let (path, _) = split_path_query(abstract_path);
    TENANT_TEMPLATES.iter().any(|(from, _)| *from == path)
        || TENANT_EXACT.contains(&path)
        || TENANT_PREFIXES.iter().any(|p| has_segment_prefix(path, p))
}

/// Resolve an abstract menu path against the selected client.
///
/// The query string is carried over verbatim. With no client selected the
/// input comes back unchanged; route guards send the user to tenant
/// selection from there. Resolving an already resolved path is not
/// supported; resolve once per render.
pub fn resolve(abstract_path: &str, client_id: Option<ClientId>) -> String {
    let Some(id) = client_id else {
        return abstract_path.to_string();
    };

    let (path, query) = split_path_query(abstract_path);

    if let Some((_, template)) = TENANT_TEMPLATES.iter().find(|(from, _)| *from == path) {
        return format!("{}{query}", template.replace("{id}", &id.to_string()));
    }

    if TENANT_EXACT.contains(&path) || TENANT_PREFIXES.iter().any(|p| has_segment_prefix(path, p)) {
        return format!("{}{path}{query}", client_root(id));
    }

    abstract_path.to_string()
}

/// The client id carried by a `/clients/<id>[/...]` path, if any.
pub fn client_id_from_path(path: &str) -> Option<ClientId> {
    let (path, _) = split_path_query(path);
    let rest = path.strip_prefix("/clients/")?;
    let segment = rest.split('/').next()?;
    segment.parse().ok()
}

/// True for `/clients/<id>` (optionally with a trailing `/`) and nothing deeper.
pub fn is_client_root(path: &str) -> bool {
    let (path, _) = split_path_query(path);
    let Some(rest) = path.strip_prefix("/clients/") else {
        return false;
    };
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    !rest.is_empty() && !rest.contains('/') && rest.parse::<ClientId>().is_ok()
}
