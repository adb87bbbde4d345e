//! Declarative route table.
//!
//! Patterns are `/`-separated segments: literals, `:name`, `:name?` and a
//! trailing `*` that swallows the rest of the path (including nothing).

use std::collections::BTreeMap;
use std::fmt;

use crate::errors::GrcError;
use crate::guard::{evaluate, GuardInputs, GuardPaths, GuardRequirements, RouteGuardResult};
use crate::paths::split_path_query;
use crate::tenant::ClientId;

pub type RouteParams = BTreeMap<String, String>;

/// Name under which the `*` tail is captured.
pub const WILDCARD_PARAM: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Optional(String),
    Wildcard,
}

impl Segment {
    /// Parameter names do not make two patterns different.
    fn same_shape(&self, other: &Segment) -> bool {
        match (self, other) {
            (Segment::Literal(a), Segment::Literal(b)) => a == b,
            (Segment::Param(_), Segment::Param(_))
            | (Segment::Optional(_), Segment::Optional(_))
            | (Segment::Wildcard, Segment::Wildcard) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(raw: &str) -> Result<Self, GrcError> {
        if !raw.starts_with('/') {
            return Err(GrcError::bad_request(format!("route pattern must start with '/': {raw:?}")));
        }

        let parts: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
        let mut segments = Vec::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            let seg = if *part == "*" {
                if i + 1 != parts.len() {
                    return Err(GrcError::bad_request(format!("'*' must be the last segment: {raw:?}")));
                }
                Segment::Wildcard
            } else if let Some(name) = part.strip_prefix(':') {
                let (name, optional) = match name.strip_suffix('?') {
                    Some(n) => (n, true),
                    None => (name, false),
                };
                if name.is_empty() {
                    return Err(GrcError::bad_request(format!("unnamed route parameter: {raw:?}")));
                }
                if optional {
                    Segment::Optional(name.to_string())
                } else {
                    Segment::Param(name.to_string())
                }
            } else {
                Segment::Literal(part.to_string())
            };
            segments.push(seg);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn same_shape(&self, other: &RoutePattern) -> bool {
        self.segments.len() == other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a.same_shape(b))
    }

    /// Match a concrete path (query ignored). Returns captured params.
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        let (path, _) = split_path_query(path);
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = RouteParams::new();
        match_segments(&self.segments, &parts, &mut params).then_some(params)
    }
}

fn match_segments(segments: &[Segment], parts: &[&str], params: &mut RouteParams) -> bool {
    let Some((seg, rest)) = segments.split_first() else {
        return parts.is_empty();
    };

    match seg {
        Segment::Wildcard => {
            params.insert(WILDCARD_PARAM.to_string(), parts.join("/"));
            true
        }
        Segment::Literal(lit) => match parts.split_first() {
            Some((head, tail)) if head == lit => match_segments(rest, tail, params),
            _ => false,
        },
        Segment::Param(name) => match parts.split_first() {
            Some((head, tail)) => {
                params.insert(name.clone(), head.to_string());
                match_segments(rest, tail, params) || {
                    params.remove(name);
                    false
                }
            }
            None => false,
        },
        Segment::Optional(name) => {
            if let Some((head, tail)) = parts.split_first() {
                params.insert(name.clone(), head.to_string());
                if match_segments(rest, tail, params) {
                    return true;
                }
                params.remove(name);
            }
            match_segments(rest, parts, params)
        }
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDef {
    pub pattern: RoutePattern,
    /// Page identifier handed to whatever renders the route.
    pub page: String,
    pub guards: GuardRequirements,
}

/// A matched route with its captured params.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRoute<'a> {
    pub route: &'a RouteDef,
    pub params: RouteParams,
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteDef>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route. A pattern with the same shape as an existing one is
    /// a conflict: it could never be reached.
    pub fn insert(&mut self, pattern: &str, page: impl Into<String>, guards: GuardRequirements) -> Result<(), GrcError> {
        let pattern = RoutePattern::parse(pattern)?;
        if let Some(existing) = self.routes.iter().find(|r| r.pattern.same_shape(&pattern)) {
            return Err(GrcError::conflict(format!(
                "route {} duplicates {}",
                pattern, existing.pattern
            )));
        }
        self.routes.push(RouteDef {
            pattern,
            page: page.into(),
            guards,
        });
        Ok(())
    }

    pub fn route(mut self, pattern: &str, page: impl Into<String>, guards: GuardRequirements) -> Result<Self, GrcError> {
        self.insert(pattern, page, guards)?;
        Ok(self)
    }

    /// First route in declaration order that matches `path`.
    pub fn match_path(&self, path: &str) -> Option<MatchedRoute<'_>> {
        self.routes.iter().find_map(|route| {
            route
                .pattern
                .matches(path)
                .map(|params| MatchedRoute { route, params })
        })
    }

    pub fn routes(&self) -> &[RouteDef] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// What a guarded navigation resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct PageDescriptor {
    pub page: String,
    pub path: String,
    pub params: RouteParams,
    pub client_id: Option<ClientId>,
}

impl PageDescriptor {
    pub fn from_match(m: &MatchedRoute<'_>, path: &str) -> Self {
        let client_id = m.params.get("clientId").and_then(|raw| raw.parse().ok());
        Self {
            page: m.route.page.clone(),
            path: split_path_query(path).0.to_string(),
            params: m.params.clone(),
            client_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub page: PageDescriptor,
    pub guards: GuardRequirements,
    pub result: RouteGuardResult,
    pub clear_selection: bool,
}

/// Match, evaluate the route's guards and settle against `path`.
pub fn navigate(table: &RouteTable, path: &str, inputs: &GuardInputs, paths: &GuardPaths) -> Result<Navigation, GrcError> {
    let matched = table
        .match_path(path)
        .ok_or_else(|| GrcError::not_found(format!("no route for {path}")))?;
    let outcome = evaluate(&matched.route.guards, inputs, paths)?;
    Ok(Navigation {
        page: PageDescriptor::from_match(&matched, path),
        guards: matched.route.guards,
        result: outcome.result.settle(path),
        clear_selection: outcome.clear_selection,
    })
}

/// The shell's route table.
pub fn default_routes() -> Result<RouteTable, GrcError> {
    use GuardRequirements as G;

    let t = RouteTable::new()
        .route("/login", "Login", G::PUBLIC)?
        .route("/upgrade", "Upgrade", G::PUBLIC)?
        .route("/", "Dashboard", G::AUTHENTICATED)?
        .route("/dashboard", "Dashboard", G::AUTHENTICATED)?
        .route("/clients", "ClientList", G::AUTHENTICATED)?
        .route("/libraries/*", "Libraries", G::AUTHENTICATED)?
        .route("/settings/*", "Settings", G::AUTHENTICATED)?
        .route("/admin/*", "Administration", G::ADMIN)?;

    let tenant: &[(&str, &str, GuardRequirements)] = &[
        ("", "WorkspaceOverview", G::AUTHENTICATED),
        ("/governance", "Governance", G::AUTHENTICATED),
        ("/people", "People", G::AUTHENTICATED),
        ("/policies/:policyId?", "Policies", G::AUTHENTICATED),
        ("/controls/:controlId?", "Controls", G::AUTHENTICATED),
        ("/evidence/intake", "EvidenceIntake", G::MANAGEMENT),
        ("/evidence", "Evidence", G::AUTHENTICATED),
        ("/audits/:auditId?", "Audits", G::AUTHENTICATED),
        ("/assets", "Assets", G::AUTHENTICATED),
        ("/tasks", "Tasks", G::AUTHENTICATED),
        ("/reports", "Reports", G::AUTHENTICATED),
        ("/frameworks/:frameworkId?", "Frameworks", G::AUTHENTICATED),
        ("/threat-intel", "ThreatIntel", G::PREMIUM),
        ("/ai-governance", "AiGovernance", G::PREMIUM),
        ("/trust-center", "TrustCenter", G::PREMIUM),
        ("/marketing", "Marketing", G::AUTHENTICATED),
        ("/settings", "WorkspaceSettings", G::MANAGEMENT),
        ("/risks/*", "Risks", G::AUTHENTICATED),
        ("/vendors/*", "Vendors", G::AUTHENTICATED),
        ("/business-continuity/*", "BusinessContinuity", G::AUTHENTICATED),
        ("/federal/*", "FederalCompliance", G::PREMIUM),
        ("/privacy/*", "Privacy", G::AUTHENTICATED),
        ("/workflows/*", "Workflows", G::PREMIUM_MANAGEMENT),
        ("/cyber/*", "CyberResilience", G::AUTHENTICATED),
        ("/roadmap/*", "Roadmap", G::AUTHENTICATED),
        ("/readiness/*", "Readiness", G::AUTHENTICATED),
        ("/implementation/*", "Implementation", G::AUTHENTICATED),
        ("/samm", "Samm", G::PREMIUM),
        ("/asvs", "Asvs", G::PREMIUM),
        ("/metrics", "Metrics", G::AUTHENTICATED),
    ];

    let mut t = t;
    for (suffix, page, guards) in tenant {
        t.insert(&format!("/clients/:clientId{suffix}"), *page, *guards)?;
    }
    Ok(t)
}
