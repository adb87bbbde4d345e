//! Active-route matching for sidebar highlighting.
//!
//! Rules, in order:
//! 1. the global "Clients" link (`/clients`) is active only on `/clients`
//! 2. two tenant roots compare by id and then by their `tab` parameter only
//! 3. identical path and query are active
//! 4. a tenant root never lights up for its own sub-pages
//! 5. an entry carrying a query does not match the same path with another query
//! 6. `/` and `/dashboard` never prefix-match
//! 7. otherwise a segment-boundary prefix match on the path

use crate::errors::GrcError;
use crate::paths::{has_segment_prefix, is_client_root, split_path_query};

/// A parsed `path[?query]` pair. The query is stored without its `?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteLocation<'a> {
    pub path: &'a str,
    pub query: &'a str,
}

impl<'a> RouteLocation<'a> {
    pub fn parse(input: &'a str) -> Result<Self, GrcError> {
        let (path, query) = split_path_query(input);
        Self::from_parts(path, query)
    }

    /// `query` may be given with or without its leading `?`.
    pub fn from_parts(path: &'a str, query: &'a str) -> Result<Self, GrcError> {
        if path.is_empty() {
            return Err(GrcError::bad_request("empty path"));
        }
        if !path.starts_with('/') {
            return Err(GrcError::bad_request(format!("path must be absolute: {path:?}")));
        }
        if path.chars().chain(query.chars()).any(|c| c.is_control() || c.is_whitespace()) {
            return Err(GrcError::bad_request(format!("path contains illegal characters: {path:?}")));
        }

        let path = if path.len() > 1 {
            path.strip_suffix('/').unwrap_or(path)
        } else {
            path
        };
        let query = query.strip_prefix('?').unwrap_or(query);

        Ok(Self { path, query })
    }

    /// Decoded value of the first `tab` parameter.
    pub fn tab(&self) -> Result<Option<String>, GrcError> {
        query_param(self.query, "tab")
    }
}

/// First value for `key` in a `a=1&b=2` query, form-decoded.
pub fn query_param(query: &str, key: &str) -> Result<Option<String>, GrcError> {
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        if decode_component(k)? == key {
            return decode_component(v).map(Some);
        }
    }
    Ok(None)
}

fn decode_component(raw: &str) -> Result<String, GrcError> {
    urlencoding::decode(&raw.replace('+', " "))
        .map(|decoded| decoded.into_owned())
        .map_err(|e| GrcError::bad_request(format!("undecodable query component {raw:?}: {e}")))
}

/// Fallible form of [`is_active`].
pub fn try_is_active(resolved: &str, current_path: &str, current_query: &str) -> Result<bool, GrcError> {
    let candidate = RouteLocation::parse(resolved)?;
    let current = RouteLocation::from_parts(current_path, current_query)?;

    if candidate.path == "/clients" {
        return Ok(current.path == "/clients");
    }

    let candidate_is_root = is_client_root(candidate.path);
    if candidate_is_root && is_client_root(current.path) {
        if candidate.path != current.path {
            return Ok(false);
        }
        return Ok(candidate.tab()? == current.tab()?);
    }

    if candidate.path == current.path && candidate.query == current.query {
        return Ok(true);
    }

    if candidate_is_root {
        return Ok(false);
    }

    if !candidate.query.is_empty() && candidate.path == current.path {
        return Ok(false);
    }

    if matches!(candidate.path, "/" | "/dashboard") {
        return Ok(candidate.path == current.path);
    }

    Ok(has_segment_prefix(current.path, candidate.path))
}

/// Whether the menu entry at `resolved` should be highlighted for the
/// current location.
///
/// Never fails: if either side cannot be parsed this degrades to a literal
/// comparison of `resolved` against `current_path + current_query`.
pub fn is_active(resolved: &str, current_path: &str, current_query: &str) -> bool {
    match try_is_active(resolved, current_path, current_query) {
        Ok(active) => active,
        Err(err) => {
            tracing::debug!(%err, resolved, current_path, "route match fell back to string equality");
            let query = current_query.strip_prefix('?').unwrap_or(current_query);
            if query.is_empty() {
                resolved == current_path
            } else {
                resolved == format!("{current_path}?{query}")
            }
        }
    }
}
