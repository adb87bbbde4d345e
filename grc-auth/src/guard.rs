//! Runs route guards against live session and backend data.

use anyhow::Result;

use grc_core::bail_grc;
use grc_core::errors::GrcError;
use grc_core::events::ClearReason;
use grc_core::guard::{effective_client_id, evaluate, GuardInputs, GuardOutcome, GuardPaths, GuardRequirements};
use grc_core::routes::{Navigation, PageDescriptor, RouteTable};
use grc_core::rpc::{Fetch, WorkspaceApi};
use grc_core::store::ClientContextStore;
use grc_core::ShellSettings;

use crate::session::SessionState;

#[derive(Clone, Debug)]
pub struct GuardRunner {
    paths: GuardPaths,
    premium_disabled: bool,
}

impl GuardRunner {
    pub fn new(paths: GuardPaths, premium_disabled: bool) -> Self {
        Self {
            paths,
            premium_disabled,
        }
    }

    pub fn from_settings(settings: &ShellSettings) -> Self {
        Self::new(settings.paths.clone(), settings.premium_disabled)
    }

    pub fn paths(&self) -> &GuardPaths {
        &self.paths
    }

    /// Evaluate `req` for `location`.
    ///
    /// The user is fetched only for routes with premium, management or
    /// admin checks; the tenant, concurrently, only for premium and
    /// management. A tenant the caller may not see
    /// clears the store; a fetched tenant syncs plan and role into it.
    pub async fn check(
        &self,
        req: &GuardRequirements,
        location: &str,
        session: &SessionState,
        api: Option<&dyn WorkspaceApi>,
        store: &ClientContextStore,
    ) -> Result<GuardOutcome> {
        let mut inputs = GuardInputs::new(session.presence());
        inputs.premium_disabled = self.premium_disabled;

        let client_id = effective_client_id(&store.snapshot(), location);

        if req.needs_records() && session.session().is_some() {
            let Some(api) = api else {
                bail_grc!(unavailable, "Workspace API is not configured");
            };

            let tenant_id = client_id.filter(|_| req.needs_tenant());
            let client_fetch = async {
                match tenant_id {
                    Some(id) => Some(api.client(id).await),
                    None => None,
                }
            };
            let (user, client) = futures::join!(api.me(), client_fetch);

            inputs.user = Fetch::from_result(user);
            inputs.client = client.map(Fetch::from_result).unwrap_or(Fetch::Idle);
        }

        let outcome = evaluate(req, &inputs, &self.paths).map_err(GrcError::into_anyhow)?;
        let outcome = GuardOutcome {
            clear_selection: outcome.clear_selection,
            result: outcome.result.settle(location),
        };

        if outcome.clear_selection {
            store.clear(ClearReason::AuthorizationFailure);
        } else {
            if outcome.result.is_allow() {
                store.sync_from_path(location);
            }
            if let Some(client) = inputs.client.ready() {
                store.sync_plan(client.id, client.plan_tier, client.role.clone());
            }
        }

        tracing::debug!(
            location,
            client_id = ?client_id,
            result = ?outcome.result,
            clear_selection = outcome.clear_selection,
            "route guard evaluated"
        );
        Ok(outcome)
    }

    /// Match `location` in `table` and run that route's guards.
    pub async fn navigate(
        &self,
        table: &RouteTable,
        location: &str,
        session: &SessionState,
        api: Option<&dyn WorkspaceApi>,
        store: &ClientContextStore,
    ) -> Result<Navigation> {
        let matched = table
            .match_path(location)
            .ok_or_else(|| GrcError::not_found(format!("No page at {location}")).into_anyhow())?;
        let guards = matched.route.guards;
        let page = PageDescriptor::from_match(&matched, location);

        let outcome = self.check(&guards, location, session, api, store).await?;
        Ok(Navigation {
            page,
            guards,
            result: outcome.result,
            clear_selection: outcome.clear_selection,
        })
    }
}
