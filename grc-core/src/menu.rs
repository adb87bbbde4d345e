//! Sidebar menu: static group definitions, search filtering and best-match
//! selection.
//!
//! Every builder returns a fresh list. Paths stored in a [`MenuItem`] are
//! abstract; [`crate::paths::resolve`] turns them into concrete routes at
//! render time.

use crate::matcher::is_active;
use crate::paths::resolve;
use crate::tenant::{is_global_admin, ClientId, WorkspaceContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum MenuIcon {
    Dashboard,
    Building,
    Settings,
    Library,
    Book,
    Map,
    Landmark,
    Users,
    FileText,
    AlertTriangle,
    Radar,
    Cpu,
    Shield,
    Truck,
    Layers,
    Flag,
    LifeBuoy,
    Lock,
    Zap,
    CheckCircle,
    Inbox,
    Briefcase,
    Megaphone,
    Wrench,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct MenuItem {
    pub icon: MenuIcon,
    pub label: String,
    pub path: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "std::ops::Not::not"))]
    pub is_premium: bool,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Vec::is_empty"))]
    pub submenu: Vec<MenuItem>,
}

impl MenuItem {
    pub fn new(icon: MenuIcon, label: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            icon,
            label: label.into(),
            path: path.into(),
            is_premium: false,
            submenu: Vec::new(),
        }
    }

    pub fn premium(mut self) -> Self {
        self.is_premium = true;
        self
    }

    pub fn with_submenu(mut self, submenu: Vec<MenuItem>) -> Self {
        self.submenu = submenu;
        self
    }

    pub fn has_submenu(&self) -> bool {
        !self.submenu.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MenuGroup {
    pub label: String,
    pub items: Vec<MenuItem>,
}

impl MenuGroup {
    pub fn new(label: impl Into<String>, items: Vec<MenuItem>) -> Self {
        Self {
            label: label.into(),
            items,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleFlags {
    pub is_admin: bool,
}

impl RoleFlags {
    /// admin, owner and super_admin see the administration group.
    pub fn from_role(role: Option<&str>) -> Self {
        Self {
            is_admin: is_global_admin(role),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Premium modules (threat intelligence) switched on for this deployment.
    pub premium_modules: bool,
    /// The tenant is run as a managed service.
    pub managed_service: bool,
}

use MenuIcon as I;

fn platform_group() -> MenuGroup {
    MenuGroup::new(
        "Platform & Overview",
        vec![
            MenuItem::new(I::Dashboard, "Dashboard", "/dashboard"),
            MenuItem::new(I::Building, "Clients", "/clients"),
            MenuItem::new(I::Settings, "Account Settings", "/settings/profile"),
        ],
    )
}

fn libraries_group() -> MenuGroup {
    MenuGroup::new(
        "Libraries & Knowledge",
        vec![
            MenuItem::new(I::Library, "Framework Library", "/libraries/frameworks"),
            MenuItem::new(I::Library, "Control Library", "/libraries/controls"),
            MenuItem::new(I::FileText, "Policy Templates", "/libraries/policies"),
            MenuItem::new(I::Book, "Knowledge Base", "/libraries/knowledge"),
        ],
    )
}

fn compliance_journey_group() -> MenuGroup {
    MenuGroup::new(
        "Compliance Journey",
        vec![
            MenuItem::new(I::Dashboard, "Workspace Overview", "/workspace?tab=dashboard"),
            MenuItem::new(I::CheckCircle, "Readiness Assessment", "/readiness"),
            MenuItem::new(I::Map, "Roadmap", "/roadmap"),
            MenuItem::new(I::Wrench, "Implementation", "/implementation"),
        ],
    )
}

fn governance_group() -> MenuGroup {
    MenuGroup::new(
        "Governance",
        vec![
            MenuItem::new(I::Landmark, "Governance Hub", "/governance"),
            MenuItem::new(I::Users, "People", "/people"),
            MenuItem::new(I::FileText, "Policies", "/policies"),
            MenuItem::new(I::CheckCircle, "Tasks", "/tasks"),
        ],
    )
}

fn risk_group() -> MenuGroup {
    MenuGroup::new(
        "Risk Management",
        vec![
            MenuItem::new(I::AlertTriangle, "Risk Dashboard", "/risks"),
            MenuItem::new(I::AlertTriangle, "Risk Register", "/risks/register"),
            MenuItem::new(I::FileText, "Risk Assessments", "/risks/assessments"),
            MenuItem::new(I::Shield, "Treatment Plans", "/risks/treatments"),
        ],
    )
}

fn threat_intel_group() -> MenuGroup {
    MenuGroup::new(
        "Threat Intelligence",
        vec![
            MenuItem::new(I::Radar, "Threat Feed", "/threat-intel").premium(),
            MenuItem::new(I::Layers, "Asset Inventory", "/assets").premium(),
        ],
    )
}

fn ai_app_security_group() -> MenuGroup {
    MenuGroup::new(
        "AI & App Security",
        vec![
            MenuItem::new(I::Cpu, "AI Governance", "/ai-governance"),
            MenuItem::new(I::Shield, "OWASP SAMM", "/samm"),
            MenuItem::new(I::Shield, "OWASP ASVS", "/asvs"),
        ],
    )
}

fn vendor_group() -> MenuGroup {
    MenuGroup::new(
        "Vendor Management",
        vec![
            MenuItem::new(I::Truck, "Vendors", "/vendors"),
            MenuItem::new(I::FileText, "Vendor Assessments", "/vendors/assessments"),
            MenuItem::new(I::AlertTriangle, "Vendor Risk", "/vendors/risk"),
        ],
    )
}

fn frameworks_group() -> MenuGroup {
    MenuGroup::new(
        "Control Frameworks",
        vec![
            MenuItem::new(I::Layers, "Frameworks", "/frameworks").with_submenu(vec![
                MenuItem::new(I::Layers, "ISO 27001", "/frameworks?framework=iso27001"),
                MenuItem::new(I::Layers, "SOC 2", "/frameworks?framework=soc2"),
                MenuItem::new(I::Layers, "NIST CSF", "/frameworks?framework=nist-csf"),
            ]),
            MenuItem::new(I::CheckCircle, "Controls", "/controls"),
        ],
    )
}

fn federal_group() -> MenuGroup {
    MenuGroup::new(
        "Federal Compliance",
        vec![
            MenuItem::new(I::Flag, "FedRAMP", "/federal/fedramp"),
            MenuItem::new(I::Flag, "CMMC", "/federal/cmmc"),
            MenuItem::new(I::FileText, "POA&M", "/federal/poam"),
        ],
    )
}

fn business_continuity_group() -> MenuGroup {
    MenuGroup::new(
        "Business Continuity",
        vec![
            MenuItem::new(I::LifeBuoy, "Impact Analysis", "/business-continuity/bia"),
            MenuItem::new(I::FileText, "Continuity Plans", "/business-continuity/plans"),
            MenuItem::new(I::Zap, "Exercises", "/business-continuity/exercises"),
        ],
    )
}

fn privacy_group() -> MenuGroup {
    MenuGroup::new(
        "Privacy",
        vec![
            MenuItem::new(I::Lock, "Data Inventory", "/privacy/inventory"),
            MenuItem::new(I::Inbox, "DSAR Requests", "/privacy/dsar"),
            MenuItem::new(I::FileText, "DPIA", "/privacy/dpia"),
            MenuItem::new(I::AlertTriangle, "Breach Register", "/privacy/breaches"),
        ],
    )
}

fn cyber_group() -> MenuGroup {
    MenuGroup::new(
        "Cyber Resilience",
        vec![
            MenuItem::new(I::Shield, "NIS2 Assessment", "/cyber/nis2"),
            MenuItem::new(I::Zap, "Incident Response", "/cyber/incidents"),
            MenuItem::new(I::Dashboard, "Security Metrics", "/metrics"),
        ],
    )
}

fn assurance_group(features: FeatureFlags) -> MenuGroup {
    let mut items = vec![MenuItem::new(I::FileText, "Evidence", "/evidence")];
    if features.managed_service {
        items.push(MenuItem::new(I::Inbox, "Evidence Intake", "/evidence-intake"));
    }
    items.push(MenuItem::new(I::CheckCircle, "Audits", "/audits"));
    items.push(MenuItem::new(I::Shield, "Trust Center", "/trust-center"));
    MenuGroup::new("Assurance", items)
}

fn management_group() -> MenuGroup {
    MenuGroup::new(
        "Management",
        vec![
            MenuItem::new(I::Zap, "Workflows", "/workflows"),
            MenuItem::new(I::FileText, "Reports", "/reports"),
            MenuItem::new(I::Settings, "Workspace Settings", "/workspace-settings"),
        ],
    )
}

fn marketing_group() -> MenuGroup {
    MenuGroup::new(
        "Marketing",
        vec![MenuItem::new(I::Megaphone, "Campaigns", "/marketing")],
    )
}

fn admin_group() -> MenuGroup {
    MenuGroup::new(
        "Administration",
        vec![
            MenuItem::new(I::Users, "Users", "/admin/users"),
            MenuItem::new(I::Building, "Organizations", "/admin/organizations"),
            MenuItem::new(I::Briefcase, "Billing", "/admin/billing"),
            MenuItem::new(I::Settings, "Platform Settings", "/admin/settings"),
        ],
    )
}

/// Assemble the sidebar for a workspace.
pub fn build_menu(ctx: &WorkspaceContext, roles: RoleFlags, features: FeatureFlags) -> Vec<MenuGroup> {
    let mut groups = vec![platform_group(), libraries_group()];

    if ctx.has_client() {
        groups.push(compliance_journey_group());
        groups.push(governance_group());
        groups.push(risk_group());
        if features.premium_modules && ctx.plan_tier.is_some_and(|t| t.is_premium()) {
            groups.push(threat_intel_group());
        }
        groups.push(ai_app_security_group());
        groups.push(vendor_group());
        groups.push(frameworks_group());
        groups.push(federal_group());
        groups.push(business_continuity_group());
        groups.push(privacy_group());
        groups.push(cyber_group());
        groups.push(assurance_group(features));
        groups.push(management_group());
        groups.push(marketing_group());
    }

    if roles.is_admin {
        groups.push(admin_group());
    }

    groups
}

fn label_matches(label: &str, needle: &str) -> bool {
    label.to_lowercase().contains(needle)
}

/// Narrow the menu to entries whose label contains `search`
/// (case-insensitive). A blank search returns the menu as is.
pub fn filter_menu(groups: &[MenuGroup], search: &str) -> Vec<MenuGroup> {
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return groups.to_vec();
    }

    groups
        .iter()
        .filter_map(|group| {
            if label_matches(&group.label, &needle) {
                return Some(group.clone());
            }

            let items: Vec<MenuItem> = group
                .items
                .iter()
                .filter_map(|item| {
                    if label_matches(&item.label, &needle) {
                        return Some(item.clone());
                    }
                    let submenu: Vec<MenuItem> = item
                        .submenu
                        .iter()
                        .filter(|sub| label_matches(&sub.label, &needle))
                        .cloned()
                        .collect();
                    (!submenu.is_empty()).then(|| MenuItem {
                        submenu,
                        ..item.clone()
                    })
                })
                .collect();

            (!items.is_empty()).then(|| MenuGroup::new(group.label.clone(), items))
        })
        .collect()
}

/// The single most specific menu entry for the current location.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ActiveItem {
    pub group: String,
    pub label: String,
    pub resolved_path: String,
    pub parent: Option<String>,
    pub has_submenu: bool,
}

/// Pick the active entry among items and their first submenu level.
///
/// Longest resolved path wins; on a tie a leaf beats an entry that owns a
/// submenu, then menu order decides.
pub fn best_match(
    groups: &[MenuGroup],
    client_id: Option<ClientId>,
    current_path: &str,
    current_query: &str,
) -> Option<ActiveItem> {
    let mut best: Option<ActiveItem> = None;

    let mut consider = |group: &MenuGroup, item: &MenuItem, parent: Option<&MenuItem>| {
        let resolved = resolve(&item.path, client_id);
        if !is_active(&resolved, current_path, current_query) {
            return;
        }
        let better = match &best {
            None => true,
            Some(b) => {
                resolved.len() > b.resolved_path.len()
                    || (resolved.len() == b.resolved_path.len() && b.has_submenu && !item.has_submenu())
            }
        };
        if better {
            best = Some(ActiveItem {
                group: group.label.clone(),
                label: item.label.clone(),
                resolved_path: resolved,
                parent: parent.map(|p| p.label.clone()),
                has_submenu: item.has_submenu(),
            });
        }
    };

    for group in groups {
        for item in &group.items {
            consider(group, item, None);
            for sub in &item.submenu {
                consider(group, sub, Some(item));
            }
        }
    }

    best
}

/// Page header title for the current location.
pub fn page_title(best: Option<&ActiveItem>) -> &str {
    best.map(|b| b.label.as_str()).unwrap_or("Dashboard")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::PlanTier;

    fn labels(groups: &[MenuGroup]) -> Vec<&str> {
        groups.iter().map(|g| g.label.as_str()).collect()
    }

    fn tenant(id: i64) -> WorkspaceContext {
        WorkspaceContext::for_client(ClientId::new(id).unwrap())
    }

    #[test]
    fn base_groups_without_tenant() {
        let menu = build_menu(&WorkspaceContext::default(), RoleFlags::default(), FeatureFlags::default());
        assert_eq!(labels(&menu), vec!["Platform & Overview", "Libraries & Knowledge"]);
    }

    #[test]
    fn tenant_groups_in_order() {
        let menu = build_menu(&tenant(3), RoleFlags::default(), FeatureFlags::default());
        assert_eq!(
            labels(&menu),
            vec![
                "Platform & Overview",
                "Libraries & Knowledge",
                "Compliance Journey",
                "Governance",
                "Risk Management",
                "AI & App Security",
                "Vendor Management",
                "Control Frameworks",
                "Federal Compliance",
                "Business Continuity",
                "Privacy",
                "Cyber Resilience",
                "Assurance",
                "Management",
                "Marketing",
            ]
        );
    }

    #[test]
    fn threat_intel_needs_plan_and_flag() {
        let flags = FeatureFlags {
            premium_modules: true,
            ..FeatureFlags::default()
        };
        let pro = tenant(3).with_plan(PlanTier::Pro);
        let free = tenant(3).with_plan(PlanTier::Free);

        let has = |m: &[MenuGroup]| m.iter().any(|g| g.label == "Threat Intelligence");
        assert!(has(&build_menu(&pro, RoleFlags::default(), flags)));
        assert!(!has(&build_menu(&free, RoleFlags::default(), flags)));
        assert!(!has(&build_menu(&pro, RoleFlags::default(), FeatureFlags::default())));
    }

    #[test]
    fn evidence_intake_only_for_managed_service() {
        let intake = |flags: FeatureFlags| {
            build_menu(&tenant(3), RoleFlags::default(), flags)
                .iter()
                .flat_map(|g| g.items.iter())
                .any(|i| i.label == "Evidence Intake")
        };
        assert!(!intake(FeatureFlags::default()));
        assert!(intake(FeatureFlags {
            managed_service: true,
            ..FeatureFlags::default()
        }));
    }

    #[test]
    fn administration_for_admin_roles() {
        let menu = build_menu(&WorkspaceContext::default(), RoleFlags::from_role(Some("super_admin")), FeatureFlags::default());
        assert_eq!(menu.last().map(|g| g.label.as_str()), Some("Administration"));
        let menu = build_menu(&WorkspaceContext::default(), RoleFlags::from_role(Some("member")), FeatureFlags::default());
        assert!(menu.iter().all(|g| g.label != "Administration"));
    }

    #[test]
    fn filter_surfaces_parent_with_matching_submenu_only() {
        let menu = build_menu(&tenant(3), RoleFlags::default(), FeatureFlags::default());
        let filtered = filter_menu(&menu, "soc");
        assert_eq!(labels(&filtered), vec!["Control Frameworks"]);
        let frameworks = &filtered[0].items;
        assert_eq!(frameworks.len(), 1);
        assert_eq!(frameworks[0].label, "Frameworks");
        let subs: Vec<&str> = frameworks[0].submenu.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(subs, vec!["SOC 2"]);
    }

    #[test]
    fn filter_by_group_label_keeps_group() {
        let menu = build_menu(&tenant(3), RoleFlags::default(), FeatureFlags::default());
        let filtered = filter_menu(&menu, "PRIVACY");
        assert_eq!(labels(&filtered), vec!["Privacy"]);
        assert_eq!(filtered[0].items.len(), 4);
    }

    #[test]
    fn filter_without_hits_is_empty_and_blank_is_identity() {
        let menu = build_menu(&tenant(3), RoleFlags::default(), FeatureFlags::default());
        assert!(filter_menu(&menu, "zzz-no-such-entry").is_empty());
        assert_eq!(filter_menu(&menu, "   "), menu);
    }

    #[test]
    fn best_match_prefers_longest_path() {
        let ctx = tenant(7);
        let menu = build_menu(&ctx, RoleFlags::default(), FeatureFlags::default());
        let best = best_match(&menu, ctx.selected_client_id, "/clients/7/risks/register/12", "").unwrap();
        assert_eq!(best.label, "Risk Register");
        assert_eq!(best.resolved_path, "/clients/7/risks/register");
        assert_eq!(page_title(Some(&best)), "Risk Register");
    }

    #[test]
    fn best_match_picks_submenu_entry_for_its_query() {
        let ctx = tenant(7);
        let menu = build_menu(&ctx, RoleFlags::default(), FeatureFlags::default());
        let best = best_match(&menu, ctx.selected_client_id, "/clients/7/frameworks", "?framework=soc2").unwrap();
        assert_eq!(best.label, "SOC 2");
        assert_eq!(best.parent.as_deref(), Some("Frameworks"));

        let best = best_match(&menu, ctx.selected_client_id, "/clients/7/frameworks", "").unwrap();
        assert_eq!(best.label, "Frameworks");
    }

    #[test]
    fn tie_prefers_leaf_over_submenu_owner() {
        let groups = vec![MenuGroup::new(
            "G",
            vec![
                MenuItem::new(I::Layers, "Owner", "/reports")
                    .with_submenu(vec![MenuItem::new(I::Layers, "Other", "/elsewhere")]),
                MenuItem::new(I::Layers, "Leaf", "/reports"),
            ],
        )];
        let best = best_match(&groups, None, "/reports", "").unwrap();
        assert_eq!(best.label, "Leaf");
    }

    #[test]
    fn workspace_overview_tab_and_no_match_title() {
        let ctx = tenant(7);
        let menu = build_menu(&ctx, RoleFlags::default(), FeatureFlags::default());
        let best = best_match(&menu, ctx.selected_client_id, "/clients/7", "?tab=dashboard").unwrap();
        assert_eq!(best.label, "Workspace Overview");

        assert!(best_match(&menu, ctx.selected_client_id, "/clients/7", "?tab=people").is_none());
        assert_eq!(page_title(None), "Dashboard");
    }
}
