//! Navigation catalogue filtered by read permission.

use sea_orm::DatabaseConnection;
use serde::Serialize;

use models::permission::{Action, PermissionGrid};
use models::user::Role;

use super::modules;
use super::policy::grid_for;
use crate::context::Actor;
use crate::errors::ServiceError;

struct Entry {
    module: &'static str,
    label: &'static str,
    path: &'static str,
    children: &'static [(&'static str, &'static str, &'static str)],
}

const CATALOGUE: &[Entry] = &[
    Entry { module: modules::LEADS, label: "Leads", path: "/leads", children: &[("follow_ups", "Follow-ups", "/leads/follow-ups")] },
    Entry { module: modules::PATIENTS, label: "Patients", path: "/patients", children: &[("payments", "Payments", "/patients/payments")] },
    Entry { module: modules::MEMBERSHIPS, label: "Memberships", path: "/memberships", children: &[] },
    Entry { module: modules::DOCTORS, label: "Doctors", path: "/doctors", children: &[] },
    Entry { module: modules::TREATMENTS, label: "Treatments", path: "/treatments", children: &[] },
    Entry {
        module: modules::PETTY_CASH,
        label: "Petty Cash",
        path: "/petty-cash",
        children: &[("allocations", "Allocations", "/petty-cash/allocations"), ("expenses", "Expenses", "/petty-cash/expenses")],
    },
    Entry { module: modules::OFFERS, label: "Offers", path: "/offers", children: &[] },
    Entry { module: modules::JOBS, label: "Jobs", path: "/jobs", children: &[] },
    Entry { module: modules::BLOGS, label: "Blogs", path: "/blogs", children: &[] },
    Entry { module: modules::VENDORS, label: "Vendors", path: "/vendors", children: &[] },
    Entry { module: modules::USERS, label: "Team", path: "/users", children: &[] },
    Entry { module: modules::PERMISSIONS, label: "Permissions", path: "/permissions", children: &[] },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SidebarItem {
    pub module: String,
    pub label: String,
    pub path: String,
    pub children: Vec<SidebarItem>,
}

/// Catalogue entries readable under `grid`; `None` means unrestricted.
pub fn filter_catalogue(grid: Option<&PermissionGrid>) -> Vec<SidebarItem> {
    let readable = |module: &str, sub: Option<&str>| grid.map_or(true, |g| g.check(module, sub, Action::Read));
    CATALOGUE
        .iter()
        .filter(|e| readable(e.module, None))
        .map(|e| SidebarItem {
            module: e.module.to_string(),
            label: e.label.to_string(),
            path: e.path.to_string(),
            children: e
                .children
                .iter()
                .filter(|(name, _, _)| readable(e.module, Some(name)))
                .map(|(name, label, path)| SidebarItem {
                    module: format!("{}.{}", e.module, name),
                    label: label.to_string(),
                    path: path.to_string(),
                    children: Vec::new(),
                })
                .collect(),
        })
        .collect()
}

/// Sidebar for the caller. Owners and admins see everything; members see what their grid lets them read.
pub async fn sidebar(db: &DatabaseConnection, actor: &Actor) -> Result<Vec<SidebarItem>, ServiceError> {
    match actor.role {
        Role::Admin | Role::Clinic => Ok(filter_catalogue(None)),
        Role::User => Ok(Vec::new()),
        _ => {
            let grid = grid_for(db, actor).await?.unwrap_or_default();
            Ok(filter_catalogue(Some(&grid)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::permission::{ActionSet, ModulePermission, SubModulePermission};

    #[test]
    fn only_readable_modules_are_listed() {
        let grid = PermissionGrid(vec![
            ModulePermission { module: "agent_leads".into(), actions: ActionSet::read_only(), sub_modules: vec![] },
            ModulePermission {
                module: "petty-cash".into(),
                actions: ActionSet::read_only(),
                sub_modules: vec![SubModulePermission { name: "expenses".into(), actions: ActionSet::default() }],
            },
            ModulePermission { module: "vendors".into(), actions: ActionSet { create: true, ..Default::default() }, sub_modules: vec![] },
        ]);
        let items = filter_catalogue(Some(&grid));
        let names: Vec<_> = items.iter().map(|i| i.module.as_str()).collect();
        assert_eq!(names, vec!["leads", "petty_cash"]);
        let petty = &items[1];
        assert_eq!(petty.children.len(), 1);
        assert_eq!(petty.children[0].module, "petty_cash.allocations");
    }

    #[test]
    fn empty_grid_shows_nothing_and_none_shows_all() {
        assert!(filter_catalogue(Some(&PermissionGrid::default())).is_empty());
        assert_eq!(filter_catalogue(None).len(), CATALOGUE.len());
    }
}
