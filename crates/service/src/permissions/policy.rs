use sea_orm::DatabaseConnection;
use tracing::debug;
use uuid::Uuid;

use models::permission::{Action, PermissionGrid};
use models::user::Role;
use models::{agent_permission, clinic_permission};

use crate::context::Actor;
use crate::errors::ServiceError;

/// Grid governing a non-owner clinic member.
///
/// Agents use their personal grid when one exists, otherwise the clinic's
/// `agent` role grid. Doctors and staff use their clinic role grid.
pub async fn grid_for(db: &DatabaseConnection, actor: &Actor) -> Result<Option<PermissionGrid>, ServiceError> {
    let Some(clinic_id) = actor.clinic_id else { return Ok(None) };
    match actor.role {
        Role::Agent => {
            if let Some(p) = agent_permission::find_for_agent(db, actor.user_id).await? {
                if p.clinic_id == clinic_id {
                    return Ok(Some(p.permissions));
                }
            }
            Ok(clinic_permission::find(db, clinic_id, Role::Agent).await?.map(|p| p.permissions))
        }
        Role::Doctor | Role::Staff => {
            Ok(clinic_permission::find(db, clinic_id, actor.role).await?.map(|p| p.permissions))
        }
        _ => Ok(None),
    }
}

/// Pure decision once the caller's grid is known.
pub fn decide(
    actor: &Actor,
    target_clinic: Option<Uuid>,
    grid: Option<&PermissionGrid>,
    module: &str,
    sub_module: Option<&str>,
    action: Action,
) -> bool {
    if actor.is_admin() {
        return true;
    }
    let Some(own) = actor.clinic_id else { return false };
    if target_clinic.is_some_and(|t| t != own) {
        return false;
    }
    match actor.role {
        Role::Clinic => true,
        Role::Agent | Role::Doctor | Role::Staff => grid.is_some_and(|g| g.check(module, sub_module, action)),
        Role::Admin | Role::User => false,
    }
}

/// Allow or deny `action` on `module` (and `sub_module`) for the caller.
pub async fn authorize(
    db: &DatabaseConnection,
    actor: &Actor,
    target_clinic: Option<Uuid>,
    module: &str,
    sub_module: Option<&str>,
    action: Action,
) -> Result<(), ServiceError> {
    let grid = match actor.role {
        Role::Agent | Role::Doctor | Role::Staff => grid_for(db, actor).await?,
        _ => None,
    };
    if decide(actor, target_clinic, grid.as_ref(), module, sub_module, action) {
        return Ok(());
    }
    debug!(user_id = %actor.user_id, role = %actor.role, module, ?sub_module, %action, "permission_denied");
    let target = match sub_module {
        Some(s) => format!("{module}.{s}"),
        None => module.to_string(),
    };
    Err(ServiceError::Forbidden(format!("{action} on {target} not permitted")))
}

/// Whether the caller holds `all` on a module (agents see every lead with it).
pub async fn has_full_access(db: &DatabaseConnection, actor: &Actor, module: &str) -> Result<bool, ServiceError> {
    match actor.role {
        Role::Admin | Role::Clinic => Ok(true),
        Role::User => Ok(false),
        _ => Ok(grid_for(db, actor)
            .await?
            .and_then(|g| g.module(module).map(|m| m.actions.all))
            .unwrap_or(false)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::permission::{ActionSet, ModulePermission};

    fn actor(role: Role, clinic_id: Option<Uuid>) -> Actor {
        Actor { user_id: Uuid::new_v4(), email: "x@y.com".into(), role, clinic_id }
    }

    fn leads_read() -> PermissionGrid {
        PermissionGrid(vec![ModulePermission { module: "agent_leads".into(), actions: ActionSet::read_only(), sub_modules: vec![] }])
    }

    #[test]
    fn admin_always_allowed() {
        assert!(decide(&actor(Role::Admin, None), Some(Uuid::new_v4()), None, "leads", None, Action::Delete));
    }

    #[test]
    fn owner_allowed_only_in_own_clinic() {
        let c = Uuid::new_v4();
        let o = actor(Role::Clinic, Some(c));
        assert!(decide(&o, Some(c), None, "vendors", None, Action::Delete));
        assert!(!decide(&o, Some(Uuid::new_v4()), None, "vendors", None, Action::Read));
        assert!(!decide(&actor(Role::Clinic, None), None, None, "vendors", None, Action::Read));
    }

    #[test]
    fn members_follow_their_grid() {
        let c = Uuid::new_v4();
        let a = actor(Role::Agent, Some(c));
        let g = leads_read();
        assert!(decide(&a, Some(c), Some(&g), "leads", None, Action::Read));
        assert!(!decide(&a, Some(c), Some(&g), "leads", None, Action::Create));
        assert!(!decide(&a, Some(c), None, "leads", None, Action::Read));
        assert!(!decide(&a, Some(Uuid::new_v4()), Some(&g), "leads", None, Action::Read));
    }

    #[test]
    fn plain_users_denied() {
        let c = Uuid::new_v4();
        let g = PermissionGrid(vec![ModulePermission { module: "leads".into(), actions: ActionSet::full(), sub_modules: vec![] }]);
        assert!(!decide(&actor(Role::User, Some(c)), Some(c), Some(&g), "leads", None, Action::Read));
    }
}
