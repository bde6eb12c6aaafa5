//! Reading and replacing the stored permission grids.

use sea_orm::{DatabaseConnection, EntityTrait};
use tracing::{info, instrument};
use uuid::Uuid;

use models::permission::{Action, PermissionGrid};
use models::user::Role;
use models::{agent_permission, clinic_permission, user};

use super::{modules, policy::authorize};
use crate::context::Actor;
use crate::errors::ServiceError;

pub async fn get_role_permissions(
    db: &DatabaseConnection,
    actor: &Actor,
    clinic_id: Option<Uuid>,
    role: Role,
) -> Result<PermissionGrid, ServiceError> {
    let clinic_id = actor.clinic_scope(clinic_id)?;
    authorize(db, actor, Some(clinic_id), modules::PERMISSIONS, None, Action::Read).await?;
    clinic_permission::validate_role(role)?;
    Ok(clinic_permission::find(db, clinic_id, role).await?.map(|p| p.permissions).unwrap_or_default())
}

#[instrument(skip(db, actor, grid), fields(user_id = %actor.user_id, role = %role))]
pub async fn put_role_permissions(
    db: &DatabaseConnection,
    actor: &Actor,
    clinic_id: Option<Uuid>,
    role: Role,
    grid: PermissionGrid,
) -> Result<PermissionGrid, ServiceError> {
    let clinic_id = actor.clinic_scope(clinic_id)?;
    owner_or_admin(actor, clinic_id)?;
    let saved = clinic_permission::upsert(db, clinic_id, role, grid, actor.user_id).await?;
    info!(clinic_id = %clinic_id, "role_permissions_updated");
    Ok(saved.permissions)
}

pub async fn get_agent_permissions(db: &DatabaseConnection, actor: &Actor, agent_id: Uuid) -> Result<PermissionGrid, ServiceError> {
    let agent = load_agent(db, agent_id).await?;
    let clinic_id = agent.clinic_id.ok_or_else(|| ServiceError::validation("agent is not linked to a clinic"))?;
    if actor.user_id != agent_id {
        authorize(db, actor, Some(clinic_id), modules::PERMISSIONS, None, Action::Read).await?;
    }
    if let Some(p) = agent_permission::find_for_agent(db, agent_id).await? {
        return Ok(p.permissions);
    }
    Ok(clinic_permission::find(db, clinic_id, Role::Agent).await?.map(|p| p.permissions).unwrap_or_default())
}

#[instrument(skip(db, actor, grid), fields(user_id = %actor.user_id, agent_id = %agent_id))]
pub async fn put_agent_permissions(
    db: &DatabaseConnection,
    actor: &Actor,
    agent_id: Uuid,
    grid: PermissionGrid,
) -> Result<PermissionGrid, ServiceError> {
    let agent = load_agent(db, agent_id).await?;
    let clinic_id = agent.clinic_id.ok_or_else(|| ServiceError::validation("agent is not linked to a clinic"))?;
    owner_or_admin(actor, clinic_id)?;
    let saved = agent_permission::upsert(db, clinic_id, agent_id, grid, actor.user_id).await?;
    info!(clinic_id = %clinic_id, "agent_permissions_updated");
    Ok(saved.permissions)
}

fn owner_or_admin(actor: &Actor, clinic_id: Uuid) -> Result<(), ServiceError> {
    if actor.is_admin() || actor.owns_clinic(clinic_id) {
        Ok(())
    } else {
        Err(ServiceError::forbidden("only the clinic owner or an admin may change permissions"))
    }
}

async fn load_agent(db: &DatabaseConnection, agent_id: Uuid) -> Result<user::Model, ServiceError> {
    let agent = user::Entity::find_by_id(agent_id).one(db).await?.ok_or_else(|| ServiceError::not_found("agent"))?;
    if agent.role()? != Role::Agent {
        return Err(ServiceError::validation("user is not an agent"));
    }
    Ok(agent)
}
