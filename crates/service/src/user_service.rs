use uuid::Uuid;
use chrono::Utc;
use serde::Deserialize;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::{info, instrument};

use common::pagination::Pagination;
use common::types::Paged;
use models::user::{self, Role};
use models::{clinic, validate};

use crate::auth::domain::{AuthUser, RegisterInput};
use crate::auth::repository::AuthRepository;
use crate::auth::AuthService;
use crate::context::Actor;
use crate::errors::ServiceError;
use crate::listing::{fetch_page, search_any};
use crate::permissions::{authorize, modules, Action};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMemberInput {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserInput {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub status: Option<String>,
}

/// Create a doctor, staff or agent account inside the caller's clinic.
#[instrument(skip(auth, actor, input), fields(user_id = %actor.user_id, role = %input.role))]
pub async fn create_member<R: AuthRepository + ?Sized>(
    db: &DatabaseConnection,
    auth: &AuthService<R>,
    actor: &Actor,
    input: CreateMemberInput,
) -> Result<AuthUser, ServiceError> {
    if !input.role.is_clinic_member() {
        return Err(ServiceError::validation("members must be doctor, staff or agent"));
    }
    let clinic_id = actor.clinic_scope(input.clinic_id)?;
    authorize(db, actor, Some(clinic_id), modules::USERS, None, Action::Create).await?;
    let registrar = if actor.is_admin() || actor.owns_clinic(clinic_id) {
        actor.clone()
    } else {
        // Members holding `users.create` register on behalf of the clinic.
        Actor { role: Role::Clinic, ..actor.clone() }
    };
    let created = auth
        .register(
            RegisterInput {
                email: input.email,
                name: input.name,
                password: input.password,
                role: input.role,
                clinic_id: Some(clinic_id),
                phone: input.phone,
            },
            Some(&registrar),
        )
        .await?;
    info!(member_id = %created.id, clinic_id = %clinic_id, "member_created");
    Ok(created)
}

/// Users of a clinic (admins may list across clinics), soft-deleted excluded.
pub async fn list_users(
    db: &DatabaseConnection,
    actor: &Actor,
    filter: UserFilter,
    page: Pagination,
) -> Result<Paged<user::Model>, ServiceError> {
    let scope = actor.list_scope(filter.clinic_id)?;
    authorize(db, actor, scope, modules::USERS, None, Action::Read).await?;
    let mut q = user::Entity::find().filter(user::Column::DeletedAt.is_null());
    if let Some(c) = scope {
        q = q.filter(user::Column::ClinicId.eq(c));
    }
    if let Some(r) = filter.role {
        q = q.filter(user::Column::Role.eq(r.as_str()));
    }
    if let Some(cond) = search_any(filter.search.as_deref(), [user::Column::Name, user::Column::Email]) {
        q = q.filter(cond);
    }
    fetch_page(db, q.order_by_asc(user::Column::Name), page).await
}

/// Self, or a user of a clinic the caller may read.
pub async fn get_user(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<user::Model, ServiceError> {
    let found = load(db, id).await?;
    if found.id != actor.user_id {
        guard_target(db, actor, &found, Action::Read).await?;
    }
    Ok(found)
}

/// Name and phone may be changed by the user; status only by the clinic or an admin.
#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id, target = %id))]
pub async fn update_user(db: &DatabaseConnection, actor: &Actor, id: Uuid, input: UpdateUserInput) -> Result<user::Model, ServiceError> {
    let found = load(db, id).await?;
    let is_self = found.id == actor.user_id;
    if !is_self || input.status.is_some() {
        guard_target(db, actor, &found, Action::Update).await?;
    }
    let mut am: user::ActiveModel = found.into();
    if let Some(name) = input.name {
        user::validate_name(&name)?;
        am.name = Set(name.trim().to_string());
    }
    if let Some(phone) = input.phone {
        let phone = phone.trim().to_string();
        if phone.is_empty() {
            am.phone = Set(None);
        } else {
            validate::validate_phone(&phone)?;
            am.phone = Set(Some(phone));
        }
    }
    if let Some(status) = input.status {
        match status.as_str() {
            user::STATUS_ACTIVE | user::STATUS_INACTIVE => am.status = Set(status),
            other => return Err(ServiceError::Validation(format!("invalid status '{other}'"))),
        }
    }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!("user_updated");
    Ok(updated)
}

/// Marks `deleted_at` and deactivates the account.
#[instrument(skip(db, actor), fields(user_id = %actor.user_id, target = %id))]
pub async fn soft_delete_user(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<(), ServiceError> {
    let found = load(db, id).await?;
    if found.id == actor.user_id {
        return Err(ServiceError::validation("cannot delete your own account"));
    }
    guard_target(db, actor, &found, Action::Delete).await?;
    if found.role()? == Role::Clinic && !actor.is_admin() {
        return Err(ServiceError::forbidden("clinic owners can only be removed by an admin"));
    }
    user::soft_delete(db, id).await?;
    info!("user_soft_deleted");
    Ok(())
}

/// Removes the row; owners of a clinic must have it deleted first.
#[instrument(skip(db, actor), fields(user_id = %actor.user_id, target = %id))]
pub async fn hard_delete_user(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<(), ServiceError> {
    actor.require_admin()?;
    load(db, id).await?;
    let owned = clinic::Entity::find().filter(clinic::Column::OwnerId.eq(id)).one(db).await?;
    if owned.is_some() {
        return Err(ServiceError::Conflict("user still owns a clinic".into()));
    }
    user::hard_delete(db, id).await?;
    info!("user_hard_deleted");
    Ok(())
}

async fn load(db: &DatabaseConnection, id: Uuid) -> Result<user::Model, ServiceError> {
    user::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("user"))
}

async fn guard_target(db: &DatabaseConnection, actor: &Actor, target: &user::Model, action: Action) -> Result<(), ServiceError> {
    if actor.is_admin() {
        return Ok(());
    }
    let clinic_id = target.clinic_id.ok_or_else(|| ServiceError::forbidden("user outside caller scope"))?;
    actor.ensure_clinic(clinic_id)?;
    authorize(db, actor, Some(clinic_id), modules::USERS, None, action).await
}
