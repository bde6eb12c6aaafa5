use uuid::Uuid;
use chrono::Utc;
use serde::Deserialize;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::{info, instrument};

use common::pagination::Pagination;
use common::types::Paged;
use models::treatment::{self, SubCategory};

use crate::context::Actor;
use crate::errors::ServiceError;
use crate::listing::{fetch_page, ilike, search_any};
use crate::permissions::{authorize, modules, Action};

#[derive(Debug, Clone, Deserialize)]
pub struct TreatmentInput {
    /// `None` from an admin creates a global catalogue entry.
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTreatmentInput {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TreatmentFilter {
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
    /// Include the global catalogue next to clinic entries (default true).
    #[serde(default)]
    pub include_global: Option<bool>,
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubCategoryInput {
    pub name: String,
    #[serde(default)]
    pub price: Option<f64>,
}

#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id))]
pub async fn create_treatment(db: &DatabaseConnection, actor: &Actor, input: TreatmentInput) -> Result<treatment::Model, ServiceError> {
    let scope = write_scope(actor, input.clinic_id)?;
    authorize(db, actor, scope, modules::TREATMENTS, None, Action::Create).await?;
    ensure_unique_name(db, scope, &input.name, None).await?;
    let created = treatment::create(db, treatment::NewTreatment { clinic_id: scope, name: input.name, description: input.description }).await?;
    info!(treatment_id = %created.id, clinic_id = ?scope, "treatment_created");
    Ok(created)
}

pub async fn get_treatment(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<treatment::Model, ServiceError> {
    let found = load(db, id).await?;
    if let Some(c) = found.clinic_id {
        actor.ensure_clinic(c)?;
    }
    Ok(found)
}

/// Global catalogue plus the caller's clinic entries.
pub async fn list_treatments(db: &DatabaseConnection, actor: &Actor, filter: TreatmentFilter, page: Pagination) -> Result<Paged<treatment::Model>, ServiceError> {
    let scope = match actor.clinic_id {
        Some(_) => actor.list_scope(filter.clinic_id)?,
        None if actor.is_admin() => filter.clinic_id,
        None => None,
    };
    let include_global = filter.include_global.unwrap_or(true);
    let mut q = treatment::Entity::find();
    q = match (scope, include_global) {
        (Some(c), true) => q.filter(Condition::any().add(treatment::Column::ClinicId.eq(c)).add(treatment::Column::ClinicId.is_null())),
        (Some(c), false) => q.filter(treatment::Column::ClinicId.eq(c)),
        (None, _) if actor.is_admin() && filter.clinic_id.is_none() && !include_global => q.filter(treatment::Column::ClinicId.is_not_null()),
        (None, _) if actor.is_admin() => q,
        (None, _) => q.filter(treatment::Column::ClinicId.is_null()),
    };
    if let Some(cond) = search_any(filter.search.as_deref(), [treatment::Column::Name]) {
        q = q.filter(cond);
    }
    fetch_page(db, q.order_by_asc(treatment::Column::Name), page).await
}

#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id, treatment_id = %id))]
pub async fn update_treatment(db: &DatabaseConnection, actor: &Actor, id: Uuid, input: UpdateTreatmentInput) -> Result<treatment::Model, ServiceError> {
    let found = load(db, id).await?;
    guard(db, actor, &found, Action::Update).await?;
    let mut am: treatment::ActiveModel = found.clone().into();
    if let Some(name) = input.name {
        models::validate::validate_required("name", &name, 120)?;
        ensure_unique_name(db, found.clinic_id, &name, Some(found.id)).await?;
        am.slug = Set(models::validate::slugify(&name));
        am.name = Set(name.trim().to_string());
    }
    if let Some(v) = input.description { am.description = Set(Some(v)); }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!("treatment_updated");
    Ok(updated)
}

#[instrument(skip(db, actor), fields(user_id = %actor.user_id, treatment_id = %id))]
pub async fn delete_treatment(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<(), ServiceError> {
    let found = load(db, id).await?;
    guard(db, actor, &found, Action::Delete).await?;
    treatment::Entity::delete_by_id(id).exec(db).await?;
    info!("treatment_deleted");
    Ok(())
}

#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id, treatment_id = %id))]
pub async fn add_sub_category(db: &DatabaseConnection, actor: &Actor, id: Uuid, input: SubCategoryInput) -> Result<SubCategory, ServiceError> {
    let found = load(db, id).await?;
    guard(db, actor, &found, Action::Update).await?;
    let mut subs = found.sub_categories.clone();
    let added = subs.add(&input.name, input.price)?.clone();
    let mut am: treatment::ActiveModel = found.into();
    am.sub_categories = Set(subs);
    am.updated_at = Set(Utc::now().into());
    am.update(db).await?;
    info!(slug = %added.slug, "sub_category_added");
    Ok(added)
}

#[instrument(skip(db, actor), fields(user_id = %actor.user_id, treatment_id = %id))]
pub async fn remove_sub_category(db: &DatabaseConnection, actor: &Actor, id: Uuid, slug: &str) -> Result<treatment::Model, ServiceError> {
    let found = load(db, id).await?;
    guard(db, actor, &found, Action::Update).await?;
    let mut subs = found.sub_categories.clone();
    if !subs.remove(slug) {
        return Err(ServiceError::not_found("sub-category"));
    }
    let mut am: treatment::ActiveModel = found.into();
    am.sub_categories = Set(subs);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(slug, "sub_category_removed");
    Ok(updated)
}

/// Admins write the global catalogue unless they name a clinic.
fn write_scope(actor: &Actor, requested: Option<Uuid>) -> Result<Option<Uuid>, ServiceError> {
    if actor.is_admin() {
        Ok(requested)
    } else {
        actor.clinic_scope(requested).map(Some)
    }
}

async fn load(db: &DatabaseConnection, id: Uuid) -> Result<treatment::Model, ServiceError> {
    treatment::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("treatment"))
}

async fn guard(db: &DatabaseConnection, actor: &Actor, found: &treatment::Model, action: Action) -> Result<(), ServiceError> {
    match found.clinic_id {
        None => actor.require_admin(),
        Some(c) => {
            actor.ensure_clinic(c)?;
            authorize(db, actor, Some(c), modules::TREATMENTS, None, action).await
        }
    }
}

async fn ensure_unique_name(db: &DatabaseConnection, scope: Option<Uuid>, name: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
    let mut q = treatment::Entity::find().filter(ilike(treatment::Column::Name, &name.trim().to_lowercase()));
    q = match scope {
        Some(c) => q.filter(treatment::Column::ClinicId.eq(c)),
        None => q.filter(treatment::Column::ClinicId.is_null()),
    };
    if let Some(id) = except {
        q = q.filter(treatment::Column::Id.ne(id));
    }
    if q.one(db).await?.is_some() {
        return Err(ServiceError::Conflict(format!("treatment '{}' already exists", name.trim())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::errors::ModelError;
    use models::user::Role;
    use crate::test_support::{cleanup, get_db, seed_clinic, seed_member};

    #[tokio::test]
    async fn clinic_catalogue_and_sub_categories() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let (owner, c) = seed_clinic(&db).await?;
        let staff = seed_member(&db, c.id, Role::Staff).await?;
        let input = TreatmentInput { clinic_id: None, name: "Laser Hair Removal".into(), description: None };

        let t = create_treatment(&db, &owner, input.clone()).await?;
        assert_eq!(t.clinic_id, Some(c.id));
        assert_eq!(t.slug, "laser-hair-removal");
        let dup = TreatmentInput { name: "laser hair removal".into(), ..input };
        assert!(matches!(create_treatment(&db, &owner, dup).await, Err(ServiceError::Conflict(_))));

        let sub = add_sub_category(&db, &owner, t.id, SubCategoryInput { name: "Full Body".into(), price: Some(1499.999) }).await?;
        assert_eq!(sub.slug, "full-body");
        assert_eq!(sub.price, Some(1500.0));
        assert!(matches!(
            add_sub_category(&db, &owner, t.id, SubCategoryInput { name: "FULL BODY".into(), price: None }).await,
            Err(ServiceError::Model(ModelError::Conflict(_)))
        ));
        assert!(matches!(add_sub_category(&db, &staff, t.id, SubCategoryInput { name: "Face".into(), price: None }).await, Err(ServiceError::Forbidden(_))));

        let after = remove_sub_category(&db, &owner, t.id, "full-body").await?;
        assert!(after.sub_categories.0.is_empty());
        assert!(matches!(remove_sub_category(&db, &owner, t.id, "full-body").await, Err(ServiceError::NotFound(_))));

        let listed = list_treatments(&db, &owner, TreatmentFilter { include_global: Some(false), ..Default::default() }, Pagination::default()).await?;
        assert_eq!(listed.total, 1);
        cleanup(&db, c.id, owner.user_id).await;
        Ok(())
    }
}
