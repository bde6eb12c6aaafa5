use uuid::Uuid;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::{info, instrument};

use common::pagination::Pagination;
use common::types::Paged;
use models::membership::{self, ConsumedTreatment};
use models::patient_registration as patient;

use crate::context::Actor;
use crate::errors::ServiceError;
use crate::listing::{fetch_page, search_any};
use crate::permissions::{authorize, modules, Action};

#[derive(Debug, Clone, Deserialize)]
pub struct MembershipInput {
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
    /// Name and phone default to the patient's when omitted.
    #[serde(default)]
    pub patient_id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub package_name: String,
    pub package_amount: f64,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMembershipInput {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub package_name: Option<String>,
    pub package_amount: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MembershipFilter {
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub patient_id: Option<Uuid>,
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsumeInput {
    pub treatment: String,
    #[serde(default)]
    pub sub_treatment: Option<String>,
    #[serde(default = "one")]
    pub quantity: u32,
    pub unit_price: f64,
}

fn one() -> u32 { 1 }

#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id))]
pub async fn create_membership(db: &DatabaseConnection, actor: &Actor, input: MembershipInput) -> Result<membership::Model, ServiceError> {
    let clinic_id = actor.clinic_scope(input.clinic_id)?;
    authorize(db, actor, Some(clinic_id), modules::MEMBERSHIPS, None, Action::Create).await?;
    let holder = match input.patient_id {
        Some(pid) => {
            let p = patient::Entity::find_by_id(pid).one(db).await?.ok_or_else(|| ServiceError::not_found("patient"))?;
            if p.clinic_id != clinic_id {
                return Err(ServiceError::validation("patient belongs to another clinic"));
            }
            Some(p)
        }
        None => None,
    };
    let name = input.name.or_else(|| holder.as_ref().map(|p| p.full_name())).unwrap_or_default();
    let phone = input.phone.or_else(|| holder.as_ref().map(|p| p.phone.clone())).unwrap_or_default();
    let start_date = input.start_date.unwrap_or_else(|| Utc::now().date_naive());
    membership::validate_window(start_date, input.end_date)?;
    let created = membership::create(
        db,
        membership::NewMembership {
            clinic_id,
            patient_id: input.patient_id,
            name,
            phone,
            package_name: input.package_name,
            package_amount: input.package_amount,
            start_date,
            end_date: input.end_date,
        },
    )
    .await?;
    info!(membership_id = %created.id, package = created.package_amount, "membership_created");
    Ok(created)
}

/// Records treatment usage against the package; refused once it would go negative.
#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id, membership_id = %id))]
pub async fn consume_treatment(db: &DatabaseConnection, actor: &Actor, id: Uuid, input: ConsumeInput) -> Result<membership::Model, ServiceError> {
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    authorize(db, actor, Some(found.clinic_id), modules::MEMBERSHIPS, Some("treatments"), Action::Create).await?;
    if input.quantity == 0 {
        return Err(ServiceError::validation("quantity must be at least 1"));
    }
    let line = ConsumedTreatment {
        treatment: input.treatment.trim().to_string(),
        sub_treatment: input.sub_treatment,
        quantity: input.quantity,
        unit_price: models::validate::round_money(input.unit_price),
        used_at: Utc::now(),
        recorded_by: actor.user_id,
    };
    let am = membership::consume(&found, line, Utc::now().date_naive())?;
    let updated = am.update(db).await?;
    info!(remaining = updated.remaining, status = %updated.status, "membership_consumed");
    Ok(updated)
}

pub async fn get_membership(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<membership::Model, ServiceError> {
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    authorize(db, actor, Some(found.clinic_id), modules::MEMBERSHIPS, None, Action::Read).await?;
    Ok(found)
}

pub async fn list_memberships(
    db: &DatabaseConnection,
    actor: &Actor,
    filter: MembershipFilter,
    page: Pagination,
) -> Result<Paged<membership::Model>, ServiceError> {
    let scope = actor.list_scope(filter.clinic_id)?;
    authorize(db, actor, scope, modules::MEMBERSHIPS, None, Action::Read).await?;
    let mut q = membership::Entity::find();
    if let Some(c) = scope {
        q = q.filter(membership::Column::ClinicId.eq(c));
    }
    if let Some(s) = filter.status {
        q = q.filter(membership::Column::Status.eq(s));
    }
    if let Some(p) = filter.patient_id {
        q = q.filter(membership::Column::PatientId.eq(p));
    }
    let cols = [membership::Column::Name, membership::Column::Phone, membership::Column::PackageName];
    if let Some(cond) = search_any(filter.search.as_deref(), cols) {
        q = q.filter(cond);
    }
    fetch_page(db, q.order_by_desc(membership::Column::CreatedAt), page).await
}

/// Package or date edits re-run the usage derivation in the save hook.
#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id, membership_id = %id))]
pub async fn update_membership(
    db: &DatabaseConnection,
    actor: &Actor,
    id: Uuid,
    input: UpdateMembershipInput,
) -> Result<membership::Model, ServiceError> {
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    authorize(db, actor, Some(found.clinic_id), modules::MEMBERSHIPS, None, Action::Update).await?;
    let mut am: membership::ActiveModel = found.into();
    if let Some(v) = input.name {
        models::validate::validate_required("name", &v, 128)?;
        am.name = Set(v.trim().to_string());
    }
    if let Some(v) = input.phone {
        models::validate::validate_phone(&v)?;
        am.phone = Set(v.trim().to_string());
    }
    if let Some(v) = input.package_name { am.package_name = Set(v.trim().to_string()); }
    if let Some(v) = input.package_amount {
        models::validate::validate_positive("package_amount", v)?;
        am.package_amount = Set(models::validate::round_money(v));
    }
    if let Some(v) = input.start_date { am.start_date = Set(v); }
    if let Some(v) = input.end_date { am.end_date = Set(v); }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(remaining = updated.remaining, "membership_updated");
    Ok(updated)
}

#[instrument(skip(db, actor), fields(user_id = %actor.user_id, membership_id = %id))]
pub async fn delete_membership(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<(), ServiceError> {
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    authorize(db, actor, Some(found.clinic_id), modules::MEMBERSHIPS, None, Action::Delete).await?;
    membership::Entity::delete_by_id(id).exec(db).await?;
    info!("membership_deleted");
    Ok(())
}

async fn load(db: &DatabaseConnection, id: Uuid) -> Result<membership::Model, ServiceError> {
    membership::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("membership"))
}
