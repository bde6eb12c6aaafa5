use uuid::Uuid;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::{info, instrument};

use common::pagination::Pagination;
use common::types::Paged;
use models::offer;
use models::types::StringList;

use crate::context::Actor;
use crate::errors::ServiceError;
use crate::listing::{fetch_page, search_any};
use crate::permissions::{authorize, modules, Action};

#[derive(Debug, Clone, Deserialize)]
pub struct OfferInput {
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub discount_type: String,
    pub discount_value: f64,
    #[serde(default)]
    pub treatments: Vec<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOfferInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub discount_type: Option<String>,
    pub discount_value: Option<f64>,
    pub treatments: Option<Vec<String>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfferFilter {
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id))]
pub async fn create_offer(db: &DatabaseConnection, actor: &Actor, input: OfferInput) -> Result<offer::Model, ServiceError> {
    let clinic_id = actor.clinic_scope(input.clinic_id)?;
    authorize(db, actor, Some(clinic_id), modules::OFFERS, None, Action::Create).await?;
    let status = input.status.unwrap_or_else(|| "draft".to_string());
    offer::validate_status(&status)?;
    let created = offer::create(
        db,
        offer::NewOffer {
            clinic_id,
            title: input.title,
            description: input.description,
            discount_type: input.discount_type,
            discount_value: input.discount_value,
            treatments: input.treatments,
            starts_at: input.starts_at,
            ends_at: input.ends_at,
            status,
        },
    )
    .await?;
    info!(offer_id = %created.id, status = %created.status, "offer_created");
    Ok(created)
}

pub async fn get_offer(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<offer::Model, ServiceError> {
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    authorize(db, actor, Some(found.clinic_id), modules::OFFERS, None, Action::Read).await?;
    Ok(found)
}

pub async fn list_offers(db: &DatabaseConnection, actor: &Actor, filter: OfferFilter, page: Pagination) -> Result<Paged<offer::Model>, ServiceError> {
    let scope = actor.list_scope(filter.clinic_id)?;
    authorize(db, actor, scope, modules::OFFERS, None, Action::Read).await?;
    let mut q = offer::Entity::find();
    if let Some(c) = scope {
        q = q.filter(offer::Column::ClinicId.eq(c));
    }
    if let Some(s) = filter.status {
        q = q.filter(offer::Column::Status.eq(s));
    }
    if let Some(cond) = search_any(filter.search.as_deref(), [offer::Column::Title]) {
        q = q.filter(cond);
    }
    fetch_page(db, q.order_by_desc(offer::Column::StartsAt), page).await
}

/// Public listing: active offers whose window contains now.
pub async fn list_live_offers(db: &DatabaseConnection, clinic_id: Option<Uuid>, page: Pagination) -> Result<Paged<offer::Model>, ServiceError> {
    let now = Utc::now();
    let mut q = offer::Entity::find()
        .filter(offer::Column::Status.eq(offer::STATUS_ACTIVE))
        .filter(offer::Column::StartsAt.lte(now))
        .filter(offer::Column::EndsAt.gt(now));
    if let Some(c) = clinic_id {
        q = q.filter(offer::Column::ClinicId.eq(c));
    }
    fetch_page(db, q.order_by_asc(offer::Column::EndsAt), page).await
}

#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id, offer_id = %id))]
pub async fn update_offer(db: &DatabaseConnection, actor: &Actor, id: Uuid, input: UpdateOfferInput) -> Result<offer::Model, ServiceError> {
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    authorize(db, actor, Some(found.clinic_id), modules::OFFERS, None, Action::Update).await?;
    let mut am: offer::ActiveModel = found.into();
    if let Some(v) = input.title {
        models::validate::validate_required("title", &v, 160)?;
        am.title = Set(v.trim().to_string());
    }
    if let Some(v) = input.description { am.description = Set(Some(v)); }
    if let Some(v) = input.discount_type { am.discount_type = Set(v); }
    if let Some(v) = input.discount_value { am.discount_value = Set(v); }
    if let Some(v) = input.treatments { am.treatments = Set(StringList::cleaned(v)); }
    if let Some(v) = input.starts_at { am.starts_at = Set(v.into()); }
    if let Some(v) = input.ends_at { am.ends_at = Set(v.into()); }
    if let Some(v) = input.status { am.status = Set(v); }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(status = %updated.status, "offer_updated");
    Ok(updated)
}

#[instrument(skip(db, actor), fields(user_id = %actor.user_id, offer_id = %id))]
pub async fn delete_offer(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<(), ServiceError> {
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    authorize(db, actor, Some(found.clinic_id), modules::OFFERS, None, Action::Delete).await?;
    offer::Entity::delete_by_id(id).exec(db).await?;
    info!("offer_deleted");
    Ok(())
}

async fn load(db: &DatabaseConnection, id: Uuid) -> Result<offer::Model, ServiceError> {
    offer::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("offer"))
}
