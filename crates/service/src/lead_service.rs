use uuid::Uuid;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::{info, instrument};

use common::pagination::Pagination;
use common::types::Paged;
use models::lead;
use models::user::{self, Role};

use crate::context::Actor;
use crate::errors::ServiceError;
use crate::integrations::notifier::dispatch;
use crate::integrations::{Notification, Notifier};
use crate::listing::{fetch_page, search_any};
use crate::permissions::policy::has_full_access;
use crate::permissions::{authorize, modules, Action};

#[derive(Debug, Clone, Deserialize)]
pub struct LeadInput {
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub treatment: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
}

fn default_source() -> String { "other".into() }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLeadInput {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub source: Option<String>,
    pub treatment: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadFilter {
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FollowUpInput {
    pub note: String,
    #[serde(default)]
    pub next_follow_up: Option<DateTime<Utc>>,
}

#[instrument(skip(db, notifier, actor, input), fields(user_id = %actor.user_id))]
pub async fn create_lead(db: &DatabaseConnection, notifier: &dyn Notifier, actor: &Actor, input: LeadInput) -> Result<lead::Model, ServiceError> {
    let clinic_id = actor.clinic_scope(input.clinic_id)?;
    authorize(db, actor, Some(clinic_id), modules::LEADS, None, Action::Create).await?;
    models::validate::validate_required("name", &input.name, 128)?;
    let assignee = match input.assigned_to {
        Some(id) => Some(load_assignee(db, clinic_id, id).await?),
        None => None,
    };
    let created = lead::create(
        db,
        lead::NewLead {
            clinic_id,
            name: input.name,
            phone: input.phone,
            email: input.email,
            source: input.source,
            treatment: input.treatment,
            notes: input.notes,
            assigned_to: input.assigned_to,
            created_by: actor.user_id,
        },
    )
    .await?;
    info!(lead_id = %created.id, clinic_id = %clinic_id, "lead_created");
    if let Some(a) = assignee {
        dispatch(notifier, assignment_notice(&a, &created)).await;
    }
    Ok(created)
}

pub async fn get_lead(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<lead::Model, ServiceError> {
    let found = load(db, id).await?;
    guard(db, actor, &found, Action::Read).await?;
    Ok(found)
}

/// Agents without `all` on leads only see the leads assigned to them.
pub async fn list_leads(db: &DatabaseConnection, actor: &Actor, filter: LeadFilter, page: Pagination) -> Result<Paged<lead::Model>, ServiceError> {
    let scope = actor.list_scope(filter.clinic_id)?;
    authorize(db, actor, scope, modules::LEADS, None, Action::Read).await?;
    let mut q = lead::Entity::find();
    if let Some(c) = scope {
        q = q.filter(lead::Column::ClinicId.eq(c));
    }
    if actor.role == Role::Agent && !has_full_access(db, actor, modules::LEADS).await? {
        q = q.filter(lead::Column::AssignedTo.eq(actor.user_id));
    } else if let Some(a) = filter.assigned_to {
        q = q.filter(lead::Column::AssignedTo.eq(a));
    }
    if let Some(s) = filter.status {
        lead::validate_status(&s)?;
        q = q.filter(lead::Column::Status.eq(s));
    }
    if let Some(s) = filter.source {
        lead::validate_source(&s)?;
        q = q.filter(lead::Column::Source.eq(s));
    }
    if let Some(cond) = search_any(filter.search.as_deref(), [lead::Column::Name, lead::Column::Phone, lead::Column::Email]) {
        q = q.filter(cond);
    }
    fetch_page(db, q.order_by_desc(lead::Column::CreatedAt), page).await
}

#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id, lead_id = %id))]
pub async fn update_lead(db: &DatabaseConnection, actor: &Actor, id: Uuid, input: UpdateLeadInput) -> Result<lead::Model, ServiceError> {
    let found = load(db, id).await?;
    guard(db, actor, &found, Action::Update).await?;
    let mut am: lead::ActiveModel = found.into();
    if let Some(v) = input.name {
        models::validate::validate_required("name", &v, 128)?;
        am.name = Set(v.trim().to_string());
    }
    if let Some(v) = input.phone { am.phone = Set(v.trim().to_string()); }
    if let Some(v) = input.email { am.email = Set(Some(v.trim().to_ascii_lowercase()).filter(|e| !e.is_empty())); }
    if let Some(v) = input.source { am.source = Set(v); }
    if let Some(v) = input.treatment { am.treatment = Set(Some(v)); }
    if let Some(v) = input.notes { am.notes = Set(Some(v)); }
    if let Some(v) = input.status { am.status = Set(v); }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!("lead_updated");
    Ok(updated)
}

#[instrument(skip(db, actor), fields(user_id = %actor.user_id, lead_id = %id))]
pub async fn update_status(db: &DatabaseConnection, actor: &Actor, id: Uuid, status: &str) -> Result<lead::Model, ServiceError> {
    lead::validate_status(status)?;
    update_lead(db, actor, id, UpdateLeadInput { status: Some(status.to_string()), ..Default::default() }).await
}

/// Hand the lead to a staff member or agent of the same clinic and notify them.
#[instrument(skip(db, notifier, actor), fields(user_id = %actor.user_id, lead_id = %id))]
pub async fn assign_lead(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    actor: &Actor,
    id: Uuid,
    assignee_id: Uuid,
) -> Result<lead::Model, ServiceError> {
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    authorize(db, actor, Some(found.clinic_id), modules::LEADS, Some("assign"), Action::Update).await?;
    let assignee = load_assignee(db, found.clinic_id, assignee_id).await?;
    let mut am: lead::ActiveModel = found.into();
    am.assigned_to = Set(Some(assignee.id));
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(assignee_id = %assignee.id, "lead_assigned");
    dispatch(notifier, assignment_notice(&assignee, &updated)).await;
    Ok(updated)
}

#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id, lead_id = %id))]
pub async fn add_follow_up(db: &DatabaseConnection, actor: &Actor, id: Uuid, input: FollowUpInput) -> Result<lead::Model, ServiceError> {
    let found = load(db, id).await?;
    guard(db, actor, &found, Action::Update).await?;
    let mut follow_ups = found.follow_ups.clone();
    follow_ups.push(actor.user_id, &input.note, input.next_follow_up)?;
    let mut am: lead::ActiveModel = found.into();
    am.follow_ups = Set(follow_ups);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(entries = updated.follow_ups.0.len(), "lead_follow_up_added");
    Ok(updated)
}

#[instrument(skip(db, actor), fields(user_id = %actor.user_id, lead_id = %id))]
pub async fn delete_lead(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<(), ServiceError> {
    let found = load(db, id).await?;
    guard(db, actor, &found, Action::Delete).await?;
    lead::Entity::delete_by_id(id).exec(db).await?;
    info!("lead_deleted");
    Ok(())
}

async fn load(db: &DatabaseConnection, id: Uuid) -> Result<lead::Model, ServiceError> {
    lead::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("lead"))
}

async fn guard(db: &DatabaseConnection, actor: &Actor, found: &lead::Model, action: Action) -> Result<(), ServiceError> {
    actor.ensure_clinic(found.clinic_id)?;
    authorize(db, actor, Some(found.clinic_id), modules::LEADS, None, action).await?;
    if actor.role == Role::Agent
        && found.assigned_to != Some(actor.user_id)
        && !has_full_access(db, actor, modules::LEADS).await?
    {
        return Err(ServiceError::forbidden("lead is assigned to someone else"));
    }
    Ok(())
}

async fn load_assignee(db: &DatabaseConnection, clinic_id: Uuid, id: Uuid) -> Result<user::Model, ServiceError> {
    let u = user::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("assignee"))?;
    if u.clinic_id != Some(clinic_id) || !u.is_active() {
        return Err(ServiceError::validation("assignee must be an active member of the lead's clinic"));
    }
    if !matches!(u.role()?, Role::Agent | Role::Staff) {
        return Err(ServiceError::validation("leads can only be assigned to agents or staff"));
    }
    Ok(u)
}

fn assignment_notice(assignee: &user::Model, l: &lead::Model) -> Notification {
    Notification {
        recipient_user_id: Some(assignee.id),
        phone: assignee.phone.clone(),
        title: "New lead assigned".into(),
        body: format!("{} ({}) has been assigned to you", l.name, l.phone),
    }
}
