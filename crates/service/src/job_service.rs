use uuid::Uuid;
use chrono::Utc;
use serde::Deserialize;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::{info, instrument};

use common::pagination::Pagination;
use common::types::Paged;
use models::job_posting;
use models::types::StringList;

use crate::context::Actor;
use crate::errors::ServiceError;
use crate::listing::{fetch_page, search_any};
use crate::permissions::{authorize, modules, Action};

#[derive(Debug, Clone, Deserialize)]
pub struct JobInput {
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
    pub title: String,
    #[serde(default)]
    pub department: Option<String>,
    pub job_type: String,
    pub location: String,
    #[serde(default)]
    pub salary_min: Option<f64>,
    #[serde(default)]
    pub salary_max: Option<f64>,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateJobInput {
    pub title: Option<String>,
    pub department: Option<String>,
    pub job_type: Option<String>,
    pub location: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub description: Option<String>,
    pub requirements: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobFilter {
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id))]
pub async fn create_job(db: &DatabaseConnection, actor: &Actor, input: JobInput) -> Result<job_posting::Model, ServiceError> {
    let clinic_id = actor.clinic_scope(input.clinic_id)?;
    authorize(db, actor, Some(clinic_id), modules::JOBS, None, Action::Create).await?;
    models::validate::validate_required("title", &input.title, 160)?;
    models::validate::validate_required("location", &input.location, 160)?;
    models::validate::validate_required("description", &input.description, 20_000)?;
    let created = job_posting::create(
        db,
        job_posting::NewJobPosting {
            clinic_id,
            posted_by: actor.user_id,
            title: input.title,
            department: input.department,
            job_type: input.job_type,
            location: input.location,
            salary_min: input.salary_min,
            salary_max: input.salary_max,
            description: input.description,
            requirements: input.requirements,
        },
    )
    .await?;
    info!(job_id = %created.id, clinic_id = %clinic_id, "job_created");
    Ok(created)
}

pub async fn get_job(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<job_posting::Model, ServiceError> {
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    authorize(db, actor, Some(found.clinic_id), modules::JOBS, None, Action::Read).await?;
    Ok(found)
}

pub async fn list_jobs(db: &DatabaseConnection, actor: &Actor, filter: JobFilter, page: Pagination) -> Result<Paged<job_posting::Model>, ServiceError> {
    let scope = actor.list_scope(filter.clinic_id)?;
    authorize(db, actor, scope, modules::JOBS, None, Action::Read).await?;
    query(db, JobFilter { clinic_id: scope, ..filter }, page).await
}

/// Open postings across all clinics.
pub async fn list_open_jobs(db: &DatabaseConnection, filter: JobFilter, page: Pagination) -> Result<Paged<job_posting::Model>, ServiceError> {
    query(db, JobFilter { status: Some(job_posting::STATUS_OPEN.into()), ..filter }, page).await
}

#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id, job_id = %id))]
pub async fn update_job(db: &DatabaseConnection, actor: &Actor, id: Uuid, input: UpdateJobInput) -> Result<job_posting::Model, ServiceError> {
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    authorize(db, actor, Some(found.clinic_id), modules::JOBS, None, Action::Update).await?;
    let mut am: job_posting::ActiveModel = found.into();
    if let Some(v) = input.title {
        models::validate::validate_required("title", &v, 160)?;
        am.title = Set(v.trim().to_string());
    }
    if let Some(v) = input.department { am.department = Set(Some(v)); }
    if let Some(v) = input.job_type { am.job_type = Set(v); }
    if let Some(v) = input.location { am.location = Set(v.trim().to_string()); }
    if let Some(v) = input.salary_min { am.salary_min = Set(Some(v)); }
    if let Some(v) = input.salary_max { am.salary_max = Set(Some(v)); }
    if let Some(v) = input.description { am.description = Set(v); }
    if let Some(v) = input.requirements { am.requirements = Set(StringList::cleaned(v)); }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!("job_updated");
    Ok(updated)
}

/// Open or close a posting.
#[instrument(skip(db, actor), fields(user_id = %actor.user_id, job_id = %id))]
pub async fn set_status(db: &DatabaseConnection, actor: &Actor, id: Uuid, status: &str) -> Result<job_posting::Model, ServiceError> {
    job_posting::validate_status(status)?;
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    authorize(db, actor, Some(found.clinic_id), modules::JOBS, None, Action::Update).await?;
    let mut am: job_posting::ActiveModel = found.into();
    am.status = Set(status.to_string());
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(status, "job_status_changed");
    Ok(updated)
}

#[instrument(skip(db, actor), fields(user_id = %actor.user_id, job_id = %id))]
pub async fn delete_job(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<(), ServiceError> {
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    authorize(db, actor, Some(found.clinic_id), modules::JOBS, None, Action::Delete).await?;
    job_posting::Entity::delete_by_id(id).exec(db).await?;
    info!("job_deleted");
    Ok(())
}

async fn load(db: &DatabaseConnection, id: Uuid) -> Result<job_posting::Model, ServiceError> {
    job_posting::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("job"))
}

async fn query(db: &DatabaseConnection, filter: JobFilter, page: Pagination) -> Result<Paged<job_posting::Model>, ServiceError> {
    let mut q = job_posting::Entity::find();
    if let Some(c) = filter.clinic_id {
        q = q.filter(job_posting::Column::ClinicId.eq(c));
    }
    if let Some(s) = filter.status {
        job_posting::validate_status(&s)?;
        q = q.filter(job_posting::Column::Status.eq(s));
    }
    if let Some(t) = filter.job_type {
        job_posting::validate_job_type(&t)?;
        q = q.filter(job_posting::Column::JobType.eq(t));
    }
    if let Some(cond) = search_any(filter.search.as_deref(), [job_posting::Column::Title, job_posting::Column::Location]) {
        q = q.filter(cond);
    }
    fetch_page(db, q.order_by_desc(job_posting::Column::CreatedAt), page).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::user::Role;
    use crate::test_support::{cleanup, get_db, seed_clinic, seed_member};

    fn job(min: Option<f64>, max: Option<f64>) -> JobInput {
        JobInput {
            clinic_id: None,
            title: "Dental Hygienist".into(),
            department: Some("Clinical".into()),
            job_type: "full_time".into(),
            location: "Jumeirah".into(),
            salary_min: min,
            salary_max: max,
            description: "Cleanings and patient education.".into(),
            requirements: vec!["DHA licence".into()],
        }
    }

    #[tokio::test]
    async fn job_posting_flow() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let (owner, c) = seed_clinic(&db).await?;
        let agent = seed_member(&db, c.id, Role::Agent).await?;

        assert!(matches!(create_job(&db, &owner, job(Some(9000.0), Some(5000.0))).await, Err(ServiceError::Model(_))));
        let j = create_job(&db, &owner, job(Some(5000.0), Some(9000.0))).await?;
        assert_eq!(j.status, job_posting::STATUS_OPEN);
        assert!(matches!(create_job(&db, &agent, job(None, None)).await, Err(ServiceError::Forbidden(_))));

        let open = list_open_jobs(&db, JobFilter { clinic_id: Some(c.id), ..Default::default() }, Pagination::default()).await?;
        assert_eq!(open.total, 1);
        set_status(&db, &owner, j.id, job_posting::STATUS_CLOSED).await?;
        let open = list_open_jobs(&db, JobFilter { clinic_id: Some(c.id), ..Default::default() }, Pagination::default()).await?;
        assert_eq!(open.total, 0);
        assert!(set_status(&db, &owner, j.id, "paused").await.is_err());

        let updated = update_job(&db, &owner, j.id, UpdateJobInput { location: Some("Deira".into()), ..Default::default() }).await?;
        assert_eq!(updated.location, "Deira");
        delete_job(&db, &owner, j.id).await?;
        cleanup(&db, c.id, owner.user_id).await;
        Ok(())
    }
}
