use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::types::StringList;
use crate::{clinic, validate};

pub const JOB_TYPES: [&str; 4] = ["full_time", "part_time", "contract", "internship"];
pub const STATUS_OPEN: &str = "open";
pub const STATUS_CLOSED: &str = "closed";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "job_posting")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub posted_by: Uuid,
    pub title: String,
    pub department: Option<String>,
    pub job_type: String,
    pub location: String,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub requirements: StringList,
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Clinic }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Clinic => Entity::belongs_to(clinic::Entity)
                .from(Column::ClinicId)
                .to(clinic::Column::Id)
                .into(),
        }
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if let Some(t) = validate::current(&self.job_type) { validate_job_type(&t)?; }
        if let Some(s) = validate::current(&self.status) { validate_status(&s)?; }
        validate_salary(
            validate::current(&self.salary_min).flatten(),
            validate::current(&self.salary_max).flatten(),
        )?;
        Ok(self)
    }
}

pub fn validate_job_type(t: &str) -> Result<(), ModelError> {
    if JOB_TYPES.contains(&t) { Ok(()) } else { Err(ModelError::Validation(format!("invalid job_type '{t}'"))) }
}

pub fn validate_status(s: &str) -> Result<(), ModelError> {
    match s {
        STATUS_OPEN | STATUS_CLOSED => Ok(()),
        other => Err(ModelError::Validation(format!("invalid job status '{other}'"))),
    }
}

pub fn validate_salary(min: Option<f64>, max: Option<f64>) -> Result<(), ModelError> {
    if let Some(m) = min { validate::validate_amount("salary_min", m)?; }
    if let Some(m) = max { validate::validate_amount("salary_max", m)?; }
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            return Err(ModelError::validation("salary_min must not exceed salary_max"));
        }
    }
    Ok(())
}

pub struct NewJobPosting {
    pub clinic_id: Uuid,
    pub posted_by: Uuid,
    pub title: String,
    pub department: Option<String>,
    pub job_type: String,
    pub location: String,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub description: String,
    pub requirements: Vec<String>,
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewJobPosting) -> Result<Model, ModelError> {
    validate::validate_required("title", &input.title, 160)?;
    validate::validate_required("location", &input.location, 160)?;
    validate::validate_required("description", &input.description, 20_000)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        clinic_id: Set(input.clinic_id),
        posted_by: Set(input.posted_by),
        title: Set(input.title.trim().to_string()),
        department: Set(input.department),
        job_type: Set(input.job_type),
        location: Set(input.location.trim().to_string()),
        salary_min: Set(input.salary_min),
        salary_max: Set(input.salary_max),
        description: Set(input.description),
        requirements: Set(StringList::cleaned(input.requirements)),
        status: Set(STATUS_OPEN.into()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salary_range_is_ordered() {
        assert!(validate_salary(Some(1000.0), Some(2000.0)).is_ok());
        assert!(validate_salary(None, Some(2000.0)).is_ok());
        assert!(validate_salary(Some(3000.0), Some(2000.0)).is_err());
        assert!(validate_salary(Some(-1.0), None).is_err());
    }

    #[test]
    fn job_type_values() {
        assert!(validate_job_type("part_time").is_ok());
        assert!(validate_job_type("freelance").is_err());
    }
}
