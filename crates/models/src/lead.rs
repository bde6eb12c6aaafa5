use sea_orm::{entity::prelude::*, FromJsonQueryResult, Set};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::{clinic, validate};

pub const SOURCES: [&str; 6] = ["website", "walk_in", "referral", "social", "campaign", "other"];
pub const STATUSES: [&str; 5] = ["new", "contacted", "interested", "converted", "lost"];
pub const STATUS_NEW: &str = "new";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FollowUp {
    pub note: String,
    pub by: Uuid,
    pub at: DateTime<Utc>,
    #[serde(default)]
    pub next_follow_up: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct FollowUps(pub Vec<FollowUp>);

impl FollowUps {
    pub fn push(&mut self, by: Uuid, note: &str, next_follow_up: Option<DateTime<Utc>>) -> Result<(), ModelError> {
        validate::validate_required("note", note, 2000)?;
        let at = Utc::now();
        if let Some(next) = next_follow_up {
            if next <= at {
                return Err(ModelError::validation("next_follow_up must be in the future"));
            }
        }
        self.0.push(FollowUp { note: note.trim().to_string(), by, at, next_follow_up });
        Ok(())
    }

    /// Earliest scheduled follow-up still ahead of `now`.
    pub fn next_due(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.0.iter().filter_map(|f| f.next_follow_up).filter(|t| *t > now).min()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lead")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub source: String,
    pub treatment: Option<String>,
    pub status: String,
    pub assigned_to: Option<Uuid>,
    #[sea_orm(column_type = "JsonBinary")]
    pub follow_ups: FollowUps,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub created_by: Uuid,
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
        if let Some(s) = validate::current(&self.source) { validate_source(&s)?; }
        if let Some(s) = validate::current(&self.status) { validate_status(&s)?; }
        if let Some(p) = validate::current(&self.phone) { validate::validate_phone(&p)?; }
        if let Some(Some(e)) = validate::current(&self.email) { validate::validate_email(&e)?; }
        Ok(self)
    }
}

pub fn validate_source(s: &str) -> Result<(), ModelError> {
    if SOURCES.contains(&s) { Ok(()) } else { Err(ModelError::Validation(format!("invalid lead source '{s}'"))) }
}

pub fn validate_status(s: &str) -> Result<(), ModelError> {
    if STATUSES.contains(&s) { Ok(()) } else { Err(ModelError::Validation(format!("invalid lead status '{s}'"))) }
}

pub struct NewLead {
    pub clinic_id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub source: String,
    pub treatment: Option<String>,
    pub notes: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub created_by: Uuid,
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewLead) -> Result<Model, ModelError> {
    validate::validate_required("name", &input.name, 128)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        clinic_id: Set(input.clinic_id),
        name: Set(input.name.trim().to_string()),
        phone: Set(input.phone.trim().to_string()),
        email: Set(input.email.map(|e| e.trim().to_ascii_lowercase())),
        source: Set(input.source),
        treatment: Set(input.treatment),
        status: Set(STATUS_NEW.into()),
        assigned_to: Set(input.assigned_to),
        follow_ups: Set(FollowUps::default()),
        notes: Set(input.notes),
        created_by: Set(input.created_by),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn follow_ups_track_next_due() {
        let mut f = FollowUps::default();
        let by = Uuid::new_v4();
        let soon = Utc::now() + Duration::days(1);
        let later = Utc::now() + Duration::days(3);
        f.push(by, "called, no answer", Some(later)).unwrap();
        f.push(by, "sent brochure", Some(soon)).unwrap();
        f.push(by, "note only", None).unwrap();
        assert_eq!(f.0.len(), 3);
        assert_eq!(f.next_due(Utc::now()), Some(soon));
    }

    #[test]
    fn follow_up_rejects_past_schedule_and_blank_note() {
        let mut f = FollowUps::default();
        let by = Uuid::new_v4();
        assert!(f.push(by, "x", Some(Utc::now() - Duration::hours(1))).is_err());
        assert!(f.push(by, "  ", None).is_err());
        assert!(f.0.is_empty());
    }

    #[test]
    fn enumerations() {
        assert!(validate_source("walk_in").is_ok());
        assert!(validate_source("tv").is_err());
        assert!(validate_status("converted").is_ok());
        assert!(validate_status("won").is_err());
    }
}
