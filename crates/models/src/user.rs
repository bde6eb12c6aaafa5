use std::{fmt, str::FromStr};

use sea_orm::{entity::prelude::*, Set, DatabaseConnection};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::validate;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Clinic,
    Doctor,
    Staff,
    Agent,
    User,
}

impl Role {
    pub const ALL: [Role; 6] = [Role::Admin, Role::Clinic, Role::Doctor, Role::Staff, Role::Agent, Role::User];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Clinic => "clinic",
            Role::Doctor => "doctor",
            Role::Staff => "staff",
            Role::Agent => "agent",
            Role::User => "user",
        }
    }

    /// Roles a clinic owner can hire into its clinic.
    pub fn is_clinic_member(&self) -> bool {
        matches!(self, Role::Doctor | Role::Staff | Role::Agent)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ModelError::Validation(format!("unknown role '{s}'")))
    }
}

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_INACTIVE: &str = "inactive";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub clinic_id: Option<Uuid>,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: String,
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    pub fn role(&self) -> Result<Role, ModelError> { self.role.parse() }

    pub fn is_active(&self) -> bool { self.status == STATUS_ACTIVE && self.deleted_at.is_none() }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_email(email: &str) -> Result<(), ModelError> { validate::validate_email(email) }

pub fn validate_name(name: &str) -> Result<(), ModelError> { validate::validate_required("name", name, 128) }

/// Normalized form used for storage and lookups.
pub fn normalize_email(email: &str) -> String { email.trim().to_ascii_lowercase() }

pub struct NewUser<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub phone: Option<&'a str>,
    pub role: Role,
    pub clinic_id: Option<Uuid>,
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewUser<'_>) -> Result<Model, ModelError> {
    validate_email(input.email)?;
    validate_name(input.name)?;
    if let Some(p) = input.phone { validate::validate_phone(p)?; }
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        clinic_id: Set(input.clinic_id),
        email: Set(normalize_email(input.email)),
        name: Set(input.name.trim().to_string()),
        phone: Set(input.phone.map(|p| p.trim().to_string())),
        role: Set(input.role.as_str().to_string()),
        status: Set(STATUS_ACTIVE.into()),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };
    Ok(am.insert(db).await?)
}

pub async fn find_by_email<C: ConnectionTrait>(db: &C, email: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::Email.eq(normalize_email(email))).one(db).await?)
}

pub async fn soft_delete(db: &DatabaseConnection, id: Uuid) -> Result<(), ModelError> {
    let mut found: ActiveModel = Entity::find_by_id(id).one(db).await?.ok_or_else(|| ModelError::validation("user not found"))?.into();
    let now = Utc::now();
    found.deleted_at = Set(Some(now.into()));
    found.status = Set(STATUS_INACTIVE.into());
    found.updated_at = Set(now.into());
    found.update(db).await?;
    Ok(())
}

pub async fn hard_delete(db: &DatabaseConnection, id: Uuid) -> Result<(), ModelError> {
    Entity::delete_by_id(id).exec(db).await?;
    Ok(())
}
