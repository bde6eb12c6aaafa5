use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::validate;

pub const STATUS_NEW: &str = "new";
pub const STATUS_RESPONDED: &str = "responded";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "get_in_touch")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub struct NewContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
}

pub fn validate_fields(input: &NewContact) -> Result<(), ModelError> {
    validate::validate_required("name", &input.name, 128)?;
    validate::validate_email(&input.email)?;
    if let Some(p) = input.phone.as_deref() { validate::validate_phone(p)?; }
    validate::validate_required("message", &input.message, 5000)?;
    Ok(())
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewContact) -> Result<Model, ModelError> {
    validate_fields(&input)?;
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(input.name.trim().to_string()),
        email: Set(input.email.trim().to_ascii_lowercase()),
        phone: Set(input.phone),
        subject: Set(input.subject),
        message: Set(input.message.trim().to_string()),
        status: Set(STATUS_NEW.into()),
        created_at: Set(Utc::now().into()),
    };
    Ok(am.insert(db).await?)
}
