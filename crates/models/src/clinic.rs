use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::types::StringList;
use crate::{user, validate};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "clinic")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub slug: String,
    pub address: String,
    pub city: String,
    pub phone: String,
    pub email: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[sea_orm(column_type = "JsonBinary")]
    pub treatments: StringList,
    pub timings: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub photos: StringList,
    pub approved: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Owner }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Owner => Entity::belongs_to(user::Entity)
                .from(Column::OwnerId)
                .to(user::Column::Id)
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
        validate_coordinates(validate::current(&self.latitude).flatten(), validate::current(&self.longitude).flatten())?;
        Ok(self)
    }
}

/// Latitude and longitude are either both present and in range, or both absent.
pub fn validate_coordinates(lat: Option<f64>, lng: Option<f64>) -> Result<(), ModelError> {
    match (lat, lng) {
        (None, None) => Ok(()),
        (Some(lat), Some(lng)) => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                return Err(ModelError::validation("coordinates out of range"));
            }
            Ok(())
        }
        _ => Err(ModelError::validation("latitude and longitude must be set together")),
    }
}

pub struct NewClinic {
    pub owner_id: Uuid,
    pub name: String,
    pub slug: String,
    pub address: String,
    pub city: String,
    pub phone: String,
    pub email: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub treatments: Vec<String>,
    pub timings: Option<String>,
    pub photos: Vec<String>,
}

pub fn validate_fields(name: &str, address: &str, city: &str, phone: &str, email: Option<&str>) -> Result<(), ModelError> {
    validate::validate_required("name", name, 160)?;
    validate::validate_required("address", address, 1000)?;
    validate::validate_required("city", city, 80)?;
    validate::validate_phone(phone)?;
    if let Some(e) = email { validate::validate_email(e)?; }
    Ok(())
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewClinic) -> Result<Model, ModelError> {
    validate_fields(&input.name, &input.address, &input.city, &input.phone, input.email.as_deref())?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(input.owner_id),
        name: Set(input.name.trim().to_string()),
        slug: Set(input.slug),
        address: Set(input.address.trim().to_string()),
        city: Set(input.city.trim().to_string()),
        phone: Set(input.phone.trim().to_string()),
        email: Set(input.email),
        latitude: Set(input.latitude),
        longitude: Set(input.longitude),
        treatments: Set(StringList::cleaned(input.treatments)),
        timings: Set(input.timings),
        photos: Set(StringList::cleaned(input.photos)),
        approved: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_must_come_in_pairs() {
        assert!(validate_coordinates(None, None).is_ok());
        assert!(validate_coordinates(Some(25.2), Some(55.3)).is_ok());
        assert!(validate_coordinates(Some(25.2), None).is_err());
        assert!(validate_coordinates(Some(95.0), Some(55.3)).is_err());
    }

    #[test]
    fn clinic_fields_are_validated() {
        assert!(validate_fields("Smile", "Street 1", "Dubai", "+971501234567", None).is_ok());
        assert!(validate_fields("", "Street 1", "Dubai", "+971501234567", None).is_err());
        assert!(validate_fields("Smile", "Street 1", "Dubai", "abc", None).is_err());
        assert!(validate_fields("Smile", "Street 1", "Dubai", "+971501234567", Some("nope")).is_err());
    }
}
