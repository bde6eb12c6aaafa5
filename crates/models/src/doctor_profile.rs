use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::types::StringList;
use crate::{clinic, user, validate};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "doctor_profile")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub clinic_id: Option<Uuid>,
    pub specialization: String,
    pub degree: String,
    pub experience_years: i32,
    pub consultation_fee: f64,
    #[sea_orm(column_type = "JsonBinary")]
    pub treatments: StringList,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
    pub approved: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { User, Clinic }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .into(),
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
        clinic::validate_coordinates(validate::current(&self.latitude).flatten(), validate::current(&self.longitude).flatten())?;
        if let Some(fee) = validate::current(&self.consultation_fee) {
            validate::validate_amount("consultation_fee", fee)?;
        }
        if let Some(years) = validate::current(&self.experience_years) {
            validate_experience(years)?;
        }
        Ok(self)
    }
}

pub fn validate_experience(years: i32) -> Result<(), ModelError> {
    if !(0..=70).contains(&years) {
        return Err(ModelError::validation("experience_years must be within 0..=70"));
    }
    Ok(())
}

pub struct NewDoctorProfile {
    pub user_id: Uuid,
    pub clinic_id: Option<Uuid>,
    pub specialization: String,
    pub degree: String,
    pub experience_years: i32,
    pub consultation_fee: f64,
    pub treatments: Vec<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewDoctorProfile) -> Result<Model, ModelError> {
    validate::validate_required("specialization", &input.specialization, 120)?;
    validate::validate_required("degree", &input.degree, 120)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(input.user_id),
        clinic_id: Set(input.clinic_id),
        specialization: Set(input.specialization.trim().to_string()),
        degree: Set(input.degree.trim().to_string()),
        experience_years: Set(input.experience_years),
        consultation_fee: Set(validate::round_money(input.consultation_fee)),
        treatments: Set(StringList::cleaned(input.treatments)),
        address: Set(input.address),
        latitude: Set(input.latitude),
        longitude: Set(input.longitude),
        bio: Set(input.bio),
        photo_url: Set(input.photo_url),
        approved: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}
