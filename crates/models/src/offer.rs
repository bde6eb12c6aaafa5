use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::types::StringList;
use crate::{clinic, validate};

pub const DISCOUNT_PERCENTAGE: &str = "percentage";
pub const DISCOUNT_FLAT: &str = "flat";
pub const STATUSES: [&str; 3] = ["draft", "active", "expired"];
pub const STATUS_ACTIVE: &str = "active";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "offer")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub discount_type: String,
    pub discount_value: f64,
    #[sea_orm(column_type = "JsonBinary")]
    pub treatments: StringList,
    pub starts_at: DateTimeWithTimeZone,
    pub ends_at: DateTimeWithTimeZone,
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn apply(&self, price: f64) -> f64 {
        apply_discount(&self.discount_type, self.discount_value, price)
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.status == STATUS_ACTIVE && self.starts_at <= now && now < self.ends_at
    }
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
        if let (Some(kind), Some(value)) = (validate::current(&self.discount_type), validate::current(&self.discount_value)) {
            validate_discount(&kind, value)?;
        }
        if let (Some(starts), Some(ends)) = (validate::current(&self.starts_at), validate::current(&self.ends_at)) {
            if starts >= ends {
                return Err(ModelError::validation("starts_at must precede ends_at").into());
            }
        }
        if let Some(s) = validate::current(&self.status) { validate_status(&s)?; }
        Ok(self)
    }
}

/// Percentage discounts lie in (0, 100]; flat discounts are positive.
pub fn validate_discount(kind: &str, value: f64) -> Result<(), ModelError> {
    match kind {
        DISCOUNT_PERCENTAGE => {
            if !value.is_finite() || value <= 0.0 || value > 100.0 {
                return Err(ModelError::validation("percentage discount must be within (0, 100]"));
            }
            Ok(())
        }
        DISCOUNT_FLAT => validate::validate_positive("discount_value", value),
        other => Err(ModelError::Validation(format!("invalid discount_type '{other}'"))),
    }
}

pub fn validate_status(s: &str) -> Result<(), ModelError> {
    if STATUSES.contains(&s) { Ok(()) } else { Err(ModelError::Validation(format!("invalid offer status '{s}'"))) }
}

/// Discounted price, never below zero.
pub fn apply_discount(kind: &str, value: f64, price: f64) -> f64 {
    let discounted = match kind {
        DISCOUNT_PERCENTAGE => price - price * value / 100.0,
        DISCOUNT_FLAT => price - value,
        _ => price,
    };
    validate::round_money(discounted.max(0.0))
}

pub struct NewOffer {
    pub clinic_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub discount_type: String,
    pub discount_value: f64,
    pub treatments: Vec<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: String,
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewOffer) -> Result<Model, ModelError> {
    validate::validate_required("title", &input.title, 160)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        clinic_id: Set(input.clinic_id),
        title: Set(input.title.trim().to_string()),
        description: Set(input.description),
        discount_type: Set(input.discount_type),
        discount_value: Set(input.discount_value),
        treatments: Set(StringList::cleaned(input.treatments)),
        starts_at: Set(input.starts_at.into()),
        ends_at: Set(input.ends_at.into()),
        status: Set(input.status),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}
