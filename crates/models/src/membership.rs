use sea_orm::{entity::prelude::*, FromJsonQueryResult, Set};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::{clinic, validate};

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_EXPIRED: &str = "expired";
pub const STATUS_EXHAUSTED: &str = "exhausted";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsumedTreatment {
    pub treatment: String,
    #[serde(default)]
    pub sub_treatment: Option<String>,
    pub quantity: u32,
    pub unit_price: f64,
    pub used_at: DateTime<Utc>,
    pub recorded_by: Uuid,
}

impl ConsumedTreatment {
    pub fn total(&self) -> f64 {
        validate::round_money(f64::from(self.quantity) * self.unit_price)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct ConsumedTreatments(pub Vec<ConsumedTreatment>);

impl ConsumedTreatments {
    pub fn total(&self) -> f64 {
        validate::round_money(self.0.iter().map(ConsumedTreatment::total).sum())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Usage {
    pub total_consumed: f64,
    pub remaining: f64,
    pub status: &'static str,
}

/// `remaining = package_amount - consumed`; an overdrawn package is rejected.
pub fn derive_usage(package_amount: f64, lines: &ConsumedTreatments, end_date: NaiveDate, today: NaiveDate) -> Result<Usage, ModelError> {
    validate::validate_amount("package_amount", package_amount)?;
    for line in &lines.0 {
        validate::validate_amount("unit_price", line.unit_price)?;
        if line.quantity == 0 {
            return Err(ModelError::validation("quantity must be at least 1"));
        }
    }
    let total_consumed = lines.total();
    let remaining = validate::round_money(package_amount - total_consumed);
    if remaining < 0.0 {
        return Err(ModelError::Validation(format!(
            "consumption ({total_consumed:.2}) exceeds package amount ({package_amount:.2})"
        )));
    }
    let status = if remaining == 0.0 {
        STATUS_EXHAUSTED
    } else if end_date < today {
        STATUS_EXPIRED
    } else {
        STATUS_ACTIVE
    };
    Ok(Usage { total_consumed, remaining, status })
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "membership")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub name: String,
    pub phone: String,
    pub package_name: String,
    pub package_amount: f64,
    pub start_date: Date,
    pub end_date: Date,
    #[sea_orm(column_type = "JsonBinary")]
    pub treatments: ConsumedTreatments,
    pub total_consumed: f64,
    pub remaining: f64,
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
    async fn before_save<C>(mut self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if let (Some(start), Some(end)) = (validate::current(&self.start_date), validate::current(&self.end_date)) {
            validate_window(start, end)?;
        }
        if let (Some(package), Some(lines), Some(end)) = (
            validate::current(&self.package_amount),
            validate::current(&self.treatments),
            validate::current(&self.end_date),
        ) {
            let usage = derive_usage(package, &lines, end, Utc::now().date_naive())?;
            self.total_consumed = Set(usage.total_consumed);
            self.remaining = Set(usage.remaining);
            self.status = Set(usage.status.to_string());
        }
        Ok(self)
    }
}

pub fn validate_window(start: NaiveDate, end: NaiveDate) -> Result<(), ModelError> {
    if end < start {
        return Err(ModelError::validation("end_date must not precede start_date"));
    }
    Ok(())
}

pub struct NewMembership {
    pub clinic_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub name: String,
    pub phone: String,
    pub package_name: String,
    pub package_amount: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewMembership) -> Result<Model, ModelError> {
    validate::validate_required("name", &input.name, 128)?;
    validate::validate_required("package_name", &input.package_name, 120)?;
    validate::validate_phone(&input.phone)?;
    validate::validate_positive("package_amount", input.package_amount)?;
    let package = validate::round_money(input.package_amount);
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        clinic_id: Set(input.clinic_id),
        patient_id: Set(input.patient_id),
        name: Set(input.name.trim().to_string()),
        phone: Set(input.phone.trim().to_string()),
        package_name: Set(input.package_name.trim().to_string()),
        package_amount: Set(package),
        start_date: Set(input.start_date),
        end_date: Set(input.end_date),
        treatments: Set(ConsumedTreatments::default()),
        total_consumed: Set(0.0),
        remaining: Set(package),
        status: Set(STATUS_ACTIVE.into()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

/// Appends a consumed line to an active membership that has started.
pub fn consume(model: &Model, line: ConsumedTreatment, today: NaiveDate) -> Result<ActiveModel, ModelError> {
    validate::validate_required("treatment", &line.treatment, 120)?;
    if today < model.start_date {
        return Err(ModelError::Validation(format!("membership starts on {}", model.start_date)));
    }
    let current = derive_usage(model.package_amount, &model.treatments, model.end_date, today)?;
    if current.status != STATUS_ACTIVE {
        return Err(ModelError::Validation(format!("membership is {}", current.status)));
    }
    let mut lines = model.treatments.clone();
    lines.0.push(line);
    derive_usage(model.package_amount, &lines, model.end_date, today)?;
    let mut am: ActiveModel = model.clone().into();
    am.treatments = Set(lines);
    am.updated_at = Set(Utc::now().into());
    Ok(am)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(qty: u32, price: f64) -> ConsumedTreatment {
        ConsumedTreatment {
            treatment: "Laser".into(),
            sub_treatment: Some("Full Face".into()),
            quantity: qty,
            unit_price: price,
            used_at: Utc::now(),
            recorded_by: Uuid::new_v4(),
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, d).unwrap() }

    #[test]
    fn remaining_is_package_minus_consumed() {
        let lines = ConsumedTreatments(vec![line(2, 150.0), line(1, 100.0)]);
        let u = derive_usage(1000.0, &lines, day(2030, 1, 1), day(2024, 1, 1)).unwrap();
        assert_eq!(u.total_consumed, 400.0);
        assert_eq!(u.remaining, 600.0);
        assert_eq!(u.status, STATUS_ACTIVE);
    }

    #[test]
    fn exhausted_and_expired() {
        let lines = ConsumedTreatments(vec![line(4, 250.0)]);
        assert_eq!(derive_usage(1000.0, &lines, day(2030, 1, 1), day(2024, 1, 1)).unwrap().status, STATUS_EXHAUSTED);
        let empty = ConsumedTreatments::default();
        assert_eq!(derive_usage(1000.0, &empty, day(2023, 12, 31), day(2024, 1, 1)).unwrap().status, STATUS_EXPIRED);
    }

    #[test]
    fn overdraw_rejected() {
        let lines = ConsumedTreatments(vec![line(5, 250.0)]);
        assert!(derive_usage(1000.0, &lines, day(2030, 1, 1), day(2024, 1, 1)).is_err());
        assert!(derive_usage(1000.0, &ConsumedTreatments(vec![line(0, 10.0)]), day(2030, 1, 1), day(2024, 1, 1)).is_err());
    }

    #[test]
    fn consume_checks_state() {
        let now = Utc::now().into();
        let m = Model {
            id: Uuid::new_v4(),
            clinic_id: Uuid::new_v4(),
            patient_id: None,
            name: "Omar".into(),
            phone: "+971501112233".into(),
            package_name: "Gold".into(),
            package_amount: 500.0,
            start_date: day(2024, 1, 1),
            end_date: day(2030, 1, 1),
            treatments: ConsumedTreatments::default(),
            total_consumed: 0.0,
            remaining: 500.0,
            status: STATUS_ACTIVE.into(),
            created_at: now,
            updated_at: now,
        };
        let today = day(2024, 6, 1);
        assert!(consume(&m, line(2, 200.0), today).is_ok());
        assert!(consume(&m, line(3, 200.0), today).is_err());
        assert!(consume(&m, line(1, 10.0), day(2031, 1, 1)).is_err());
        assert!(consume(&m, line(1, 10.0), day(2023, 12, 31)).is_err());
        assert!(consume(&m, line(1, 10.0), day(2024, 1, 1)).is_ok());
    }

    #[test]
    fn window_order() {
        assert!(validate_window(day(2024, 1, 1), day(2024, 1, 1)).is_ok());
        assert!(validate_window(day(2024, 2, 1), day(2024, 1, 1)).is_err());
    }
}
