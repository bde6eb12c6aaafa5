use sea_orm::{entity::prelude::*, FromJsonQueryResult, QueryFilter, QuerySelect, Set};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::{clinic, validate};

pub const PAYMENT_PENDING: &str = "pending";
pub const PAYMENT_PARTIAL: &str = "partial";
pub const PAYMENT_PAID: &str = "paid";
pub const GENDERS: [&str; 3] = ["male", "female", "other"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentEntry {
    pub amount: f64,
    pub method: String,
    pub paid_at: DateTime<Utc>,
    pub recorded_by: Uuid,
    #[serde(default)]
    pub note: Option<String>,
    pub pending_after: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct PaymentHistory(pub Vec<PaymentEntry>);

/// Outstanding balance and payment status for a bill.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Balance {
    pub pending: f64,
    pub status: &'static str,
}

/// `pending = amount - (paid + advance)`, rejecting negatives and overpayment.
pub fn derive_balance(amount: f64, paid: f64, advance: f64) -> Result<Balance, ModelError> {
    validate::validate_amount("amount", amount)?;
    validate::validate_amount("paid", paid)?;
    validate::validate_amount("advance", advance)?;
    let settled = validate::round_money(paid + advance);
    let amount = validate::round_money(amount);
    if settled > amount {
        return Err(ModelError::Validation(format!(
            "paid plus advance ({settled:.2}) exceeds amount ({amount:.2})"
        )));
    }
    let pending = validate::round_money(amount - settled);
    let status = if pending == 0.0 {
        PAYMENT_PAID
    } else if settled > 0.0 {
        PAYMENT_PARTIAL
    } else {
        PAYMENT_PENDING
    };
    Ok(Balance { pending, status })
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "patient_registration")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub emr_number: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub phone: String,
    pub email: Option<String>,
    pub date_of_birth: Option<Date>,
    pub doctor_id: Option<Uuid>,
    pub treatment: Option<String>,
    pub amount: f64,
    pub paid: f64,
    pub advance: f64,
    pub pending: f64,
    pub payment_status: String,
    pub payment_method: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub payment_history: PaymentHistory,
    pub created_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
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
    async fn before_save<C>(mut self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if let Some(g) = validate::current(&self.gender) { validate_gender(&g)?; }
        if let (Some(amount), Some(paid), Some(advance)) = (
            validate::current(&self.amount),
            validate::current(&self.paid),
            validate::current(&self.advance),
        ) {
            let balance = derive_balance(amount, paid, advance)?;
            self.pending = Set(balance.pending);
            self.payment_status = Set(balance.status.to_string());
        }
        Ok(self)
    }
}

pub fn validate_gender(g: &str) -> Result<(), ModelError> {
    if GENDERS.contains(&g) { Ok(()) } else { Err(ModelError::Validation(format!("invalid gender '{g}'"))) }
}

/// `EMR-YYYYMMDD-NNNN` where NNNN is the clinic's sequence for that day.
pub fn format_emr(day: NaiveDate, seq: u64) -> String {
    format!("EMR-{}-{:04}", day.format("%Y%m%d"), seq)
}

/// Highest numeric suffix among `taken` for the given prefix; foreign formats are ignored.
pub fn highest_emr_seq<'a>(prefix: &str, taken: impl IntoIterator<Item = &'a str>) -> u64 {
    taken
        .into_iter()
        .filter_map(|emr| emr.strip_prefix(prefix))
        .filter_map(|rest| rest.parse::<u64>().ok())
        .max()
        .unwrap_or(0)
}

/// One past the highest sequence used today, so deletions and hand-entered numbers never cause reuse.
pub async fn next_emr_number<C: ConnectionTrait>(db: &C, clinic_id: Uuid, day: NaiveDate) -> Result<String, ModelError> {
    let prefix = format!("EMR-{}-", day.format("%Y%m%d"));
    let taken: Vec<String> = Entity::find()
        .select_only()
        .column(Column::EmrNumber)
        .filter(Column::ClinicId.eq(clinic_id))
        .filter(Column::EmrNumber.starts_with(&prefix))
        .into_tuple()
        .all(db)
        .await?;
    let seq = highest_emr_seq(&prefix, taken.iter().map(String::as_str));
    Ok(format_emr(day, seq + 1))
}

pub struct NewPatient {
    pub clinic_id: Uuid,
    pub emr_number: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub phone: String,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub doctor_id: Option<Uuid>,
    pub treatment: Option<String>,
    pub amount: f64,
    pub paid: f64,
    pub advance: f64,
    pub payment_method: String,
    pub created_by: Uuid,
}

pub fn validate_fields(first_name: &str, last_name: &str, phone: &str, email: Option<&str>) -> Result<(), ModelError> {
    validate::validate_required("first_name", first_name, 80)?;
    validate::validate_required("last_name", last_name, 80)?;
    validate::validate_phone(phone)?;
    if let Some(e) = email { validate::validate_email(e)?; }
    Ok(())
}

/// Trimmed and lowercased; blank means none.
pub fn normalize_email(email: Option<String>) -> Option<String> {
    email.map(|e| e.trim().to_ascii_lowercase()).filter(|e| !e.is_empty())
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewPatient) -> Result<Model, ModelError> {
    validate_fields(&input.first_name, &input.last_name, &input.phone, input.email.as_deref())?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        clinic_id: Set(input.clinic_id),
        emr_number: Set(input.emr_number),
        first_name: Set(input.first_name.trim().to_string()),
        last_name: Set(input.last_name.trim().to_string()),
        gender: Set(input.gender.trim().to_ascii_lowercase()),
        phone: Set(input.phone.trim().to_string()),
        email: Set(normalize_email(input.email)),
        date_of_birth: Set(input.date_of_birth),
        doctor_id: Set(input.doctor_id),
        treatment: Set(input.treatment),
        amount: Set(validate::round_money(input.amount)),
        paid: Set(validate::round_money(input.paid)),
        advance: Set(validate::round_money(input.advance)),
        // recomputed by the save hook
        pending: Set(0.0),
        payment_status: Set(PAYMENT_PENDING.into()),
        payment_method: Set(input.payment_method),
        payment_history: Set(PaymentHistory::default()),
        created_by: Set(input.created_by),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

/// Applies a payment to a loaded registration and appends the history entry.
pub fn apply_payment(
    model: &Model,
    amount: f64,
    method: &str,
    note: Option<String>,
    recorded_by: Uuid,
) -> Result<ActiveModel, ModelError> {
    validate::validate_positive("payment amount", amount)?;
    validate::validate_required("method", method, 32)?;
    let paid = validate::round_money(model.paid + amount);
    let balance = derive_balance(model.amount, paid, model.advance)?;
    let mut history = model.payment_history.clone();
    history.0.push(PaymentEntry {
        amount: validate::round_money(amount),
        method: method.trim().to_string(),
        paid_at: Utc::now(),
        recorded_by,
        note,
        pending_after: balance.pending,
    });
    let mut am: ActiveModel = model.clone().into();
    am.paid = Set(paid);
    am.payment_method = Set(method.trim().to_string());
    am.payment_history = Set(history);
    am.updated_at = Set(Utc::now().into());
    Ok(am)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Model {
        let now = Utc::now().into();
        Model {
            id: Uuid::new_v4(),
            clinic_id: Uuid::new_v4(),
            emr_number: "EMR-20240101-0001".into(),
            first_name: "Sara".into(),
            last_name: "Ali".into(),
            gender: "female".into(),
            phone: "+971501234567".into(),
            email: None,
            date_of_birth: None,
            doctor_id: None,
            treatment: Some("Botox".into()),
            amount: 1000.0,
            paid: 0.0,
            advance: 200.0,
            pending: 800.0,
            payment_status: PAYMENT_PARTIAL.into(),
            payment_method: "cash".into(),
            payment_history: PaymentHistory::default(),
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn balance_derivation() {
        assert_eq!(derive_balance(1000.0, 0.0, 0.0).unwrap(), Balance { pending: 1000.0, status: PAYMENT_PENDING });
        assert_eq!(derive_balance(1000.0, 300.0, 200.0).unwrap(), Balance { pending: 500.0, status: PAYMENT_PARTIAL });
        assert_eq!(derive_balance(1000.0, 800.0, 200.0).unwrap(), Balance { pending: 0.0, status: PAYMENT_PAID });
        assert_eq!(derive_balance(0.0, 0.0, 0.0).unwrap().status, PAYMENT_PAID);
    }

    #[test]
    fn overpayment_and_negatives_rejected() {
        assert!(derive_balance(1000.0, 900.0, 200.0).is_err());
        assert!(derive_balance(-1.0, 0.0, 0.0).is_err());
        assert!(derive_balance(100.0, -5.0, 0.0).is_err());
    }

    #[test]
    fn cents_do_not_drift() {
        let b = derive_balance(0.3, 0.1, 0.2).unwrap();
        assert_eq!(b.pending, 0.0);
        assert_eq!(b.status, PAYMENT_PAID);
    }

    #[test]
    fn payment_records_pending_after() {
        let m = sample();
        let am = apply_payment(&m, 300.0, "card", Some("first".into()), Uuid::new_v4()).unwrap();
        let history = validate::current(&am.payment_history).unwrap();
        assert_eq!(history.0.len(), 1);
        assert_eq!(history.0[0].pending_after, 500.0);
        assert_eq!(validate::current(&am.paid), Some(300.0));
        assert!(apply_payment(&m, 900.0, "card", None, Uuid::new_v4()).is_err());
        assert!(apply_payment(&m, 0.0, "card", None, Uuid::new_v4()).is_err());
    }

    #[test]
    fn emr_format() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(format_emr(day, 12), "EMR-20240307-0012");
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email(Some("  Sara.Ali@Example.COM ".into())).as_deref(), Some("sara.ali@example.com"));
        assert_eq!(normalize_email(Some("   ".into())), None);
        assert_eq!(normalize_email(None), None);
    }

    #[test]
    fn emr_sequence_follows_highest_suffix() {
        let prefix = "EMR-20240307-";
        assert_eq!(highest_emr_seq(prefix, std::iter::empty()), 0);
        // 0001 was deleted; a count would hand out 0002 again
        assert_eq!(highest_emr_seq(prefix, ["EMR-20240307-0002"]), 2);
        assert_eq!(highest_emr_seq(prefix, ["EMR-20240307-0001", "EMR-20240307-0009", "EMR-20240307-0003"]), 9);
        assert_eq!(highest_emr_seq(prefix, ["EMR-20240307-12345", "EMR-20240307-custom"]), 12345);
    }
}
