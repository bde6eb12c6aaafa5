use uuid::Uuid;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::{info, instrument, warn};

use common::pagination::Pagination;
use common::types::Paged;
use models::errors::ModelError;
use models::patient_registration as patient;
use models::user::{self, Role};

use crate::context::Actor;
use crate::errors::ServiceError;
use crate::integrations::notifier::dispatch;
use crate::integrations::{Notification, Notifier};
use crate::listing::{fetch_page, search_any};
use crate::permissions::{authorize, modules, Action};

const EMR_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct PatientInput {
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
    /// Generated as `EMR-YYYYMMDD-NNNN` when absent.
    #[serde(default)]
    pub emr_number: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub doctor_id: Option<Uuid>,
    #[serde(default)]
    pub treatment: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub paid: f64,
    #[serde(default)]
    pub advance: f64,
    #[serde(default = "default_method")]
    pub payment_method: String,
}

fn default_method() -> String { "cash".into() }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePatientInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub doctor_id: Option<Uuid>,
    pub treatment: Option<String>,
    pub amount: Option<f64>,
    pub advance: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientFilter {
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
    /// Matches first/last name, phone or EMR number.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub doctor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentInput {
    pub amount: f64,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id))]
pub async fn register_patient(db: &DatabaseConnection, actor: &Actor, input: PatientInput) -> Result<patient::Model, ServiceError> {
    let clinic_id = actor.clinic_scope(input.clinic_id)?;
    authorize(db, actor, Some(clinic_id), modules::PATIENTS, None, Action::Create).await?;
    patient::validate_fields(&input.first_name, &input.last_name, &input.phone, input.email.as_deref())?;
    patient::derive_balance(input.amount, input.paid, input.advance)?;
    if let Some(d) = input.doctor_id {
        ensure_doctor(db, clinic_id, d).await?;
    }

    let explicit = input.emr_number.as_deref().map(str::trim).filter(|e| !e.is_empty()).map(str::to_string);
    let mut attempt = 0;
    let created = loop {
        attempt += 1;
        let emr_number = match &explicit {
            Some(e) => e.clone(),
            None => patient::next_emr_number(db, clinic_id, Utc::now().date_naive()).await?,
        };
        let new = patient::NewPatient {
            clinic_id,
            emr_number,
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            gender: input.gender.clone(),
            phone: input.phone.clone(),
            email: input.email.clone(),
            date_of_birth: input.date_of_birth,
            doctor_id: input.doctor_id,
            treatment: input.treatment.clone(),
            amount: input.amount,
            paid: input.paid,
            advance: input.advance,
            payment_method: input.payment_method.clone(),
            created_by: actor.user_id,
        };
        match patient::create(db, new).await {
            Ok(m) => break m,
            // a concurrent registration took the generated number
            Err(ModelError::Conflict(_)) if explicit.is_none() && attempt < EMR_ATTEMPTS => {
                warn!(attempt, "emr number taken; retrying");
            }
            Err(ModelError::Conflict(_)) => return Err(ServiceError::Conflict("emr_number already used in this clinic".into())),
            Err(e) => return Err(e.into()),
        }
    };
    info!(patient_id = %created.id, emr = %created.emr_number, pending = created.pending, "patient_registered");
    Ok(created)
}

/// Adds a payment, appends it to the history and notifies the patient.
#[instrument(skip(db, notifier, actor, input), fields(user_id = %actor.user_id, patient_id = %id))]
pub async fn record_payment(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    actor: &Actor,
    id: Uuid,
    input: PaymentInput,
) -> Result<patient::Model, ServiceError> {
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    authorize(db, actor, Some(found.clinic_id), modules::PATIENTS, Some("payments"), Action::Create).await?;
    let am = patient::apply_payment(&found, input.amount, &input.method, input.note, actor.user_id)?;
    let updated = am.update(db).await?;
    info!(amount = input.amount, pending = updated.pending, status = %updated.payment_status, "payment_recorded");
    dispatch(
        notifier,
        Notification {
            recipient_user_id: None,
            phone: Some(updated.phone.clone()),
            title: "Payment received".into(),
            body: format!(
                "Thank you {}, we received {:.2}. Outstanding balance: {:.2}",
                updated.first_name, input.amount, updated.pending
            ),
        },
    )
    .await;
    Ok(updated)
}

pub async fn get_patient(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<patient::Model, ServiceError> {
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    authorize(db, actor, Some(found.clinic_id), modules::PATIENTS, None, Action::Read).await?;
    Ok(found)
}

pub async fn list_patients(db: &DatabaseConnection, actor: &Actor, filter: PatientFilter, page: Pagination) -> Result<Paged<patient::Model>, ServiceError> {
    let scope = actor.list_scope(filter.clinic_id)?;
    authorize(db, actor, scope, modules::PATIENTS, None, Action::Read).await?;
    let mut q = patient::Entity::find();
    if let Some(c) = scope {
        q = q.filter(patient::Column::ClinicId.eq(c));
    }
    if let Some(s) = filter.payment_status {
        q = q.filter(patient::Column::PaymentStatus.eq(s));
    }
    if let Some(d) = filter.doctor_id {
        q = q.filter(patient::Column::DoctorId.eq(d));
    }
    let cols = [patient::Column::FirstName, patient::Column::LastName, patient::Column::Phone, patient::Column::EmrNumber];
    if let Some(cond) = search_any(filter.search.as_deref(), cols) {
        q = q.filter(cond);
    }
    fetch_page(db, q.order_by_desc(patient::Column::CreatedAt), page).await
}

/// Amount and advance edits go through the same balance derivation as payments.
#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id, patient_id = %id))]
pub async fn update_patient(db: &DatabaseConnection, actor: &Actor, id: Uuid, input: UpdatePatientInput) -> Result<patient::Model, ServiceError> {
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    authorize(db, actor, Some(found.clinic_id), modules::PATIENTS, None, Action::Update).await?;
    patient::validate_fields(
        input.first_name.as_deref().unwrap_or(&found.first_name),
        input.last_name.as_deref().unwrap_or(&found.last_name),
        input.phone.as_deref().unwrap_or(&found.phone),
        input.email.as_deref().or(found.email.as_deref()),
    )?;
    if let Some(d) = input.doctor_id {
        ensure_doctor(db, found.clinic_id, d).await?;
    }
    let mut am: patient::ActiveModel = found.into();
    if let Some(v) = input.first_name { am.first_name = Set(v.trim().to_string()); }
    if let Some(v) = input.last_name { am.last_name = Set(v.trim().to_string()); }
    if let Some(v) = input.gender { am.gender = Set(v.trim().to_ascii_lowercase()); }
    if let Some(v) = input.phone { am.phone = Set(v.trim().to_string()); }
    if let Some(v) = input.email { am.email = Set(patient::normalize_email(Some(v))); }
    if let Some(v) = input.date_of_birth { am.date_of_birth = Set(Some(v)); }
    if let Some(v) = input.doctor_id { am.doctor_id = Set(Some(v)); }
    if let Some(v) = input.treatment { am.treatment = Set(Some(v)); }
    if let Some(v) = input.amount { am.amount = Set(models::validate::round_money(v)); }
    if let Some(v) = input.advance { am.advance = Set(models::validate::round_money(v)); }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(pending = updated.pending, "patient_updated");
    Ok(updated)
}

#[instrument(skip(db, actor), fields(user_id = %actor.user_id, patient_id = %id))]
pub async fn delete_patient(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<(), ServiceError> {
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    authorize(db, actor, Some(found.clinic_id), modules::PATIENTS, None, Action::Delete).await?;
    patient::Entity::delete_by_id(id).exec(db).await?;
    info!("patient_deleted");
    Ok(())
}

async fn load(db: &DatabaseConnection, id: Uuid) -> Result<patient::Model, ServiceError> {
    patient::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("patient"))
}

async fn ensure_doctor(db: &DatabaseConnection, clinic_id: Uuid, doctor_id: Uuid) -> Result<(), ServiceError> {
    let d = user::Entity::find_by_id(doctor_id).one(db).await?.ok_or_else(|| ServiceError::not_found("doctor"))?;
    if d.clinic_id != Some(clinic_id) || d.role()? != Role::Doctor {
        return Err(ServiceError::validation("doctor_id must be a doctor of the same clinic"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::LogNotifier;
    use crate::test_support::{cleanup, get_db, seed_clinic, seed_member};

    fn input(amount: f64, paid: f64, advance: f64) -> PatientInput {
        PatientInput {
            clinic_id: None,
            emr_number: None,
            first_name: "Sara".into(),
            last_name: "Khan".into(),
            gender: "female".into(),
            phone: "+971527654321".into(),
            email: None,
            date_of_birth: NaiveDate::from_ymd_opt(1990, 4, 12),
            doctor_id: None,
            treatment: Some("Whitening".into()),
            amount,
            paid,
            advance,
            payment_method: "card".into(),
        }
    }

    #[tokio::test]
    async fn registration_numbers_and_balances() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let (owner, c) = seed_clinic(&db).await?;
        let staff = seed_member(&db, c.id, Role::Staff).await?;

        let first = register_patient(&db, &owner, input(1000.0, 200.0, 100.0)).await?;
        let second = register_patient(&db, &owner, input(500.0, 0.0, 0.0)).await?;
        let today = Utc::now().date_naive();
        assert_eq!(first.emr_number, patient::format_emr(today, 1));
        assert_eq!(second.emr_number, patient::format_emr(today, 2));
        assert_eq!(first.pending, 700.0);
        assert_eq!(first.payment_status, patient::PAYMENT_PARTIAL);
        assert_eq!(second.payment_status, patient::PAYMENT_PENDING);

        assert!(register_patient(&db, &owner, input(100.0, 80.0, 30.0)).await.is_err());
        let dup = PatientInput { emr_number: Some(first.emr_number.clone()), ..input(10.0, 0.0, 0.0) };
        assert!(matches!(register_patient(&db, &owner, dup).await, Err(ServiceError::Conflict(_))));
        assert!(matches!(register_patient(&db, &staff, input(10.0, 0.0, 0.0)).await, Err(ServiceError::Forbidden(_))));

        let paid = record_payment(&db, &LogNotifier, &owner, first.id, PaymentInput { amount: 700.0, method: "cash".into(), note: None }).await?;
        assert_eq!(paid.pending, 0.0);
        assert_eq!(paid.payment_status, patient::PAYMENT_PAID);
        assert_eq!(paid.payment_history.0.last().map(|e| e.pending_after), Some(0.0));
        assert!(record_payment(&db, &LogNotifier, &owner, first.id, PaymentInput { amount: 1.0, method: "cash".into(), note: None }).await.is_err());

        let raised = update_patient(&db, &owner, first.id, UpdatePatientInput { amount: Some(1200.0), ..Default::default() }).await?;
        assert_eq!(raised.pending, 200.0);
        assert_eq!(raised.payment_status, patient::PAYMENT_PARTIAL);

        let found = list_patients(&db, &owner, PatientFilter { search: Some(second.emr_number.clone()), ..Default::default() }, Pagination::default()).await?;
        assert_eq!(found.total, 1);

        delete_patient(&db, &owner, second.id).await?;
        cleanup(&db, c.id, owner.user_id).await;
        Ok(())
    }
}

#[cfg(test)]
mod emr_tests {
    use super::*;
    use crate::test_support::{cleanup, get_db, seed_clinic};

    fn walk_in(phone: &str) -> PatientInput {
        PatientInput {
            clinic_id: None,
            emr_number: None,
            first_name: "Mona".into(),
            last_name: "Haddad".into(),
            gender: "female".into(),
            phone: phone.into(),
            email: Some("  Mona.Haddad@Example.COM ".into()),
            date_of_birth: None,
            doctor_id: None,
            treatment: Some("Cleaning".into()),
            amount: 300.0,
            paid: 0.0,
            advance: 0.0,
            payment_method: "cash".into(),
        }
    }

    #[tokio::test]
    async fn emr_numbers_are_not_reused_after_delete() -> anyhow::Result<()> {
        let Some(db) = get_db().await else { return Ok(()) };
        let (owner, clinic) = seed_clinic(&db).await?;

        let first = register_patient(&db, &owner, walk_in("+971501000001")).await?;
        let second = register_patient(&db, &owner, walk_in("+971501000002")).await?;
        assert!(first.emr_number.ends_with("-0001"));
        assert!(second.emr_number.ends_with("-0002"));
        assert_eq!(first.email.as_deref(), Some("mona.haddad@example.com"));

        delete_patient(&db, &owner, first.id).await?;
        let third = register_patient(&db, &owner, walk_in("+971501000003")).await?;
        assert!(third.emr_number.ends_with("-0003"));

        let mut manual = walk_in("+971501000004");
        let today = Utc::now().date_naive();
        manual.emr_number = Some(patient::format_emr(today, 7));
        register_patient(&db, &owner, manual).await?;
        let fourth = register_patient(&db, &owner, walk_in("+971501000005")).await?;
        assert_eq!(fourth.emr_number, patient::format_emr(today, 8));

        cleanup(&db, clinic.id, owner.user_id).await;
        Ok(())
    }
}
