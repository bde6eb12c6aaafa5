use anyhow::Result;
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

use super::{cleanup, seed_clinic, setup_test_db};
use crate::errors::ModelError;
use crate::{membership, patient_registration as patient, petty_cash};

#[tokio::test]
async fn test_patient_pending_recomputed_on_save() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };
    let (owner, c) = seed_clinic(&db).await?;

    let today = Utc::now().date_naive();
    let emr = patient::next_emr_number(&db, c.id, today).await?;
    assert!(emr.ends_with("-0001"));
    let p = patient::create(
        &db,
        patient::NewPatient {
            clinic_id: c.id,
            emr_number: emr,
            first_name: "Sara".into(),
            last_name: "Ali".into(),
            gender: "female".into(),
            phone: "+971501234567".into(),
            email: None,
            date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 1),
            doctor_id: None,
            treatment: Some("Botox".into()),
            amount: 1000.0,
            paid: 100.0,
            advance: 200.0,
            payment_method: "cash".into(),
            created_by: owner.id,
        },
    )
    .await?;
    assert_eq!(p.pending, 700.0);
    assert_eq!(p.payment_status, patient::PAYMENT_PARTIAL);
    assert!(patient::next_emr_number(&db, c.id, today).await?.ends_with("-0002"));

    let p = patient::apply_payment(&p, 700.0, "card", None, owner.id)?.update(&db).await?;
    assert_eq!(p.pending, 0.0);
    assert_eq!(p.payment_status, patient::PAYMENT_PAID);
    assert_eq!(p.payment_history.0.last().map(|h| h.pending_after), Some(0.0));

    let mut am: patient::ActiveModel = p.into();
    am.advance = Set(500.0);
    let overpaid = am.update(&db).await.map_err(ModelError::from);
    assert!(matches!(overpaid, Err(ModelError::Validation(_))));

    cleanup(&db, &owner, &c).await?;
    Ok(())
}

#[tokio::test]
async fn test_membership_and_petty_cash_totals() -> Result<()> {
    let Some(db) = setup_test_db().await else { return Ok(()) };
    let (owner, c) = seed_clinic(&db).await?;
    let today = Utc::now().date_naive();

    let m = membership::create(
        &db,
        membership::NewMembership {
            clinic_id: c.id,
            patient_id: None,
            name: "Omar".into(),
            phone: "+971501112233".into(),
            package_name: "Gold".into(),
            package_amount: 1000.0,
            start_date: today,
            end_date: today + chrono::Duration::days(365),
        },
    )
    .await?;
    let line = membership::ConsumedTreatment {
        treatment: "Laser".into(),
        sub_treatment: None,
        quantity: 2,
        unit_price: 150.0,
        used_at: Utc::now(),
        recorded_by: owner.id,
    };
    let m = membership::consume(&m, line, today)?.update(&db).await?;
    assert_eq!(m.total_consumed, 300.0);
    assert_eq!(m.remaining, 700.0);
    assert_eq!(m.status, membership::STATUS_ACTIVE);

    let staff_id = Uuid::new_v4();
    let f = petty_cash::create(
        &db,
        petty_cash::NewFloat {
            clinic_id: c.id,
            staff_id,
            staff_name: "Reception".into(),
            initial: Some(petty_cash::Allocation { amount: 500.0, note: None, allocated_by: owner.id, at: Utc::now() }),
        },
    )
    .await?;
    assert_eq!(f.total_amount, 500.0);
    let expense = petty_cash::Expense {
        description: "Printer ink".into(),
        amount: 120.5,
        vendor: None,
        receipt_url: None,
        spent_by: staff_id,
        at: Utc::now(),
    };
    let f = petty_cash::add_expense(&f, expense)?.update(&db).await?;
    assert_eq!(f.total_spent, 120.5);
    assert_eq!(f.total_amount, 379.5);

    cleanup(&db, &owner, &c).await?;
    Ok(())
}
