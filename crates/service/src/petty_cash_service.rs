use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter, QueryOrder, QuerySelect,
};
use sea_orm::sea_query::Expr;
use tracing::{info, instrument};

use common::pagination::Pagination;
use common::types::Paged;
use models::petty_cash::{self, Allocation, Expense};
use models::user;

use crate::context::Actor;
use crate::errors::ServiceError;
use crate::listing::fetch_page;
use crate::permissions::{authorize, modules, Action};

#[derive(Debug, Clone, Deserialize)]
pub struct FloatInput {
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
    pub staff_id: Uuid,
    #[serde(default)]
    pub initial_amount: Option<f64>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AllocationInput {
    pub amount: f64,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseInput {
    pub description: String,
    pub amount: f64,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub receipt_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FloatFilter {
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
    #[serde(default)]
    pub staff_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, FromQueryResult)]
pub struct CashSummary {
    pub floats: i64,
    pub total_allocated: f64,
    pub total_spent: f64,
    pub total_amount: f64,
}

/// One float per staff member per clinic; a second one is a conflict.
#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id))]
pub async fn create_float(db: &DatabaseConnection, actor: &Actor, input: FloatInput) -> Result<petty_cash::Model, ServiceError> {
    let clinic_id = actor.clinic_scope(input.clinic_id)?;
    authorize(db, actor, Some(clinic_id), modules::PETTY_CASH, None, Action::Create).await?;
    let staff = user::Entity::find_by_id(input.staff_id)
        .filter(user::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("staff member"))?;
    if staff.clinic_id != Some(clinic_id) {
        return Err(ServiceError::validation("staff member belongs to another clinic"));
    }
    let initial = match input.initial_amount {
        Some(amount) => Some(Allocation { amount, note: input.note, allocated_by: actor.user_id, at: Utc::now() }),
        None => None,
    };
    let created = petty_cash::create(
        db,
        petty_cash::NewFloat { clinic_id, staff_id: staff.id, staff_name: staff.name, initial },
    )
    .await?;
    info!(float_id = %created.id, staff_id = %created.staff_id, total = created.total_amount, "petty_cash_created");
    Ok(created)
}

#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id, float_id = %id))]
pub async fn add_allocation(db: &DatabaseConnection, actor: &Actor, id: Uuid, input: AllocationInput) -> Result<petty_cash::Model, ServiceError> {
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    authorize(db, actor, Some(found.clinic_id), modules::PETTY_CASH, Some("allocations"), Action::Create).await?;
    let allocation = Allocation {
        amount: models::validate::round_money(input.amount),
        note: input.note,
        allocated_by: actor.user_id,
        at: Utc::now(),
    };
    let updated = petty_cash::add_allocation(&found, allocation)?.update(db).await?;
    info!(total_allocated = updated.total_allocated, total_amount = updated.total_amount, "petty_cash_allocated");
    Ok(updated)
}

/// Staff record spending against their own float without needing a grant.
#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id, float_id = %id))]
pub async fn add_expense(db: &DatabaseConnection, actor: &Actor, id: Uuid, input: ExpenseInput) -> Result<petty_cash::Model, ServiceError> {
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    if found.staff_id != actor.user_id {
        authorize(db, actor, Some(found.clinic_id), modules::PETTY_CASH, Some("expenses"), Action::Create).await?;
    }
    let expense = Expense {
        description: input.description.trim().to_string(),
        amount: models::validate::round_money(input.amount),
        vendor: input.vendor,
        receipt_url: input.receipt_url,
        spent_by: actor.user_id,
        at: Utc::now(),
    };
    let updated = petty_cash::add_expense(&found, expense)?.update(db).await?;
    info!(total_spent = updated.total_spent, total_amount = updated.total_amount, "petty_cash_expense_added");
    Ok(updated)
}

#[instrument(skip(db, actor), fields(user_id = %actor.user_id, float_id = %id))]
pub async fn remove_expense(db: &DatabaseConnection, actor: &Actor, id: Uuid, index: usize) -> Result<petty_cash::Model, ServiceError> {
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    authorize(db, actor, Some(found.clinic_id), modules::PETTY_CASH, Some("expenses"), Action::Delete).await?;
    let updated = petty_cash::remove_expense(&found, index)?.update(db).await?;
    info!(index, total_amount = updated.total_amount, "petty_cash_expense_removed");
    Ok(updated)
}

pub async fn get_float(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<petty_cash::Model, ServiceError> {
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    if found.staff_id != actor.user_id {
        authorize(db, actor, Some(found.clinic_id), modules::PETTY_CASH, None, Action::Read).await?;
    }
    Ok(found)
}

/// Without read access a member only sees their own float.
pub async fn list_floats(
    db: &DatabaseConnection,
    actor: &Actor,
    filter: FloatFilter,
    page: Pagination,
) -> Result<Paged<petty_cash::Model>, ServiceError> {
    let scope = actor.list_scope(filter.clinic_id)?;
    let mut q = petty_cash::Entity::find();
    match authorize(db, actor, scope, modules::PETTY_CASH, None, Action::Read).await {
        Ok(()) => {
            if let Some(s) = filter.staff_id {
                q = q.filter(petty_cash::Column::StaffId.eq(s));
            }
        }
        Err(ServiceError::Forbidden(_)) if actor.clinic_id.is_some() => {
            q = q.filter(petty_cash::Column::StaffId.eq(actor.user_id));
        }
        Err(e) => return Err(e),
    }
    if let Some(c) = scope {
        q = q.filter(petty_cash::Column::ClinicId.eq(c));
    }
    fetch_page(db, q.order_by_asc(petty_cash::Column::StaffName), page).await
}

/// Clinic-wide totals across every float.
pub async fn clinic_summary(db: &DatabaseConnection, actor: &Actor, clinic_id: Option<Uuid>) -> Result<CashSummary, ServiceError> {
    let clinic_id = actor.clinic_scope(clinic_id)?;
    authorize(db, actor, Some(clinic_id), modules::PETTY_CASH, None, Action::Read).await?;
    let row = petty_cash::Entity::find()
        .select_only()
        .column_as(Expr::col(petty_cash::Column::Id).count(), "floats")
        .column_as(Expr::cust("COALESCE(SUM(total_allocated), 0)::float8"), "total_allocated")
        .column_as(Expr::cust("COALESCE(SUM(total_spent), 0)::float8"), "total_spent")
        .column_as(Expr::cust("COALESCE(SUM(total_amount), 0)::float8"), "total_amount")
        .filter(petty_cash::Column::ClinicId.eq(clinic_id))
        .into_model::<CashSummary>()
        .one(db)
        .await?
        .unwrap_or_default();
    Ok(CashSummary {
        total_allocated: models::validate::round_money(row.total_allocated),
        total_spent: models::validate::round_money(row.total_spent),
        total_amount: models::validate::round_money(row.total_amount),
        ..row
    })
}

#[instrument(skip(db, actor), fields(user_id = %actor.user_id, float_id = %id))]
pub async fn delete_float(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<(), ServiceError> {
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    authorize(db, actor, Some(found.clinic_id), modules::PETTY_CASH, None, Action::Delete).await?;
    petty_cash::Entity::delete_by_id(id).exec(db).await?;
    info!("petty_cash_deleted");
    Ok(())
}

async fn load(db: &DatabaseConnection, id: Uuid) -> Result<petty_cash::Model, ServiceError> {
    petty_cash::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("petty cash"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::errors::ModelError;
    use models::user::Role;
    use crate::test_support::{cleanup, get_db, seed_clinic, seed_member};

    fn spend(amount: f64) -> ExpenseInput {
        ExpenseInput { description: "Printer paper".into(), amount, vendor: Some("Office Hub".into()), receipt_url: None }
    }

    #[tokio::test]
    async fn float_balances_follow_allocations_and_expenses() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let (owner, c) = seed_clinic(&db).await?;
        let staff = seed_member(&db, c.id, Role::Staff).await?;

        let input = FloatInput { clinic_id: None, staff_id: staff.user_id, initial_amount: Some(500.0), note: None };
        let f = create_float(&db, &owner, input.clone()).await?;
        assert_eq!(f.total_amount, 500.0);
        assert!(matches!(
            create_float(&db, &owner, input).await,
            Err(ServiceError::Model(ModelError::Conflict(_)))
        ));

        let f = add_expense(&db, &staff, f.id, spend(120.5)).await?;
        assert_eq!(f.total_spent, 120.5);
        assert_eq!(f.total_amount, 379.5);
        assert!(add_expense(&db, &staff, f.id, spend(1000.0)).await.is_err());

        let f = add_allocation(&db, &owner, f.id, AllocationInput { amount: 100.0, note: Some("top up".into()) }).await?;
        assert_eq!(f.total_allocated, 600.0);
        let f = remove_expense(&db, &owner, f.id, 0).await?;
        assert_eq!(f.total_amount, 600.0);
        assert!(remove_expense(&db, &owner, f.id, 3).await.is_err());

        let own = list_floats(&db, &staff, FloatFilter::default(), Pagination::default()).await?;
        assert_eq!(own.total, 1);

        let summary = clinic_summary(&db, &owner, None).await?;
        assert_eq!(summary.floats, 1);
        assert_eq!(summary.total_amount, 600.0);

        delete_float(&db, &owner, f.id).await?;
        cleanup(&db, c.id, owner.user_id).await;
        Ok(())
    }
}
