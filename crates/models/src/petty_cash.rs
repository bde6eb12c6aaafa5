use sea_orm::{entity::prelude::*, FromJsonQueryResult, Set};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::{clinic, validate};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub amount: f64,
    #[serde(default)]
    pub note: Option<String>,
    pub allocated_by: Uuid,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub description: String,
    pub amount: f64,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub receipt_url: Option<String>,
    pub spent_by: Uuid,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct Allocations(pub Vec<Allocation>);

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct Expenses(pub Vec<Expense>);

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub total_allocated: f64,
    pub total_spent: f64,
    pub total_amount: f64,
}

/// `total_amount = sum(allocations) - sum(expenses)`, never below zero.
pub fn derive_totals(allocations: &Allocations, expenses: &Expenses) -> Result<Totals, ModelError> {
    for a in &allocations.0 { validate::validate_positive("allocation", a.amount)?; }
    for e in &expenses.0 { validate::validate_positive("expense", e.amount)?; }
    let total_allocated = validate::round_money(allocations.0.iter().map(|a| a.amount).sum());
    let total_spent = validate::round_money(expenses.0.iter().map(|e| e.amount).sum());
    let total_amount = validate::round_money(total_allocated - total_spent);
    if total_amount < 0.0 {
        return Err(ModelError::Validation(format!(
            "expenses ({total_spent:.2}) exceed allocated funds ({total_allocated:.2})"
        )));
    }
    Ok(Totals { total_allocated, total_spent, total_amount })
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "petty_cash")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub staff_id: Uuid,
    pub staff_name: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub allocations: Allocations,
    #[sea_orm(column_type = "JsonBinary")]
    pub expenses: Expenses,
    pub total_allocated: f64,
    pub total_spent: f64,
    pub total_amount: f64,
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
        if let (Some(allocations), Some(expenses)) = (validate::current(&self.allocations), validate::current(&self.expenses)) {
            let totals = derive_totals(&allocations, &expenses)?;
            self.total_allocated = Set(totals.total_allocated);
            self.total_spent = Set(totals.total_spent);
            self.total_amount = Set(totals.total_amount);
        }
        Ok(self)
    }
}

pub struct NewFloat {
    pub clinic_id: Uuid,
    pub staff_id: Uuid,
    pub staff_name: String,
    pub initial: Option<Allocation>,
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewFloat) -> Result<Model, ModelError> {
    validate::validate_required("staff_name", &input.staff_name, 128)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        clinic_id: Set(input.clinic_id),
        staff_id: Set(input.staff_id),
        staff_name: Set(input.staff_name.trim().to_string()),
        allocations: Set(Allocations(input.initial.into_iter().collect())),
        expenses: Set(Expenses::default()),
        total_allocated: Set(0.0),
        total_spent: Set(0.0),
        total_amount: Set(0.0),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

pub fn add_allocation(model: &Model, allocation: Allocation) -> Result<ActiveModel, ModelError> {
    let mut allocations = model.allocations.clone();
    allocations.0.push(allocation);
    derive_totals(&allocations, &model.expenses)?;
    let mut am: ActiveModel = model.clone().into();
    am.allocations = Set(allocations);
    am.updated_at = Set(Utc::now().into());
    Ok(am)
}

pub fn add_expense(model: &Model, expense: Expense) -> Result<ActiveModel, ModelError> {
    validate::validate_required("description", &expense.description, 500)?;
    let mut expenses = model.expenses.clone();
    expenses.0.push(expense);
    derive_totals(&model.allocations, &expenses)?;
    let mut am: ActiveModel = model.clone().into();
    am.expenses = Set(expenses);
    am.updated_at = Set(Utc::now().into());
    Ok(am)
}

pub fn remove_expense(model: &Model, index: usize) -> Result<ActiveModel, ModelError> {
    if index >= model.expenses.0.len() {
        return Err(ModelError::Validation(format!("no expense at index {index}")));
    }
    let mut expenses = model.expenses.clone();
    expenses.0.remove(index);
    let mut am: ActiveModel = model.clone().into();
    am.expenses = Set(expenses);
    am.updated_at = Set(Utc::now().into());
    Ok(am)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alloc(amount: f64) -> Allocation {
        Allocation { amount, note: None, allocated_by: Uuid::new_v4(), at: Utc::now() }
    }

    fn expense(amount: f64) -> Expense {
        Expense {
            description: "stationery".into(),
            amount,
            vendor: None,
            receipt_url: None,
            spent_by: Uuid::new_v4(),
            at: Utc::now(),
        }
    }

    fn float(allocations: Vec<Allocation>, expenses: Vec<Expense>) -> Model {
        let now = Utc::now().into();
        Model {
            id: Uuid::new_v4(),
            clinic_id: Uuid::new_v4(),
            staff_id: Uuid::new_v4(),
            staff_name: "Reception".into(),
            allocations: Allocations(allocations),
            expenses: Expenses(expenses),
            total_allocated: 0.0,
            total_spent: 0.0,
            total_amount: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn totals_are_allocated_minus_spent() {
        let t = derive_totals(&Allocations(vec![alloc(500.0), alloc(250.5)]), &Expenses(vec![expense(100.25)])).unwrap();
        assert_eq!(t, Totals { total_allocated: 750.5, total_spent: 100.25, total_amount: 650.25 });
    }

    #[test]
    fn expenses_cannot_exceed_allocations() {
        let m = float(vec![alloc(100.0)], vec![expense(60.0)]);
        assert!(add_expense(&m, expense(40.0)).is_ok());
        assert!(add_expense(&m, expense(40.01)).is_err());
        assert!(add_expense(&m, expense(0.0)).is_err());
    }

    #[test]
    fn remove_expense_by_index() {
        let m = float(vec![alloc(100.0)], vec![expense(60.0)]);
        let am = remove_expense(&m, 0).unwrap();
        assert!(validate::current(&am.expenses).unwrap().0.is_empty());
        assert!(remove_expense(&m, 1).is_err());
    }

    #[test]
    fn allocations_must_be_positive() {
        let m = float(vec![], vec![]);
        assert!(add_allocation(&m, alloc(-10.0)).is_err());
        assert!(add_allocation(&m, alloc(10.0)).is_ok());
    }
}
