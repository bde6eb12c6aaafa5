use sea_orm::{entity::prelude::*, FromJsonQueryResult, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::{clinic, validate};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubCategory {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub price: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct SubCategories(pub Vec<SubCategory>);

impl SubCategories {
    /// Adds a sub-category; names are unique within a treatment ignoring case.
    pub fn add(&mut self, name: &str, price: Option<f64>) -> Result<&SubCategory, ModelError> {
        validate::validate_required("sub_category", name, 120)?;
        if let Some(p) = price { validate::validate_amount("price", p)?; }
        let name = name.trim();
        if self.0.iter().any(|s| s.name.eq_ignore_ascii_case(name)) {
            return Err(ModelError::Conflict(format!("sub-category '{name}' already exists")));
        }
        self.0.push(SubCategory {
            name: name.to_string(),
            slug: validate::slugify(name),
            price: price.map(validate::round_money),
        });
        Ok(&self.0[self.0.len() - 1])
    }

    pub fn remove(&mut self, slug: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|s| s.slug != slug);
        self.0.len() != before
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "treatment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// `None` marks the global catalogue.
    pub clinic_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub sub_categories: SubCategories,
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

impl ActiveModelBehavior for ActiveModel {}

pub struct NewTreatment {
    pub clinic_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewTreatment) -> Result<Model, ModelError> {
    validate::validate_required("name", &input.name, 120)?;
    let name = input.name.trim().to_string();
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        clinic_id: Set(input.clinic_id),
        slug: Set(validate::slugify(&name)),
        name: Set(name),
        description: Set(input.description),
        sub_categories: Set(SubCategories::default()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_categories_are_unique_per_treatment() {
        let mut s = SubCategories::default();
        assert_eq!(s.add("Full Face", Some(1200.0)).unwrap().slug, "full-face");
        assert!(matches!(s.add("full face", None), Err(ModelError::Conflict(_))));
        assert!(s.add("Under Arms", None).is_ok());
        assert!(s.remove("full-face"));
        assert!(!s.remove("full-face"));
        assert_eq!(s.0.len(), 1);
    }

    #[test]
    fn negative_price_rejected() {
        let mut s = SubCategories::default();
        assert!(s.add("Session", Some(-5.0)).is_err());
    }
}
