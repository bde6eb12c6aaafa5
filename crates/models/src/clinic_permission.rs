use sea_orm::{entity::prelude::*, QueryFilter, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::permission::PermissionGrid;
use crate::user::Role;
use crate::clinic;

/// Role grid for one clinic; `(clinic_id, role)` is unique.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "clinic_permission")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub role: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub permissions: PermissionGrid,
    pub updated_by: Uuid,
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

/// Only roles working inside a clinic carry a role grid.
pub fn validate_role(role: Role) -> Result<(), ModelError> {
    if role.is_clinic_member() {
        Ok(())
    } else {
        Err(ModelError::Validation(format!("role '{role}' has no clinic permissions")))
    }
}

pub async fn find<C: ConnectionTrait>(db: &C, clinic_id: Uuid, role: Role) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::ClinicId.eq(clinic_id))
        .filter(Column::Role.eq(role.as_str()))
        .one(db)
        .await?)
}

pub async fn upsert<C: ConnectionTrait>(
    db: &C,
    clinic_id: Uuid,
    role: Role,
    grid: PermissionGrid,
    updated_by: Uuid,
) -> Result<Model, ModelError> {
    validate_role(role)?;
    grid.validate()?;
    let now = Utc::now().into();
    if let Some(existing) = find(db, clinic_id, role).await? {
        let mut am: ActiveModel = existing.into();
        am.permissions = Set(grid);
        am.updated_by = Set(updated_by);
        am.updated_at = Set(now);
        Ok(am.update(db).await?)
    } else {
        let am = ActiveModel {
            id: Set(Uuid::new_v4()),
            clinic_id: Set(clinic_id),
            role: Set(role.as_str().to_string()),
            permissions: Set(grid),
            updated_by: Set(updated_by),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(am.insert(db).await?)
    }
}
