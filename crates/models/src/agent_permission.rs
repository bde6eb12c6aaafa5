use sea_orm::{entity::prelude::*, QueryFilter, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::permission::PermissionGrid;
use crate::{clinic, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "agent_permission")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub agent_id: Uuid,
    #[sea_orm(column_type = "JsonBinary")]
    pub permissions: PermissionGrid,
    pub updated_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Clinic, Agent }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Clinic => Entity::belongs_to(clinic::Entity)
                .from(Column::ClinicId)
                .to(clinic::Column::Id)
                .into(),
            Relation::Agent => Entity::belongs_to(user::Entity)
                .from(Column::AgentId)
                .to(user::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub async fn find_for_agent<C: ConnectionTrait>(db: &C, agent_id: Uuid) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::AgentId.eq(agent_id)).one(db).await?)
}

pub async fn upsert<C: ConnectionTrait>(
    db: &C,
    clinic_id: Uuid,
    agent_id: Uuid,
    grid: PermissionGrid,
    updated_by: Uuid,
) -> Result<Model, ModelError> {
    grid.validate()?;
    let now = Utc::now().into();
    if let Some(existing) = find_for_agent(db, agent_id).await? {
        let mut am: ActiveModel = existing.into();
        am.clinic_id = Set(clinic_id);
        am.permissions = Set(grid);
        am.updated_by = Set(updated_by);
        am.updated_at = Set(now);
        Ok(am.update(db).await?)
    } else {
        let am = ActiveModel {
            id: Set(Uuid::new_v4()),
            clinic_id: Set(clinic_id),
            agent_id: Set(agent_id),
            permissions: Set(grid),
            updated_by: Set(updated_by),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(am.insert(db).await?)
    }
}
