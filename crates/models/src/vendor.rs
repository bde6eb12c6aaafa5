use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::types::StringList;
use crate::{clinic, validate};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vendor")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub address: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub services: StringList,
    pub gst_number: Option<String>,
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
    async fn before_save<C>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if let Some(p) = validate::current(&self.phone) { validate::validate_phone(&p)?; }
        if let Some(Some(e)) = validate::current(&self.email) { validate::validate_email(&e)?; }
        Ok(self)
    }
}

pub struct NewVendor {
    pub clinic_id: Uuid,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub services: Vec<String>,
    pub gst_number: Option<String>,
}

pub async fn create<C: ConnectionTrait>(db: &C, input: NewVendor) -> Result<Model, ModelError> {
    validate::validate_required("name", &input.name, 160)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        clinic_id: Set(input.clinic_id),
        name: Set(input.name.trim().to_string()),
        contact_person: Set(input.contact_person),
        phone: Set(input.phone.trim().to_string()),
        email: Set(input.email),
        address: Set(input.address),
        services: Set(StringList::cleaned(input.services)),
        gst_number: Set(input.gst_number.map(|g| g.trim().to_ascii_uppercase())),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}
