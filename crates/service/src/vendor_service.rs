use uuid::Uuid;
use chrono::Utc;
use serde::Deserialize;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::{info, instrument};

use common::pagination::Pagination;
use common::types::Paged;
use models::types::StringList;
use models::vendor;

use crate::context::Actor;
use crate::errors::ServiceError;
use crate::listing::{fetch_page, ilike, search_any};
use crate::permissions::{authorize, modules, Action};

#[derive(Debug, Clone, Deserialize)]
pub struct VendorInput {
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub contact_person: Option<String>,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub gst_number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateVendorInput {
    pub name: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub services: Option<Vec<String>>,
    pub gst_number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VendorFilter {
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
    #[serde(default)]
    pub search: Option<String>,
}

#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id))]
pub async fn create_vendor(db: &DatabaseConnection, actor: &Actor, input: VendorInput) -> Result<vendor::Model, ServiceError> {
    let clinic_id = actor.clinic_scope(input.clinic_id)?;
    authorize(db, actor, Some(clinic_id), modules::VENDORS, None, Action::Create).await?;
    ensure_unique_name(db, clinic_id, &input.name, None).await?;
    let created = vendor::create(
        db,
        vendor::NewVendor {
            clinic_id,
            name: input.name,
            contact_person: input.contact_person,
            phone: input.phone,
            email: input.email,
            address: input.address,
            services: input.services,
            gst_number: input.gst_number,
        },
    )
    .await?;
    info!(vendor_id = %created.id, "vendor_created");
    Ok(created)
}

pub async fn get_vendor(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<vendor::Model, ServiceError> {
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    authorize(db, actor, Some(found.clinic_id), modules::VENDORS, None, Action::Read).await?;
    Ok(found)
}

pub async fn list_vendors(db: &DatabaseConnection, actor: &Actor, filter: VendorFilter, page: Pagination) -> Result<Paged<vendor::Model>, ServiceError> {
    let scope = actor.list_scope(filter.clinic_id)?;
    authorize(db, actor, scope, modules::VENDORS, None, Action::Read).await?;
    let mut q = vendor::Entity::find();
    if let Some(c) = scope {
        q = q.filter(vendor::Column::ClinicId.eq(c));
    }
    let cols = [vendor::Column::Name, vendor::Column::ContactPerson, vendor::Column::Phone];
    if let Some(cond) = search_any(filter.search.as_deref(), cols) {
        q = q.filter(cond);
    }
    fetch_page(db, q.order_by_asc(vendor::Column::Name), page).await
}

#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id, vendor_id = %id))]
pub async fn update_vendor(db: &DatabaseConnection, actor: &Actor, id: Uuid, input: UpdateVendorInput) -> Result<vendor::Model, ServiceError> {
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    authorize(db, actor, Some(found.clinic_id), modules::VENDORS, None, Action::Update).await?;
    let (clinic_id, vendor_id) = (found.clinic_id, found.id);
    let mut am: vendor::ActiveModel = found.into();
    if let Some(v) = input.name {
        models::validate::validate_required("name", &v, 160)?;
        ensure_unique_name(db, clinic_id, &v, Some(vendor_id)).await?;
        am.name = Set(v.trim().to_string());
    }
    if let Some(v) = input.contact_person { am.contact_person = Set(Some(v)); }
    if let Some(v) = input.phone { am.phone = Set(v.trim().to_string()); }
    if let Some(v) = input.email { am.email = Set(Some(v)); }
    if let Some(v) = input.address { am.address = Set(Some(v)); }
    if let Some(v) = input.services { am.services = Set(StringList::cleaned(v)); }
    if let Some(v) = input.gst_number { am.gst_number = Set(Some(v.trim().to_ascii_uppercase())); }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!("vendor_updated");
    Ok(updated)
}

#[instrument(skip(db, actor), fields(user_id = %actor.user_id, vendor_id = %id))]
pub async fn delete_vendor(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<(), ServiceError> {
    let found = load(db, id).await?;
    actor.ensure_clinic(found.clinic_id)?;
    authorize(db, actor, Some(found.clinic_id), modules::VENDORS, None, Action::Delete).await?;
    vendor::Entity::delete_by_id(id).exec(db).await?;
    info!("vendor_deleted");
    Ok(())
}

async fn load(db: &DatabaseConnection, id: Uuid) -> Result<vendor::Model, ServiceError> {
    vendor::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("vendor"))
}

async fn ensure_unique_name(db: &DatabaseConnection, clinic_id: Uuid, name: &str, except: Option<Uuid>) -> Result<(), ServiceError> {
    let mut q = vendor::Entity::find()
        .filter(vendor::Column::ClinicId.eq(clinic_id))
        .filter(ilike(vendor::Column::Name, &name.trim().to_lowercase()));
    if let Some(id) = except {
        q = q.filter(vendor::Column::Id.ne(id));
    }
    if q.one(db).await?.is_some() {
        return Err(ServiceError::Conflict(format!("vendor '{}' already exists", name.trim())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::user::Role;
    use crate::test_support::{cleanup, get_db, seed_clinic, seed_member};

    fn supplier(name: &str) -> VendorInput {
        VendorInput {
            clinic_id: None,
            name: name.into(),
            contact_person: Some("Omar".into()),
            phone: "+971509998888".into(),
            email: Some("sales@medsupply.ae".into()),
            address: None,
            services: vec!["Gloves".into(), "gloves ".into(), "Masks".into()],
            gst_number: Some("trn100200".into()),
        }
    }

    #[tokio::test]
    async fn vendor_names_are_unique_per_clinic() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let (owner, c) = seed_clinic(&db).await?;

        let v = create_vendor(&db, &owner, supplier("MedSupply")).await?;
        assert_eq!(v.gst_number.as_deref(), Some("TRN100200"));
        assert!(matches!(create_vendor(&db, &owner, supplier("medsupply")).await, Err(ServiceError::Conflict(_))));

        let other = create_vendor(&db, &owner, supplier("Dental Depot")).await?;
        let renamed = UpdateVendorInput { name: Some("MedSupply".into()), ..Default::default() };
        assert!(matches!(update_vendor(&db, &owner, other.id, renamed).await, Err(ServiceError::Conflict(_))));

        let agent = seed_member(&db, c.id, Role::Agent).await?;
        assert!(matches!(delete_vendor(&db, &agent, v.id).await, Err(ServiceError::Forbidden(_))));

        let found = list_vendors(&db, &owner, VendorFilter { search: Some("depot".into()), ..Default::default() }, Pagination::default()).await?;
        assert_eq!(found.total, 1);
        delete_vendor(&db, &owner, v.id).await?;
        cleanup(&db, c.id, owner.user_id).await;
        Ok(())
    }
}
