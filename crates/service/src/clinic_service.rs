use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use sea_orm::sea_query::Expr;
use tracing::{info, instrument, warn};

use common::geo::{self, BoundingBox, GeoPoint};
use common::pagination::Pagination;
use common::types::{Nearby, Paged};
use models::types::StringList;
use models::user::Role;
use models::{
    agent_permission, blog, clinic, clinic_permission, doctor_profile, job_posting, lead, membership, offer,
    patient_registration, petty_cash, treatment, user, vendor,
};

use crate::context::Actor;
use crate::errors::ServiceError;
use crate::integrations::{GeocodeResult, Geocoder};
use crate::listing::{fetch_page, search_any, unique_slug, within_box};
use crate::permissions::{authorize, modules, Action};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateClinicInput {
    /// Admins create on behalf of an existing clinic-role user.
    #[serde(default)]
    pub owner_id: Option<Uuid>,
    pub name: String,
    pub address: String,
    pub city: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub treatments: Vec<String>,
    #[serde(default)]
    pub timings: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateClinicInput {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub treatments: Option<Vec<String>>,
    pub timings: Option<String>,
    pub photos: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClinicFilter {
    #[serde(default)]
    pub approved: Option<bool>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub treatment: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub radius_km: Option<f64>,
}

impl NearbyQuery {
    pub fn point(&self) -> Result<GeoPoint, ServiceError> {
        GeoPoint::new(self.lat, self.lng).ok_or_else(|| ServiceError::validation("lat/lng out of range"))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AddressSearch {
    pub location: GeocodeResult,
    pub is_dubai: bool,
    pub radius_km: f64,
    pub clinics: Vec<Nearby<clinic::Model>>,
}

/// Create the caller's clinic and link the owner account to it.
///
/// Coordinates are looked up from the address when absent and a geocoder is
/// available; a failed lookup leaves them empty.
#[instrument(skip(db, geocoder, actor, input), fields(user_id = %actor.user_id))]
pub async fn create_clinic(
    db: &DatabaseConnection,
    geocoder: &dyn Geocoder,
    actor: &Actor,
    mut input: CreateClinicInput,
) -> Result<clinic::Model, ServiceError> {
    let owner_id = match actor.role {
        Role::Admin => input.owner_id.ok_or_else(|| ServiceError::validation("owner_id required"))?,
        Role::Clinic => actor.user_id,
        _ => return Err(ServiceError::forbidden("only clinic accounts can create a clinic")),
    };
    let owner = user::Entity::find_by_id(owner_id).one(db).await?.ok_or_else(|| ServiceError::not_found("owner"))?;
    if owner.role()? != Role::Clinic {
        return Err(ServiceError::validation("owner must be a clinic account"));
    }
    if owner.clinic_id.is_some() || clinic::Entity::find().filter(clinic::Column::OwnerId.eq(owner_id)).one(db).await?.is_some() {
        return Err(ServiceError::Conflict("owner already has a clinic".into()));
    }
    clinic::validate_fields(&input.name, &input.address, &input.city, &input.phone, input.email.as_deref())?;

    if input.latitude.is_none() && input.longitude.is_none() {
        if let Some(p) = locate(geocoder, &input.address, &input.city).await {
            input.latitude = Some(p.lat);
            input.longitude = Some(p.lng);
        }
    }
    let slug = unique_slug::<clinic::Entity>(db, clinic::Column::Slug, &input.name).await?;

    let txn = db.begin().await?;
    let created = clinic::create(
        &txn,
        clinic::NewClinic {
            owner_id,
            name: input.name,
            slug,
            address: input.address,
            city: input.city,
            phone: input.phone,
            email: input.email,
            latitude: input.latitude,
            longitude: input.longitude,
            treatments: input.treatments,
            timings: input.timings,
            photos: input.photos,
        },
    )
    .await?;
    let mut owner_am: user::ActiveModel = owner.into();
    owner_am.clinic_id = Set(Some(created.id));
    owner_am.updated_at = Set(Utc::now().into());
    owner_am.update(&txn).await?;
    txn.commit().await?;

    info!(clinic_id = %created.id, owner_id = %owner_id, "clinic_created");
    Ok(created)
}

pub async fn get_clinic(db: &DatabaseConnection, id: Uuid) -> Result<clinic::Model, ServiceError> {
    clinic::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("clinic"))
}

pub async fn list_clinics(db: &DatabaseConnection, filter: ClinicFilter, page: Pagination) -> Result<Paged<clinic::Model>, ServiceError> {
    let mut q = clinic::Entity::find();
    if let Some(a) = filter.approved {
        q = q.filter(clinic::Column::Approved.eq(a));
    }
    if let Some(city) = filter.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        q = q.filter(crate::listing::ilike(clinic::Column::City, &city.to_lowercase()));
    }
    if let Some(cond) = search_any(filter.search.as_deref(), [clinic::Column::Name, clinic::Column::Address]) {
        q = q.filter(cond);
    }
    if let Some(t) = filter.treatment.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        // jsonb containment against the stored treatment names
        q = q.filter(Expr::cust_with_values("treatments @> $1::jsonb", [serde_json::json!([t]).to_string()]));
    }
    fetch_page(db, q.order_by_asc(clinic::Column::Name), page).await
}

#[instrument(skip(db, geocoder, actor, input), fields(user_id = %actor.user_id, clinic_id = %id))]
pub async fn update_clinic(
    db: &DatabaseConnection,
    geocoder: &dyn Geocoder,
    actor: &Actor,
    id: Uuid,
    input: UpdateClinicInput,
) -> Result<clinic::Model, ServiceError> {
    let found = get_clinic(db, id).await?;
    authorize(db, actor, Some(found.id), modules::CLINICS, None, Action::Update).await?;
    clinic::validate_fields(
        input.name.as_deref().unwrap_or(&found.name),
        input.address.as_deref().unwrap_or(&found.address),
        input.city.as_deref().unwrap_or(&found.city),
        input.phone.as_deref().unwrap_or(&found.phone),
        input.email.as_deref().or(found.email.as_deref()),
    )?;

    let moved = input.address.as_deref().is_some_and(|a| a.trim() != found.address)
        || input.city.as_deref().is_some_and(|c| c.trim() != found.city);
    let coords_given = input.latitude.is_some() || input.longitude.is_some();
    let address = input.address.clone().unwrap_or_else(|| found.address.clone());
    let city = input.city.clone().unwrap_or_else(|| found.city.clone());

    let mut am: clinic::ActiveModel = found.into();
    if let Some(v) = input.name { am.name = Set(v.trim().to_string()); }
    if let Some(v) = input.address { am.address = Set(v.trim().to_string()); }
    if let Some(v) = input.city { am.city = Set(v.trim().to_string()); }
    if let Some(v) = input.phone { am.phone = Set(v.trim().to_string()); }
    if let Some(v) = input.email { am.email = Set(Some(v.trim().to_ascii_lowercase()).filter(|e| !e.is_empty())); }
    if let Some(v) = input.treatments { am.treatments = Set(StringList::cleaned(v)); }
    if let Some(v) = input.timings { am.timings = Set(Some(v)); }
    if let Some(v) = input.photos { am.photos = Set(StringList::cleaned(v)); }
    if coords_given {
        am.latitude = Set(input.latitude);
        am.longitude = Set(input.longitude);
    } else if moved {
        let p = locate(geocoder, &address, &city).await;
        am.latitude = Set(p.map(|p| p.lat));
        am.longitude = Set(p.map(|p| p.lng));
    }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!("clinic_updated");
    Ok(updated)
}

/// Admin approval toggle; only approved clinics appear publicly.
#[instrument(skip(db, actor), fields(user_id = %actor.user_id, clinic_id = %id))]
pub async fn approve_clinic(db: &DatabaseConnection, actor: &Actor, id: Uuid, approved: bool) -> Result<clinic::Model, ServiceError> {
    actor.require_admin()?;
    let mut am: clinic::ActiveModel = get_clinic(db, id).await?.into();
    am.approved = Set(approved);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(approved, "clinic_approval_changed");
    Ok(updated)
}

/// Delete a clinic with everything that belongs to it, in one transaction.
/// Member accounts survive, detached from the clinic.
#[instrument(skip(db, actor), fields(user_id = %actor.user_id, clinic_id = %id))]
pub async fn delete_clinic(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<(), ServiceError> {
    let found = get_clinic(db, id).await?;
    if !(actor.is_admin() || actor.owns_clinic(found.id)) {
        return Err(ServiceError::forbidden("only the owner or an admin may delete a clinic"));
    }
    let txn = db.begin().await?;
    let doctors = doctor_profile::Entity::delete_many().filter(doctor_profile::Column::ClinicId.eq(id)).exec(&txn).await?;
    let jobs = job_posting::Entity::delete_many().filter(job_posting::Column::ClinicId.eq(id)).exec(&txn).await?;
    let leads = lead::Entity::delete_many().filter(lead::Column::ClinicId.eq(id)).exec(&txn).await?;
    offer::Entity::delete_many().filter(offer::Column::ClinicId.eq(id)).exec(&txn).await?;
    treatment::Entity::delete_many().filter(treatment::Column::ClinicId.eq(id)).exec(&txn).await?;
    let patients = patient_registration::Entity::delete_many()
        .filter(patient_registration::Column::ClinicId.eq(id))
        .exec(&txn)
        .await?;
    membership::Entity::delete_many().filter(membership::Column::ClinicId.eq(id)).exec(&txn).await?;
    petty_cash::Entity::delete_many().filter(petty_cash::Column::ClinicId.eq(id)).exec(&txn).await?;
    vendor::Entity::delete_many().filter(vendor::Column::ClinicId.eq(id)).exec(&txn).await?;
    clinic_permission::Entity::delete_many().filter(clinic_permission::Column::ClinicId.eq(id)).exec(&txn).await?;
    agent_permission::Entity::delete_many().filter(agent_permission::Column::ClinicId.eq(id)).exec(&txn).await?;
    blog::Entity::update_many()
        .col_expr(blog::Column::ClinicId, Expr::value(Option::<Uuid>::None))
        .filter(blog::Column::ClinicId.eq(id))
        .exec(&txn)
        .await?;
    let detached = user::Entity::update_many()
        .col_expr(user::Column::ClinicId, Expr::value(Option::<Uuid>::None))
        .col_expr(user::Column::UpdatedAt, Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(Utc::now())))
        .filter(user::Column::ClinicId.eq(id))
        .exec(&txn)
        .await?;
    clinic::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;
    info!(
        doctors = doctors.rows_affected,
        jobs = jobs.rows_affected,
        leads = leads.rows_affected,
        patients = patients.rows_affected,
        users_detached = detached.rows_affected,
        "clinic_deleted"
    );
    Ok(())
}

/// Approved clinics within the radius, nearest first.
pub async fn nearby_clinics(db: &DatabaseConnection, query: NearbyQuery) -> Result<Vec<Nearby<clinic::Model>>, ServiceError> {
    let center = query.point()?;
    clinics_around(db, center, geo::clamp_radius(query.radius_km)).await
}

/// Geocode `address` and search around it; Dubai addresses search city-wide.
#[instrument(skip(db, geocoder))]
pub async fn search_by_address(
    db: &DatabaseConnection,
    geocoder: &dyn Geocoder,
    address: &str,
    radius_km: Option<f64>,
) -> Result<AddressSearch, ServiceError> {
    if address.trim().is_empty() {
        return Err(ServiceError::validation("address required"));
    }
    let location = geocoder.geocode(address.trim()).await?;
    let center = location.point().ok_or_else(|| ServiceError::Integration("geocoder returned invalid coordinates".into()))?;
    let is_dubai = location.is_dubai();
    let radius_km = location.search_radius(radius_km);
    let clinics = clinics_around(db, center, radius_km).await?;
    info!(is_dubai, radius_km, hits = clinics.len(), "address_search");
    Ok(AddressSearch { location, is_dubai, radius_km, clinics })
}

async fn clinics_around(db: &DatabaseConnection, center: GeoPoint, radius_km: f64) -> Result<Vec<Nearby<clinic::Model>>, ServiceError> {
    let bbox = BoundingBox::around(center, radius_km);
    let candidates = clinic::Entity::find()
        .filter(clinic::Column::Approved.eq(true))
        .filter(within_box(clinic::Column::Latitude, clinic::Column::Longitude, &bbox))
        .all(db)
        .await?;
    Ok(geo::within_radius(center, radius_km, candidates, |c| GeoPoint::new(c.latitude?, c.longitude?))
        .into_iter()
        .map(|(c, d)| Nearby::new(c, d))
        .collect())
}

async fn locate(geocoder: &dyn Geocoder, address: &str, city: &str) -> Option<GeoPoint> {
    if !geocoder.enabled() {
        return None;
    }
    match geocoder.geocode(&format!("{}, {}", address.trim(), city.trim())).await {
        Ok(r) => r.point(),
        Err(e) => {
            warn!(error = %e, "geocoding failed; saving without coordinates");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::integrations::DisabledGeocoder;
    use crate::test_support::{admin, cleanup, get_db, seed_clinic, seed_member};

    struct Fixed(GeocodeResult);

    #[async_trait]
    impl Geocoder for Fixed {
        async fn geocode(&self, _address: &str) -> Result<GeocodeResult, ServiceError> { Ok(self.0.clone()) }
    }

    fn dubai_marina() -> GeocodeResult {
        GeocodeResult {
            lat: 25.0805,
            lng: 55.1403,
            formatted_address: "Dubai Marina - Dubai - United Arab Emirates".into(),
            locality: Some("Dubai".into()),
            admin_area: Some("Dubai".into()),
        }
    }

    #[tokio::test]
    async fn create_geocodes_and_links_owner() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let owner = user::create(
            &db,
            user::NewUser { email: &format!("o_{}@example.com", Uuid::new_v4()), name: "Owner", phone: None, role: Role::Clinic, clinic_id: None },
        )
        .await?;
        let actor = Actor { user_id: owner.id, email: owner.email.clone(), role: Role::Clinic, clinic_id: None };
        let input = CreateClinicInput {
            owner_id: None,
            name: "Marina Dental".into(),
            address: "Marina Walk".into(),
            city: "Dubai".into(),
            phone: "+971501112233".into(),
            email: None,
            latitude: None,
            longitude: None,
            treatments: vec!["Implants".into()],
            timings: None,
            photos: vec![],
        };
        let c = create_clinic(&db, &Fixed(dubai_marina()), &actor, input.clone()).await?;
        assert_eq!(c.latitude, Some(25.0805));
        assert!(c.slug.starts_with("marina-dental"));
        let linked = user::Entity::find_by_id(owner.id).one(&db).await?.unwrap();
        assert_eq!(linked.clinic_id, Some(c.id));
        assert!(matches!(create_clinic(&db, &DisabledGeocoder, &actor, input).await, Err(ServiceError::Conflict(_))));

        approve_clinic(&db, &admin(), c.id, true).await?;
        let hits = nearby_clinics(&db, NearbyQuery { lat: 25.0810, lng: 55.1410, radius_km: Some(2.0) }).await?;
        assert!(hits.iter().any(|h| h.item.id == c.id));
        assert!(hits.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));

        let found = search_by_address(&db, &Fixed(dubai_marina()), "Marina", Some(1.0)).await?;
        assert!(found.is_dubai);
        assert_eq!(found.radius_km, geo::DUBAI_RADIUS_KM);

        cleanup(&db, c.id, owner.id).await;
        Ok(())
    }

    #[tokio::test]
    async fn address_search_without_geocoder_is_integration_error() {
        let Some(db) = get_db().await else { return };
        assert!(matches!(search_by_address(&db, &DisabledGeocoder, "Deira", None).await, Err(ServiceError::Integration(_))));
    }

    #[tokio::test]
    async fn delete_cascades_and_detaches_members() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let (owner, c) = seed_clinic(&db).await?;
        let staff = seed_member(&db, c.id, Role::Staff).await?;
        vendor::create(
            &db,
            vendor::NewVendor {
                clinic_id: c.id,
                name: "Dental Supplies LLC".into(),
                contact_person: None,
                phone: "+971509998877".into(),
                email: None,
                address: None,
                services: vec![],
                gst_number: None,
            },
        )
        .await?;

        assert!(matches!(delete_clinic(&db, &staff, c.id).await, Err(ServiceError::Forbidden(_))));
        delete_clinic(&db, &owner, c.id).await?;

        assert!(clinic::Entity::find_by_id(c.id).one(&db).await?.is_none());
        assert_eq!(vendor::Entity::find().filter(vendor::Column::ClinicId.eq(c.id)).all(&db).await?.len(), 0);
        let s = user::Entity::find_by_id(staff.user_id).one(&db).await?.unwrap();
        assert_eq!(s.clinic_id, None);

        user::Entity::delete_by_id(staff.user_id).exec(&db).await?;
        user::Entity::delete_by_id(owner.user_id).exec(&db).await?;
        Ok(())
    }

    #[test]
    fn nearby_query_rejects_bad_coordinates() {
        assert!(NearbyQuery { lat: 95.0, lng: 0.0, radius_km: None }.point().is_err());
        assert!(NearbyQuery { lat: 25.0, lng: 55.0, radius_km: None }.point().is_ok());
    }
}
