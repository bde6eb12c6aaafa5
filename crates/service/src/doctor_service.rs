use uuid::Uuid;
use chrono::Utc;
use serde::Deserialize;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::{info, instrument};

use common::geo::{self, BoundingBox};
use common::pagination::Pagination;
use common::types::{Nearby, Paged};
use models::types::StringList;
use models::user::{self, Role};
use models::{clinic, doctor_profile};

use crate::clinic_service::NearbyQuery;
use crate::context::Actor;
use crate::errors::ServiceError;
use crate::listing::{fetch_page, search_any, within_box};
use crate::permissions::{authorize, modules, Action};

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorInput {
    /// Required when a clinic owner or admin creates the profile.
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub specialization: String,
    pub degree: String,
    #[serde(default)]
    pub experience_years: i32,
    #[serde(default)]
    pub consultation_fee: f64,
    #[serde(default)]
    pub treatments: Vec<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDoctorInput {
    pub specialization: Option<String>,
    pub degree: Option<String>,
    pub experience_years: Option<i32>,
    pub consultation_fee: Option<f64>,
    pub treatments: Option<Vec<String>>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub bio: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorFilter {
    #[serde(default)]
    pub clinic_id: Option<Uuid>,
    #[serde(default)]
    pub approved: Option<bool>,
    #[serde(default)]
    pub search: Option<String>,
}

/// One profile per doctor account. The profile joins the doctor's clinic, if any.
#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id))]
pub async fn create_doctor(db: &DatabaseConnection, actor: &Actor, input: DoctorInput) -> Result<doctor_profile::Model, ServiceError> {
    let doctor_id = match actor.role {
        Role::Doctor => actor.user_id,
        _ => input.user_id.ok_or_else(|| ServiceError::validation("user_id required"))?,
    };
    let doctor = user::Entity::find_by_id(doctor_id).one(db).await?.ok_or_else(|| ServiceError::not_found("doctor"))?;
    if doctor.role()? != Role::Doctor {
        return Err(ServiceError::validation("profile owner must be a doctor account"));
    }
    if doctor_id != actor.user_id && !actor.is_admin() {
        let clinic_id = doctor.clinic_id.ok_or_else(|| ServiceError::forbidden("doctor outside caller scope"))?;
        actor.ensure_clinic(clinic_id)?;
        authorize(db, actor, Some(clinic_id), modules::DOCTORS, None, Action::Create).await?;
    }
    let exists = doctor_profile::Entity::find().filter(doctor_profile::Column::UserId.eq(doctor_id)).one(db).await?;
    if exists.is_some() {
        return Err(ServiceError::Conflict("doctor already has a profile".into()));
    }
    validate_required(&input.specialization, &input.degree)?;
    let created = doctor_profile::create(
        db,
        doctor_profile::NewDoctorProfile {
            user_id: doctor_id,
            clinic_id: doctor.clinic_id,
            specialization: input.specialization,
            degree: input.degree,
            experience_years: input.experience_years,
            consultation_fee: input.consultation_fee,
            treatments: input.treatments,
            address: input.address,
            latitude: input.latitude,
            longitude: input.longitude,
            bio: input.bio,
            photo_url: input.photo_url,
        },
    )
    .await?;
    info!(doctor_id = %created.id, "doctor_profile_created");
    Ok(created)
}

pub async fn get_doctor(db: &DatabaseConnection, id: Uuid) -> Result<doctor_profile::Model, ServiceError> {
    doctor_profile::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("doctor"))
}

pub async fn list_doctors(db: &DatabaseConnection, filter: DoctorFilter, page: Pagination) -> Result<Paged<doctor_profile::Model>, ServiceError> {
    let mut q = doctor_profile::Entity::find();
    if let Some(c) = filter.clinic_id {
        q = q.filter(doctor_profile::Column::ClinicId.eq(c));
    }
    if let Some(a) = filter.approved {
        q = q.filter(doctor_profile::Column::Approved.eq(a));
    }
    if let Some(cond) = search_any(filter.search.as_deref(), [doctor_profile::Column::Specialization, doctor_profile::Column::Degree]) {
        q = q.filter(cond);
    }
    fetch_page(db, q.order_by_desc(doctor_profile::Column::CreatedAt), page).await
}

#[instrument(skip(db, actor, input), fields(user_id = %actor.user_id, doctor_id = %id))]
pub async fn update_doctor(db: &DatabaseConnection, actor: &Actor, id: Uuid, input: UpdateDoctorInput) -> Result<doctor_profile::Model, ServiceError> {
    let found = get_doctor(db, id).await?;
    guard(db, actor, &found, Action::Update).await?;
    let mut am: doctor_profile::ActiveModel = found.into();
    if let Some(v) = input.specialization {
        models::validate::validate_required("specialization", &v, 120)?;
        am.specialization = Set(v.trim().to_string());
    }
    if let Some(v) = input.degree {
        models::validate::validate_required("degree", &v, 120)?;
        am.degree = Set(v.trim().to_string());
    }
    if let Some(v) = input.experience_years { am.experience_years = Set(v); }
    if let Some(v) = input.consultation_fee { am.consultation_fee = Set(models::validate::round_money(v)); }
    if let Some(v) = input.treatments { am.treatments = Set(StringList::cleaned(v)); }
    if let Some(v) = input.address { am.address = Set(Some(v)); }
    if input.latitude.is_some() || input.longitude.is_some() {
        am.latitude = Set(input.latitude);
        am.longitude = Set(input.longitude);
    }
    if let Some(v) = input.bio { am.bio = Set(Some(v)); }
    if let Some(v) = input.photo_url { am.photo_url = Set(Some(v)); }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!("doctor_profile_updated");
    Ok(updated)
}

#[instrument(skip(db, actor), fields(user_id = %actor.user_id, doctor_id = %id))]
pub async fn delete_doctor(db: &DatabaseConnection, actor: &Actor, id: Uuid) -> Result<(), ServiceError> {
    let found = get_doctor(db, id).await?;
    guard(db, actor, &found, Action::Delete).await?;
    doctor_profile::Entity::delete_by_id(id).exec(db).await?;
    info!("doctor_profile_deleted");
    Ok(())
}

#[instrument(skip(db, actor), fields(user_id = %actor.user_id, doctor_id = %id))]
pub async fn approve_doctor(db: &DatabaseConnection, actor: &Actor, id: Uuid, approved: bool) -> Result<doctor_profile::Model, ServiceError> {
    actor.require_admin()?;
    let mut am: doctor_profile::ActiveModel = get_doctor(db, id).await?.into();
    am.approved = Set(approved);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(approved, "doctor_approval_changed");
    Ok(updated)
}

/// Approved doctors near a point. Profiles without their own coordinates use
/// their clinic's.
pub async fn nearby_doctors(db: &DatabaseConnection, query: NearbyQuery) -> Result<Vec<Nearby<doctor_profile::Model>>, ServiceError> {
    let center = query.point()?;
    let radius = geo::clamp_radius(query.radius_km);
    let bbox = BoundingBox::around(center, radius);

    let mut candidates = doctor_profile::Entity::find()
        .filter(doctor_profile::Column::Approved.eq(true))
        .filter(within_box(doctor_profile::Column::Latitude, doctor_profile::Column::Longitude, &bbox))
        .all(db)
        .await?;
    let clinics = clinic::Entity::find()
        .filter(within_box(clinic::Column::Latitude, clinic::Column::Longitude, &bbox))
        .all(db)
        .await?;
    if !clinics.is_empty() {
        let clinic_ids: Vec<Uuid> = clinics.iter().map(|c| c.id).collect();
        let at_clinics = doctor_profile::Entity::find()
            .filter(doctor_profile::Column::Approved.eq(true))
            .filter(doctor_profile::Column::Latitude.is_null())
            .filter(doctor_profile::Column::ClinicId.is_in(clinic_ids))
            .all(db)
            .await?;
        for mut d in at_clinics {
            if let Some(c) = clinics.iter().find(|c| Some(c.id) == d.clinic_id) {
                d.latitude = c.latitude;
                d.longitude = c.longitude;
                candidates.push(d);
            }
        }
    }
    Ok(geo::within_radius(center, radius, candidates, |d| geo::GeoPoint::new(d.latitude?, d.longitude?))
        .into_iter()
        .map(|(d, km)| Nearby::new(d, km))
        .collect())
}

fn validate_required(specialization: &str, degree: &str) -> Result<(), ServiceError> {
    models::validate::validate_required("specialization", specialization, 120)?;
    models::validate::validate_required("degree", degree, 120)?;
    Ok(())
}

async fn guard(db: &DatabaseConnection, actor: &Actor, profile: &doctor_profile::Model, action: Action) -> Result<(), ServiceError> {
    if actor.is_admin() || profile.user_id == actor.user_id {
        return Ok(());
    }
    let clinic_id = profile.clinic_id.ok_or_else(|| ServiceError::forbidden("profile outside caller scope"))?;
    actor.ensure_clinic(clinic_id)?;
    authorize(db, actor, Some(clinic_id), modules::DOCTORS, None, action).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{admin, cleanup, get_db, seed_clinic, seed_member};

    fn input(lat: Option<f64>) -> DoctorInput {
        DoctorInput {
            user_id: None,
            specialization: "Orthodontics".into(),
            degree: "BDS".into(),
            experience_years: 8,
            consultation_fee: 250.0,
            treatments: vec!["Braces".into()],
            address: None,
            latitude: lat,
            longitude: lat.map(|_| 55.2710),
            bio: None,
            photo_url: None,
        }
    }

    #[tokio::test]
    async fn doctor_profile_flow() -> Result<(), anyhow::Error> {
        let Some(db) = get_db().await else { return Ok(()) };
        let (owner, c) = seed_clinic(&db).await?;
        let doctor = seed_member(&db, c.id, Role::Doctor).await?;
        let staff = seed_member(&db, c.id, Role::Staff).await?;

        let p = create_doctor(&db, &doctor, input(None)).await?;
        assert_eq!(p.clinic_id, Some(c.id));
        assert!(!p.approved);
        assert!(matches!(create_doctor(&db, &doctor, input(None)).await, Err(ServiceError::Conflict(_))));

        // staff without a role grid cannot edit someone else's profile
        assert!(matches!(
            update_doctor(&db, &staff, p.id, UpdateDoctorInput { bio: Some("x".into()), ..Default::default() }).await,
            Err(ServiceError::Forbidden(_))
        ));
        let updated = update_doctor(&db, &owner, p.id, UpdateDoctorInput { experience_years: Some(9), ..Default::default() }).await?;
        assert_eq!(updated.experience_years, 9);

        assert!(approve_doctor(&db, &owner, p.id, true).await.is_err());
        approve_doctor(&db, &admin(), p.id, true).await?;

        // no own coordinates: located at the seeded clinic
        let hits = nearby_doctors(&db, NearbyQuery { lat: 25.2048, lng: 55.2708, radius_km: Some(1.0) }).await?;
        assert!(hits.iter().any(|h| h.item.id == p.id && h.distance_km < 0.01));

        delete_doctor(&db, &doctor, p.id).await?;
        assert!(matches!(get_doctor(&db, p.id).await, Err(ServiceError::NotFound(_))));
        cleanup(&db, c.id, owner.user_id).await;
        Ok(())
    }
}
