//! Migrator registering entity-specific migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_user;
mod m20240101_000002_create_user_credentials;
mod m20240101_000003_create_clinic;
mod m20240101_000004_create_doctor_profile;
mod m20240101_000005_create_blog;
mod m20240101_000006_create_job_posting;
mod m20240101_000007_create_lead;
mod m20240101_000008_create_treatment;
mod m20240101_000009_create_patient_registration;
mod m20240101_000010_create_membership;
mod m20240101_000011_create_petty_cash;
mod m20240101_000012_create_permissions;
mod m20240101_000013_create_offer;
mod m20240101_000014_create_vendor;
mod m20240101_000015_create_get_in_touch;
mod m20240101_000099_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_user::Migration),
            Box::new(m20240101_000002_create_user_credentials::Migration),
            Box::new(m20240101_000003_create_clinic::Migration),
            Box::new(m20240101_000004_create_doctor_profile::Migration),
            Box::new(m20240101_000005_create_blog::Migration),
            Box::new(m20240101_000006_create_job_posting::Migration),
            Box::new(m20240101_000007_create_lead::Migration),
            Box::new(m20240101_000008_create_treatment::Migration),
            Box::new(m20240101_000009_create_patient_registration::Migration),
            Box::new(m20240101_000010_create_membership::Migration),
            Box::new(m20240101_000011_create_petty_cash::Migration),
            Box::new(m20240101_000012_create_permissions::Migration),
            Box::new(m20240101_000013_create_offer::Migration),
            Box::new(m20240101_000014_create_vendor::Migration),
            Box::new(m20240101_000015_create_get_in_touch::Migration),
            // Indexes should always be applied last
            Box::new(m20240101_000099_add_indexes::Migration),
        ]
    }
}
