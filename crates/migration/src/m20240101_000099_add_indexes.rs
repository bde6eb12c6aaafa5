use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const INDEXES: &[(&str, &str, &str)] = &[
    ("idx_user_clinic", "user", "clinic_id"),
    ("idx_clinic_city", "clinic", "city"),
    ("idx_doctor_profile_clinic", "doctor_profile", "clinic_id"),
    ("idx_blog_status", "blog", "status"),
    ("idx_job_posting_clinic", "job_posting", "clinic_id"),
    ("idx_lead_clinic", "lead", "clinic_id"),
    ("idx_lead_assigned_to", "lead", "assigned_to"),
    ("idx_treatment_clinic", "treatment", "clinic_id"),
    ("idx_patient_registration_phone", "patient_registration", "phone"),
    ("idx_membership_clinic", "membership", "clinic_id"),
    ("idx_offer_clinic", "offer", "clinic_id"),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (name, table, column) in INDEXES {
            manager
                .create_index(
                    Index::create()
                        .name(*name)
                        .table(Alias::new(*table))
                        .col(Alias::new(*column))
                        .to_owned(),
                )
                .await?;
        }

        // Clinic and doctor coordinates: bounding-box prefilter for nearby searches
        manager
            .create_index(
                Index::create()
                    .name("idx_clinic_lat_lng")
                    .table(Alias::new("clinic"))
                    .col(Alias::new("latitude"))
                    .col(Alias::new("longitude"))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_doctor_profile_lat_lng")
                    .table(Alias::new("doctor_profile"))
                    .col(Alias::new("latitude"))
                    .col(Alias::new("longitude"))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in ["idx_clinic_lat_lng", "idx_doctor_profile_lat_lng"] {
            manager.drop_index(Index::drop().name(name).to_owned()).await?;
        }
        for (name, table, _) in INDEXES {
            manager
                .drop_index(Index::drop().name(*name).table(Alias::new(*table)).to_owned())
                .await?;
        }
        Ok(())
    }
}
