//! Create `doctor_profile` table.
//!
//! One profile per doctor account, optionally attached to a clinic.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DoctorProfile::Table)
                    .if_not_exists()
                    .col(uuid(DoctorProfile::Id).primary_key())
                    .col(uuid(DoctorProfile::UserId).unique_key().not_null())
                    .col(uuid_null(DoctorProfile::ClinicId))
                    .col(string_len(DoctorProfile::Specialization, 120).not_null())
                    .col(string_len(DoctorProfile::Degree, 120).not_null())
                    .col(integer(DoctorProfile::ExperienceYears).not_null())
                    .col(double(DoctorProfile::ConsultationFee).not_null())
                    .col(json_binary(DoctorProfile::Treatments).not_null())
                    .col(text_null(DoctorProfile::Address))
                    .col(double_null(DoctorProfile::Latitude))
                    .col(double_null(DoctorProfile::Longitude))
                    .col(text_null(DoctorProfile::Bio))
                    .col(string_len_null(DoctorProfile::PhotoUrl, 512))
                    .col(boolean(DoctorProfile::Approved).not_null().default(false))
                    .col(timestamp_with_time_zone(DoctorProfile::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(DoctorProfile::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_doctor_profile_user")
                            .from(DoctorProfile::Table, DoctorProfile::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_doctor_profile_clinic")
                            .from(DoctorProfile::Table, DoctorProfile::ClinicId)
                            .to(Clinic::Table, Clinic::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(DoctorProfile::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum DoctorProfile {
    Table,
    Id,
    UserId,
    ClinicId,
    Specialization,
    Degree,
    ExperienceYears,
    ConsultationFee,
    Treatments,
    Address,
    Latitude,
    Longitude,
    Bio,
    PhotoUrl,
    Approved,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User { Table, Id }

#[derive(DeriveIden)]
enum Clinic { Table, Id }
