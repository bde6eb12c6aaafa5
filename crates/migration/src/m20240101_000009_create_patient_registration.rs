//! Create `patient_registration` table with FK to `clinic`.
//!
//! `pending` and `payment_status` are derived on every save; payment history is jsonb.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PatientRegistration::Table)
                    .if_not_exists()
                    .col(uuid(PatientRegistration::Id).primary_key())
                    .col(uuid(PatientRegistration::ClinicId).not_null())
                    .col(string_len(PatientRegistration::EmrNumber, 40).not_null())
                    .col(string_len(PatientRegistration::FirstName, 80).not_null())
                    .col(string_len(PatientRegistration::LastName, 80).not_null())
                    .col(string_len(PatientRegistration::Gender, 16).not_null())
                    .col(string_len(PatientRegistration::Phone, 32).not_null())
                    .col(string_len_null(PatientRegistration::Email, 255))
                    .col(date_null(PatientRegistration::DateOfBirth))
                    .col(uuid_null(PatientRegistration::DoctorId))
                    .col(string_len_null(PatientRegistration::Treatment, 120))
                    .col(double(PatientRegistration::Amount).not_null())
                    .col(double(PatientRegistration::Paid).not_null())
                    .col(double(PatientRegistration::Advance).not_null())
                    .col(double(PatientRegistration::Pending).not_null())
                    .col(string_len(PatientRegistration::PaymentStatus, 16).not_null())
                    .col(string_len(PatientRegistration::PaymentMethod, 32).not_null())
                    .col(json_binary(PatientRegistration::PaymentHistory).not_null())
                    .col(uuid(PatientRegistration::CreatedBy).not_null())
                    .col(timestamp_with_time_zone(PatientRegistration::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(PatientRegistration::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_patient_registration_clinic")
                            .from(PatientRegistration::Table, PatientRegistration::ClinicId)
                            .to(Clinic::Table, Clinic::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // EMR numbers are unique within a clinic
        manager
            .create_index(
                Index::create()
                    .name("uniq_patient_registration_clinic_emr")
                    .table(PatientRegistration::Table)
                    .col(PatientRegistration::ClinicId)
                    .col(PatientRegistration::EmrNumber)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(PatientRegistration::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum PatientRegistration {
    Table,
    Id,
    ClinicId,
    EmrNumber,
    FirstName,
    LastName,
    Gender,
    Phone,
    Email,
    DateOfBirth,
    DoctorId,
    Treatment,
    Amount,
    Paid,
    Advance,
    Pending,
    PaymentStatus,
    PaymentMethod,
    PaymentHistory,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Clinic { Table, Id }
