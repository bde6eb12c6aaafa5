//! Create `membership` table with FK to `clinic`.
//!
//! Consumed treatment lines are jsonb; `total_consumed`, `remaining` and `status` are derived.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Membership::Table)
                    .if_not_exists()
                    .col(uuid(Membership::Id).primary_key())
                    .col(uuid(Membership::ClinicId).not_null())
                    .col(uuid_null(Membership::PatientId))
                    .col(string_len(Membership::Name, 128).not_null())
                    .col(string_len(Membership::Phone, 32).not_null())
                    .col(string_len(Membership::PackageName, 120).not_null())
                    .col(double(Membership::PackageAmount).not_null())
                    .col(date(Membership::StartDate).not_null())
                    .col(date(Membership::EndDate).not_null())
                    .col(json_binary(Membership::Treatments).not_null())
                    .col(double(Membership::TotalConsumed).not_null())
                    .col(double(Membership::Remaining).not_null())
                    .col(string_len(Membership::Status, 16).not_null())
                    .col(timestamp_with_time_zone(Membership::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Membership::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_membership_clinic")
                            .from(Membership::Table, Membership::ClinicId)
                            .to(Clinic::Table, Clinic::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Membership::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Membership {
    Table,
    Id,
    ClinicId,
    PatientId,
    Name,
    Phone,
    PackageName,
    PackageAmount,
    StartDate,
    EndDate,
    Treatments,
    TotalConsumed,
    Remaining,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Clinic { Table, Id }
