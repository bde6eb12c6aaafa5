//! Create `lead` table with FK to `clinic`.
//!
//! Follow-up notes are embedded as jsonb.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Lead::Table)
                    .if_not_exists()
                    .col(uuid(Lead::Id).primary_key())
                    .col(uuid(Lead::ClinicId).not_null())
                    .col(string_len(Lead::Name, 128).not_null())
                    .col(string_len(Lead::Phone, 32).not_null())
                    .col(string_len_null(Lead::Email, 255))
                    .col(string_len(Lead::Source, 16).not_null())
                    .col(string_len_null(Lead::Treatment, 120))
                    .col(string_len(Lead::Status, 16).not_null())
                    .col(uuid_null(Lead::AssignedTo))
                    .col(json_binary(Lead::FollowUps).not_null())
                    .col(text_null(Lead::Notes))
                    .col(uuid(Lead::CreatedBy).not_null())
                    .col(timestamp_with_time_zone(Lead::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Lead::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lead_clinic")
                            .from(Lead::Table, Lead::ClinicId)
                            .to(Clinic::Table, Clinic::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Lead::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Lead {
    Table,
    Id,
    ClinicId,
    Name,
    Phone,
    Email,
    Source,
    Treatment,
    Status,
    AssignedTo,
    FollowUps,
    Notes,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Clinic { Table, Id }
