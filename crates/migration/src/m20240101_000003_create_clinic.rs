//! Create `clinic` table with FK to its owning `user`.
//!
//! Root of the clinic tenancy; most other tables reference it.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Clinic::Table)
                    .if_not_exists()
                    .col(uuid(Clinic::Id).primary_key())
                    .col(uuid(Clinic::OwnerId).unique_key().not_null())
                    .col(string_len(Clinic::Name, 160).not_null())
                    .col(string_len(Clinic::Slug, 180).unique_key().not_null())
                    .col(text(Clinic::Address).not_null())
                    .col(string_len(Clinic::City, 80).not_null())
                    .col(string_len(Clinic::Phone, 32).not_null())
                    .col(string_len_null(Clinic::Email, 255))
                    .col(double_null(Clinic::Latitude))
                    .col(double_null(Clinic::Longitude))
                    .col(json_binary(Clinic::Treatments).not_null())
                    .col(string_len_null(Clinic::Timings, 255))
                    .col(json_binary(Clinic::Photos).not_null())
                    .col(boolean(Clinic::Approved).not_null().default(false))
                    .col(timestamp_with_time_zone(Clinic::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Clinic::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_clinic_owner")
                            .from(Clinic::Table, Clinic::OwnerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Clinic::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Clinic {
    Table,
    Id,
    OwnerId,
    Name,
    Slug,
    Address,
    City,
    Phone,
    Email,
    Latitude,
    Longitude,
    Treatments,
    Timings,
    Photos,
    Approved,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User { Table, Id }
