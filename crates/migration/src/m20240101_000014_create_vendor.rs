//! Create `vendor` table with FK to `clinic`; names are unique per clinic.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vendor::Table)
                    .if_not_exists()
                    .col(uuid(Vendor::Id).primary_key())
                    .col(uuid(Vendor::ClinicId).not_null())
                    .col(string_len(Vendor::Name, 160).not_null())
                    .col(string_len_null(Vendor::ContactPerson, 128))
                    .col(string_len(Vendor::Phone, 32).not_null())
                    .col(string_len_null(Vendor::Email, 255))
                    .col(text_null(Vendor::Address))
                    .col(json_binary(Vendor::Services).not_null())
                    .col(string_len_null(Vendor::GstNumber, 32))
                    .col(timestamp_with_time_zone(Vendor::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Vendor::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vendor_clinic")
                            .from(Vendor::Table, Vendor::ClinicId)
                            .to(Clinic::Table, Clinic::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uniq_vendor_clinic_name")
                    .table(Vendor::Table)
                    .col(Vendor::ClinicId)
                    .col(Vendor::Name)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Vendor::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Vendor {
    Table,
    Id,
    ClinicId,
    Name,
    ContactPerson,
    Phone,
    Email,
    Address,
    Services,
    GstNumber,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Clinic { Table, Id }
