//! Create `offer` table with FK to `clinic`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Offer::Table)
                    .if_not_exists()
                    .col(uuid(Offer::Id).primary_key())
                    .col(uuid(Offer::ClinicId).not_null())
                    .col(string_len(Offer::Title, 160).not_null())
                    .col(text_null(Offer::Description))
                    .col(string_len(Offer::DiscountType, 16).not_null())
                    .col(double(Offer::DiscountValue).not_null())
                    .col(json_binary(Offer::Treatments).not_null())
                    .col(timestamp_with_time_zone(Offer::StartsAt).not_null())
                    .col(timestamp_with_time_zone(Offer::EndsAt).not_null())
                    .col(string_len(Offer::Status, 16).not_null())
                    .col(timestamp_with_time_zone(Offer::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Offer::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_offer_clinic")
                            .from(Offer::Table, Offer::ClinicId)
                            .to(Clinic::Table, Clinic::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Offer::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Offer {
    Table,
    Id,
    ClinicId,
    Title,
    Description,
    DiscountType,
    DiscountValue,
    Treatments,
    StartsAt,
    EndsAt,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Clinic { Table, Id }
