//! Create `treatment` table.
//!
//! `clinic_id` NULL marks the global catalogue; sub-categories are jsonb.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Treatment::Table)
                    .if_not_exists()
                    .col(uuid(Treatment::Id).primary_key())
                    .col(uuid_null(Treatment::ClinicId))
                    .col(string_len(Treatment::Name, 120).not_null())
                    .col(string_len(Treatment::Slug, 140).not_null())
                    .col(text_null(Treatment::Description))
                    .col(json_binary(Treatment::SubCategories).not_null())
                    .col(timestamp_with_time_zone(Treatment::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Treatment::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_treatment_clinic")
                            .from(Treatment::Table, Treatment::ClinicId)
                            .to(Clinic::Table, Clinic::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Treatment::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Treatment { Table, Id, ClinicId, Name, Slug, Description, SubCategories, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum Clinic { Table, Id }
