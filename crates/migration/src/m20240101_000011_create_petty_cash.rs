//! Create `petty_cash` table: one cash float per staff member per clinic.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PettyCash::Table)
                    .if_not_exists()
                    .col(uuid(PettyCash::Id).primary_key())
                    .col(uuid(PettyCash::ClinicId).not_null())
                    .col(uuid(PettyCash::StaffId).not_null())
                    .col(string_len(PettyCash::StaffName, 128).not_null())
                    .col(json_binary(PettyCash::Allocations).not_null())
                    .col(json_binary(PettyCash::Expenses).not_null())
                    .col(double(PettyCash::TotalAllocated).not_null())
                    .col(double(PettyCash::TotalSpent).not_null())
                    .col(double(PettyCash::TotalAmount).not_null())
                    .col(timestamp_with_time_zone(PettyCash::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(PettyCash::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_petty_cash_clinic")
                            .from(PettyCash::Table, PettyCash::ClinicId)
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
                    .name("uniq_petty_cash_clinic_staff")
                    .table(PettyCash::Table)
                    .col(PettyCash::ClinicId)
                    .col(PettyCash::StaffId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(PettyCash::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum PettyCash {
    Table,
    Id,
    ClinicId,
    StaffId,
    StaffName,
    Allocations,
    Expenses,
    TotalAllocated,
    TotalSpent,
    TotalAmount,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Clinic { Table, Id }
