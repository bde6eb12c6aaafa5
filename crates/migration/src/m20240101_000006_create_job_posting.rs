//! Create `job_posting` table with FK to `clinic`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(JobPosting::Table)
                    .if_not_exists()
                    .col(uuid(JobPosting::Id).primary_key())
                    .col(uuid(JobPosting::ClinicId).not_null())
                    .col(uuid(JobPosting::PostedBy).not_null())
                    .col(string_len(JobPosting::Title, 160).not_null())
                    .col(string_len_null(JobPosting::Department, 80))
                    .col(string_len(JobPosting::JobType, 16).not_null())
                    .col(string_len(JobPosting::Location, 160).not_null())
                    .col(double_null(JobPosting::SalaryMin))
                    .col(double_null(JobPosting::SalaryMax))
                    .col(text(JobPosting::Description).not_null())
                    .col(json_binary(JobPosting::Requirements).not_null())
                    .col(string_len(JobPosting::Status, 16).not_null())
                    .col(timestamp_with_time_zone(JobPosting::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(JobPosting::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_job_posting_clinic")
                            .from(JobPosting::Table, JobPosting::ClinicId)
                            .to(Clinic::Table, Clinic::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(JobPosting::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum JobPosting {
    Table,
    Id,
    ClinicId,
    PostedBy,
    Title,
    Department,
    JobType,
    Location,
    SalaryMin,
    SalaryMax,
    Description,
    Requirements,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Clinic { Table, Id }
