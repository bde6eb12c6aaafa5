//! Create `get_in_touch` table for public contact requests.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GetInTouch::Table)
                    .if_not_exists()
                    .col(uuid(GetInTouch::Id).primary_key())
                    .col(string_len(GetInTouch::Name, 128).not_null())
                    .col(string_len(GetInTouch::Email, 255).not_null())
                    .col(string_len_null(GetInTouch::Phone, 32))
                    .col(string_len_null(GetInTouch::Subject, 200))
                    .col(text(GetInTouch::Message).not_null())
                    .col(string_len(GetInTouch::Status, 16).not_null())
                    .col(timestamp_with_time_zone(GetInTouch::CreatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(GetInTouch::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum GetInTouch { Table, Id, Name, Email, Phone, Subject, Message, Status, CreatedAt }
