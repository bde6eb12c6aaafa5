//! Create `blog` table.
//!
//! Comments, replies and likes are embedded as jsonb.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Blog::Table)
                    .if_not_exists()
                    .col(uuid(Blog::Id).primary_key())
                    .col(uuid(Blog::AuthorId).not_null())
                    .col(uuid_null(Blog::ClinicId))
                    .col(string_len(Blog::Title, 200).not_null())
                    .col(string_len(Blog::Slug, 220).unique_key().not_null())
                    .col(text(Blog::Content).not_null())
                    .col(json_binary(Blog::Tags).not_null())
                    .col(string_len_null(Blog::CoverImage, 512))
                    .col(string_len(Blog::Status, 16).not_null())
                    .col(json_binary(Blog::Likes).not_null())
                    .col(json_binary(Blog::Comments).not_null())
                    .col(timestamp_with_time_zone_null(Blog::PublishedAt))
                    .col(timestamp_with_time_zone(Blog::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Blog::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_blog_author")
                            .from(Blog::Table, Blog::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Blog::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Blog {
    Table,
    Id,
    AuthorId,
    ClinicId,
    Title,
    Slug,
    Content,
    Tags,
    CoverImage,
    Status,
    Likes,
    Comments,
    PublishedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User { Table, Id }
