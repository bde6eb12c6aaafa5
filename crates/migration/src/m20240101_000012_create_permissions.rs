//! Create `clinic_permission` and `agent_permission` tables.
//!
//! Both hold a module → sub-module → action grid as jsonb. Clinic grids are keyed by
//! `(clinic_id, role)`, agent grids by `agent_id`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ClinicPermission::Table)
                    .if_not_exists()
                    .col(uuid(ClinicPermission::Id).primary_key())
                    .col(uuid(ClinicPermission::ClinicId).not_null())
                    .col(string_len(ClinicPermission::Role, 16).not_null())
                    .col(json_binary(ClinicPermission::Permissions).not_null())
                    .col(uuid(ClinicPermission::UpdatedBy).not_null())
                    .col(timestamp_with_time_zone(ClinicPermission::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(ClinicPermission::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_clinic_permission_clinic")
                            .from(ClinicPermission::Table, ClinicPermission::ClinicId)
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
                    .name("uniq_clinic_permission_clinic_role")
                    .table(ClinicPermission::Table)
                    .col(ClinicPermission::ClinicId)
                    .col(ClinicPermission::Role)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AgentPermission::Table)
                    .if_not_exists()
                    .col(uuid(AgentPermission::Id).primary_key())
                    .col(uuid(AgentPermission::ClinicId).not_null())
                    .col(uuid(AgentPermission::AgentId).unique_key().not_null())
                    .col(json_binary(AgentPermission::Permissions).not_null())
                    .col(uuid(AgentPermission::UpdatedBy).not_null())
                    .col(timestamp_with_time_zone(AgentPermission::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(AgentPermission::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_agent_permission_clinic")
                            .from(AgentPermission::Table, AgentPermission::ClinicId)
                            .to(Clinic::Table, Clinic::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_agent_permission_agent")
                            .from(AgentPermission::Table, AgentPermission::AgentId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(AgentPermission::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(ClinicPermission::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ClinicPermission { Table, Id, ClinicId, Role, Permissions, UpdatedBy, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum AgentPermission { Table, Id, ClinicId, AgentId, Permissions, UpdatedBy, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum Clinic { Table, Id }

#[derive(DeriveIden)]
enum User { Table, Id }
