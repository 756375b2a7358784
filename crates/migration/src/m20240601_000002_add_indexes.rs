//! Owner lookup index for `list(owner_id)`.
use sea_orm_migration::prelude::*;

use crate::m20240601_000001_create_services::Services;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_services_owner_id")
                    .table(Services::Table)
                    .col(Services::OwnerId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_services_owner_id").table(Services::Table).to_owned())
            .await
    }
}
