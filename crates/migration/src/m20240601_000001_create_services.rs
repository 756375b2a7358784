//! Create `services` table.
//!
//! One row per saved service: `(service_id, owner_id, payload)`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Services::Table)
                    .if_not_exists()
                    .col(string(Services::ServiceId).primary_key())
                    .col(string(Services::OwnerId).not_null())
                    .col(json(Services::Payload).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Services::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Services {
    Table,
    ServiceId,
    OwnerId,
    Payload,
}
