//! Create api_key_usage table migration

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ApiKeyUsage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApiKeyUsage::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ApiKeyUsage::KeyHash).string_len(64).not_null())
                    .col(
                        ColumnDef::new(ApiKeyUsage::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ApiKeyUsage::Endpoint).string_len(255).not_null())
                    .to_owned(),
            )
            .await?;

        // Cost lookups count by key
        manager
            .create_index(
                Index::create()
                    .name("idx_api_key_usage_key_hash")
                    .table(ApiKeyUsage::Table)
                    .col(ApiKeyUsage::KeyHash)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ApiKeyUsage::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ApiKeyUsage {
    Table,
    Id,
    KeyHash,
    RecordedAt,
    Endpoint,
}
