//! Initial schema migration - creates all tables from scratch.
//!
//! - `users`: accounts and argon2 password hashes
//! - `categories`: per-user asset categories
//! - `locations`: per-user places an asset can be in
//! - `assets`: inventory items, soft-deleted through `status`
//! - `history_logs`: append-only audit trail of asset mutations

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    PasswordHash,
    DisplayName,
}

#[derive(Iden)]
enum Categories {
    Table,
    Id,
    UserId,
    Name,
    NameNorm,
    CreatedAt,
}

#[derive(Iden)]
enum Locations {
    Table,
    Id,
    UserId,
    Name,
    NameNorm,
    CreatedAt,
}

#[derive(Iden)]
enum Assets {
    Table,
    Id,
    UserId,
    Name,
    CodeId,
    CategoryId,
    City,
    ValueMinor,
    Observation,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum HistoryLogs {
    Table,
    Id,
    AssetId,
    AssetName,
    CodeId,
    Action,
    Details,
    UserId,
    UserDisplayName,
    Timestamp,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::DisplayName).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Categories
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::UserId).string().not_null())
                    .col(ColumnDef::new(Categories::Name).string().not_null())
                    .col(ColumnDef::new(Categories::NameNorm).string().not_null())
                    .col(
                        ColumnDef::new(Categories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-categories-user_id")
                            .from(Categories::Table, Categories::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-categories-user_id-name_norm-unique")
                    .table(Categories::Table)
                    .col(Categories::UserId)
                    .col(Categories::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Locations
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Locations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Locations::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Locations::UserId).string().not_null())
                    .col(ColumnDef::new(Locations::Name).string().not_null())
                    .col(ColumnDef::new(Locations::NameNorm).string().not_null())
                    .col(
                        ColumnDef::new(Locations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-locations-user_id")
                            .from(Locations::Table, Locations::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-locations-user_id-name_norm-unique")
                    .table(Locations::Table)
                    .col(Locations::UserId)
                    .col(Locations::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Assets
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Assets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Assets::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Assets::UserId).string().not_null())
                    .col(ColumnDef::new(Assets::Name).string().not_null())
                    .col(ColumnDef::new(Assets::CodeId).string().not_null())
                    .col(ColumnDef::new(Assets::CategoryId).string().not_null())
                    .col(
                        ColumnDef::new(Assets::City)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Assets::ValueMinor).big_integer().not_null())
                    .col(ColumnDef::new(Assets::Observation).string())
                    .col(
                        ColumnDef::new(Assets::Status)
                            .string()
                            .not_null()
                            .default("ativo"),
                    )
                    .col(
                        ColumnDef::new(Assets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Assets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-assets-user_id")
                            .from(Assets::Table, Assets::UserId)
                            .to(Users::Table, Users::Username),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-assets-category_id")
                            .from(Assets::Table, Assets::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-assets-user_id-status")
                    .table(Assets::Table)
                    .col(Assets::UserId)
                    .col(Assets::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-assets-category_id")
                    .table(Assets::Table)
                    .col(Assets::CategoryId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. History logs
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(HistoryLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(HistoryLogs::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(HistoryLogs::AssetId).string().not_null())
                    .col(ColumnDef::new(HistoryLogs::AssetName).string().not_null())
                    .col(ColumnDef::new(HistoryLogs::CodeId).string().not_null())
                    .col(ColumnDef::new(HistoryLogs::Action).string().not_null())
                    .col(ColumnDef::new(HistoryLogs::Details).string().not_null())
                    .col(ColumnDef::new(HistoryLogs::UserId).string().not_null())
                    .col(
                        ColumnDef::new(HistoryLogs::UserDisplayName)
                            .string()
                            .not_null(),
                    )
                    // NULL until the write is materialized; read back as pending.
                    .col(ColumnDef::new(HistoryLogs::Timestamp).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-history_logs-asset_id")
                            .from(HistoryLogs::Table, HistoryLogs::AssetId)
                            .to(Assets::Table, Assets::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-history_logs-user_id")
                    .table(HistoryLogs::Table)
                    .col(HistoryLogs::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-history_logs-asset_id")
                    .table(HistoryLogs::Table)
                    .col(HistoryLogs::AssetId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting foreign keys)
        manager
            .drop_table(Table::drop().table(HistoryLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Assets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Locations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}
