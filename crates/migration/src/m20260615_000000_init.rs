//! Initial schema migration - creates all tables from scratch.
//!
//! - `contributors`: group members with running balances
//! - `contributions`: posted incoming payments
//! - `expenses`: outgoing payments, counted once approved
//! - `sms_messages`: pending inbox notifications awaiting reconciliation
//! - `settings`: flat key/value feature toggles and integration state

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Contributors {
    Table,
    Id,
    Name,
    Phone,
    Email,
    BalanceMinor,
    TotalContributedMinor,
    TotalOwedMinor,
    Active,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Contributions {
    Table,
    Id,
    ContributorId,
    AmountMinor,
    Source,
    SmsContent,
    SmsSender,
    TransactionRef,
    Date,
    SyncedToSheets,
    Notes,
}

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    AmountMinor,
    Category,
    Description,
    SmsContent,
    SmsSender,
    Date,
    Approved,
    SyncedToSheets,
    Notes,
}

#[derive(Iden)]
enum SmsMessages {
    Table,
    Id,
    Sender,
    Content,
    Date,
    Kind,
    Processed,
    MatchedContributorId,
    DedupKey,
    CreatedAt,
}

#[derive(Iden)]
enum Settings {
    Table,
    Key,
    Value,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Contributors
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Contributors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Contributors::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Contributors::Name).string().not_null())
                    .col(ColumnDef::new(Contributors::Phone).string())
                    .col(ColumnDef::new(Contributors::Email).string())
                    .col(
                        ColumnDef::new(Contributors::BalanceMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Contributors::TotalContributedMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Contributors::TotalOwedMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Contributors::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Contributors::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Contributors::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Contributions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Contributions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Contributions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Contributions::ContributorId).string())
                    .col(
                        ColumnDef::new(Contributions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Contributions::Source).string().not_null())
                    .col(ColumnDef::new(Contributions::SmsContent).string())
                    .col(ColumnDef::new(Contributions::SmsSender).string())
                    .col(ColumnDef::new(Contributions::TransactionRef).string())
                    .col(ColumnDef::new(Contributions::Date).timestamp().not_null())
                    .col(
                        ColumnDef::new(Contributions::SyncedToSheets)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Contributions::Notes).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-contributions-contributor_id")
                            .from(Contributions::Table, Contributions::ContributorId)
                            .to(Contributors::Table, Contributors::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-contributions-date")
                    .table(Contributions::Table)
                    .col(Contributions::Date)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Expenses
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Expenses::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Expenses::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Expenses::Category).string().not_null())
                    .col(ColumnDef::new(Expenses::Description).string())
                    .col(ColumnDef::new(Expenses::SmsContent).string())
                    .col(ColumnDef::new(Expenses::SmsSender).string())
                    .col(ColumnDef::new(Expenses::Date).timestamp().not_null())
                    .col(
                        ColumnDef::new(Expenses::Approved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Expenses::SyncedToSheets)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Expenses::Notes).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-date")
                    .table(Expenses::Table)
                    .col(Expenses::Date)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. SMS messages
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SmsMessages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SmsMessages::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SmsMessages::Sender).string().not_null())
                    .col(ColumnDef::new(SmsMessages::Content).string().not_null())
                    .col(ColumnDef::new(SmsMessages::Date).timestamp().not_null())
                    .col(ColumnDef::new(SmsMessages::Kind).string().not_null())
                    .col(
                        ColumnDef::new(SmsMessages::Processed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(SmsMessages::MatchedContributorId).string())
                    .col(ColumnDef::new(SmsMessages::DedupKey).string().not_null())
                    .col(
                        ColumnDef::new(SmsMessages::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sms_messages-matched_contributor_id")
                            .from(SmsMessages::Table, SmsMessages::MatchedContributorId)
                            .to(Contributors::Table, Contributors::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-sms_messages-processed")
                    .table(SmsMessages::Table)
                    .col(SmsMessages::Processed)
                    .to_owned(),
            )
            .await?;

        // Intake idempotence: one row per underlying inbox message.
        manager
            .create_index(
                Index::create()
                    .name("uidx-sms_messages-dedup_key")
                    .table(SmsMessages::Table)
                    .col(SmsMessages::DedupKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Settings
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Settings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Settings::Key)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Settings::Value).string().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(Settings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SmsMessages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Contributions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Contributors::Table).to_owned())
            .await?;
        Ok(())
    }
}
