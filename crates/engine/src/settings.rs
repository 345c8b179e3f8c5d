//! Flat key→value settings store, for feature toggles and
//! external-integration state.

use sea_orm::entity::prelude::*;

/// Keys the rest of the system relies on.
pub mod keys {
    /// `"true"` when new postings should be pushed to the spreadsheet
    /// automatically.
    pub const AUTO_SYNC: &str = "auto_sync";
    /// Id of the spreadsheet the ledger exports to.
    pub const SPREADSHEET_ID: &str = "spreadsheet_id";
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    pub value: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
