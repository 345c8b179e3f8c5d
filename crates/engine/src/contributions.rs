//! Contribution primitives.
//!
//! A `Contribution` is an incoming payment credited to a contributor and to
//! the aggregate balance. Rows are immutable once posted; corrections are a
//! new posting, never an edit.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, sms::Network};

/// Where a contribution came from.
///
/// `Manual` is a hand-entered posting; the other variants are derived from
/// SMS classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContributionSource {
    Manual,
    Bank,
    MtnMobileMoney,
}

impl ContributionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "MANUAL",
            Self::Bank => "BANK",
            Self::MtnMobileMoney => "MTN_MOBILE_MONEY",
        }
    }
}

impl TryFrom<&str> for ContributionSource {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "MANUAL" => Ok(Self::Manual),
            "BANK" => Ok(Self::Bank),
            "MTN_MOBILE_MONEY" => Ok(Self::MtnMobileMoney),
            other => Err(EngineError::Validation(format!(
                "invalid contribution source: {other}"
            ))),
        }
    }
}

impl From<Network> for ContributionSource {
    fn from(network: Network) -> Self {
        match network {
            Network::MtnMobileMoney => Self::MtnMobileMoney,
            Network::Bank => Self::Bank,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub id: Uuid,
    /// `None` until the posting has been matched to a contributor.
    pub contributor_id: Option<Uuid>,
    pub amount_minor: i64,
    pub source: ContributionSource,
    pub sms_content: Option<String>,
    pub sms_sender: Option<String>,
    pub transaction_ref: Option<String>,
    pub date: DateTime<Utc>,
    pub synced_to_sheets: bool,
    pub notes: Option<String>,
}

impl Contribution {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        contributor_id: Option<Uuid>,
        amount_minor: i64,
        source: ContributionSource,
        sms_content: Option<String>,
        sms_sender: Option<String>,
        transaction_ref: Option<String>,
        notes: Option<String>,
        date: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::Validation(
                "amount_minor must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            contributor_id,
            amount_minor,
            source,
            sms_content,
            sms_sender,
            transaction_ref,
            date,
            synced_to_sheets: false,
            notes,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "contributions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub contributor_id: Option<String>,
    pub amount_minor: i64,
    pub source: String,
    pub sms_content: Option<String>,
    pub sms_sender: Option<String>,
    pub transaction_ref: Option<String>,
    pub date: DateTimeUtc,
    pub synced_to_sheets: bool,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::contributors::Entity",
        from = "Column::ContributorId",
        to = "super::contributors::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Contributors,
}

impl Related<super::contributors::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contributors.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Contribution> for ActiveModel {
    fn from(contribution: &Contribution) -> Self {
        Self {
            id: ActiveValue::Set(contribution.id.to_string()),
            contributor_id: ActiveValue::Set(
                contribution.contributor_id.map(|id| id.to_string()),
            ),
            amount_minor: ActiveValue::Set(contribution.amount_minor),
            source: ActiveValue::Set(contribution.source.as_str().to_string()),
            sms_content: ActiveValue::Set(contribution.sms_content.clone()),
            sms_sender: ActiveValue::Set(contribution.sms_sender.clone()),
            transaction_ref: ActiveValue::Set(contribution.transaction_ref.clone()),
            date: ActiveValue::Set(contribution.date),
            synced_to_sheets: ActiveValue::Set(contribution.synced_to_sheets),
            notes: ActiveValue::Set(contribution.notes.clone()),
        }
    }
}

impl TryFrom<Model> for Contribution {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("contribution".to_string()))?,
            contributor_id: model
                .contributor_id
                .and_then(|s| Uuid::parse_str(&s).ok()),
            amount_minor: model.amount_minor,
            source: ContributionSource::try_from(model.source.as_str())?,
            sms_content: model.sms_content,
            sms_sender: model.sms_sender,
            transaction_ref: model.transaction_ref,
            date: model.date,
            synced_to_sheets: model.synced_to_sheets,
            notes: model.notes,
        })
    }
}
