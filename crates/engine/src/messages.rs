//! Pending-message primitives.
//!
//! An `InboundMessage` is a financial-looking SMS persisted by intake and
//! waiting for manual reconciliation. It is created unprocessed and becomes
//! processed exactly once: either reconciled against a contributor, or
//! dismissed.

use std::fmt;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    sms::{Direction, Network},
};

/// Classifier outcome stored with a pending message, e.g.
/// `MTN_MOBILE_MONEY_RECEIVED`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageKind {
    pub network: Network,
    pub direction: Direction,
}

impl MessageKind {
    pub const fn new(network: Network, direction: Direction) -> Self {
        Self { network, direction }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.network.as_str(), self.direction.as_str())
    }
}

impl TryFrom<&str> for MessageKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "MTN_MOBILE_MONEY_RECEIVED" => {
                Ok(Self::new(Network::MtnMobileMoney, Direction::Received))
            }
            "MTN_MOBILE_MONEY_SENT" => Ok(Self::new(Network::MtnMobileMoney, Direction::Sent)),
            "BANK_RECEIVED" => Ok(Self::new(Network::Bank, Direction::Received)),
            "BANK_SENT" => Ok(Self::new(Network::Bank, Direction::Sent)),
            other => Err(EngineError::Validation(format!(
                "invalid message kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: Uuid,
    pub sender: String,
    pub content: String,
    pub date: DateTime<Utc>,
    pub kind: MessageKind,
    pub processed: bool,
    pub matched_contributor_id: Option<Uuid>,
    /// Stable hash of (sender, content, date); intake refuses to store the
    /// same underlying message twice.
    pub dedup_key: String,
    pub created_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(
        sender: String,
        content: String,
        date: DateTime<Utc>,
        kind: MessageKind,
        created_at: DateTime<Utc>,
    ) -> Self {
        let dedup_key = dedup_key(&sender, &content, date);
        Self {
            id: Uuid::new_v4(),
            sender,
            content,
            date,
            kind,
            processed: false,
            matched_contributor_id: None,
            dedup_key,
            created_at,
        }
    }
}

/// Stable identity of an inbox message across intake runs.
pub fn dedup_key(sender: &str, content: &str, date: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sender.as_bytes());
    hasher.update([0u8]);
    hasher.update(content.as_bytes());
    hasher.update([0u8]);
    hasher.update(date.timestamp_millis().to_be_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sms_messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub sender: String,
    pub content: String,
    pub date: DateTimeUtc,
    pub kind: String,
    pub processed: bool,
    pub matched_contributor_id: Option<String>,
    pub dedup_key: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::contributors::Entity",
        from = "Column::MatchedContributorId",
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

impl From<&InboundMessage> for ActiveModel {
    fn from(message: &InboundMessage) -> Self {
        Self {
            id: ActiveValue::Set(message.id.to_string()),
            sender: ActiveValue::Set(message.sender.clone()),
            content: ActiveValue::Set(message.content.clone()),
            date: ActiveValue::Set(message.date),
            kind: ActiveValue::Set(message.kind.to_string()),
            processed: ActiveValue::Set(message.processed),
            matched_contributor_id: ActiveValue::Set(
                message.matched_contributor_id.map(|id| id.to_string()),
            ),
            dedup_key: ActiveValue::Set(message.dedup_key.clone()),
            created_at: ActiveValue::Set(message.created_at),
        }
    }
}

impl TryFrom<Model> for InboundMessage {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("pending message".to_string()))?,
            sender: model.sender,
            content: model.content,
            date: model.date,
            kind: MessageKind::try_from(model.kind.as_str())?,
            processed: model.processed,
            matched_contributor_id: model
                .matched_contributor_id
                .and_then(|s| Uuid::parse_str(&s).ok()),
            dedup_key: model.dedup_key,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips() {
        for raw in [
            "MTN_MOBILE_MONEY_RECEIVED",
            "MTN_MOBILE_MONEY_SENT",
            "BANK_RECEIVED",
            "BANK_SENT",
        ] {
            assert_eq!(MessageKind::try_from(raw).unwrap().to_string(), raw);
        }
        assert!(MessageKind::try_from("AIRTEL_RECEIVED").is_err());
    }

    #[test]
    fn dedup_key_is_stable_and_content_sensitive() {
        let date = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let a = dedup_key("MTN", "Received 5,000 RWF from John", date);
        let b = dedup_key("MTN", "Received 5,000 RWF from John", date);
        let c = dedup_key("MTN", "Received 6,000 RWF from John", date);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
