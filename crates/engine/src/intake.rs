//! SMS intake: turns an inbox snapshot into pending ledger candidates.
//!
//! The inbox itself is a collaborator behind [`InboxProvider`]; the engine
//! never writes to it. Intake filters a bounded batch by recency, classifies
//! each message, and persists the financial ones as unprocessed
//! [`InboundMessage`](crate::messages::InboundMessage) rows for later
//! reconciliation.

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter};
use thiserror::Error;

use crate::{
    Engine, EngineError, ResultEngine,
    messages::{self, InboundMessage, MessageKind},
    sms,
};

/// How many inbox messages a single intake run will look at.
pub const INBOX_FETCH_LIMIT: usize = 200;

/// A raw message as handed over by the inbox collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawSmsMessage {
    pub sender: String,
    pub body: String,
    pub timestamp_millis: i64,
}

/// Errors an inbox collaborator can surface.
#[derive(Error, Debug)]
pub enum InboxError {
    /// Access to the message store was refused. Intake performs no partial
    /// work in this case; the caller should ask the user to grant access.
    #[error("inbox access denied: {0}")]
    PermissionDenied(String),
    #[error("inbox unavailable: {0}")]
    Unavailable(String),
}

impl From<InboxError> for EngineError {
    fn from(err: InboxError) -> Self {
        match err {
            InboxError::PermissionDenied(reason) => EngineError::PermissionDenied(reason),
            InboxError::Unavailable(reason) => EngineError::Inbox(reason),
        }
    }
}

/// Read access to a historical SMS inbox snapshot.
pub trait InboxProvider {
    /// Lists up to `max_count` inbox messages. Order is not significant;
    /// intake applies its own recency cutoff.
    fn list_inbox(
        &self,
        max_count: usize,
    ) -> impl Future<Output = Result<Vec<RawSmsMessage>, InboxError>> + Send;
}

/// What an intake run did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntakeReport {
    /// Messages persisted as new pending records.
    pub processed: usize,
    /// Messages skipped because an earlier run already stored them.
    pub duplicates: usize,
}

impl Engine {
    /// Scans the inbox for recent financial messages and persists them as
    /// pending records.
    ///
    /// Only messages dated within the last `window_days` before `now` are
    /// eligible. Non-financial messages are filtered out, not errors.
    /// Financial messages whose amount cannot be extracted are dropped as
    /// well (logged at debug level). Re-running over an overlapping window
    /// is idempotent: the stable dedup key prevents duplicate rows.
    ///
    /// Two intake runs against the same store are serialized through an
    /// internal lock; callers may fire this concurrently without corrupting
    /// counts.
    pub async fn sync_recent_sms<P: InboxProvider>(
        &self,
        provider: &P,
        window_days: u32,
        now: DateTime<Utc>,
    ) -> ResultEngine<IntakeReport> {
        let _serial = self.intake_lock.lock().await;

        let batch = provider.list_inbox(INBOX_FETCH_LIMIT).await?;
        let cutoff = now - Duration::days(i64::from(window_days));

        let mut report = IntakeReport::default();
        for raw in batch {
            let Some(date) = DateTime::from_timestamp_millis(raw.timestamp_millis) else {
                tracing::debug!(sender = %raw.sender, "skipping message with invalid timestamp");
                continue;
            };
            if date < cutoff {
                continue;
            }

            let classification = sms::classify(&raw.sender, &raw.body);
            let (Some(network), Some(direction)) =
                (classification.network, classification.direction)
            else {
                continue;
            };

            // Messages with no extractable amount are dropped, matching the
            // historical behavior; reconciliation re-derives the amount from
            // the stored content anyway.
            let Some(amount) = sms::extract_amount(&raw.body).filter(|a| a.is_positive()) else {
                tracing::debug!(sender = %raw.sender, "financial message without amount dropped");
                continue;
            };

            let message = InboundMessage::new(
                raw.sender,
                raw.body,
                date,
                MessageKind::new(network, direction),
                now,
            );

            let already_known = messages::Entity::find()
                .filter(messages::Column::DedupKey.eq(message.dedup_key.clone()))
                .one(&self.database)
                .await?
                .is_some();
            if already_known {
                report.duplicates += 1;
                continue;
            }

            messages::ActiveModel::from(&message).insert(&self.database).await?;
            tracing::debug!(
                kind = %message.kind,
                %amount,
                "stored pending message"
            );
            report.processed += 1;
        }

        tracing::info!(
            processed = report.processed,
            duplicates = report.duplicates,
            window_days,
            "sms intake finished"
        );
        Ok(report)
    }
}
