//! Command payloads for the engine's mutating operations.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{contributions::ContributionSource, expenses::ExpenseCategory};

/// Posts a contribution against a contributor.
#[derive(Clone, Debug)]
pub struct NewContribution {
    pub contributor_id: Uuid,
    pub amount_minor: i64,
    pub source: ContributionSource,
    pub sms_content: Option<String>,
    pub sms_sender: Option<String>,
    pub transaction_ref: Option<String>,
    pub notes: Option<String>,
    pub date: DateTime<Utc>,
}

/// Records an expense. Starts unapproved.
#[derive(Clone, Debug)]
pub struct NewExpense {
    pub amount_minor: i64,
    pub category: ExpenseCategory,
    pub description: Option<String>,
    pub sms_content: Option<String>,
    pub sms_sender: Option<String>,
    pub notes: Option<String>,
    pub date: DateTime<Utc>,
}

/// Binds a pending message to the ledger.
///
/// `contributor_id` is required when the message classified as RECEIVED
/// (the posting is a contribution) and ignored for SENT (an expense).
/// `amount_override_minor` replaces the amount re-derived from the stored
/// message content, e.g. when the user corrected it.
#[derive(Clone, Debug)]
pub struct ReconcileSms {
    pub message_id: Uuid,
    pub contributor_id: Option<Uuid>,
    pub amount_override_minor: Option<i64>,
    pub category: Option<ExpenseCategory>,
    pub notes: Option<String>,
    pub now: DateTime<Utc>,
}

/// What a reconciliation produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Posting {
    Contribution(Uuid),
    Expense(Uuid),
}
