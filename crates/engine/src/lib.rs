//! Core ledger engine: contributors, contributions, expenses, pending SMS
//! records and the reconciliation workflow that ties them together.
//!
//! The engine exclusively owns entity mutation. Every multi-statement
//! mutation (posting a contribution and bumping the contributor's balance,
//! reconciling a message and marking it processed) runs inside one database
//! transaction, so partial state is never observable.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseConnection, DatabaseTransaction, QueryFilter,
    QueryOrder, QuerySelect, Statement, TransactionTrait, prelude::*, sea_query::OnConflict,
};
use uuid::Uuid;

pub use commands::{NewContribution, NewExpense, Posting, ReconcileSms};
pub use contributions::{Contribution, ContributionSource};
pub use contributors::Contributor;
pub use error::EngineError;
pub use expenses::{Expense, ExpenseCategory};
pub use intake::{INBOX_FETCH_LIMIT, InboxError, InboxProvider, IntakeReport, RawSmsMessage};
pub use messages::{InboundMessage, MessageKind};
pub use money::Money;

mod commands;
mod contributions;
mod contributors;
mod error;
mod expenses;
mod intake;
mod messages;
mod money;
pub mod settings;
pub mod sms;

type ResultEngine<T> = Result<T, EngineError>;

/// Aggregate view of the ledger, computed from a single storage snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_contributions: Money,
    pub total_approved_expenses: Money,
    pub pending_expenses: Money,
    pub active_contributors: u64,
    pub current_balance: Money,
}

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    /// Serializes intake runs; see `Engine::sync_recent_sms`.
    intake_lock: tokio::sync::Mutex<()>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    // ── Contributors ────────────────────────────────────────────────────

    /// Registers a new contributor.
    pub async fn add_contributor(
        &self,
        name: &str,
        phone: Option<&str>,
        email: Option<&str>,
        now: DateTime<Utc>,
    ) -> ResultEngine<Uuid> {
        let contributor = Contributor::new(
            name.to_string(),
            phone.map(|s| s.to_string()),
            email.map(|s| s.to_string()),
            now,
        )?;
        contributors::ActiveModel::from(&contributor)
            .insert(&self.database)
            .await?;
        tracing::info!(contributor = %contributor.id, name, "registered contributor");
        Ok(contributor.id)
    }

    /// Return a [`Contributor`].
    pub async fn contributor(&self, contributor_id: Uuid) -> ResultEngine<Contributor> {
        let model = contributors::Entity::find_by_id(contributor_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound("contributor".to_string()))?;
        Contributor::try_from(model)
    }

    /// Lists contributors ordered by name. Inactive ones are hidden unless
    /// requested.
    pub async fn list_contributors(
        &self,
        include_inactive: bool,
    ) -> ResultEngine<Vec<Contributor>> {
        let mut query = contributors::Entity::find().order_by_asc(contributors::Column::Name);
        if !include_inactive {
            query = query.filter(contributors::Column::Active.eq(true));
        }

        let models = query.all(&self.database).await?;
        models.into_iter().map(Contributor::try_from).collect()
    }

    /// Marks a contributor inactive. Their postings and balances stay on
    /// record; re-archiving is a no-op.
    pub async fn archive_contributor(
        &self,
        contributor_id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let model = contributors::Entity::find_by_id(contributor_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound("contributor".to_string()))?;
        if !model.active {
            return Ok(());
        }

        let update = contributors::ActiveModel {
            id: ActiveValue::Set(model.id),
            active: ActiveValue::Set(false),
            updated_at: ActiveValue::Set(now),
            ..Default::default()
        };
        update.update(&self.database).await?;
        Ok(())
    }

    // ── Contributions ───────────────────────────────────────────────────

    /// Posts a contribution.
    ///
    /// The row insert and the contributor's balance / total update commit
    /// atomically: `balance_minor` and `total_contributed_minor` both grow
    /// by exactly `amount_minor`.
    pub async fn add_contribution(&self, cmd: NewContribution) -> ResultEngine<Uuid> {
        let contribution = Contribution::new(
            Some(cmd.contributor_id),
            cmd.amount_minor,
            cmd.source,
            cmd.sms_content,
            cmd.sms_sender,
            cmd.transaction_ref,
            cmd.notes,
            cmd.date,
        )?;

        let db_tx = self.database.begin().await?;
        self.insert_contribution(&db_tx, &contribution).await?;
        db_tx.commit().await?;

        tracing::info!(
            contribution = %contribution.id,
            contributor = %cmd.contributor_id,
            amount = %Money::new(contribution.amount_minor),
            source = contribution.source.as_str(),
            "posted contribution"
        );
        Ok(contribution.id)
    }

    /// Lists recent contributions with the matched contributor's name.
    pub async fn list_contributions(
        &self,
        limit: u64,
    ) -> ResultEngine<Vec<(Contribution, Option<String>)>> {
        let rows = contributions::Entity::find()
            .find_also_related(contributors::Entity)
            .order_by_desc(contributions::Column::Date)
            .limit(limit)
            .all(&self.database)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for (model, contributor) in rows {
            out.push((Contribution::try_from(model)?, contributor.map(|c| c.name)));
        }
        Ok(out)
    }

    /// Inserts a contribution row and applies the balance delta to the
    /// referenced contributor, inside the caller's transaction.
    async fn insert_contribution(
        &self,
        db_tx: &DatabaseTransaction,
        contribution: &Contribution,
    ) -> ResultEngine<()> {
        let contributor_id = contribution
            .contributor_id
            .ok_or_else(|| EngineError::Validation("contribution requires a contributor".to_string()))?;

        let contributor = contributors::Entity::find_by_id(contributor_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound("contributor".to_string()))?;

        contributions::ActiveModel::from(contribution)
            .insert(db_tx)
            .await?;

        let update = contributors::ActiveModel {
            id: ActiveValue::Set(contributor.id),
            balance_minor: ActiveValue::Set(contributor.balance_minor + contribution.amount_minor),
            total_contributed_minor: ActiveValue::Set(
                contributor.total_contributed_minor + contribution.amount_minor,
            ),
            updated_at: ActiveValue::Set(contribution.date),
            ..Default::default()
        };
        update.update(db_tx).await?;
        Ok(())
    }

    // ── Expenses ────────────────────────────────────────────────────────

    /// Records an expense. It stays out of the aggregate balance until
    /// approved.
    pub async fn add_expense(&self, cmd: NewExpense) -> ResultEngine<Uuid> {
        let expense = Expense::new(
            cmd.amount_minor,
            cmd.category,
            cmd.description,
            cmd.sms_content,
            cmd.sms_sender,
            cmd.notes,
            cmd.date,
        )?;
        expenses::ActiveModel::from(&expense)
            .insert(&self.database)
            .await?;

        tracing::info!(
            expense = %expense.id,
            amount = %Money::new(expense.amount_minor),
            category = expense.category.as_str(),
            "recorded expense"
        );
        Ok(expense.id)
    }

    /// Approves an expense, making it count against the balance. Approval
    /// is one-way; approving twice is a no-op.
    pub async fn approve_expense(&self, expense_id: Uuid) -> ResultEngine<()> {
        let model = expenses::Entity::find_by_id(expense_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound("expense".to_string()))?;
        if model.approved {
            return Ok(());
        }

        let update = expenses::ActiveModel {
            id: ActiveValue::Set(model.id),
            approved: ActiveValue::Set(true),
            ..Default::default()
        };
        update.update(&self.database).await?;
        tracing::info!(expense = %expense_id, "approved expense");
        Ok(())
    }

    /// Lists recent expenses.
    pub async fn list_expenses(&self, limit: u64) -> ResultEngine<Vec<Expense>> {
        let models = expenses::Entity::find()
            .order_by_desc(expenses::Column::Date)
            .limit(limit)
            .all(&self.database)
            .await?;
        models.into_iter().map(Expense::try_from).collect()
    }

    // ── Pending messages & reconciliation ───────────────────────────────

    /// Lists pending messages, newest first.
    pub async fn unprocessed_messages(&self) -> ResultEngine<Vec<InboundMessage>> {
        let models = messages::Entity::find()
            .filter(messages::Column::Processed.eq(false))
            .order_by_desc(messages::Column::Date)
            .all(&self.database)
            .await?;
        models.into_iter().map(InboundMessage::try_from).collect()
    }

    /// Marks a pending message processed without posting anything.
    pub async fn dismiss_message(&self, message_id: Uuid) -> ResultEngine<()> {
        let model = messages::Entity::find_by_id(message_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound("pending message".to_string()))?;
        if model.processed {
            return Err(EngineError::NotFound("pending message".to_string()));
        }

        let update = messages::ActiveModel {
            id: ActiveValue::Set(model.id),
            processed: ActiveValue::Set(true),
            ..Default::default()
        };
        update.update(&self.database).await?;
        tracing::info!(message = %message_id, "dismissed pending message");
        Ok(())
    }

    /// Binds a pending message to the ledger.
    ///
    /// RECEIVED messages post a contribution (a contributor is required);
    /// SENT messages post an expense. The amount is the caller's override
    /// when given, otherwise re-extracted from the stored content. Posting
    /// and marking the message processed commit in one transaction, so a
    /// failure anywhere leaves the message reconcilable; a message already
    /// processed (or unknown) fails with `NotFound` and posts nothing.
    pub async fn reconcile_message(&self, cmd: ReconcileSms) -> ResultEngine<Posting> {
        let db_tx = self.database.begin().await?;

        let model = messages::Entity::find_by_id(cmd.message_id.to_string())
            .one(&db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound("pending message".to_string()))?;
        if model.processed {
            return Err(EngineError::NotFound("pending message".to_string()));
        }
        let message = InboundMessage::try_from(model)?;

        let amount_minor = match cmd.amount_override_minor {
            Some(amount) => amount,
            None => sms::extract_amount(&message.content)
                .map(|m| m.minor())
                .ok_or_else(|| {
                    EngineError::Validation(
                        "no amount could be extracted; supply an override".to_string(),
                    )
                })?,
        };

        let posting = match message.kind.direction {
            sms::Direction::Received => {
                let contributor_id = cmd.contributor_id.ok_or_else(|| {
                    EngineError::Validation(
                        "a contributor is required to post a contribution".to_string(),
                    )
                })?;
                let contribution = Contribution::new(
                    Some(contributor_id),
                    amount_minor,
                    message.kind.network.into(),
                    Some(message.content.clone()),
                    Some(message.sender.clone()),
                    sms::extract_transaction_ref(&message.content),
                    cmd.notes,
                    cmd.now,
                )?;
                self.insert_contribution(&db_tx, &contribution).await?;
                self.mark_processed(&db_tx, &message, Some(contributor_id))
                    .await?;
                Posting::Contribution(contribution.id)
            }
            sms::Direction::Sent => {
                let expense = Expense::new(
                    amount_minor,
                    cmd.category.unwrap_or_default(),
                    None,
                    Some(message.content.clone()),
                    Some(message.sender.clone()),
                    cmd.notes,
                    cmd.now,
                )?;
                expenses::ActiveModel::from(&expense).insert(&db_tx).await?;
                self.mark_processed(&db_tx, &message, None).await?;
                Posting::Expense(expense.id)
            }
        };

        db_tx.commit().await?;

        tracing::info!(
            message = %cmd.message_id,
            kind = %message.kind,
            amount = %Money::new(amount_minor),
            "reconciled pending message"
        );
        Ok(posting)
    }

    async fn mark_processed(
        &self,
        db_tx: &DatabaseTransaction,
        message: &InboundMessage,
        matched_contributor_id: Option<Uuid>,
    ) -> ResultEngine<()> {
        let update = messages::ActiveModel {
            id: ActiveValue::Set(message.id.to_string()),
            processed: ActiveValue::Set(true),
            matched_contributor_id: ActiveValue::Set(
                matched_contributor_id.map(|id| id.to_string()),
            ),
            ..Default::default()
        };
        update.update(db_tx).await?;
        Ok(())
    }

    // ── Aggregates ──────────────────────────────────────────────────────

    /// Returns ledger totals from one consistent snapshot:
    /// `current_balance = total_contributions − total_approved_expenses`.
    /// Unapproved expenses are reported separately and do not affect the
    /// balance.
    pub async fn dashboard_stats(&self) -> ResultEngine<DashboardStats> {
        let backend = self.database.get_database_backend();
        let db_tx = self.database.begin().await?;

        let total_contributions = query_sum(
            &db_tx,
            Statement::from_string(
                backend,
                "SELECT COALESCE(SUM(amount_minor), 0) AS sum FROM contributions",
            ),
        )
        .await?;
        let total_approved_expenses = query_sum(
            &db_tx,
            Statement::from_sql_and_values(
                backend,
                "SELECT COALESCE(SUM(amount_minor), 0) AS sum FROM expenses WHERE approved = ?",
                [true.into()],
            ),
        )
        .await?;
        let pending_expenses = query_sum(
            &db_tx,
            Statement::from_sql_and_values(
                backend,
                "SELECT COALESCE(SUM(amount_minor), 0) AS sum FROM expenses WHERE approved = ?",
                [false.into()],
            ),
        )
        .await?;
        let active_contributors = query_sum(
            &db_tx,
            Statement::from_sql_and_values(
                backend,
                "SELECT COUNT(*) AS sum FROM contributors WHERE active = ?",
                [true.into()],
            ),
        )
        .await?;

        db_tx.commit().await?;

        Ok(DashboardStats {
            total_contributions: Money::new(total_contributions),
            total_approved_expenses: Money::new(total_approved_expenses),
            pending_expenses: Money::new(pending_expenses),
            active_contributors: active_contributors.max(0) as u64,
            current_balance: Money::new(total_contributions - total_approved_expenses),
        })
    }

    // ── Settings ────────────────────────────────────────────────────────

    /// Returns a setting value, or `None` when the key was never written.
    pub async fn setting(&self, key: &str) -> ResultEngine<Option<String>> {
        let model = settings::Entity::find_by_id(key.to_string())
            .one(&self.database)
            .await?;
        Ok(model.map(|m| m.value))
    }

    /// Writes a setting, replacing any previous value.
    pub async fn set_setting(&self, key: &str, value: &str) -> ResultEngine<()> {
        let model = settings::ActiveModel {
            key: ActiveValue::Set(key.to_string()),
            value: ActiveValue::Set(value.to_string()),
        };
        settings::Entity::insert(model)
            .on_conflict(
                OnConflict::column(settings::Column::Key)
                    .update_column(settings::Column::Value)
                    .to_owned(),
            )
            .exec(&self.database)
            .await?;
        Ok(())
    }
}

async fn query_sum(db_tx: &DatabaseTransaction, stmt: Statement) -> ResultEngine<i64> {
    let row = db_tx.query_one(stmt).await?;
    Ok(row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0))
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> Engine {
        Engine {
            database: self.database,
            intake_lock: tokio::sync::Mutex::new(()),
        }
    }
}
