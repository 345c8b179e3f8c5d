use chrono::{DateTime, Duration, TimeZone, Utc};
use sea_orm::Database;
use uuid::Uuid;

use engine::{
    ContributionSource, Engine, EngineError, ExpenseCategory, InboxError, InboxProvider, Money,
    Posting, RawSmsMessage, ReconcileSms,
};
use migration::MigratorTrait;

async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap()
}

fn days_ago(days: i64) -> i64 {
    (now() - Duration::days(days)).timestamp_millis()
}

struct FakeInbox(Vec<RawSmsMessage>);

impl InboxProvider for FakeInbox {
    async fn list_inbox(&self, max_count: usize) -> Result<Vec<RawSmsMessage>, InboxError> {
        Ok(self.0.iter().take(max_count).cloned().collect())
    }
}

struct DeniedInbox;

impl InboxProvider for DeniedInbox {
    async fn list_inbox(&self, _max_count: usize) -> Result<Vec<RawSmsMessage>, InboxError> {
        Err(InboxError::PermissionDenied("READ_SMS refused".to_string()))
    }
}

fn received_sms(days: i64) -> RawSmsMessage {
    RawSmsMessage {
        sender: "MTN".to_string(),
        body: "You have received 5,000 RWF from John Doe. Ref: AB12CD".to_string(),
        timestamp_millis: days_ago(days),
    }
}

fn sent_sms(days: i64) -> RawSmsMessage {
    RawSmsMessage {
        sender: "COGEBANQUE".to_string(),
        body: "You paid 3,000 RWF to Kigali Sports House. TXN: 998877".to_string(),
        timestamp_millis: days_ago(days),
    }
}

#[tokio::test]
async fn intake_applies_recency_window() {
    let engine = engine_with_db().await;
    let inbox = FakeInbox(vec![received_sms(1), received_sms(31)]);

    let report = engine.sync_recent_sms(&inbox, 30, now()).await.unwrap();
    assert_eq!(report.processed, 1);

    let pending = engine.unprocessed_messages().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind.to_string(), "MTN_MOBILE_MONEY_RECEIVED");
}

#[tokio::test]
async fn intake_skips_non_financial_messages() {
    let engine = engine_with_db().await;
    let inbox = FakeInbox(vec![
        RawSmsMessage {
            sender: "MAMA".to_string(),
            body: "dinner at seven?".to_string(),
            timestamp_millis: days_ago(1),
        },
        // Financial phrasing from an unknown sender is not enough.
        RawSmsMessage {
            sender: "+250788123456".to_string(),
            body: "You have received 5,000 RWF from John".to_string(),
            timestamp_millis: days_ago(1),
        },
        received_sms(2),
    ]);

    let report = engine.sync_recent_sms(&inbox, 30, now()).await.unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(engine.unprocessed_messages().await.unwrap().len(), 1);
}

#[tokio::test]
async fn intake_drops_zero_amount_messages() {
    let engine = engine_with_db().await;
    let inbox = FakeInbox(vec![RawSmsMessage {
        sender: "MTN".to_string(),
        body: "You have received 0 RWF from John".to_string(),
        timestamp_millis: days_ago(1),
    }]);

    let report = engine.sync_recent_sms(&inbox, 30, now()).await.unwrap();
    assert_eq!(report.processed, 0);
    assert!(engine.unprocessed_messages().await.unwrap().is_empty());
}

#[tokio::test]
async fn intake_rerun_is_idempotent() {
    let engine = engine_with_db().await;
    let inbox = FakeInbox(vec![received_sms(1), sent_sms(2)]);

    let first = engine.sync_recent_sms(&inbox, 30, now()).await.unwrap();
    assert_eq!(first.processed, 2);
    assert_eq!(first.duplicates, 0);

    let second = engine.sync_recent_sms(&inbox, 30, now()).await.unwrap();
    assert_eq!(second.processed, 0);
    assert_eq!(second.duplicates, 2);

    assert_eq!(engine.unprocessed_messages().await.unwrap().len(), 2);
}

#[tokio::test]
async fn intake_permission_denied_does_no_work() {
    let engine = engine_with_db().await;

    let err = engine
        .sync_recent_sms(&DeniedInbox, 30, now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));
    assert!(engine.unprocessed_messages().await.unwrap().is_empty());
}

#[tokio::test]
async fn reconcile_received_posts_contribution() {
    let engine = engine_with_db().await;
    let contributor_id = engine
        .add_contributor("John Doe", None, None, now())
        .await
        .unwrap();
    let inbox = FakeInbox(vec![received_sms(1)]);
    engine.sync_recent_sms(&inbox, 30, now()).await.unwrap();
    let message = engine.unprocessed_messages().await.unwrap().remove(0);

    let posting = engine
        .reconcile_message(ReconcileSms {
            message_id: message.id,
            contributor_id: Some(contributor_id),
            amount_override_minor: None,
            category: None,
            notes: None,
            now: now(),
        })
        .await
        .unwrap();

    let Posting::Contribution(contribution_id) = posting else {
        panic!("expected a contribution posting");
    };

    let contributor = engine.contributor(contributor_id).await.unwrap();
    assert_eq!(contributor.balance_minor, 500_000);
    assert_eq!(contributor.total_contributed_minor, 500_000);

    let listed = engine.list_contributions(10).await.unwrap();
    assert_eq!(listed[0].0.id, contribution_id);
    assert_eq!(listed[0].0.source, ContributionSource::MtnMobileMoney);
    assert_eq!(listed[0].0.transaction_ref.as_deref(), Some("AB12CD"));

    assert!(engine.unprocessed_messages().await.unwrap().is_empty());
}

#[tokio::test]
async fn reconcile_twice_fails_without_duplicating() {
    let engine = engine_with_db().await;
    let contributor_id = engine
        .add_contributor("John Doe", None, None, now())
        .await
        .unwrap();
    let inbox = FakeInbox(vec![received_sms(1)]);
    engine.sync_recent_sms(&inbox, 30, now()).await.unwrap();
    let message = engine.unprocessed_messages().await.unwrap().remove(0);

    let cmd = ReconcileSms {
        message_id: message.id,
        contributor_id: Some(contributor_id),
        amount_override_minor: None,
        category: None,
        notes: None,
        now: now(),
    };
    engine.reconcile_message(cmd.clone()).await.unwrap();

    let err = engine.reconcile_message(cmd).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let contributor = engine.contributor(contributor_id).await.unwrap();
    assert_eq!(contributor.balance_minor, 500_000);
    assert_eq!(engine.list_contributions(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn reconcile_received_requires_contributor() {
    let engine = engine_with_db().await;
    let inbox = FakeInbox(vec![received_sms(1)]);
    engine.sync_recent_sms(&inbox, 30, now()).await.unwrap();
    let message = engine.unprocessed_messages().await.unwrap().remove(0);

    let err = engine
        .reconcile_message(ReconcileSms {
            message_id: message.id,
            contributor_id: None,
            amount_override_minor: None,
            category: None,
            notes: None,
            now: now(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    // The message survives a failed reconciliation.
    assert_eq!(engine.unprocessed_messages().await.unwrap().len(), 1);
}

#[tokio::test]
async fn reconcile_sent_posts_unapproved_expense() {
    let engine = engine_with_db().await;
    let inbox = FakeInbox(vec![sent_sms(1)]);
    engine.sync_recent_sms(&inbox, 30, now()).await.unwrap();
    let message = engine.unprocessed_messages().await.unwrap().remove(0);
    assert_eq!(message.kind.to_string(), "BANK_SENT");

    let posting = engine
        .reconcile_message(ReconcileSms {
            message_id: message.id,
            contributor_id: None,
            amount_override_minor: None,
            category: Some(ExpenseCategory::Equipment),
            notes: None,
            now: now(),
        })
        .await
        .unwrap();

    let Posting::Expense(expense_id) = posting else {
        panic!("expected an expense posting");
    };

    let expenses = engine.list_expenses(10).await.unwrap();
    assert_eq!(expenses[0].id, expense_id);
    assert_eq!(expenses[0].amount_minor, 300_000);
    assert!(!expenses[0].approved);

    // Unapproved, so the balance is untouched.
    let stats = engine.dashboard_stats().await.unwrap();
    assert_eq!(stats.current_balance, Money::ZERO);
    assert_eq!(stats.pending_expenses, Money::new(300_000));
}

#[tokio::test]
async fn reconcile_honours_amount_override() {
    let engine = engine_with_db().await;
    let contributor_id = engine
        .add_contributor("John Doe", None, None, now())
        .await
        .unwrap();
    let inbox = FakeInbox(vec![received_sms(1)]);
    engine.sync_recent_sms(&inbox, 30, now()).await.unwrap();
    let message = engine.unprocessed_messages().await.unwrap().remove(0);

    engine
        .reconcile_message(ReconcileSms {
            message_id: message.id,
            contributor_id: Some(contributor_id),
            amount_override_minor: Some(450_000),
            category: None,
            notes: Some("sender fee deducted".to_string()),
            now: now(),
        })
        .await
        .unwrap();

    let contributor = engine.contributor(contributor_id).await.unwrap();
    assert_eq!(contributor.balance_minor, 450_000);
}

#[tokio::test]
async fn reconcile_unknown_message_fails() {
    let engine = engine_with_db().await;
    let err = engine
        .reconcile_message(ReconcileSms {
            message_id: Uuid::new_v4(),
            contributor_id: None,
            amount_override_minor: None,
            category: None,
            notes: None,
            now: now(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn dismiss_consumes_message_once() {
    let engine = engine_with_db().await;
    let inbox = FakeInbox(vec![received_sms(1)]);
    engine.sync_recent_sms(&inbox, 30, now()).await.unwrap();
    let message = engine.unprocessed_messages().await.unwrap().remove(0);

    engine.dismiss_message(message.id).await.unwrap();
    assert!(engine.unprocessed_messages().await.unwrap().is_empty());

    let err = engine.dismiss_message(message.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    // Nothing was posted either way.
    assert!(engine.list_contributions(10).await.unwrap().is_empty());
    assert!(engine.list_expenses(10).await.unwrap().is_empty());
}
