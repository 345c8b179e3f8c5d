use chrono::{DateTime, TimeZone, Utc};
use sea_orm::Database;
use uuid::Uuid;

use engine::{
    ContributionSource, Engine, EngineError, ExpenseCategory, Money, NewContribution, NewExpense,
};
use migration::MigratorTrait;

async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build()
}

fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap()
}

fn contribution(contributor_id: Uuid, amount_minor: i64) -> NewContribution {
    NewContribution {
        contributor_id,
        amount_minor,
        source: ContributionSource::Manual,
        sms_content: None,
        sms_sender: None,
        transaction_ref: None,
        notes: None,
        date: at(),
    }
}

fn expense(amount_minor: i64) -> NewExpense {
    NewExpense {
        amount_minor,
        category: ExpenseCategory::Equipment,
        description: Some("jerseys".to_string()),
        sms_content: None,
        sms_sender: None,
        notes: None,
        date: at(),
    }
}

#[tokio::test]
async fn contribution_updates_balance_and_total() {
    let engine = engine_with_db().await;
    let contributor_id = engine
        .add_contributor("Jean Bosco", Some("+250780000001"), None, at())
        .await
        .unwrap();

    engine
        .add_contribution(contribution(contributor_id, 500_000))
        .await
        .unwrap();
    engine
        .add_contribution(contribution(contributor_id, 250_000))
        .await
        .unwrap();

    let contributor = engine.contributor(contributor_id).await.unwrap();
    assert_eq!(contributor.balance_minor, 750_000);
    assert_eq!(contributor.total_contributed_minor, 750_000);
}

#[tokio::test]
async fn contribution_rejects_nonpositive_amount() {
    let engine = engine_with_db().await;
    let contributor_id = engine
        .add_contributor("Jean Bosco", None, None, at())
        .await
        .unwrap();

    let err = engine
        .add_contribution(contribution(contributor_id, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let contributor = engine.contributor(contributor_id).await.unwrap();
    assert_eq!(contributor.balance_minor, 0);
}

#[tokio::test]
async fn contribution_rejects_unknown_contributor() {
    let engine = engine_with_db().await;

    let err = engine
        .add_contribution(contribution(Uuid::new_v4(), 500_000))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let stats = engine.dashboard_stats().await.unwrap();
    assert_eq!(stats.total_contributions, Money::ZERO);
}

#[tokio::test]
async fn expense_counts_only_once_approved() {
    let engine = engine_with_db().await;
    let contributor_id = engine
        .add_contributor("Jean Bosco", None, None, at())
        .await
        .unwrap();
    engine
        .add_contribution(contribution(contributor_id, 1_000_000))
        .await
        .unwrap();

    let expense_id = engine.add_expense(expense(300_000)).await.unwrap();

    let stats = engine.dashboard_stats().await.unwrap();
    assert_eq!(stats.current_balance, Money::new(1_000_000));
    assert_eq!(stats.pending_expenses, Money::new(300_000));
    assert_eq!(stats.total_approved_expenses, Money::ZERO);

    engine.approve_expense(expense_id).await.unwrap();
    // Re-approval is a no-op, not an error.
    engine.approve_expense(expense_id).await.unwrap();

    let stats = engine.dashboard_stats().await.unwrap();
    assert_eq!(stats.current_balance, Money::new(700_000));
    assert_eq!(stats.pending_expenses, Money::ZERO);
    assert_eq!(stats.total_approved_expenses, Money::new(300_000));
}

#[tokio::test]
async fn approve_unknown_expense_fails() {
    let engine = engine_with_db().await;
    let err = engine.approve_expense(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn dashboard_zero_state() {
    let engine = engine_with_db().await;
    let stats = engine.dashboard_stats().await.unwrap();

    assert_eq!(stats.total_contributions, Money::ZERO);
    assert_eq!(stats.total_approved_expenses, Money::ZERO);
    assert_eq!(stats.pending_expenses, Money::ZERO);
    assert_eq!(stats.current_balance, Money::ZERO);
    assert_eq!(stats.active_contributors, 0);
}

#[tokio::test]
async fn dashboard_balance_stays_consistent() {
    let engine = engine_with_db().await;
    let contributor_id = engine
        .add_contributor("Jean Bosco", None, None, at())
        .await
        .unwrap();

    engine
        .add_contribution(contribution(contributor_id, 800_000))
        .await
        .unwrap();
    engine
        .add_contribution(contribution(contributor_id, 200_000))
        .await
        .unwrap();
    let first = engine.add_expense(expense(150_000)).await.unwrap();
    engine.add_expense(expense(999_000)).await.unwrap();
    engine.approve_expense(first).await.unwrap();

    let stats = engine.dashboard_stats().await.unwrap();
    assert_eq!(
        stats.current_balance,
        stats.total_contributions - stats.total_approved_expenses
    );
    assert_eq!(stats.current_balance, Money::new(850_000));
    assert_eq!(stats.active_contributors, 1);
}

#[tokio::test]
async fn contributions_list_carries_contributor_name() {
    let engine = engine_with_db().await;
    let contributor_id = engine
        .add_contributor("Jean Bosco", None, None, at())
        .await
        .unwrap();
    engine
        .add_contribution(contribution(contributor_id, 500_000))
        .await
        .unwrap();

    let listed = engine.list_contributions(10).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].1.as_deref(), Some("Jean Bosco"));
    assert_eq!(listed[0].0.source, ContributionSource::Manual);
}

#[tokio::test]
async fn archived_contributors_leave_default_listing() {
    let engine = engine_with_db().await;
    let keep = engine
        .add_contributor("Jean Bosco", None, None, at())
        .await
        .unwrap();
    let gone = engine
        .add_contributor("Claudine", None, None, at())
        .await
        .unwrap();

    engine.archive_contributor(gone, at()).await.unwrap();
    // Archiving twice is a no-op.
    engine.archive_contributor(gone, at()).await.unwrap();

    let active = engine.list_contributors(false).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, keep);

    let everyone = engine.list_contributors(true).await.unwrap();
    assert_eq!(everyone.len(), 2);

    let stats = engine.dashboard_stats().await.unwrap();
    assert_eq!(stats.active_contributors, 1);
}

#[tokio::test]
async fn settings_upsert_by_key() {
    let engine = engine_with_db().await;

    assert_eq!(engine.setting("auto_sync").await.unwrap(), None);

    engine.set_setting("auto_sync", "true").await.unwrap();
    assert_eq!(
        engine.setting("auto_sync").await.unwrap().as_deref(),
        Some("true")
    );

    engine.set_setting("auto_sync", "false").await.unwrap();
    assert_eq!(
        engine.setting("auto_sync").await.unwrap().as_deref(),
        Some("false")
    );
}

#[tokio::test]
async fn empty_contributor_name_rejected() {
    let engine = engine_with_db().await;
    let err = engine
        .add_contributor("   ", None, None, at())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}
