use std::error::Error;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use engine::{
    Engine, ExpenseCategory, Money, NewContribution, NewExpense, Posting, ReconcileSms,
    settings::keys,
};
use migration::{Migrator, MigratorTrait};
use sheets_sync::{Credentials, SheetsClient};
use uuid::Uuid;

mod inbox;
mod settings;

#[derive(Parser, Debug)]
#[command(name = "umusanzu")]
#[command(about = "Group contribution ledger reconciled against SMS notifications")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage contributors.
    Contributor(ContributorCmd),
    /// Post and list contributions.
    Contribution(ContributionCmd),
    /// Record, approve and list expenses.
    Expense(ExpenseCmd),
    /// Scan and reconcile SMS notifications.
    Sms(SmsCmd),
    /// Print the ledger dashboard.
    Stats,
    /// Read or write a stored setting.
    Setting(SettingCmd),
    /// Manage the spreadsheet export.
    Sheets(SheetsCmd),
}

#[derive(Args, Debug)]
struct ContributorCmd {
    #[command(subcommand)]
    command: ContributorCommand,
}

#[derive(Subcommand, Debug)]
enum ContributorCommand {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    List {
        /// Include archived contributors.
        #[arg(long)]
        all: bool,
    },
    Archive {
        #[arg(long)]
        id: Uuid,
    },
}

#[derive(Args, Debug)]
struct ContributionCmd {
    #[command(subcommand)]
    command: ContributionCommand,
}

#[derive(Subcommand, Debug)]
enum ContributionCommand {
    Add {
        #[arg(long)]
        contributor: Uuid,
        /// Amount, e.g. `5000` or `12,500.50`.
        #[arg(long)]
        amount: String,
        #[arg(long, default_value = "MANUAL")]
        source: String,
        #[arg(long)]
        notes: Option<String>,
    },
    List {
        #[arg(long, default_value_t = 50)]
        limit: u64,
    },
}

#[derive(Args, Debug)]
struct ExpenseCmd {
    #[command(subcommand)]
    command: ExpenseCommand,
}

#[derive(Subcommand, Debug)]
enum ExpenseCommand {
    Add {
        #[arg(long)]
        amount: String,
        #[arg(long, default_value = "Other")]
        category: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    Approve {
        #[arg(long)]
        id: Uuid,
    },
    List {
        #[arg(long, default_value_t = 50)]
        limit: u64,
    },
}

#[derive(Args, Debug)]
struct SmsCmd {
    #[command(subcommand)]
    command: SmsCommand,
}

#[derive(Subcommand, Debug)]
enum SmsCommand {
    /// Scan an inbox snapshot for recent financial messages.
    Sync {
        /// JSON snapshot of `{sender, body, timestamp_millis}` objects.
        #[arg(long)]
        inbox: std::path::PathBuf,
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
    /// List messages awaiting reconciliation.
    Pending,
    /// Post a pending message as a contribution or expense.
    Reconcile {
        #[arg(long)]
        message: Uuid,
        /// Required for received (contribution) messages.
        #[arg(long)]
        contributor: Option<Uuid>,
        /// Overrides the amount extracted from the message.
        #[arg(long)]
        amount: Option<String>,
        /// Expense category for sent messages.
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Mark a pending message processed without posting.
    Dismiss {
        #[arg(long)]
        message: Uuid,
    },
}

#[derive(Args, Debug)]
struct SettingCmd {
    #[command(subcommand)]
    command: SettingCommand,
}

#[derive(Subcommand, Debug)]
enum SettingCommand {
    Get { key: String },
    Set { key: String, value: String },
}

#[derive(Args, Debug)]
struct SheetsCmd {
    #[command(subcommand)]
    command: SheetsCommand,
}

#[derive(Subcommand, Debug)]
enum SheetsCommand {
    /// Create the ledger spreadsheet and remember its id.
    Init {
        #[arg(long, default_value = "Umusanzu Ledger")]
        title: String,
    },
    /// Push contributors, contributions, expenses and the summary.
    Export,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "umusanzu={level},engine={level},sheets_sync={level}",
            level = settings.app.level
        ))
        .init();

    let database = parse_database(&settings.database).await?;
    let engine = Engine::builder().database(database).build();

    run(cli.command, &engine, &settings).await
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let url = match config {
        settings::Database::Memory => String::from("sqlite::memory:"),
        settings::Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

/// Builds a sheets client from the config section, targeting the stored
/// spreadsheet when one is known.
async fn sheets_client(
    engine: &Engine,
    settings: &settings::Settings,
) -> Result<SheetsClient, Box<dyn Error + Send + Sync>> {
    let Some(sheets) = settings.sheets.as_ref() else {
        return Err("no [sheets] section in settings.toml".into());
    };

    let mut client = SheetsClient::new(
        reqwest::Client::new(),
        Credentials {
            client_id: sheets.client_id.clone(),
            client_secret: sheets.client_secret.clone(),
        },
        sheets.access_token.clone(),
        sheets.refresh_token.clone(),
    );

    let spreadsheet_id = match sheets.spreadsheet_id.clone() {
        Some(id) => Some(id),
        None => engine.setting(keys::SPREADSHEET_ID).await?,
    };
    if let Some(id) = spreadsheet_id {
        client = client.with_spreadsheet_id(id);
    }
    Ok(client)
}

async fn auto_sync_enabled(engine: &Engine) -> bool {
    matches!(engine.setting(keys::AUTO_SYNC).await, Ok(Some(v)) if v == "true")
}

fn parse_amount(raw: &str) -> Result<i64, Box<dyn Error + Send + Sync>> {
    Ok(Money::parse_grouped(raw)?.minor())
}

async fn run(
    command: Command,
    engine: &Engine,
    settings: &settings::Settings,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match command {
        Command::Contributor(cmd) => match cmd.command {
            ContributorCommand::Add { name, phone, email } => {
                let id = engine
                    .add_contributor(&name, phone.as_deref(), email.as_deref(), Utc::now())
                    .await?;
                println!("{id}");
            }
            ContributorCommand::List { all } => {
                for contributor in engine.list_contributors(all).await? {
                    println!(
                        "{}  {:<24}  balance {}  contributed {}{}",
                        contributor.id,
                        contributor.name,
                        Money::new(contributor.balance_minor),
                        Money::new(contributor.total_contributed_minor),
                        if contributor.active { "" } else { "  (archived)" },
                    );
                }
            }
            ContributorCommand::Archive { id } => {
                engine.archive_contributor(id, Utc::now()).await?;
                println!("archived {id}");
            }
        },
        Command::Contribution(cmd) => match cmd.command {
            ContributionCommand::Add {
                contributor,
                amount,
                source,
                notes,
            } => {
                let id = engine
                    .add_contribution(NewContribution {
                        contributor_id: contributor,
                        amount_minor: parse_amount(&amount)?,
                        source: source.as_str().try_into()?,
                        sms_content: None,
                        sms_sender: None,
                        transaction_ref: None,
                        notes,
                        date: Utc::now(),
                    })
                    .await?;
                println!("{id}");

                if auto_sync_enabled(engine).await {
                    push_contribution(engine, settings, id).await;
                }
            }
            ContributionCommand::List { limit } => {
                for (contribution, name) in engine.list_contributions(limit).await? {
                    println!(
                        "{}  {}  {:<24}  {}  {}",
                        contribution.id,
                        contribution.date.format("%Y-%m-%d"),
                        name.unwrap_or_else(|| "(unmatched)".to_string()),
                        Money::new(contribution.amount_minor),
                        contribution.source.as_str(),
                    );
                }
            }
        },
        Command::Expense(cmd) => match cmd.command {
            ExpenseCommand::Add {
                amount,
                category,
                description,
                notes,
            } => {
                let id = engine
                    .add_expense(NewExpense {
                        amount_minor: parse_amount(&amount)?,
                        category: ExpenseCategory::try_from(category.as_str())?,
                        description,
                        sms_content: None,
                        sms_sender: None,
                        notes,
                        date: Utc::now(),
                    })
                    .await?;
                println!("{id}");

                if auto_sync_enabled(engine).await {
                    push_expense(engine, settings, id).await;
                }
            }
            ExpenseCommand::Approve { id } => {
                engine.approve_expense(id).await?;
                println!("approved {id}");
            }
            ExpenseCommand::List { limit } => {
                for expense in engine.list_expenses(limit).await? {
                    println!(
                        "{}  {}  {:<18}  {}  {}",
                        expense.id,
                        expense.date.format("%Y-%m-%d"),
                        expense.category.as_str(),
                        Money::new(expense.amount_minor),
                        if expense.approved { "approved" } else { "pending" },
                    );
                }
            }
        },
        Command::Sms(cmd) => match cmd.command {
            SmsCommand::Sync { inbox, days } => {
                let provider = inbox::JsonInbox::new(inbox);
                let report = engine.sync_recent_sms(&provider, days, Utc::now()).await?;
                println!(
                    "{} new pending message(s), {} duplicate(s) skipped",
                    report.processed, report.duplicates
                );
            }
            SmsCommand::Pending => {
                for message in engine.unprocessed_messages().await? {
                    println!(
                        "{}  {}  {}  {}  {}",
                        message.id,
                        message.date.format("%Y-%m-%d %H:%M"),
                        message.sender,
                        message.kind,
                        message.content,
                    );
                }
            }
            SmsCommand::Reconcile {
                message,
                contributor,
                amount,
                category,
                notes,
            } => {
                let amount_override_minor = amount.as_deref().map(parse_amount).transpose()?;
                let category = category
                    .as_deref()
                    .map(ExpenseCategory::try_from)
                    .transpose()?;
                let posting = engine
                    .reconcile_message(ReconcileSms {
                        message_id: message,
                        contributor_id: contributor,
                        amount_override_minor,
                        category,
                        notes,
                        now: Utc::now(),
                    })
                    .await?;
                match posting {
                    Posting::Contribution(id) => println!("contribution {id}"),
                    Posting::Expense(id) => println!("expense {id}"),
                }
            }
            SmsCommand::Dismiss { message } => {
                engine.dismiss_message(message).await?;
                println!("dismissed {message}");
            }
        },
        Command::Stats => {
            let stats = engine.dashboard_stats().await?;
            println!("Total contributions   {}", stats.total_contributions);
            println!("Approved expenses     {}", stats.total_approved_expenses);
            println!("Pending expenses      {}", stats.pending_expenses);
            println!("Active contributors   {}", stats.active_contributors);
            println!("Current balance       {}", stats.current_balance);
        }
        Command::Setting(cmd) => match cmd.command {
            SettingCommand::Get { key } => match engine.setting(&key).await? {
                Some(value) => println!("{value}"),
                None => println!("(unset)"),
            },
            SettingCommand::Set { key, value } => {
                engine.set_setting(&key, &value).await?;
            }
        },
        Command::Sheets(cmd) => match cmd.command {
            SheetsCommand::Init { title } => {
                let mut client = sheets_client(engine, settings).await?;
                let info = client.create_spreadsheet(&title).await?;
                engine.set_setting(keys::SPREADSHEET_ID, &info.id).await?;
                println!("{}", info.url);
            }
            SheetsCommand::Export => {
                let mut client = sheets_client(engine, settings).await?;
                export_all(engine, &mut client).await?;
                println!("export complete");
            }
        },
    }

    Ok(())
}

/// Pushes the full ledger: every contributor, recent postings, and a fresh
/// summary.
async fn export_all(
    engine: &Engine,
    client: &mut SheetsClient,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let now = Utc::now();

    for contributor in engine.list_contributors(true).await? {
        client.sync_contributor(&contributor, now).await?;
    }
    for (contribution, name) in engine.list_contributions(1000).await? {
        client
            .sync_contribution(&contribution, name.as_deref(), now)
            .await?;
    }
    for expense in engine.list_expenses(1000).await? {
        client.sync_expense(&expense, now).await?;
    }
    let stats = engine.dashboard_stats().await?;
    client.sync_summary(&stats, now).await?;
    Ok(())
}

/// Best-effort auto-sync after a posting; failures are logged, never fatal.
async fn push_contribution(engine: &Engine, settings: &settings::Settings, id: Uuid) {
    let result = async {
        let mut client = sheets_client(engine, settings).await?;
        let listed = engine.list_contributions(1000).await?;
        if let Some((contribution, name)) = listed.into_iter().find(|(c, _)| c.id == id) {
            client
                .sync_contribution(&contribution, name.as_deref(), Utc::now())
                .await?;
        }
        Ok::<(), Box<dyn Error + Send + Sync>>(())
    }
    .await;

    if let Err(err) = result {
        tracing::warn!("auto-sync of contribution failed: {err}");
    }
}

async fn push_expense(engine: &Engine, settings: &settings::Settings, id: Uuid) {
    let result = async {
        let mut client = sheets_client(engine, settings).await?;
        let listed = engine.list_expenses(1000).await?;
        if let Some(expense) = listed.into_iter().find(|e| e.id == id) {
            client.sync_expense(&expense, Utc::now()).await?;
        }
        Ok::<(), Box<dyn Error + Send + Sync>>(())
    }
    .await;

    if let Err(err) = result {
        tracing::warn!("auto-sync of expense failed: {err}");
    }
}
