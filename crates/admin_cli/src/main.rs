use std::error::Error;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use engine::{AccountType, Engine, Money, PointerKey, StockPolicy};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "tavola_admin")]
#[command(about = "Admin utilities for Tavola (bootstrap books, tax, tables and menu)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./tavola.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Account(Account),
    Year(Year),
    Tax(Tax),
    Posting(Posting),
    Table(Table),
    Menu(Menu),
    Stock(Stock),
    Ledger(Ledger),
}

#[derive(Args, Debug)]
struct Account {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    Create(AccountCreateArgs),
    List,
}

#[derive(Args, Debug)]
struct AccountCreateArgs {
    #[arg(long)]
    code: String,
    #[arg(long)]
    name: String,
    /// asset, liability, equity, income or expense.
    #[arg(long = "type", value_parser = parse_account_type)]
    account_type: AccountType,
}

#[derive(Args, Debug)]
struct Year {
    #[command(subcommand)]
    command: YearCommand,
}

#[derive(Subcommand, Debug)]
enum YearCommand {
    Create(YearCreateArgs),
    SetCurrent {
        #[arg(long)]
        id: Uuid,
    },
}

#[derive(Args, Debug)]
struct YearCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    start: NaiveDate,
    #[arg(long)]
    end: NaiveDate,
    /// Also make it the current financial year.
    #[arg(long)]
    current: bool,
}

#[derive(Args, Debug)]
struct Tax {
    #[command(subcommand)]
    command: TaxCommand,
}

#[derive(Subcommand, Debug)]
enum TaxCommand {
    Create(TaxCreateArgs),
    Activate {
        #[arg(long)]
        id: Uuid,
    },
    Deactivate,
}

#[derive(Args, Debug)]
struct TaxCreateArgs {
    #[arg(long)]
    name: String,
    /// Tax rate in basis points (1300 = 13%).
    #[arg(long)]
    rate_bp: i64,
    /// Service charge rate in basis points.
    #[arg(long, default_value_t = 0)]
    service_bp: i64,
    #[arg(long)]
    activate: bool,
}

#[derive(Args, Debug)]
struct Posting {
    #[command(subcommand)]
    command: PostingCommand,
}

#[derive(Subcommand, Debug)]
enum PostingCommand {
    /// Bind a posting role (cash, bank, receivable, sales, tax_payable,
    /// inventory, cost_of_goods, payable) to an account.
    Set {
        #[arg(long, value_parser = parse_role)]
        role: PointerKey,
        #[arg(long)]
        account: Uuid,
    },
    List,
}

#[derive(Args, Debug)]
struct Table {
    #[command(subcommand)]
    command: TableCommand,
}

#[derive(Subcommand, Debug)]
enum TableCommand {
    /// Create one table per name.
    Create {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Args, Debug)]
struct Menu {
    #[command(subcommand)]
    command: MenuCommand,
}

#[derive(Subcommand, Debug)]
enum MenuCommand {
    Create {
        #[arg(long)]
        name: String,
        /// Price as a decimal amount, e.g. `12.50`.
        #[arg(long, value_parser = parse_money)]
        price: Money,
    },
}

#[derive(Args, Debug)]
struct Stock {
    #[command(subcommand)]
    command: StockCommand,
}

#[derive(Subcommand, Debug)]
enum StockCommand {
    /// Replay every ingredient's movements and report drift.
    Verify,
}

#[derive(Args, Debug)]
struct Ledger {
    #[command(subcommand)]
    command: LedgerCommand,
}

#[derive(Subcommand, Debug)]
enum LedgerCommand {
    /// Rebuild every account balance from its entries.
    RecomputeBalances,
    TrialBalance,
}

fn parse_account_type(raw: &str) -> Result<AccountType, String> {
    AccountType::try_from(raw).map_err(|err| err.to_string())
}

fn parse_role(raw: &str) -> Result<PointerKey, String> {
    let key = if raw.starts_with("posting.") {
        raw.to_string()
    } else {
        format!("posting.{raw}")
    };
    match PointerKey::try_from(key.as_str()) {
        Ok(role) if role.is_posting_role() => Ok(role),
        _ => Err(format!("unknown posting role: {raw}")),
    }
}

fn parse_money(raw: &str) -> Result<Money, String> {
    raw.parse::<Money>().map_err(|err| err.to_string())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder()
        .database(db)
        .stock_policy(StockPolicy::Reject)
        .build()
        .await?;

    match cli.command {
        Command::Account(Account {
            command: AccountCommand::Create(args),
        }) => {
            let account = engine
                .create_account(&args.code, &args.name, args.account_type)
                .await?;
            println!("created account: {} {} ({})", account.code, account.name, account.id);
        }
        Command::Account(Account {
            command: AccountCommand::List,
        }) => {
            for account in engine.accounts().await? {
                println!(
                    "{:<8} {:<32} {:<10} {:>14} {}",
                    account.code,
                    account.name,
                    account.account_type.as_str(),
                    account.current_balance.to_string(),
                    account.id
                );
            }
        }
        Command::Year(Year {
            command: YearCommand::Create(args),
        }) => {
            let year = engine
                .create_financial_year(&args.name, args.start, args.end)
                .await?;
            if args.current {
                engine.set_current_financial_year(year.id).await?;
            }
            println!("created financial year: {} ({})", year.name, year.id);
        }
        Command::Year(Year {
            command: YearCommand::SetCurrent { id },
        }) => {
            let year = engine.set_current_financial_year(id).await?;
            println!("current financial year: {}", year.name);
        }
        Command::Tax(Tax {
            command: TaxCommand::Create(args),
        }) => {
            let setting = engine
                .create_tax_setting(&args.name, args.rate_bp, args.service_bp)
                .await?;
            if args.activate {
                engine.activate_tax_setting(setting.id).await?;
            }
            println!("created tax setting: {} ({})", setting.name, setting.id);
        }
        Command::Tax(Tax {
            command: TaxCommand::Activate { id },
        }) => {
            let setting = engine.activate_tax_setting(id).await?;
            println!("active tax setting: {}", setting.name);
        }
        Command::Tax(Tax {
            command: TaxCommand::Deactivate,
        }) => {
            engine.deactivate_tax_setting().await?;
            println!("tax disabled");
        }
        Command::Posting(Posting {
            command: PostingCommand::Set { role, account },
        }) => {
            engine.set_posting_account(role, account).await?;
            println!("{role} -> {account}");
        }
        Command::Posting(Posting {
            command: PostingCommand::List,
        }) => {
            for (role, account) in engine.posting_accounts().await? {
                println!("{:<26} {} {}", role.as_str(), account.code, account.name);
            }
        }
        Command::Table(Table {
            command: TableCommand::Create { names },
        }) => {
            for name in names {
                let table = engine.create_table(&name).await?;
                println!("created table: {} ({})", table.name, table.id);
            }
        }
        Command::Menu(Menu {
            command: MenuCommand::Create { name, price },
        }) => {
            let item = engine.create_menu_item(&name, price).await?;
            println!("created menu item: {} {} ({})", item.name, item.price, item.id);
        }
        Command::Stock(Stock {
            command: StockCommand::Verify,
        }) => {
            let drifts = engine.verify_stock_ledger().await?;
            if drifts.is_empty() {
                println!("stock ledger consistent");
            }
            for drift in &drifts {
                println!(
                    "{}: stored {} replayed {} broken rows {:?}",
                    drift.name, drift.stored, drift.replayed, drift.broken_rows
                );
            }
            if !drifts.is_empty() {
                std::process::exit(1);
            }
        }
        Command::Ledger(Ledger {
            command: LedgerCommand::RecomputeBalances,
        }) => {
            let accounts = engine.recompute_account_balances().await?;
            println!("recomputed {} account balances", accounts.len());
        }
        Command::Ledger(Ledger {
            command: LedgerCommand::TrialBalance,
        }) => {
            let trial = engine.trial_balance().await?;
            for row in &trial.rows {
                println!(
                    "{:<8} {:<32} {:>14} {:>14}",
                    row.code,
                    row.name,
                    row.debit.to_string(),
                    row.credit.to_string()
                );
            }
            println!(
                "{:<41} {:>14} {:>14}",
                "total",
                trial.total_debit.to_string(),
                trial.total_credit.to_string()
            );
            if !trial.is_balanced() {
                eprintln!("trial balance does not balance");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
