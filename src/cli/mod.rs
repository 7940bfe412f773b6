use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::application::{FinanceService, NewTransaction, TransactionFilter};
use crate::domain::{
    Account, AccountId, DATE_FORMAT, TransactionKind, TransactionStatus, YearReport, format_cents, format_money,
    parse_amount, parse_date,
};

/// finplan - personal finance tracker
#[derive(Parser)]
#[command(name = "finplan")]
#[command(about = "Track planned and cleared transactions, forecast the coming months and report on the year")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "FINPLAN_DB", default_value = "finplan.db")]
    pub database: String,

    /// Currency used for new accounts and for displaying amounts
    #[arg(long, env = "FINPLAN_CURRENCY", default_value = "BRL", global = true)]
    pub currency: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Payee management commands
    #[command(subcommand)]
    Payee(PayeeCommands),

    /// Category management commands
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Transaction commands
    #[command(subcommand)]
    Tx(TransactionCommands),

    /// Monthly totals of planned transactions from today on
    Forecast {
        /// Cutoff date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        today: Option<String>,

        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Month-by-month report for a year
    Report {
        /// Year to report on (defaults to the current year)
        #[arg(short, long)]
        year: Option<i32>,

        /// Restrict the report to one month (1-12)
        #[arg(short, long)]
        month: Option<u32>,

        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Export data: transactions (CSV) or full (JSON)
    Export {
        /// What to export: transactions, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import data: transactions (CSV)
    Import {
        /// What to import: transactions
        import_type: String,

        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Validate rows without importing
        #[arg(long)]
        dry_run: bool,

        /// Create accounts, payees and categories that don't exist
        #[arg(long)]
        create_missing: bool,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a new account
    Add {
        /// Account name (must be unique)
        name: String,

        /// Description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List all accounts
    List,

    /// Show account details and balances
    Show {
        /// Account name
        name: String,
    },

    /// Delete an account without transactions
    Delete {
        /// Account name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum PayeeCommands {
    /// Create a new payee
    Add {
        /// Payee name (must be unique)
        name: String,
    },

    /// List all payees
    List,

    /// Delete a payee
    Delete {
        /// Payee name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Create a new category
    Add {
        /// Category name (must be unique)
        name: String,

        /// Kind of transactions it groups: income, expense
        #[arg(short, long, default_value = "expense")]
        kind: String,

        /// Parent category name
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// Move a category under another parent
    Move {
        /// Category name
        name: String,

        /// New parent category name (top level if omitted)
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// List categories as a tree
    List,

    /// Delete a category without subcategories
    Delete {
        /// Category name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum TransactionCommands {
    /// Record a transaction (planned unless --cleared-on is given)
    Add {
        /// Amount (e.g., "50.00", "50,00" or "50")
        amount: String,

        /// Transaction type: income, expense
        #[arg(short = 't', long = "type")]
        kind: String,

        /// Expected date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Account name
        #[arg(short, long)]
        account: String,

        /// Payee name
        #[arg(short, long)]
        payee: Option<String>,

        /// Category name
        #[arg(short, long)]
        category: Option<String>,

        /// Description
        #[arg(short, long)]
        description: Option<String>,

        /// Record as already cleared on this date (YYYY-MM-DD)
        #[arg(long)]
        cleared_on: Option<String>,
    },

    /// Mark a planned transaction as cleared
    Clear {
        /// Transaction ID
        id: String,

        /// Settlement date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Move a cleared transaction back to planned
    Reopen {
        /// Transaction ID
        id: String,
    },

    /// Delete a transaction
    Delete {
        /// Transaction ID
        id: String,
    },

    /// List transactions ordered by expected date
    List {
        /// Filter by account name
        #[arg(long)]
        account: Option<String>,

        /// Filter by category name
        #[arg(long)]
        category: Option<String>,

        /// Filter by status: planned, cleared
        #[arg(long)]
        status: Option<String>,

        /// Filter from expected date (YYYY-MM-DD)
        #[arg(long)]
        from_date: Option<String>,

        /// Filter to expected date (YYYY-MM-DD)
        #[arg(long)]
        to_date: Option<String>,

        /// Maximum number of transactions to show
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let currency = self.currency.to_uppercase();

        match self.command {
            Commands::Init => {
                FinanceService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Account(cmd) => {
                let service = FinanceService::connect(&self.database).await?;
                run_account_command(&service, cmd, &currency).await?;
            }

            Commands::Payee(cmd) => {
                let service = FinanceService::connect(&self.database).await?;
                run_payee_command(&service, cmd).await?;
            }

            Commands::Category(cmd) => {
                let service = FinanceService::connect(&self.database).await?;
                run_category_command(&service, cmd).await?;
            }

            Commands::Tx(cmd) => {
                let service = FinanceService::connect(&self.database).await?;
                run_transaction_command(&service, cmd, &currency).await?;
            }

            Commands::Forecast { today, format } => {
                let service = FinanceService::connect(&self.database).await?;
                let today = parse_date_or_today(today.as_deref())?;
                run_forecast_command(&service, today, format, &currency).await?;
            }

            Commands::Report {
                year,
                month,
                format,
            } => {
                let service = FinanceService::connect(&self.database).await?;
                let year = year.unwrap_or_else(|| Utc::now().year());
                let report = service.report(year, month).await?;
                print_report(&report, format, &currency)?;
            }

            Commands::Export {
                export_type,
                output,
            } => {
                let service = FinanceService::connect(&self.database).await?;
                run_export_command(&service, &export_type, output.as_deref()).await?;
            }

            Commands::Import {
                import_type,
                input,
                dry_run,
                create_missing,
            } => {
                if import_type != "transactions" {
                    anyhow::bail!(
                        "Invalid import type '{}'. Valid types: transactions",
                        import_type
                    );
                }
                let service = FinanceService::connect(&self.database).await?;
                run_import_command(&service, input.as_deref(), dry_run, create_missing, &currency)
                    .await?;
            }
        }

        Ok(())
    }
}

async fn run_account_command(
    service: &FinanceService,
    cmd: AccountCommands,
    currency: &str,
) -> Result<()> {
    match cmd {
        AccountCommands::Add { name, description } => {
            let account = service
                .create_account(name, currency.to_string(), description)
                .await?;
            println!("Created account: {} ({})", account.name, account.currency);
        }

        AccountCommands::List => {
            let accounts = service.list_accounts().await?;
            if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!("{:<24} {:<8} {}", "NAME", "CURRENCY", "DESCRIPTION");
                println!("{}", "-".repeat(60));
                for account in accounts {
                    println!(
                        "{:<24} {:<8} {}",
                        truncate(&account.name, 24),
                        account.currency,
                        account.description.unwrap_or_default()
                    );
                }
            }
        }

        AccountCommands::Show { name } => {
            let info = service.get_account_info(&name).await?;
            let account = &info.account;

            println!("Account: {}", account.name);
            println!("  ID:              {}", account.id);
            println!("  Currency:        {}", account.currency);
            if let Some(desc) = &account.description {
                println!("  Description:     {}", desc);
            }
            println!(
                "  Created:         {}",
                account.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!();
            println!(
                "  Cleared balance: {}",
                format_money(info.cleared_balance, &account.currency)
            );
            println!(
                "  Planned balance: {}",
                format_money(info.planned_balance, &account.currency)
            );
            println!("  Transactions:    {}", info.transaction_count);
        }

        AccountCommands::Delete { name } => {
            service.delete_account(&name).await?;
            println!("Deleted account: {}", name);
        }
    }
    Ok(())
}

async fn run_payee_command(service: &FinanceService, cmd: PayeeCommands) -> Result<()> {
    match cmd {
        PayeeCommands::Add { name } => {
            let payee = service.create_payee(name).await?;
            println!("Created payee: {}", payee.name);
        }

        PayeeCommands::List => {
            let payees = service.list_payees().await?;
            if payees.is_empty() {
                println!("No payees found.");
            }
            for payee in payees {
                println!("{}", payee.name);
            }
        }

        PayeeCommands::Delete { name } => {
            service.delete_payee(&name).await?;
            println!("Deleted payee: {}", name);
        }
    }
    Ok(())
}

async fn run_category_command(service: &FinanceService, cmd: CategoryCommands) -> Result<()> {
    match cmd {
        CategoryCommands::Add { name, kind, parent } => {
            let kind = kind
                .parse::<TransactionKind>()
                .map_err(|e| anyhow::anyhow!("{}. Valid kinds: income, expense", e))?;
            let category = service
                .create_category(name, kind, parent.as_deref())
                .await?;
            println!("Created category: {} ({})", category.name, category.kind);
        }

        CategoryCommands::Move { name, parent } => {
            let category = service.move_category(&name, parent.as_deref()).await?;
            let tree = service.category_tree().await?;
            println!(
                "Moved category: {}",
                tree.path(category.id).unwrap_or(category.name)
            );
        }

        CategoryCommands::List => {
            let tree = service.category_tree().await?;
            if tree.is_empty() {
                println!("No categories found.");
            }
            for (depth, category) in tree.walk() {
                println!(
                    "{}{} ({})",
                    "  ".repeat(depth),
                    category.name,
                    category.kind
                );
            }
        }

        CategoryCommands::Delete { name } => {
            service.delete_category(&name).await?;
            println!("Deleted category: {}", name);
        }
    }
    Ok(())
}

async fn run_transaction_command(
    service: &FinanceService,
    cmd: TransactionCommands,
    currency: &str,
) -> Result<()> {
    match cmd {
        TransactionCommands::Add {
            amount,
            kind,
            date,
            account,
            payee,
            category,
            description,
            cleared_on,
        } => {
            let amount_cents = parse_amount(&amount)
                .with_context(|| format!("Invalid amount '{}'. Use '50.00' or '50'", amount))?;
            let kind = kind
                .parse::<TransactionKind>()
                .map_err(|e| anyhow::anyhow!("{}. Valid types: income, expense", e))?;
            let expected_date = parse_date_or_today(date.as_deref())?;
            let cleared_date = cleared_on
                .as_deref()
                .map(parse_date)
                .transpose()
                .context("Invalid --cleared-on date")?;

            let tx = service
                .record_transaction(NewTransaction {
                    kind,
                    amount_cents,
                    expected_date,
                    account,
                    payee,
                    category,
                    description,
                    cleared_date,
                })
                .await?;

            let account = service.account_of(&tx).await?;
            println!(
                "Recorded {} {} {} on {} ({})",
                tx.status,
                tx.kind,
                format_money(tx.amount_cents, &account.currency),
                tx.expected_date.format(DATE_FORMAT),
                tx.id
            );
        }

        TransactionCommands::Clear { id, date } => {
            let id = parse_id(&id)?;
            let date = parse_date_or_today(date.as_deref())?;
            let tx = service.clear_transaction(id, date).await?;
            let account = service.account_of(&tx).await?;
            println!(
                "Cleared {} {} on {}",
                tx.kind,
                format_money(tx.amount_cents, &account.currency),
                date.format(DATE_FORMAT)
            );
        }

        TransactionCommands::Reopen { id } => {
            let tx = service.reopen_transaction(parse_id(&id)?).await?;
            println!("Reopened transaction: {}", tx.id);
        }

        TransactionCommands::Delete { id } => {
            let tx = service.delete_transaction(parse_id(&id)?).await?;
            println!("Deleted transaction: {}", tx.id);
        }

        TransactionCommands::List {
            account,
            category,
            status,
            from_date,
            to_date,
            limit,
        } => {
            let status = status
                .map(|s| s.parse::<TransactionStatus>())
                .transpose()
                .map_err(|e| anyhow::anyhow!("{}. Valid statuses: planned, cleared", e))?;
            let filter = TransactionFilter {
                account,
                category,
                status,
                from_date: from_date
                    .as_deref()
                    .map(parse_date)
                    .transpose()
                    .context("Invalid from-date")?,
                to_date: to_date
                    .as_deref()
                    .map(parse_date)
                    .transpose()
                    .context("Invalid to-date")?,
                limit,
            };

            let transactions = service.list_transactions(filter).await?;
            if transactions.is_empty() {
                println!("No transactions found.");
                return Ok(());
            }

            let accounts = service.list_accounts().await?;
            let tree = service.category_tree().await?;

            println!(
                "{:<36} {:<10} {:<8} {:>14} {:<8} {:<16} {:<20}",
                "ID", "DATE", "TYPE", "AMOUNT", "STATUS", "ACCOUNT", "CATEGORY"
            );
            println!("{}", "-".repeat(118));
            for tx in transactions {
                let owner = find_account(&accounts, tx.account_id);
                let account = owner.map(|a| a.name.as_str()).unwrap_or("?");
                let money_currency = owner.map(|a| a.currency.as_str()).unwrap_or(currency);
                let category = tx
                    .category_id
                    .and_then(|id| tree.path(id))
                    .unwrap_or_default();
                println!(
                    "{:<36} {:<10} {:<8} {:>14} {:<8} {:<16} {:<20}",
                    tx.id,
                    tx.expected_date.format(DATE_FORMAT),
                    tx.kind,
                    format_money(tx.amount_cents, money_currency),
                    tx.status,
                    truncate(account, 16),
                    truncate(&category, 20)
                );
            }
        }
    }
    Ok(())
}

async fn run_forecast_command(
    service: &FinanceService,
    today: NaiveDate,
    format: OutputFormat,
    currency: &str,
) -> Result<()> {
    let forecast = service.forecast(today).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&forecast)?);
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            writer.write_record(["month", "income", "expense", "net", "count"])?;
            for month in &forecast.months {
                writer.write_record([
                    month.year_month.to_string(),
                    format_cents(month.income),
                    format_cents(month.expense),
                    format_cents(month.net),
                    month.count.to_string(),
                ])?;
            }
            writer.flush()?;
        }
        OutputFormat::Table => {
            if forecast.is_empty() {
                println!(
                    "No planned transactions from {} on.",
                    today.format(DATE_FORMAT)
                );
                return Ok(());
            }

            println!("Forecast from {}", today.format(DATE_FORMAT));
            println!();
            println!(
                "{:<8} {:>16} {:>16} {:>16} {:>6}",
                "MONTH", "INCOME", "EXPENSE", "NET", "COUNT"
            );
            println!("{}", "-".repeat(66));
            for month in &forecast.months {
                println!(
                    "{:<8} {:>16} {:>16} {:>16} {:>6}",
                    month.year_month,
                    format_money(month.income, currency),
                    format_money(month.expense, currency),
                    format_money(month.net, currency),
                    month.count
                );
            }
            println!("{}", "-".repeat(66));
            println!(
                "{:<8} {:>16} {:>16} {:>16}",
                "TOTAL",
                format_money(forecast.total_income, currency),
                format_money(forecast.total_expense, currency),
                format_money(forecast.net, currency)
            );
        }
    }

    Ok(())
}

fn print_report(report: &YearReport, format: OutputFormat, currency: &str) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            writer.write_record(["month", "income", "expense", "planned", "cleared", "net"])?;
            for month in &report.months {
                writer.write_record([
                    month.year_month.to_string(),
                    format_cents(month.income),
                    format_cents(month.expense),
                    format_cents(month.planned),
                    format_cents(month.cleared),
                    format_cents(month.net),
                ])?;
            }
            writer.flush()?;
        }
        OutputFormat::Table => {
            println!("Report {}", report.period);
            println!();
            println!(
                "{:<8} {:>16} {:>16} {:>16} {:>16} {:>16}",
                "MONTH", "INCOME", "EXPENSE", "PLANNED", "CLEARED", "NET"
            );
            println!("{}", "-".repeat(93));
            for month in &report.months {
                println!(
                    "{:<8} {:>16} {:>16} {:>16} {:>16} {:>16}",
                    month.year_month,
                    format_money(month.income, currency),
                    format_money(month.expense, currency),
                    format_money(month.planned, currency),
                    format_money(month.cleared, currency),
                    format_money(month.net, currency)
                );
            }
            println!("{}", "-".repeat(93));
            let totals = &report.totals;
            println!(
                "{:<8} {:>16} {:>16} {:>16} {:>16} {:>16}",
                "TOTAL",
                format_money(totals.income, currency),
                format_money(totals.expense, currency),
                format_money(totals.planned, currency),
                format_money(totals.cleared, currency),
                format_money(totals.net, currency)
            );
        }
    }
    Ok(())
}

async fn run_export_command(
    service: &FinanceService,
    export_type: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    // Determine output writer
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "transactions" => {
            let count = exporter.export_transactions_csv(writer).await?;
            if output.is_some() {
                eprintln!("Exported {} transactions", count);
            }
        }
        "full" => {
            let export = exporter.export_full_json(writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported {} accounts, {} payees, {} categories, {} transactions",
                    export.accounts.len(),
                    export.payees.len(),
                    export.categories.len(),
                    export.transactions.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: transactions, full",
                export_type
            );
        }
    }

    Ok(())
}

async fn run_import_command(
    service: &FinanceService,
    input: Option<&str>,
    dry_run: bool,
    create_missing: bool,
    currency: &str,
) -> Result<()> {
    use crate::io::{ImportOptions, Importer};
    use std::fs::File;
    use std::io::{Read, stdin};

    let importer = Importer::new(service);

    let reader: Box<dyn Read> = match input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Failed to open input file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdin()),
    };

    let options = ImportOptions {
        dry_run,
        create_missing,
        currency: currency.to_string(),
    };
    let result = importer.import_transactions_csv(reader, &options).await?;

    if dry_run {
        println!("Validation finished");
    } else {
        println!("Import complete");
    }
    println!("  Imported: {}", result.imported);
    println!("  Errors:   {}", result.errors.len());

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in result.errors.iter().take(10) {
            println!(
                "  Line {}: {}{}",
                error.line,
                error
                    .field
                    .as_ref()
                    .map(|f| format!("{}: ", f))
                    .unwrap_or_default(),
                error.error
            );
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more errors", result.errors.len() - 10);
        }
    }

    Ok(())
}

fn find_account(accounts: &[Account], id: AccountId) -> Option<&Account> {
    accounts.iter().find(|a| a.id == id)
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).context("Invalid transaction ID format (expected UUID)")
}

fn parse_date_or_today(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        Some(s) => Ok(parse_date(s)?),
        None => Ok(Utc::now().date_naive()),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Groceries", 20), "Groceries");
        assert_eq!(truncate("Supermercado São João", 12), "Supermerc...");
    }

    #[test]
    fn test_find_account_keeps_its_currency() {
        let brl = Account::new(String::from("Nubank"), String::from("BRL"));
        let usd = Account::new(String::from("Chase"), String::from("usd"));
        let accounts = vec![brl, usd.clone()];

        let owner = find_account(&accounts, usd.id).unwrap();
        assert_eq!(
            format_money(150000, &owner.currency),
            "$1,500.00"
        );
        assert!(find_account(&accounts, Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_cli_parses_report() {
        let cli = Cli::try_parse_from([
            "finplan", "-d", "test.db", "report", "--year", "2025", "--month", "2", "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.database, "test.db");
        match cli.command {
            Commands::Report {
                year,
                month,
                format,
            } => {
                assert_eq!(year, Some(2025));
                assert_eq!(month, Some(2));
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("expected report command"),
        }
    }

    #[test]
    fn test_cli_parses_transaction_add() {
        let cli = Cli::try_parse_from([
            "finplan", "tx", "add", "40,00", "--type", "expense", "--account", "Nubank",
            "--cleared-on", "2025-01-20",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Tx(TransactionCommands::Add { .. })
        ));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
