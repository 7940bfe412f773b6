// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::NaiveDate;
use finplan::application::{FinanceService, NewTransaction};
use finplan::domain::{Transaction, TransactionKind};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(FinanceService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = FinanceService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into NaiveDate
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// Build a planned transaction request against the given account.
pub fn new_tx(kind: TransactionKind, amount: i64, date: &str, account: &str) -> NewTransaction {
    NewTransaction {
        kind,
        amount_cents: amount,
        expected_date: parse_date(date),
        account: account.to_string(),
        payee: None,
        category: None,
        description: None,
        cleared_date: None,
    }
}

/// Record a planned transaction on the "Nubank" account.
pub async fn plan(
    service: &FinanceService,
    kind: TransactionKind,
    amount: i64,
    date: &str,
) -> Result<Transaction> {
    Ok(service
        .record_transaction(new_tx(kind, amount, date, "Nubank"))
        .await?)
}

/// Record a transaction on the "Nubank" account that already cleared.
pub async fn settle(
    service: &FinanceService,
    kind: TransactionKind,
    amount: i64,
    date: &str,
    cleared: &str,
) -> Result<Transaction> {
    let mut new = new_tx(kind, amount, date, "Nubank");
    new.cleared_date = Some(parse_date(cleared));
    Ok(service.record_transaction(new).await?)
}

/// Test fixture: accounts, payees and categories shared by most tests
pub struct StandardSetup;

impl StandardSetup {
    /// Create the "Nubank" and "Wallet" accounts
    pub async fn create_accounts(service: &FinanceService) -> Result<()> {
        service
            .create_account("Nubank".into(), "BRL".into(), None)
            .await?;
        service
            .create_account("Wallet".into(), "BRL".into(), Some("Cash".into()))
            .await?;
        Ok(())
    }

    /// Accounts plus payees and a small category tree:
    /// Salary (income), Housing > Rent and Groceries (expense)
    pub async fn create_full(service: &FinanceService) -> Result<()> {
        Self::create_accounts(service).await?;
        service.create_payee("ACME Corp".into()).await?;
        service.create_payee("Landlord".into()).await?;
        service
            .create_category("Salary".into(), TransactionKind::Income, None)
            .await?;
        service
            .create_category("Housing".into(), TransactionKind::Expense, None)
            .await?;
        service
            .create_category("Rent".into(), TransactionKind::Expense, Some("Housing"))
            .await?;
        service
            .create_category("Groceries".into(), TransactionKind::Expense, None)
            .await?;
        Ok(())
    }
}
