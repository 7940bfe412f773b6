use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Account, AccountId, Category, Cents, ForecastBucket, Payee, PayeeId, Transaction,
};

/// Immutable set of rows loaded together for one computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub taken_at: DateTime<Utc>,
    pub accounts: Vec<Account>,
    pub payees: Vec<Payee>,
    pub categories: Vec<Category>,
    /// Sorted by expected date
    pub transactions: Vec<Transaction>,
}

impl LedgerSnapshot {
    pub fn account_names(&self) -> HashMap<AccountId, &str> {
        self.accounts
            .iter()
            .map(|a| (a.id, a.name.as_str()))
            .collect()
    }

    pub fn payee_names(&self) -> HashMap<PayeeId, &str> {
        self.payees.iter().map(|p| (p.id, p.name.as_str())).collect()
    }
}

/// Forward-looking aggregation of planned transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    pub today: NaiveDate,
    pub months: Vec<ForecastBucket>,
    pub total_income: Cents,
    pub total_expense: Cents,
    pub net: Cents,
}

impl Forecast {
    pub fn new(today: NaiveDate, months: Vec<ForecastBucket>) -> Self {
        let total_income = months
            .iter()
            .fold(0 as Cents, |sum, m| sum.saturating_add(m.income));
        let total_expense = months
            .iter()
            .fold(0 as Cents, |sum, m| sum.saturating_add(m.expense));
        Self {
            today,
            months,
            total_income,
            total_expense,
            net: total_income.saturating_sub(total_expense),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }
}

/// Account details with its balances.
#[derive(Debug, Clone, Serialize)]
pub struct AccountInfo {
    pub account: Account,
    /// Sum of cleared transactions
    pub cleared_balance: Cents,
    /// Cleared balance plus everything still planned
    pub planned_balance: Cents,
    pub transaction_count: i64,
}
