use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use crate::domain::{
    Account, Category, CategoryTree, Cents, MAX_AMOUNT, Payee, ReportPeriod, Transaction,
    TransactionId, TransactionKind, TransactionStatus, YearReport, compute_forecast,
    compute_report,
};
use crate::storage::{Repository, TransactionQuery};

use super::{AccountInfo, AppError, Forecast, LedgerSnapshot};

/// Application service providing high-level operations for the tracker.
/// This is the primary interface for any client (CLI, importer, tests).
pub struct FinanceService {
    repo: Repository,
}

/// Input for recording a transaction. Names are resolved by the service.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub amount_cents: Cents,
    pub expected_date: NaiveDate,
    pub account: String,
    pub payee: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    /// Record the transaction as already cleared on this date
    pub cleared_date: Option<NaiveDate>,
}

/// Filter for querying transactions
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub account: Option<String>,
    pub category: Option<String>,
    pub status: Option<TransactionStatus>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub limit: Option<usize>,
}

impl FinanceService {
    /// Create a new service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        info!(database = database_path, "database initialized");
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        debug!(database = database_path, "connected");
        Ok(Self::new(repo))
    }

    // ========================
    // Account operations
    // ========================

    pub async fn create_account(
        &self,
        name: String,
        currency: String,
        description: Option<String>,
    ) -> Result<Account, AppError> {
        let name = require_name("Account", name)?;
        if self.repo.get_account_by_name(&name).await?.is_some() {
            return Err(AppError::AccountAlreadyExists(name));
        }

        let mut account = Account::new(name, currency);
        if let Some(desc) = description {
            account = account.with_description(desc);
        }

        self.repo.save_account(&account).await?;
        info!(account = %account.name, "created account");
        Ok(account)
    }

    pub async fn get_account(&self, name: &str) -> Result<Account, AppError> {
        self.repo
            .get_account_by_name(name)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(name.to_string()))
    }

    pub async fn get_account_info(&self, name: &str) -> Result<AccountInfo, AppError> {
        let account = self.get_account(name).await?;
        let totals = self.repo.account_totals(account.id).await?;
        Ok(AccountInfo {
            account,
            cleared_balance: totals.cleared_balance,
            planned_balance: totals.planned_balance,
            transaction_count: totals.transaction_count,
        })
    }

    /// The account a transaction belongs to.
    pub async fn account_of(&self, tx: &Transaction) -> Result<Account, AppError> {
        self.repo
            .get_account(tx.account_id)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(tx.account_id.to_string()))
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_accounts().await?)
    }

    /// Delete an account. Accounts that still have transactions are kept.
    pub async fn delete_account(&self, name: &str) -> Result<Account, AppError> {
        let account = self.get_account(name).await?;
        let totals = self.repo.account_totals(account.id).await?;
        if totals.transaction_count > 0 {
            return Err(AppError::AccountInUse {
                name: account.name,
                transactions: totals.transaction_count,
            });
        }
        self.repo.delete_account(account.id).await?;
        info!(account = %account.name, "deleted account");
        Ok(account)
    }

    // ========================
    // Payee operations
    // ========================

    pub async fn create_payee(&self, name: String) -> Result<Payee, AppError> {
        let name = require_name("Payee", name)?;
        if self.repo.get_payee_by_name(&name).await?.is_some() {
            return Err(AppError::PayeeAlreadyExists(name));
        }
        let payee = Payee::new(name);
        self.repo.save_payee(&payee).await?;
        info!(payee = %payee.name, "created payee");
        Ok(payee)
    }

    pub async fn get_payee(&self, name: &str) -> Result<Payee, AppError> {
        self.repo
            .get_payee_by_name(name)
            .await?
            .ok_or_else(|| AppError::PayeeNotFound(name.to_string()))
    }

    pub async fn list_payees(&self) -> Result<Vec<Payee>, AppError> {
        Ok(self.repo.list_payees().await?)
    }

    /// Delete a payee. Transactions that referenced it keep no payee.
    pub async fn delete_payee(&self, name: &str) -> Result<Payee, AppError> {
        let payee = self.get_payee(name).await?;
        let detached = self.repo.delete_payee(payee.id).await?;
        info!(payee = %payee.name, detached, "deleted payee");
        Ok(payee)
    }

    // ========================
    // Category operations
    // ========================

    /// Create a category, optionally under a parent of the same kind.
    pub async fn create_category(
        &self,
        name: String,
        kind: TransactionKind,
        parent: Option<&str>,
    ) -> Result<Category, AppError> {
        let name = require_name("Category", name)?;
        if self.repo.get_category_by_name(&name).await?.is_some() {
            return Err(AppError::CategoryAlreadyExists(name));
        }

        let mut category = Category::new(name, kind);
        if let Some(parent_name) = parent {
            let parent = self.get_category(parent_name).await?;
            if parent.kind != kind {
                return Err(AppError::CategoryKindMismatch {
                    category: parent.name,
                    expected: parent.kind,
                    found: kind,
                });
            }
            category = category.with_parent(parent.id);
        }

        self.repo.save_category(&category).await?;
        info!(category = %category.name, kind = %category.kind, "created category");
        Ok(category)
    }

    pub async fn get_category(&self, name: &str) -> Result<Category, AppError> {
        self.repo
            .get_category_by_name(name)
            .await?
            .ok_or_else(|| AppError::CategoryNotFound(name.to_string()))
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        Ok(self.repo.list_categories().await?)
    }

    pub async fn category_tree(&self) -> Result<CategoryTree, AppError> {
        Ok(CategoryTree::build(self.repo.list_categories().await?))
    }

    /// Move a category under a new parent, or to the top level with `None`.
    pub async fn move_category(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<Category, AppError> {
        let mut category = self.get_category(name).await?;
        let parent_id = match parent {
            Some(parent_name) => {
                let parent = self.get_category(parent_name).await?;
                if parent.kind != category.kind {
                    return Err(AppError::CategoryKindMismatch {
                        category: parent.name,
                        expected: parent.kind,
                        found: category.kind,
                    });
                }
                let tree = self.category_tree().await?;
                if tree.would_cycle(category.id, parent.id) {
                    return Err(AppError::CategoryCycle {
                        category: category.name,
                        parent: parent.name,
                    });
                }
                Some(parent.id)
            }
            None => None,
        };

        self.repo.update_category_parent(category.id, parent_id).await?;
        category.parent_id = parent_id;
        info!(category = %category.name, parent = ?parent, "moved category");
        Ok(category)
    }

    /// Delete a leaf category. Transactions that referenced it keep no category.
    pub async fn delete_category(&self, name: &str) -> Result<Category, AppError> {
        let category = self.get_category(name).await?;
        let tree = self.category_tree().await?;
        if tree.has_children(category.id) {
            return Err(AppError::CategoryHasChildren(category.name));
        }
        let detached = self.repo.delete_category(category.id).await?;
        info!(category = %category.name, detached, "deleted category");
        Ok(category)
    }

    // ========================
    // Transaction operations
    // ========================

    /// Record a transaction, planned unless a cleared date is given.
    pub async fn record_transaction(&self, new: NewTransaction) -> Result<Transaction, AppError> {
        if new.amount_cents < 0 {
            return Err(AppError::InvalidAmount(
                "Amount must not be negative".to_string(),
            ));
        }
        if new.amount_cents > MAX_AMOUNT {
            return Err(AppError::InvalidAmount(format!(
                "Amount must not exceed {} cents",
                MAX_AMOUNT
            )));
        }

        let account = self.get_account(&new.account).await?;
        let mut tx = Transaction::planned(
            new.kind,
            new.amount_cents,
            new.expected_date,
            account.id,
        );

        if let Some(payee_name) = &new.payee {
            tx = tx.with_payee(self.get_payee(payee_name).await?.id);
        }
        if let Some(category_name) = &new.category {
            let category = self.get_category(category_name).await?;
            if category.kind != new.kind {
                return Err(AppError::CategoryKindMismatch {
                    category: category.name,
                    expected: category.kind,
                    found: new.kind,
                });
            }
            tx = tx.with_category(category.id);
        }
        if let Some(desc) = new.description {
            tx = tx.with_description(desc);
        }
        if let Some(date) = new.cleared_date {
            tx.clear(date)?;
        }

        self.repo.save_transaction(&tx).await?;
        info!(
            id = %tx.id,
            kind = %tx.kind,
            amount = tx.amount_cents,
            status = %tx.status,
            "recorded transaction"
        );
        Ok(tx)
    }

    pub async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, AppError> {
        self.repo
            .get_transaction(id)
            .await?
            .ok_or_else(|| AppError::TransactionNotFound(id.to_string()))
    }

    /// Mark a planned transaction as cleared on `date`.
    pub async fn clear_transaction(
        &self,
        id: TransactionId,
        date: NaiveDate,
    ) -> Result<Transaction, AppError> {
        let mut tx = self.get_transaction(id).await?;
        tx.clear(date)?;
        self.repo.update_transaction_status(&tx).await?;
        info!(id = %tx.id, cleared_date = %date, "cleared transaction");
        Ok(tx)
    }

    /// Move a cleared transaction back to planned.
    pub async fn reopen_transaction(&self, id: TransactionId) -> Result<Transaction, AppError> {
        let mut tx = self.get_transaction(id).await?;
        tx.reopen()?;
        self.repo.update_transaction_status(&tx).await?;
        info!(id = %tx.id, "reopened transaction");
        Ok(tx)
    }

    pub async fn delete_transaction(&self, id: TransactionId) -> Result<Transaction, AppError> {
        let tx = self.get_transaction(id).await?;
        self.repo.delete_transaction(id).await?;
        info!(id = %tx.id, "deleted transaction");
        Ok(tx)
    }

    /// List transactions with filters, ordered by expected date.
    pub async fn list_transactions(
        &self,
        filter: TransactionFilter,
    ) -> Result<Vec<Transaction>, AppError> {
        let query = self.resolve_filter(filter).await?;
        Ok(self.repo.list_transactions(&query).await?)
    }

    async fn resolve_filter(&self, filter: TransactionFilter) -> Result<TransactionQuery, AppError> {
        // Resolve names to IDs
        let account_id = match &filter.account {
            Some(name) => Some(self.get_account(name).await?.id),
            None => None,
        };
        let category_id = match &filter.category {
            Some(name) => Some(self.get_category(name).await?.id),
            None => None,
        };

        Ok(TransactionQuery {
            account_id,
            category_id,
            status: filter.status,
            from_date: filter.from_date,
            to_date: filter.to_date,
            limit: filter.limit,
        })
    }

    // ========================
    // Aggregation
    // ========================

    /// Load accounts, payees, categories and every matching transaction
    /// concurrently. The row cap of listings does not apply here. The first
    /// failing fetch aborts the whole load.
    pub async fn load_snapshot(&self, query: &TransactionQuery) -> Result<LedgerSnapshot, AppError> {
        let (accounts, payees, categories, transactions) = tokio::try_join!(
            self.repo.list_accounts(),
            self.repo.list_payees(),
            self.repo.list_categories(),
            self.repo.load_transactions(query),
        )?;

        debug!(
            accounts = accounts.len(),
            payees = payees.len(),
            categories = categories.len(),
            transactions = transactions.len(),
            "loaded snapshot"
        );

        Ok(LedgerSnapshot {
            taken_at: Utc::now(),
            accounts,
            payees,
            categories,
            transactions,
        })
    }

    /// Monthly totals of planned transactions due on or after `today`.
    pub async fn forecast(&self, today: NaiveDate) -> Result<Forecast, AppError> {
        let snapshot = self
            .load_snapshot(&TransactionQuery {
                status: Some(TransactionStatus::Planned),
                from_date: Some(today),
                ..Default::default()
            })
            .await?;

        let months = compute_forecast(&snapshot.transactions, today);
        debug!(months = months.len(), %today, "computed forecast");
        Ok(Forecast::new(today, months))
    }

    /// Monthly report for a year, optionally restricted to one month.
    pub async fn report(&self, year: i32, month: Option<u32>) -> Result<YearReport, AppError> {
        let period = ReportPeriod::new(year, month)?;
        let (from_date, to_date) = period.bounds();
        let snapshot = self
            .load_snapshot(&TransactionQuery {
                from_date: Some(from_date),
                to_date: Some(to_date),
                ..Default::default()
            })
            .await?;

        let report = compute_report(&snapshot.transactions, &period);
        debug!(%period, transactions = snapshot.transactions.len(), "computed report");
        Ok(report)
    }
}

fn require_name(what: &'static str, name: String) -> Result<String, AppError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::EmptyName(what));
    }
    Ok(trimmed.to_string())
}
