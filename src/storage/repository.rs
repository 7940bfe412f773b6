use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::domain::{
    Account, AccountId, Category, CategoryId, Cents, DATE_FORMAT, Payee, PayeeId, Transaction,
    TransactionId, TransactionKind, TransactionStatus,
};

use super::{MAX_ROWS, MIGRATION_001_INITIAL, MIGRATION_002_TRANSACTIONS};

const TRANSACTION_COLUMNS: &str = "id, kind, amount_cents, expected_date, status, cleared_date, account_id, payee_id, category_id, description, created_at";

/// Filters for listing transactions. Dates are inclusive.
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    pub account_id: Option<AccountId>,
    pub category_id: Option<CategoryId>,
    pub status: Option<TransactionStatus>,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub limit: Option<usize>,
}

/// Planned and cleared totals for one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountTotals {
    pub cleared_balance: Cents,
    pub planned_balance: Cents,
    pub transaction_count: i64,
}

/// Repository for persisting and querying accounts, payees, categories and
/// transactions.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        sqlx::query(MIGRATION_002_TRANSACTIONS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 002")?;

        debug!("database migrations applied");
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Account operations
    // ========================

    pub async fn save_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, name, currency, description, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(&account.name)
        .bind(&account.currency)
        .bind(&account.description)
        .bind(account.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;
        Ok(())
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, name, currency, description, created_at FROM accounts WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    pub async fn get_account_by_name(&self, name: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, name, currency, description, created_at FROM accounts WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account by name")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            "SELECT id, name, currency, description, created_at FROM accounts ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    pub async fn delete_account(&self, id: AccountId) -> Result<()> {
        sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete account")?;
        Ok(())
    }

    /// Balances for an account using SQL aggregation.
    /// The planned balance includes cleared transactions plus the ones still planned.
    pub async fn account_totals(&self, id: AccountId) -> Result<AccountTotals> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status = 'cleared' AND kind = 'income' THEN amount_cents
                                  WHEN status = 'cleared' AND kind = 'expense' THEN -amount_cents
                                  ELSE 0 END), 0) as cleared_balance,
                COALESCE(SUM(CASE WHEN kind = 'income' THEN amount_cents
                                  ELSE -amount_cents END), 0) as planned_balance,
                COUNT(*) as transaction_count
            FROM transactions
            WHERE account_id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute account totals")?;

        Ok(AccountTotals {
            cleared_balance: row.get("cleared_balance"),
            planned_balance: row.get("planned_balance"),
            transaction_count: row.get("transaction_count"),
        })
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(Account {
            id: Uuid::parse_str(&id_str).context("Invalid account ID")?,
            name: row.get("name"),
            currency: row.get("currency"),
            description: row.get("description"),
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    // ========================
    // Payee operations
    // ========================

    pub async fn save_payee(&self, payee: &Payee) -> Result<()> {
        sqlx::query("INSERT INTO payees (id, name, created_at) VALUES (?, ?, ?)")
            .bind(payee.id.to_string())
            .bind(&payee.name)
            .bind(payee.created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .context("Failed to save payee")?;
        Ok(())
    }

    pub async fn get_payee(&self, id: PayeeId) -> Result<Option<Payee>> {
        let row = sqlx::query("SELECT id, name, created_at FROM payees WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch payee")?;

        row.as_ref().map(Self::row_to_payee).transpose()
    }

    pub async fn get_payee_by_name(&self, name: &str) -> Result<Option<Payee>> {
        let row = sqlx::query("SELECT id, name, created_at FROM payees WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch payee by name")?;

        row.as_ref().map(Self::row_to_payee).transpose()
    }

    pub async fn list_payees(&self) -> Result<Vec<Payee>> {
        let rows = sqlx::query("SELECT id, name, created_at FROM payees ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list payees")?;

        rows.iter().map(Self::row_to_payee).collect()
    }

    /// Delete a payee, detaching it from any transaction first.
    pub async fn delete_payee(&self, id: PayeeId) -> Result<u64> {
        let detached = sqlx::query("UPDATE transactions SET payee_id = NULL WHERE payee_id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to detach payee from transactions")?
            .rows_affected();

        sqlx::query("DELETE FROM payees WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete payee")?;
        Ok(detached)
    }

    fn row_to_payee(row: &sqlx::sqlite::SqliteRow) -> Result<Payee> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(Payee {
            id: Uuid::parse_str(&id_str).context("Invalid payee ID")?,
            name: row.get("name"),
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    // ========================
    // Category operations
    // ========================

    pub async fn save_category(&self, category: &Category) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, kind, parent_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(category.id.to_string())
        .bind(&category.name)
        .bind(category.kind.as_str())
        .bind(category.parent_id.map(|id| id.to_string()))
        .bind(category.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save category")?;
        Ok(())
    }

    pub async fn get_category(&self, id: CategoryId) -> Result<Option<Category>> {
        let row = sqlx::query(
            "SELECT id, name, kind, parent_id, created_at FROM categories WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch category")?;

        row.as_ref().map(Self::row_to_category).transpose()
    }

    pub async fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let row = sqlx::query(
            "SELECT id, name, kind, parent_id, created_at FROM categories WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch category by name")?;

        row.as_ref().map(Self::row_to_category).transpose()
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query(
            "SELECT id, name, kind, parent_id, created_at FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list categories")?;

        rows.iter().map(Self::row_to_category).collect()
    }

    pub async fn update_category_parent(
        &self,
        id: CategoryId,
        parent_id: Option<CategoryId>,
    ) -> Result<()> {
        sqlx::query("UPDATE categories SET parent_id = ? WHERE id = ?")
            .bind(parent_id.map(|id| id.to_string()))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update category parent")?;
        Ok(())
    }

    /// Delete a category, detaching it from any transaction first.
    pub async fn delete_category(&self, id: CategoryId) -> Result<u64> {
        let detached =
            sqlx::query("UPDATE transactions SET category_id = NULL WHERE category_id = ?")
                .bind(id.to_string())
                .execute(&self.pool)
                .await
                .context("Failed to detach category from transactions")?
                .rows_affected();

        sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete category")?;
        Ok(detached)
    }

    fn row_to_category(row: &sqlx::sqlite::SqliteRow) -> Result<Category> {
        let id_str: String = row.get("id");
        let kind_str: String = row.get("kind");
        let parent_str: Option<String> = row.get("parent_id");
        let created_at_str: String = row.get("created_at");

        Ok(Category {
            id: Uuid::parse_str(&id_str).context("Invalid category ID")?,
            name: row.get("name"),
            kind: kind_str
                .parse::<TransactionKind>()
                .map_err(|e| anyhow::anyhow!("Invalid category kind: {}", e))?,
            parent_id: parent_str
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("Invalid parent category ID")?,
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    // ========================
    // Transaction operations
    // ========================

    pub async fn save_transaction(&self, tx: &Transaction) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO transactions ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            TRANSACTION_COLUMNS
        ))
        .bind(tx.id.to_string())
        .bind(tx.kind.as_str())
        .bind(tx.amount_cents)
        .bind(tx.expected_date.format(DATE_FORMAT).to_string())
        .bind(tx.status.as_str())
        .bind(tx.cleared_date.map(|d| d.format(DATE_FORMAT).to_string()))
        .bind(tx.account_id.to_string())
        .bind(tx.payee_id.map(|id| id.to_string()))
        .bind(tx.category_id.map(|id| id.to_string()))
        .bind(&tx.description)
        .bind(tx.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save transaction")?;
        Ok(())
    }

    /// Persist the status fields of a transaction.
    pub async fn update_transaction_status(&self, tx: &Transaction) -> Result<()> {
        sqlx::query("UPDATE transactions SET status = ?, cleared_date = ? WHERE id = ?")
            .bind(tx.status.as_str())
            .bind(tx.cleared_date.map(|d| d.format(DATE_FORMAT).to_string()))
            .bind(tx.id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update transaction status")?;
        Ok(())
    }

    pub async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM transactions WHERE id = ?",
            TRANSACTION_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch transaction")?;

        row.as_ref().map(Self::row_to_transaction).transpose()
    }

    pub async fn delete_transaction(&self, id: TransactionId) -> Result<()> {
        sqlx::query("DELETE FROM transactions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete transaction")?;
        Ok(())
    }

    /// List transactions matching the query, ordered by expected date.
    /// At most [`MAX_ROWS`] rows are returned whatever the requested limit.
    pub async fn list_transactions(&self, query: &TransactionQuery) -> Result<Vec<Transaction>> {
        let limit = query.limit.unwrap_or(MAX_ROWS).min(MAX_ROWS);
        self.select_transactions(query, Some(limit)).await
    }

    /// Every transaction matching the query's filters, ordered by expected
    /// date. `query.limit` is ignored: aggregation and export need all rows.
    pub async fn load_transactions(&self, query: &TransactionQuery) -> Result<Vec<Transaction>> {
        self.select_transactions(query, None).await
    }

    async fn select_transactions(
        &self,
        query: &TransactionQuery,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>> {
        let mut sql = format!("SELECT {} FROM transactions WHERE 1=1", TRANSACTION_COLUMNS);

        // Collect all string bindings first so they live long enough
        let account_str = query.account_id.map(|id| id.to_string());
        let category_str = query.category_id.map(|id| id.to_string());
        let from_str = query.from_date.map(|d| d.format(DATE_FORMAT).to_string());
        let to_str = query.to_date.map(|d| d.format(DATE_FORMAT).to_string());

        if account_str.is_some() {
            sql.push_str(" AND account_id = ?");
        }
        if category_str.is_some() {
            sql.push_str(" AND category_id = ?");
        }
        if query.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        // ISO dates compare correctly as text
        if from_str.is_some() {
            sql.push_str(" AND expected_date >= ?");
        }
        if to_str.is_some() {
            sql.push_str(" AND expected_date <= ?");
        }

        sql.push_str(" ORDER BY expected_date, created_at");
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut sql_query = sqlx::query(&sql);
        if let Some(ref s) = account_str {
            sql_query = sql_query.bind(s);
        }
        if let Some(ref s) = category_str {
            sql_query = sql_query.bind(s);
        }
        if let Some(status) = query.status {
            sql_query = sql_query.bind(status.as_str());
        }
        if let Some(ref s) = from_str {
            sql_query = sql_query.bind(s);
        }
        if let Some(ref s) = to_str {
            sql_query = sql_query.bind(s);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions")?;

        debug!(rows = rows.len(), ?limit, "selected transactions");
        rows.iter().map(Self::row_to_transaction).collect()
    }

    fn row_to_transaction(row: &sqlx::sqlite::SqliteRow) -> Result<Transaction> {
        let id_str: String = row.get("id");
        let kind_str: String = row.get("kind");
        let status_str: String = row.get("status");
        let expected_str: String = row.get("expected_date");
        let cleared_str: Option<String> = row.get("cleared_date");
        let account_str: String = row.get("account_id");
        let payee_str: Option<String> = row.get("payee_id");
        let category_str: Option<String> = row.get("category_id");
        let created_at_str: String = row.get("created_at");

        let tx = Transaction {
            id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
            kind: kind_str
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid transaction kind: {}", e))?,
            amount_cents: row.get("amount_cents"),
            expected_date: parse_stored_date(&expected_str)?,
            status: status_str
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid transaction status: {}", e))?,
            cleared_date: cleared_str
                .as_deref()
                .map(parse_stored_date)
                .transpose()?,
            account_id: Uuid::parse_str(&account_str).context("Invalid account ID")?,
            payee_id: payee_str
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("Invalid payee ID")?,
            category_id: category_str
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("Invalid category ID")?,
            description: row.get("description"),
            created_at: parse_timestamp(&created_at_str)?,
        };

        tx.validate().context("Corrupt transaction row")?;
        Ok(tx)
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid timestamp: {}", s))?
        .with_timezone(&Utc))
}

fn parse_stored_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).with_context(|| format!("Invalid date: {}", s))
}
