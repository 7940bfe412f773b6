use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{AccountId, CategoryId, Cents, MAX_AMOUNT, PayeeId};

pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            other => Err(format!("unknown transaction type '{}'", other)),
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Recorded but not settled yet
    Planned,
    /// Settled on `cleared_date`
    Cleared,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Planned => "planned",
            TransactionStatus::Cleared => "cleared",
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "planned" => Ok(TransactionStatus::Planned),
            "cleared" => Ok(TransactionStatus::Cleared),
            other => Err(format!("unknown transaction status '{}'", other)),
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single income or expense entry against an account.
///
/// A transaction starts out planned for its `expected_date` and becomes
/// cleared once it settles. `cleared_date` is set if and only if the status
/// is [`TransactionStatus::Cleared`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Amount in cents (never negative, the kind carries the sign)
    pub amount_cents: Cents,
    /// When the transaction is due, or was due
    pub expected_date: NaiveDate,
    pub status: TransactionStatus,
    pub cleared_date: Option<NaiveDate>,
    pub account_id: AccountId,
    pub payee_id: Option<PayeeId>,
    pub category_id: Option<CategoryId>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a planned transaction.
    pub fn planned(
        kind: TransactionKind,
        amount_cents: Cents,
        expected_date: NaiveDate,
        account_id: AccountId,
    ) -> Self {
        assert!(amount_cents >= 0, "Transaction amount must not be negative");
        Self {
            id: Uuid::new_v4(),
            kind,
            amount_cents,
            expected_date,
            status: TransactionStatus::Planned,
            cleared_date: None,
            account_id,
            payee_id: None,
            category_id: None,
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_payee(mut self, payee_id: PayeeId) -> Self {
        self.payee_id = Some(payee_id);
        self
    }

    pub fn with_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_planned(&self) -> bool {
        self.status == TransactionStatus::Planned
    }

    pub fn is_cleared(&self) -> bool {
        self.status == TransactionStatus::Cleared
    }

    /// Amount with income positive and expense negative.
    pub fn signed_amount(&self) -> Cents {
        match self.kind {
            TransactionKind::Income => self.amount_cents,
            TransactionKind::Expense => -self.amount_cents,
        }
    }

    /// Mark the transaction as settled on `date`.
    pub fn clear(&mut self, date: NaiveDate) -> Result<(), StatusError> {
        if self.is_cleared() {
            return Err(StatusError::AlreadyCleared(self.id));
        }
        self.status = TransactionStatus::Cleared;
        self.cleared_date = Some(date);
        Ok(())
    }

    /// Move a cleared transaction back to planned.
    pub fn reopen(&mut self) -> Result<(), StatusError> {
        if self.is_planned() {
            return Err(StatusError::NotCleared(self.id));
        }
        self.status = TransactionStatus::Planned;
        self.cleared_date = None;
        Ok(())
    }

    /// Check the record invariants. Used on rows read back from storage.
    pub fn validate(&self) -> Result<(), StatusError> {
        if self.amount_cents < 0 {
            return Err(StatusError::NegativeAmount(self.id));
        }
        if self.amount_cents > MAX_AMOUNT {
            return Err(StatusError::AmountTooLarge(self.id));
        }
        match (self.status, self.cleared_date) {
            (TransactionStatus::Cleared, None) => Err(StatusError::MissingClearedDate(self.id)),
            (TransactionStatus::Planned, Some(_)) => {
                Err(StatusError::UnexpectedClearedDate(self.id))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    #[error("transaction {0} is already cleared")]
    AlreadyCleared(TransactionId),
    #[error("transaction {0} is not cleared")]
    NotCleared(TransactionId),
    #[error("transaction {0} has a negative amount")]
    NegativeAmount(TransactionId),
    #[error("transaction {0} exceeds the maximum amount")]
    AmountTooLarge(TransactionId),
    #[error("cleared transaction {0} has no cleared date")]
    MissingClearedDate(TransactionId),
    #[error("planned transaction {0} has a cleared date")]
    UnexpectedClearedDate(TransactionId),
}
