use thiserror::Error;

use crate::domain::{PeriodError, StatusError, TransactionKind};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0} name must not be empty")]
    EmptyName(&'static str),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    #[error("Account '{name}' still has {transactions} transaction(s)")]
    AccountInUse { name: String, transactions: i64 },

    #[error("Payee not found: {0}")]
    PayeeNotFound(String),

    #[error("Payee already exists: {0}")]
    PayeeAlreadyExists(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Category already exists: {0}")]
    CategoryAlreadyExists(String),

    #[error("Category '{0}' has subcategories")]
    CategoryHasChildren(String),

    #[error("Category '{category}' cannot be placed under '{parent}': it would become its own ancestor")]
    CategoryCycle { category: String, parent: String },

    #[error("Category '{category}' is for {expected} but {found} was given")]
    CategoryKindMismatch {
        category: String,
        expected: TransactionKind,
        found: TransactionKind,
    },

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error(transparent)]
    InvalidStatus(#[from] StatusError),

    #[error("Invalid report period: {0}")]
    InvalidPeriod(#[from] PeriodError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
