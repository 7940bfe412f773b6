mod repository;

pub use repository::*;

/// SQL migration for accounts, payees and categories
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// SQL migration for transactions
pub const MIGRATION_002_TRANSACTIONS: &str = include_str!("migrations/002_transactions.sql");

/// Upper bound on rows returned by a single listing query.
pub const MAX_ROWS: usize = 1000;
