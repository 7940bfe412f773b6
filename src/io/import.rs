use anyhow::Result;
use serde::Deserialize;
use std::io::Read;
use tracing::{debug, warn};

use crate::application::{AppError, FinanceService, NewTransaction};
use crate::domain::{TransactionKind, TransactionStatus, parse_amount, parse_date};

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred during import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

impl ImportError {
    fn field(line: usize, field: &str, error: impl Into<String>) -> Self {
        Self {
            line,
            field: Some(field.to_string()),
            error: error.into(),
        }
    }
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Validate every row without writing anything
    pub dry_run: bool,
    /// Create accounts, payees and categories that don't exist yet
    pub create_missing: bool,
    /// Currency for accounts created during import
    pub currency: String,
}

/// One CSV row, exactly as read. Every field is text until validated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: String,
    pub expected_date: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub cleared_date: String,
    pub account: String,
    #[serde(default)]
    pub payee: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
}

/// Validate a raw record into a transaction request.
pub fn parse_record(line: usize, record: &TransactionRecord) -> Result<NewTransaction, ImportError> {
    let kind = record
        .kind
        .parse::<TransactionKind>()
        .map_err(|e: String| ImportError::field(line, "type", e))?;

    let amount_cents = parse_amount(&record.amount)
        .map_err(|e| ImportError::field(line, "amount", e.to_string()))?;

    let expected_date = parse_date(&record.expected_date)
        .map_err(|e| ImportError::field(line, "expected_date", e.to_string()))?;

    let status = match non_empty(&record.status) {
        Some(s) => s
            .parse::<TransactionStatus>()
            .map_err(|e: String| ImportError::field(line, "status", e))?,
        None => TransactionStatus::Planned,
    };

    let cleared_date = match (status, non_empty(&record.cleared_date)) {
        (TransactionStatus::Cleared, Some(s)) => Some(
            parse_date(&s).map_err(|e| ImportError::field(line, "cleared_date", e.to_string()))?,
        ),
        (TransactionStatus::Cleared, None) => {
            return Err(ImportError::field(
                line,
                "cleared_date",
                "cleared transactions need a cleared date",
            ));
        }
        (TransactionStatus::Planned, Some(_)) => {
            return Err(ImportError::field(
                line,
                "cleared_date",
                "planned transactions cannot have a cleared date",
            ));
        }
        (TransactionStatus::Planned, None) => None,
    };

    let account = non_empty(&record.account)
        .ok_or_else(|| ImportError::field(line, "account", "account is required"))?;

    Ok(NewTransaction {
        kind,
        amount_cents,
        expected_date,
        account,
        payee: non_empty(&record.payee),
        category: non_empty(&record.category),
        description: non_empty(&record.description),
        cleared_date,
    })
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Importer for loading transactions into the tracker
pub struct Importer<'a> {
    service: &'a FinanceService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a FinanceService) -> Self {
        Self { service }
    }

    /// Import transactions from CSV with a header row.
    pub async fn import_transactions_csv<R: Read>(
        &self,
        reader: R,
        options: &ImportOptions,
    ) -> Result<ImportResult> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut result = ImportResult::default();

        for (index, row) in csv_reader.deserialize::<TransactionRecord>().enumerate() {
            let line = index + 2; // +2 for header and 0-indexing

            let record = match row {
                Ok(r) => r,
                Err(e) => {
                    result.errors.push(ImportError {
                        line,
                        field: None,
                        error: format!("CSV parse error: {}", e),
                    });
                    continue;
                }
            };

            let new = match parse_record(line, &record) {
                Ok(new) => new,
                Err(e) => {
                    result.errors.push(e);
                    continue;
                }
            };

            if options.create_missing && !options.dry_run {
                if let Err(e) = self.ensure_references(&new, options).await {
                    result.errors.push(ImportError {
                        line,
                        field: None,
                        error: e.to_string(),
                    });
                    continue;
                }
            }

            // Skip actual import if dry run
            if options.dry_run {
                result.imported += 1;
                continue;
            }

            match self.service.record_transaction(new).await {
                Ok(tx) => {
                    debug!(line, id = %tx.id, "imported transaction");
                    result.imported += 1;
                }
                Err(e) => result.errors.push(ImportError {
                    line,
                    field: None,
                    error: format!("Transaction rejected: {}", e),
                }),
            }
        }

        if !result.errors.is_empty() {
            warn!(errors = result.errors.len(), "import finished with errors");
        }
        Ok(result)
    }

    async fn ensure_references(
        &self,
        new: &NewTransaction,
        options: &ImportOptions,
    ) -> Result<(), AppError> {
        match self.service.get_account(&new.account).await {
            Err(AppError::AccountNotFound(_)) => {
                self.service
                    .create_account(
                        new.account.clone(),
                        options.currency.clone(),
                        Some("Created during import".to_string()),
                    )
                    .await?;
            }
            other => {
                other?;
            }
        }

        if let Some(payee) = &new.payee {
            match self.service.get_payee(payee).await {
                Err(AppError::PayeeNotFound(_)) => {
                    self.service.create_payee(payee.clone()).await?;
                }
                other => {
                    other?;
                }
            }
        }

        if let Some(category) = &new.category {
            match self.service.get_category(category).await {
                Err(AppError::CategoryNotFound(_)) => {
                    self.service
                        .create_category(category.clone(), new.kind, None)
                        .await?;
                }
                other => {
                    other?;
                }
            }
        }

        Ok(())
    }
}
