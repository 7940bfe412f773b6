use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;

use crate::application::FinanceService;
use crate::domain::{Account, Category, CategoryId, DATE_FORMAT, Payee, Transaction, format_cents};
use crate::storage::TransactionQuery;

/// Header written by [`Exporter::export_transactions_csv`] and read back by
/// the importer.
pub const TRANSACTION_CSV_HEADER: [&str; 9] = [
    "type",
    "amount",
    "expected_date",
    "status",
    "cleared_date",
    "account",
    "payee",
    "category",
    "description",
];

/// Database snapshot for full export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseExport {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub accounts: Vec<Account>,
    pub payees: Vec<Payee>,
    pub categories: Vec<Category>,
    pub transactions: Vec<Transaction>,
}

/// Exporter for converting tracker data to CSV and JSON
pub struct Exporter<'a> {
    service: &'a FinanceService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a FinanceService) -> Self {
        Self { service }
    }

    /// Export transactions to CSV, with names instead of IDs so the file can
    /// be imported into another database.
    pub async fn export_transactions_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let snapshot = self
            .service
            .load_snapshot(&TransactionQuery::default())
            .await?;
        let accounts = snapshot.account_names();
        let payees = snapshot.payee_names();
        let categories: HashMap<CategoryId, &str> = snapshot
            .categories
            .iter()
            .map(|c| (c.id, c.name.as_str()))
            .collect();

        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(TRANSACTION_CSV_HEADER)?;

        for tx in &snapshot.transactions {
            let amount = format_cents(tx.amount_cents);
            let expected_date = tx.expected_date.format(DATE_FORMAT).to_string();
            let cleared_date = tx
                .cleared_date
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default();

            let record: [&str; 9] = [
                tx.kind.as_str(),
                &amount,
                &expected_date,
                tx.status.as_str(),
                &cleared_date,
                accounts.get(&tx.account_id).copied().unwrap_or_default(),
                tx.payee_id
                    .and_then(|id| payees.get(&id).copied())
                    .unwrap_or_default(),
                tx.category_id
                    .and_then(|id| categories.get(&id).copied())
                    .unwrap_or_default(),
                tx.description.as_deref().unwrap_or_default(),
            ];
            csv_writer.write_record(record)?;
        }

        csv_writer.flush()?;
        Ok(snapshot.transactions.len())
    }

    /// Export everything as a JSON document
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<DatabaseExport> {
        let snapshot = self
            .service
            .load_snapshot(&TransactionQuery::default())
            .await?;

        let export = DatabaseExport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: snapshot.taken_at,
            accounts: snapshot.accounts,
            payees: snapshot.payees,
            categories: snapshot.categories,
            transactions: snapshot.transactions,
        };

        serde_json::to_writer_pretty(&mut writer, &export)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        Ok(export)
    }
}
