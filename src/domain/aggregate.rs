//! Monthly aggregation of transactions into forecast and report buckets.
//!
//! Both entry points are pure functions over an in-memory slice: no I/O, no
//! shared state. Amounts are summed as integer cents.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{Cents, ReportPeriod, Transaction, TransactionKind, TransactionStatus, YearMonth};

/// Sums for one month of a forward-looking forecast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastBucket {
    pub year_month: YearMonth,
    pub income: Cents,
    pub expense: Cents,
    pub net: Cents,
    pub count: usize,
}

/// Sums for one month of a yearly report, split by kind and by status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthBucket {
    pub year_month: YearMonth,
    pub income: Cents,
    pub expense: Cents,
    pub planned: Cents,
    pub cleared: Cents,
    pub net: Cents,
}

impl MonthBucket {
    pub fn zero(year_month: YearMonth) -> Self {
        Self {
            year_month,
            income: 0,
            expense: 0,
            planned: 0,
            cleared: 0,
            net: 0,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.income == 0 && self.expense == 0 && self.planned == 0 && self.cleared == 0
    }
}

/// Yearly report: always one bucket per calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearReport {
    pub period: ReportPeriod,
    pub months: [MonthBucket; 12],
    pub totals: ReportTotals,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTotals {
    pub income: Cents,
    pub expense: Cents,
    pub planned: Cents,
    pub cleared: Cents,
    pub net: Cents,
}

#[derive(Default)]
struct Accumulator {
    income: Cents,
    expense: Cents,
    planned: Cents,
    cleared: Cents,
    count: usize,
}

impl Accumulator {
    fn add_kind(&mut self, kind: TransactionKind, amount: Cents) {
        match kind {
            TransactionKind::Income => self.income = self.income.saturating_add(amount),
            TransactionKind::Expense => self.expense = self.expense.saturating_add(amount),
        }
    }

    fn add_status(&mut self, status: TransactionStatus, amount: Cents) {
        match status {
            TransactionStatus::Planned => self.planned = self.planned.saturating_add(amount),
            TransactionStatus::Cleared => self.cleared = self.cleared.saturating_add(amount),
        }
    }
}

/// Aggregate planned transactions due on or after `today`, grouped by the
/// month of their expected date.
///
/// Only months with at least one qualifying transaction appear, in ascending
/// month order. An empty result means there is nothing planned ahead.
pub fn compute_forecast(transactions: &[Transaction], today: NaiveDate) -> Vec<ForecastBucket> {
    let mut groups: BTreeMap<YearMonth, Accumulator> = BTreeMap::new();

    for tx in transactions
        .iter()
        .filter(|tx| tx.status == TransactionStatus::Planned && tx.expected_date >= today)
    {
        let acc = groups.entry(YearMonth::of(tx.expected_date)).or_default();
        acc.add_kind(tx.kind, tx.amount_cents);
        acc.count += 1;
    }

    groups
        .into_iter()
        .map(|(year_month, acc)| ForecastBucket {
            year_month,
            income: acc.income,
            expense: acc.expense,
            net: acc.income.saturating_sub(acc.expense),
            count: acc.count,
        })
        .collect()
}

/// Aggregate the transactions expected within `period` into 12 monthly
/// buckets.
///
/// Each selected transaction adds its amount once by kind (income/expense)
/// and once by status (planned/cleared). Months without transactions, and
/// every month outside a single-month period, come back as zero buckets.
pub fn compute_report(transactions: &[Transaction], period: &ReportPeriod) -> YearReport {
    let months = period.months();
    let mut accumulators: [Accumulator; 12] = Default::default();

    for tx in transactions
        .iter()
        .filter(|tx| period.contains(tx.expected_date))
    {
        // The period covers a single year, so the month picks the slot.
        let acc = &mut accumulators[tx.expected_date.month0() as usize];
        acc.add_kind(tx.kind, tx.amount_cents);
        acc.add_status(tx.status, tx.amount_cents);
        acc.count += 1;
    }

    let buckets: [MonthBucket; 12] = std::array::from_fn(|i| {
        let acc = &accumulators[i];
        if acc.count == 0 {
            return MonthBucket::zero(months[i]);
        }
        MonthBucket {
            year_month: months[i],
            income: acc.income,
            expense: acc.expense,
            planned: acc.planned,
            cleared: acc.cleared,
            net: acc.income.saturating_sub(acc.expense),
        }
    });

    let totals = buckets
        .iter()
        .fold(ReportTotals::default(), |mut totals, bucket| {
            totals.income = totals.income.saturating_add(bucket.income);
            totals.expense = totals.expense.saturating_add(bucket.expense);
            totals.planned = totals.planned.saturating_add(bucket.planned);
            totals.cleared = totals.cleared.saturating_add(bucket.cleared);
            totals.net = totals.net.saturating_add(bucket.net);
            totals
        });

    YearReport {
        period: *period,
        months: buckets,
        totals,
    }
}
