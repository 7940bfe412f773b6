use chrono::{Days, NaiveDate};
use finplan::domain::{
    ReportPeriod, Transaction, TransactionKind, TransactionStatus, compute_forecast,
    compute_report,
};
use quickcheck_macros::quickcheck;
use uuid::Uuid;

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// Turn arbitrary tuples into transactions spread over 2024-2026.
fn build(specs: &[(bool, bool, u32, u16)]) -> Vec<Transaction> {
    let account = Uuid::new_v4();
    specs
        .iter()
        .map(|&(income, cleared, amount, offset)| {
            let kind = if income {
                TransactionKind::Income
            } else {
                TransactionKind::Expense
            };
            let date = base_date() + Days::new(u64::from(offset % 1096));
            let mut tx = Transaction::planned(kind, i64::from(amount % 10_000_000), date, account);
            if cleared {
                tx.clear(date).unwrap();
            }
            tx
        })
        .collect()
}

#[quickcheck]
fn report_always_has_twelve_ordered_months(specs: Vec<(bool, bool, u32, u16)>) -> bool {
    let period = ReportPeriod::new(2025, None).unwrap();
    let report = compute_report(&build(&specs), &period);
    report
        .months
        .iter()
        .enumerate()
        .all(|(i, m)| m.year_month.year() == 2025 && m.year_month.month() == i as u32 + 1)
}

#[quickcheck]
fn report_kind_and_status_sums_agree(specs: Vec<(bool, bool, u32, u16)>) -> bool {
    let period = ReportPeriod::new(2025, None).unwrap();
    let report = compute_report(&build(&specs), &period);
    report.months.iter().all(|m| {
        m.income + m.expense == m.planned + m.cleared && m.net == m.income - m.expense
    }) && report.totals.net == report.totals.income - report.totals.expense
}

#[quickcheck]
fn report_totals_match_selected_transactions(specs: Vec<(bool, bool, u32, u16)>) -> bool {
    let transactions = build(&specs);
    let period = ReportPeriod::new(2025, None).unwrap();
    let report = compute_report(&transactions, &period);

    let expected: i64 = transactions
        .iter()
        .filter(|tx| period.contains(tx.expected_date))
        .map(Transaction::signed_amount)
        .sum();
    report.totals.net == expected
}

#[quickcheck]
fn single_month_report_only_fills_that_month(specs: Vec<(bool, bool, u32, u16)>, month: u8) -> bool {
    let month = u32::from(month % 12) + 1;
    let period = ReportPeriod::new(2025, Some(month)).unwrap();
    let report = compute_report(&build(&specs), &period);
    report
        .months
        .iter()
        .filter(|m| m.year_month.month() != month)
        .all(|m| m.is_zero())
}

#[quickcheck]
fn forecast_only_counts_upcoming_planned(specs: Vec<(bool, bool, u32, u16)>, cutoff: u16) -> bool {
    let transactions = build(&specs);
    let today = base_date() + Days::new(u64::from(cutoff % 1096));
    let forecast = compute_forecast(&transactions, today);

    let expected = transactions
        .iter()
        .filter(|tx| tx.status == TransactionStatus::Planned && tx.expected_date >= today)
        .count();
    let counted: usize = forecast.iter().map(|b| b.count).sum();

    let ascending = forecast.windows(2).all(|w| w[0].year_month < w[1].year_month);
    let not_before_today = forecast
        .iter()
        .all(|b| b.year_month.last_day() >= today && b.count > 0);

    counted == expected && ascending && not_before_today
}

#[quickcheck]
fn aggregation_is_idempotent(specs: Vec<(bool, bool, u32, u16)>) -> bool {
    let transactions = build(&specs);
    let period = ReportPeriod::new(2025, None).unwrap();
    let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

    compute_report(&transactions, &period) == compute_report(&transactions, &period)
        && compute_forecast(&transactions, today) == compute_forecast(&transactions, today)
}
