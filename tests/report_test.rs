mod common;

use anyhow::Result;
use common::{StandardSetup, parse_date, plan, settle, test_service};
use finplan::application::{AppError, TransactionFilter};
use finplan::domain::{MonthBucket, PeriodError, TransactionKind};
use finplan::io::Exporter;
use finplan::storage::MAX_ROWS;

#[tokio::test]
async fn test_report_splits_by_kind_and_status() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_accounts(&service).await?;

    plan(&service, TransactionKind::Income, 10000, "2025-01-15").await?;
    settle(
        &service,
        TransactionKind::Expense,
        4000,
        "2025-01-20",
        "2025-01-20",
    )
    .await?;

    let report = service.report(2025, None).await?;
    assert_eq!(report.months.len(), 12);

    let january = &report.months[0];
    assert_eq!(january.year_month.to_string(), "2025-01");
    assert_eq!(january.income, 10000);
    assert_eq!(january.expense, 4000);
    assert_eq!(january.planned, 10000);
    assert_eq!(january.cleared, 4000);
    assert_eq!(january.net, 6000);

    for bucket in &report.months[1..] {
        assert!(bucket.is_zero(), "{} should be empty", bucket.year_month);
    }

    assert_eq!(report.totals.income, 10000);
    assert_eq!(report.totals.expense, 4000);
    assert_eq!(report.totals.net, 6000);

    Ok(())
}

#[tokio::test]
async fn test_report_year_boundaries() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_accounts(&service).await?;

    plan(&service, TransactionKind::Expense, 100, "2024-12-31").await?;
    plan(&service, TransactionKind::Expense, 200, "2025-01-01").await?;
    plan(&service, TransactionKind::Expense, 300, "2025-02-28").await?;
    plan(&service, TransactionKind::Expense, 400, "2025-12-31").await?;
    plan(&service, TransactionKind::Expense, 500, "2026-01-01").await?;

    let report = service.report(2025, None).await?;
    assert_eq!(report.months[0].expense, 200);
    assert_eq!(report.months[1].expense, 300);
    assert_eq!(report.months[11].expense, 400);
    assert_eq!(report.totals.expense, 900);

    Ok(())
}

#[tokio::test]
async fn test_report_single_month() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_accounts(&service).await?;

    plan(&service, TransactionKind::Income, 1000, "2025-01-31").await?;
    plan(&service, TransactionKind::Income, 2000, "2025-02-01").await?;
    plan(&service, TransactionKind::Expense, 500, "2025-02-28").await?;
    plan(&service, TransactionKind::Income, 4000, "2025-03-01").await?;

    let report = service.report(2025, Some(2)).await?;
    assert_eq!(report.months.len(), 12);
    assert_eq!(report.months[1].income, 2000);
    assert_eq!(report.months[1].expense, 500);
    assert_eq!(report.months[1].net, 1500);
    assert!(report.months[0].is_zero());
    assert!(report.months[2].is_zero());
    assert_eq!(report.totals.net, 1500);

    Ok(())
}

#[tokio::test]
async fn test_report_leap_year_february() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_accounts(&service).await?;

    plan(&service, TransactionKind::Expense, 2900, "2024-02-29").await?;

    let report = service.report(2024, Some(2)).await?;
    assert_eq!(report.months[1].expense, 2900);

    Ok(())
}

#[tokio::test]
async fn test_report_empty_year_has_zero_buckets() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_accounts(&service).await?;

    let report = service.report(2030, None).await?;
    assert!(report.months.iter().all(MonthBucket::is_zero));
    assert_eq!(report.months[11].year_month.to_string(), "2030-12");
    assert_eq!(report.totals.income, 0);

    Ok(())
}

#[tokio::test]
async fn test_report_tracks_clearing() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_accounts(&service).await?;

    let tx = plan(&service, TransactionKind::Expense, 8000, "2025-03-10").await?;
    let report = service.report(2025, Some(3)).await?;
    assert_eq!(report.months[2].planned, 8000);
    assert_eq!(report.months[2].cleared, 0);

    // Cleared late, but still reported in the expected month
    service
        .clear_transaction(tx.id, parse_date("2025-04-02"))
        .await?;
    let report = service.report(2025, None).await?;
    assert_eq!(report.months[2].planned, 0);
    assert_eq!(report.months[2].cleared, 8000);
    assert!(report.months[3].is_zero());

    Ok(())
}

#[tokio::test]
async fn test_report_rejects_invalid_period() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service.report(2025, Some(13)).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidPeriod(PeriodError::InvalidMonth(13))
    ));

    let err = service.report(2025, Some(0)).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidPeriod(_)));

    Ok(())
}

#[tokio::test]
async fn test_snapshots_are_not_capped_like_listings() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_accounts(&service).await?;

    for _ in 0..MAX_ROWS {
        plan(&service, TransactionKind::Expense, 1, "2025-01-10").await?;
    }
    plan(&service, TransactionKind::Income, 500000, "2025-12-20").await?;

    let report = service.report(2025, None).await?;
    assert_eq!(report.months[0].expense, MAX_ROWS as i64);
    assert_eq!(report.months[11].income, 500000);
    assert_eq!(report.totals.net, 500000 - MAX_ROWS as i64);

    let forecast = service.forecast(parse_date("2025-01-01")).await?;
    assert_eq!(forecast.months.len(), 2);
    assert_eq!(forecast.net, 500000 - MAX_ROWS as i64);

    let mut buffer = Vec::new();
    let exported = Exporter::new(&service)
        .export_transactions_csv(&mut buffer)
        .await?;
    assert_eq!(exported, MAX_ROWS + 1);

    let mut json = Vec::new();
    let full = Exporter::new(&service).export_full_json(&mut json).await?;
    assert_eq!(full.transactions.len(), MAX_ROWS + 1);

    // Interactive listing keeps the cap
    let listed = service
        .list_transactions(TransactionFilter {
            limit: Some(MAX_ROWS + 500),
            ..Default::default()
        })
        .await?;
    assert_eq!(listed.len(), MAX_ROWS);

    Ok(())
}
