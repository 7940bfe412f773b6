mod common;

use anyhow::Result;
use common::{StandardSetup, new_tx, parse_date, plan, settle, test_service};
use finplan::application::{AppError, TransactionFilter};
use finplan::domain::{MAX_AMOUNT, StatusError, TransactionKind, TransactionStatus};
use uuid::Uuid;

#[tokio::test]
async fn test_record_planned_transaction() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_full(&service).await?;

    let mut new = new_tx(TransactionKind::Expense, 180000, "2025-02-05", "Nubank");
    new.payee = Some("Landlord".into());
    new.category = Some("Rent".into());
    new.description = Some("February rent".into());
    let tx = service.record_transaction(new).await?;

    assert_eq!(tx.status, TransactionStatus::Planned);
    assert_eq!(tx.cleared_date, None);

    let loaded = service.get_transaction(tx.id).await?;
    assert_eq!(loaded.kind, TransactionKind::Expense);
    assert_eq!(loaded.amount_cents, 180000);
    assert_eq!(loaded.expected_date, parse_date("2025-02-05"));
    assert_eq!(loaded.category_id, tx.category_id);
    assert_eq!(loaded.description.as_deref(), Some("February rent"));

    Ok(())
}

#[tokio::test]
async fn test_record_rejects_invalid_input() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_full(&service).await?;

    let err = service
        .record_transaction(new_tx(TransactionKind::Expense, -1, "2025-01-01", "Nubank"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidAmount(_)));

    let err = service
        .record_transaction(new_tx(
            TransactionKind::Income,
            MAX_AMOUNT + 1,
            "2025-01-01",
            "Nubank",
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidAmount(_)));

    let err = service
        .record_transaction(new_tx(TransactionKind::Expense, 100, "2025-01-01", "Itaú"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AccountNotFound(_)));

    // An income cannot be filed under an expense category
    let mut new = new_tx(TransactionKind::Income, 100, "2025-01-01", "Nubank");
    new.category = Some("Groceries".into());
    let err = service.record_transaction(new).await.unwrap_err();
    assert!(matches!(err, AppError::CategoryKindMismatch { .. }));

    let mut new = new_tx(TransactionKind::Expense, 100, "2025-01-01", "Nubank");
    new.payee = Some("Nobody".into());
    let err = service.record_transaction(new).await.unwrap_err();
    assert!(matches!(err, AppError::PayeeNotFound(_)));

    assert!(
        service
            .list_transactions(TransactionFilter::default())
            .await?
            .is_empty()
    );

    Ok(())
}

#[tokio::test]
async fn test_clear_and_reopen() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_accounts(&service).await?;

    let tx = plan(&service, TransactionKind::Expense, 4000, "2025-01-20").await?;

    let cleared = service
        .clear_transaction(tx.id, parse_date("2025-01-21"))
        .await?;
    assert_eq!(cleared.status, TransactionStatus::Cleared);
    assert_eq!(cleared.cleared_date, Some(parse_date("2025-01-21")));

    let loaded = service.get_transaction(tx.id).await?;
    assert!(loaded.is_cleared());
    assert_eq!(loaded.cleared_date, Some(parse_date("2025-01-21")));

    let err = service
        .clear_transaction(tx.id, parse_date("2025-01-22"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidStatus(StatusError::AlreadyCleared(_))
    ));

    let reopened = service.reopen_transaction(tx.id).await?;
    assert!(reopened.is_planned());
    assert_eq!(service.get_transaction(tx.id).await?.cleared_date, None);

    let err = service.reopen_transaction(tx.id).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidStatus(StatusError::NotCleared(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_delete_transaction() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_accounts(&service).await?;

    let tx = plan(&service, TransactionKind::Income, 100, "2025-01-01").await?;
    service.delete_transaction(tx.id).await?;

    let err = service.get_transaction(tx.id).await.unwrap_err();
    assert!(matches!(err, AppError::TransactionNotFound(_)));

    let err = service.delete_transaction(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::TransactionNotFound(_)));

    Ok(())
}

#[tokio::test]
async fn test_list_transactions_filters() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_full(&service).await?;

    settle(
        &service,
        TransactionKind::Income,
        500000,
        "2025-01-05",
        "2025-01-05",
    )
    .await?;
    plan(&service, TransactionKind::Expense, 3000, "2025-02-10").await?;
    plan(&service, TransactionKind::Expense, 2000, "2025-01-15").await?;

    let mut groceries = new_tx(TransactionKind::Expense, 25000, "2025-03-01", "Wallet");
    groceries.category = Some("Groceries".into());
    service.record_transaction(groceries).await?;

    // Ordered by expected date
    let all = service
        .list_transactions(TransactionFilter::default())
        .await?;
    let dates: Vec<String> = all.iter().map(|t| t.expected_date.to_string()).collect();
    assert_eq!(
        dates,
        vec!["2025-01-05", "2025-01-15", "2025-02-10", "2025-03-01"]
    );

    let nubank = service
        .list_transactions(TransactionFilter {
            account: Some("Nubank".into()),
            ..Default::default()
        })
        .await?;
    assert_eq!(nubank.len(), 3);

    let planned = service
        .list_transactions(TransactionFilter {
            status: Some(TransactionStatus::Planned),
            ..Default::default()
        })
        .await?;
    assert_eq!(planned.len(), 3);

    let january = service
        .list_transactions(TransactionFilter {
            from_date: Some(parse_date("2025-01-01")),
            to_date: Some(parse_date("2025-01-31")),
            ..Default::default()
        })
        .await?;
    assert_eq!(january.len(), 2);

    let groceries = service
        .list_transactions(TransactionFilter {
            category: Some("Groceries".into()),
            ..Default::default()
        })
        .await?;
    assert_eq!(groceries.len(), 1);
    assert_eq!(groceries[0].amount_cents, 25000);

    let limited = service
        .list_transactions(TransactionFilter {
            limit: Some(2),
            ..Default::default()
        })
        .await?;
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].expected_date, parse_date("2025-01-05"));

    let err = service
        .list_transactions(TransactionFilter {
            account: Some("Itaú".into()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AccountNotFound(_)));

    Ok(())
}

#[tokio::test]
async fn test_transaction_keeps_account_currency() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardSetup::create_accounts(&service).await?;
    service
        .create_account("Chase".into(), "usd".into(), None)
        .await?;

    let tx = service
        .record_transaction(new_tx(TransactionKind::Expense, 2500, "2025-04-01", "Chase"))
        .await?;
    let account = service.account_of(&tx).await?;
    assert_eq!(account.name, "Chase");
    assert_eq!(account.currency, "USD");

    let local = plan(&service, TransactionKind::Income, 100, "2025-04-01").await?;
    assert_eq!(service.account_of(&local).await?.currency, "BRL");

    Ok(())
}
