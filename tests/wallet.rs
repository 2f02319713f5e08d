mod common;

use common::{create_user, database_url, setup_state, wallet_balance};
use marketplace_api::{
    dto::wallet::WithdrawRequest,
    error::AppError,
    ledger::credit_wallet,
    middleware::auth::AuthUser,
    models::{UserRole, WalletEntryKind},
    services::{refund_service::COD_REFUND_TXN, wallet_service},
    state::AppState,
};
use sea_orm::TransactionTrait;

async fn funded_buyer(state: &AppState, amount: i64) -> anyhow::Result<AuthUser> {
    let buyer = create_user(state, UserRole::Buyer).await?;
    let txn = state.orm.begin().await?;
    credit_wallet(&txn, buyer.user_id, amount, COD_REFUND_TXN, None).await?;
    txn.commit().await?;
    Ok(buyer)
}

#[tokio::test]
async fn withdrawal_debits_balance_and_appends_entry() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url).await?;
    let buyer = funded_buyer(&state, 300).await?;

    let entry = wallet_service::withdraw_wallet(&state, &buyer, WithdrawRequest { amount: 120 })
        .await?
        .data
        .expect("entry");
    assert_eq!(entry.kind, WalletEntryKind::Debit);
    assert_eq!(entry.amount, 120);
    assert_eq!(entry.txn_type, wallet_service::WITHDRAWAL_TXN);

    let summary = wallet_service::get_wallet(&state, &buyer)
        .await?
        .data
        .expect("wallet");
    assert_eq!(summary.balance, 180);
    assert_eq!(summary.transactions.len(), 2);
    assert_eq!(wallet_balance(&state, buyer.user_id).await?, 180);
    Ok(())
}

#[tokio::test]
async fn overdraft_is_rejected_without_side_effects() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url).await?;
    let buyer = funded_buyer(&state, 50).await?;

    let err = wallet_service::withdraw_wallet(&state, &buyer, WithdrawRequest { amount: 51 })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientBalance));

    let err = wallet_service::withdraw_wallet(&state, &buyer, WithdrawRequest { amount: 0 })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let summary = wallet_service::get_wallet(&state, &buyer)
        .await?
        .data
        .expect("wallet");
    assert_eq!(summary.balance, 50);
    assert_eq!(summary.transactions.len(), 1);
    Ok(())
}

#[tokio::test]
async fn concurrent_withdrawals_never_overdraw() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url).await?;
    let buyer = funded_buyer(&state, 100).await?;

    let mut handles = Vec::new();
    for _ in 0..5 {
        let state = state.clone();
        let buyer = buyer.clone();
        handles.push(tokio::spawn(async move {
            wallet_service::withdraw_wallet(&state, &buyer, WithdrawRequest { amount: 30 }).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => succeeded += 1,
            Err(err) => assert!(matches!(err, AppError::InsufficientBalance)),
        }
    }
    assert_eq!(succeeded, 3);
    assert_eq!(wallet_balance(&state, buyer.user_id).await?, 10);
    Ok(())
}
