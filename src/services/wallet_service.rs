use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, TransactionTrait};

use crate::{
    audit::{self, AuditEvent},
    dto::wallet::{WalletSummary, WithdrawRequest},
    entity::{
        users::Entity as Users,
        wallet_transactions::{Column as WalletTxnCol, Entity as WalletTransactions},
    },
    error::{AppError, AppResult},
    ledger::debit_wallet,
    middleware::auth::AuthUser,
    models::{NotificationCategory, WalletTransaction},
    response::{ApiResponse, Meta},
    services::notification_service::{Notice, notify_user},
    state::AppState,
};

pub const WITHDRAWAL_TXN: &str = "withdrawal";

pub async fn get_wallet(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<WalletSummary>> {
    let account = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    let transactions = WalletTransactions::find()
        .filter(WalletTxnCol::UserId.eq(user.user_id))
        .order_by_desc(WalletTxnCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(WalletTransaction::from)
        .collect();

    Ok(ApiResponse::success(
        "Ok",
        WalletSummary {
            balance: account.wallet_balance,
            transactions,
        },
        Some(Meta::empty()),
    ))
}

/// Moves funds out of the wallet. Fails without side effects when the balance
/// is short.
pub async fn withdraw_wallet(
    state: &AppState,
    user: &AuthUser,
    payload: WithdrawRequest,
) -> AppResult<ApiResponse<WalletTransaction>> {
    let txn = state.orm.begin().await?;
    let entry = debit_wallet(&txn, user.user_id, payload.amount, WITHDRAWAL_TXN, None).await?;
    txn.commit().await?;

    notify_user(
        state,
        user.user_id,
        Notice::new(
            "Withdrawal requested",
            format!("{} has been debited from your wallet.", entry.amount),
            NotificationCategory::Payment,
            "/buyer/wallet",
        ),
    )
    .await;
    audit::record(
        state,
        AuditEvent::new(Some(user.user_id), "wallet_withdrawal", "wallet_transactions", entry.id)
            .details(serde_json::json!({ "amount": entry.amount })),
    )
    .await;

    Ok(ApiResponse::success("Withdrawal recorded", WalletTransaction::from(entry), Some(Meta::empty())))
}
