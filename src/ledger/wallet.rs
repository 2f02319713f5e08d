//! Wallet balance plus its append-only transaction log.
//!
//! Both functions lock the user row first, so concurrent mutations for the same
//! user serialize and the balance always equals the signed sum of its entries.

use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ConnectionTrait, EntityTrait, QuerySelect, Set,
    sea_query::LockType,
};
use uuid::Uuid;

use crate::{
    entity::{
        users::{self, Entity as Users},
        wallet_transactions::{ActiveModel as WalletTxnActive, Model as WalletTxnModel},
    },
    error::{AppError, AppResult},
    models::WalletEntryKind,
};

async fn lock_user<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<users::Model> {
    Users::find_by_id(user_id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
}

async fn apply<C: ConnectionTrait>(
    conn: &C,
    user: users::Model,
    kind: WalletEntryKind,
    amount: i64,
    txn_type: &str,
    reference_id: Option<String>,
) -> AppResult<WalletTxnModel> {
    let balance = match kind {
        WalletEntryKind::Credit => user.wallet_balance.checked_add(amount),
        WalletEntryKind::Debit => user.wallet_balance.checked_sub(amount),
    }
    .ok_or_else(|| AppError::Validation("Amount out of range".into()))?;

    let user_id = user.id;
    let mut active: users::ActiveModel = user.into();
    active.wallet_balance = Set(balance);
    active.update(conn).await?;

    let entry = WalletTxnActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        amount: Set(amount),
        kind: Set(kind),
        txn_type: Set(txn_type.to_string()),
        reference_id: Set(reference_id),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;

    tracing::info!(%user_id, ?kind, amount, txn_type, balance, "wallet updated");
    Ok(entry)
}

fn ensure_positive(amount: i64) -> AppResult<()> {
    if amount <= 0 {
        return Err(AppError::Validation("Amount must be positive".into()));
    }
    Ok(())
}

pub async fn credit_wallet<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    amount: i64,
    txn_type: &str,
    reference_id: Option<String>,
) -> AppResult<WalletTxnModel> {
    ensure_positive(amount)?;
    let user = lock_user(conn, user_id).await?;
    apply(conn, user, WalletEntryKind::Credit, amount, txn_type, reference_id).await
}

pub async fn debit_wallet<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    amount: i64,
    txn_type: &str,
    reference_id: Option<String>,
) -> AppResult<WalletTxnModel> {
    ensure_positive(amount)?;
    let user = lock_user(conn, user_id).await?;
    if user.wallet_balance < amount {
        return Err(AppError::InsufficientBalance);
    }
    apply(conn, user, WalletEntryKind::Debit, amount, txn_type, reference_id).await
}
