//! Batches unsettled earnings into payouts.
//!
//! Earning rows are selected `FOR UPDATE` with `settled = false`, summed, and
//! flipped to settled in the same transaction that inserts the payout, so no
//! row can be paid twice.

use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, LockType},
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit::{self, AuditEvent},
    entity::{
        commissions::{Column as CommissionCol, Entity as Commissions},
        deliveries::{Column as DeliveryCol, Entity as Deliveries},
        payouts::{ActiveModel as PayoutActive, Model as PayoutModel},
        sellers::Entity as Sellers,
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{DeliveryStatus, NotificationCategory, Payout, PayoutStatus, PayoutType, UserRole},
    response::{ApiResponse, Meta},
    services::notification_service::{Notice, notify_user},
    state::AppState,
};

async fn insert_payout(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    payout_type: PayoutType,
    amount: i64,
    reference_ids: &[Uuid],
) -> AppResult<PayoutModel> {
    if amount <= 0 {
        return Err(AppError::conflict("No earnings to payout"));
    }
    Ok(PayoutActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        amount: Set(amount),
        payout_type: Set(payout_type),
        reference_ids: Set(json!(reference_ids)),
        status: Set(PayoutStatus::Pending),
        created_at: NotSet,
    }
    .insert(txn)
    .await?)
}

async fn announce(state: &AppState, actor: &AuthUser, payout: &PayoutModel) {
    tracing::info!(
        payout_id = %payout.id,
        user_id = %payout.user_id,
        payout_type = %payout.payout_type,
        amount = payout.amount,
        "payout created"
    );
    notify_user(
        state,
        payout.user_id,
        Notice::new(
            "Payout created",
            format!("A payout of {} is being processed.", payout.amount),
            NotificationCategory::Payment,
            "/payouts",
        ),
    )
    .await;
    audit::record(
        state,
        AuditEvent::new(Some(actor.user_id), "payout_created", "payouts", payout.id)
            .details(json!({ "type": payout.payout_type, "amount": payout.amount })),
    )
    .await;
}

/// Pays a seller every commission row not yet included in a payout.
pub async fn create_seller_payout(
    state: &AppState,
    user: &AuthUser,
    seller_id: Uuid,
) -> AppResult<ApiResponse<Payout>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let seller = Sellers::find_by_id(seller_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Seller"))?;

    let rows = Commissions::find()
        .filter(CommissionCol::SellerId.eq(seller.id))
        .filter(CommissionCol::Settled.eq(false))
        .order_by_asc(CommissionCol::CreatedAt)
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    if rows.is_empty() {
        return Err(AppError::conflict("No earnings to payout"));
    }

    let amount: i64 = rows.iter().map(|r| r.seller_earning).sum();
    let order_ids: Vec<Uuid> = rows.iter().map(|r| r.order_id).collect();
    let row_ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

    let payout = insert_payout(&txn, seller.user_id, PayoutType::Seller, amount, &order_ids).await?;
    Commissions::update_many()
        .col_expr(CommissionCol::Settled, Expr::value(true))
        .col_expr(CommissionCol::PayoutId, Expr::value(payout.id))
        .filter(CommissionCol::Id.is_in(row_ids))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    announce(state, user, &payout).await;
    Ok(ApiResponse::success("Payout created", Payout::from(payout), Some(Meta::empty())))
}

/// Pays a delivery partner for every delivered, unsettled delivery.
pub async fn create_delivery_payout(
    state: &AppState,
    user: &AuthUser,
    partner_id: Uuid,
) -> AppResult<ApiResponse<Payout>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let partner = Users::find_by_id(partner_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Delivery partner"))?;
    if partner.role != UserRole::Delivery {
        return Err(AppError::Validation("User is not a delivery partner".into()));
    }

    let rows = Deliveries::find()
        .filter(DeliveryCol::PartnerId.eq(partner.id))
        .filter(DeliveryCol::Status.eq(DeliveryStatus::Delivered))
        .filter(DeliveryCol::Settled.eq(false))
        .order_by_asc(DeliveryCol::CreatedAt)
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    if rows.is_empty() {
        return Err(AppError::conflict("No earnings to payout"));
    }

    let amount: i64 = rows.iter().map(|r| r.partner_earning).sum();
    let delivery_ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

    let payout =
        insert_payout(&txn, partner.id, PayoutType::Delivery, amount, &delivery_ids).await?;
    Deliveries::update_many()
        .col_expr(DeliveryCol::Settled, Expr::value(true))
        .col_expr(DeliveryCol::PayoutId, Expr::value(payout.id))
        .filter(DeliveryCol::Id.is_in(delivery_ids))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    announce(state, user, &payout).await;
    Ok(ApiResponse::success("Payout created", Payout::from(payout), Some(Meta::empty())))
}
