use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit::{self, AuditEvent},
    dto::{orders::UpdateOrderStatusRequest, settlement::SellerEarnings},
    entity::{
        commissions::{Column as CommissionCol, Entity as Commissions},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        payments::{Column as PaymentCol, Entity as Payments},
        sellers::{Column as SellerCol, Entity as Sellers, Model as SellerModel},
    },
    error::{AppError, AppResult},
    lifecycle,
    middleware::auth::{AuthUser, ensure_role},
    models::{NotificationCategory, Order, OrderStatus, PaymentMethod, PaymentStatus, UserRole},
    response::{ApiResponse, Meta},
    services::{
        notification_service::{notify_user, order_status_notice},
        order_service::{invalidate_buyer_orders, lock_order},
    },
    state::AppState,
};

async fn current_seller(state: &AppState, user: &AuthUser) -> AppResult<SellerModel> {
    ensure_role(user, UserRole::Seller)?;
    Sellers::find()
        .filter(SellerCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Seller profile"))
}

/// Seller fulfilment: a placed order moves to packed.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    let seller = current_seller(state, user).await?;

    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, order_id).await?;
    if order.seller_id != seller.id {
        return Err(AppError::PermissionDenied);
    }
    lifecycle::seller_transition(order.status, payload.status)?;

    if order.payment_method == PaymentMethod::Prepaid {
        let paid = Payments::find()
            .filter(PaymentCol::OrderId.eq(order.id))
            .filter(PaymentCol::Status.eq(PaymentStatus::Completed))
            .one(&txn)
            .await?
            .is_some();
        if !paid {
            return Err(AppError::conflict("Prepaid order is awaiting payment"));
        }
    }

    let previous = order.status;
    let mut active: OrderActive = order.into();
    active.status = Set(payload.status);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(%order_id, from = %previous, to = %order.status, "seller advanced order");

    invalidate_buyer_orders(state, order.buyer_id).await;
    notify_user(
        state,
        order.buyer_id,
        order_status_notice(
            state,
            order.id,
            format!("Order #{} {}", order.id, order.status),
            format!("Your order is now {}.", order.status),
            NotificationCategory::Order,
            order.status.to_string(),
        ),
    )
    .await;
    audit::record(
        state,
        AuditEvent::new(Some(user.user_id), "order_status_updated", "orders", order.id)
            .details(json!({ "from": previous, "to": order.status })),
    )
    .await;

    Ok(ApiResponse::success("Order updated", Order::from(order), Some(Meta::empty())))
}

pub async fn seller_earnings(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<SellerEarnings>> {
    let seller = current_seller(state, user).await?;

    let revenue: Vec<i64> = Orders::find()
        .filter(OrderCol::SellerId.eq(seller.id))
        .filter(OrderCol::Status.eq(OrderStatus::Delivered))
        .select_only()
        .column(OrderCol::TotalAmount)
        .into_tuple()
        .all(&state.orm)
        .await?;

    let commissions: Vec<(i64, i64, bool)> = Commissions::find()
        .filter(CommissionCol::SellerId.eq(seller.id))
        .select_only()
        .column(CommissionCol::CommissionAmount)
        .column(CommissionCol::SellerEarning)
        .column(CommissionCol::Settled)
        .into_tuple()
        .all(&state.orm)
        .await?;

    let summary = SellerEarnings {
        delivered_orders: revenue.len() as i64,
        gross_revenue: revenue.iter().sum(),
        total_commission: commissions.iter().map(|(c, _, _)| c).sum(),
        net_earning: commissions.iter().map(|(_, e, _)| e).sum(),
        unsettled_earning: commissions
            .iter()
            .filter(|(_, _, settled)| !settled)
            .map(|(_, e, _)| e)
            .sum(),
    };
    Ok(ApiResponse::success("Ok", summary, Some(Meta::empty())))
}
