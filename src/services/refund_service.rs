use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseTransaction, EntityTrait, Set, TransactionTrait};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit::{self, AuditEvent},
    dto::orders::RefundResult,
    entity::orders::{self, ActiveModel as OrderActive, Entity as Orders},
    error::{AppError, AppResult},
    ledger::credit_wallet,
    lifecycle,
    middleware::auth::{AuthUser, ensure_admin},
    models::{NotificationCategory, Order, OrderStatus, Payment, PaymentMethod, WalletTransaction},
    response::{ApiResponse, Meta},
    services::{
        notification_service::{Notice, notify_user},
        order_service::{invalidate_buyer_orders, lock_order},
        payment_service::{gateway_refund, mark_refunded, refundable_payment},
    },
    state::AppState,
    templates,
};

pub const COD_REFUND_TXN: &str = "cod_refund";

/// Settles a picked-up return: reverses the payment (prepaid) or credits the
/// buyer's wallet (cash on delivery), then closes the order as cancelled.
pub async fn process_refund(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<RefundResult>> {
    ensure_admin(user)?;

    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;
    lifecycle::ensure_refundable(order.status, order.return_status)?;

    let (order, payment, wallet_credit) = match order.payment_method {
        PaymentMethod::Prepaid => {
            let payment = refundable_payment(state, order.id).await?;
            // Gateway first; rows are re-validated under lock afterwards.
            let refund_ref = gateway_refund(state, &payment).await?;

            let txn = state.orm.begin().await?;
            let order = lock_order(&txn, order_id).await?;
            lifecycle::ensure_refundable(order.status, order.return_status)?;
            let payment = mark_refunded(&txn, payment.id, refund_ref).await?;
            let order = close_order(&txn, order).await?;
            txn.commit().await?;
            (order, Some(Payment::from(payment)), None)
        }
        PaymentMethod::Cod => {
            let txn = state.orm.begin().await?;
            let order = lock_order(&txn, order_id).await?;
            lifecycle::ensure_refundable(order.status, order.return_status)?;
            let entry = credit_wallet(
                &txn,
                order.buyer_id,
                order.total_amount,
                COD_REFUND_TXN,
                Some(order.id.to_string()),
            )
            .await?;
            let order = close_order(&txn, order).await?;
            txn.commit().await?;
            (order, None, Some(WalletTransaction::from(entry)))
        }
    };

    tracing::info!(
        order_id = %order.id,
        method = %order.payment_method,
        amount = order.total_amount,
        "return refunded"
    );

    invalidate_buyer_orders(state, order.buyer_id).await;
    let frontend = state.config.frontend_url.clone();
    notify_user(
        state,
        order.buyer_id,
        Notice::new(
            format!("Refund completed for order #{}", order.id),
            "Your refund has been completed.",
            NotificationCategory::Payment,
            "/buyer/wallet",
        )
        .with_email(move |buyer| templates::refund_processed(&frontend, &buyer.name, order_id)),
    )
    .await;
    audit::record(
        state,
        AuditEvent::new(Some(user.user_id), "return_refunded", "orders", order.id)
            .details(json!({ "method": order.payment_method, "amount": order.total_amount })),
    )
    .await;

    Ok(ApiResponse::success(
        "Refund processed",
        RefundResult {
            order: Order::from(order),
            payment,
            wallet_credit,
        },
        Some(Meta::empty()),
    ))
}

async fn close_order(
    txn: &DatabaseTransaction,
    order: orders::Model,
) -> AppResult<orders::Model> {
    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled);
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(txn).await?)
}
