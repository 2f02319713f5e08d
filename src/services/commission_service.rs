use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit::{self, AuditEvent},
    entity::{
        commissions::{ActiveModel as CommissionActive, Column as CommissionCol, Entity as Commissions},
        orders::ActiveModel as OrderActive,
        payments::{Column as PaymentCol, Entity as Payments},
        sellers::Entity as Sellers,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Commission, OrderStatus, PaymentMethod, PaymentStatus},
    response::{ApiResponse, Meta},
    services::order_service::lock_order,
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissionSplit {
    pub commission_amount: i64,
    pub seller_earning: i64,
    pub platform_earning: i64,
}

/// Integer split of an order total; the platform's share rounds down.
pub fn split_commission(total_amount: i64, percent: i32) -> CommissionSplit {
    let commission_amount = total_amount * i64::from(percent) / 100;
    CommissionSplit {
        commission_amount,
        seller_earning: total_amount - commission_amount,
        platform_earning: commission_amount,
    }
}

/// Records the platform/seller split for a delivered order, at most once.
///
/// The seller's current rate is frozen on the row. A second call, concurrent or
/// not, fails with a conflict: the pre-check catches the common case and the
/// unique index on `order_id` catches the race.
pub async fn calculate_commission(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<Commission>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, order_id).await?;
    if order.status != OrderStatus::Delivered {
        return Err(AppError::conflict("Order must be delivered before commission"));
    }
    if order.payment_method == PaymentMethod::Prepaid {
        let paid = Payments::find()
            .filter(PaymentCol::OrderId.eq(order.id))
            .filter(PaymentCol::Status.eq(PaymentStatus::Completed))
            .one(&txn)
            .await?
            .is_some();
        if !paid {
            return Err(AppError::conflict("Prepaid order has no completed payment"));
        }
    }

    let existing = Commissions::find()
        .filter(CommissionCol::OrderId.eq(order.id))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(AppError::conflict("Commission already calculated"));
    }

    let seller = Sellers::find_by_id(order.seller_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Seller"))?;

    let split = split_commission(order.total_amount, seller.commission_percent);
    let commission = CommissionActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        seller_id: Set(seller.id),
        commission_percent: Set(seller.commission_percent),
        commission_amount: Set(split.commission_amount),
        seller_earning: Set(split.seller_earning),
        platform_earning: Set(split.platform_earning),
        settled: Set(false),
        payout_id: Set(None),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut active: OrderActive = order.into();
    active.commission_amount = Set(Some(split.commission_amount));
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        %order_id,
        percent = commission.commission_percent,
        commission_amount = commission.commission_amount,
        seller_earning = commission.seller_earning,
        "commission calculated"
    );
    audit::record(
        state,
        AuditEvent::new(Some(user.user_id), "commission_calculated", "commissions", commission.id)
            .details(json!({ "order_id": order_id, "amount": commission.commission_amount })),
    )
    .await;

    Ok(ApiResponse::success(
        "Commission calculated",
        Commission::from(commission),
        Some(Meta::empty()),
    ))
}
