use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::LockType,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit::{self, AuditEvent},
    config::DeliveryConfig,
    dto::delivery::{AssignDeliveryRequest, DeliveryList, PartnerEarnings, UpdateDeliveryStatusRequest},
    entity::{
        deliveries::{self, ActiveModel as DeliveryActive, Column as DeliveryCol, Entity as Deliveries},
        orders::ActiveModel as OrderActive,
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    lifecycle,
    middleware::auth::{AuthUser, ensure_admin, ensure_role},
    models::{Delivery, DeliveryStatus, NotificationCategory, Order, OrderStatus, UserRole},
    response::{ApiResponse, Meta},
    routes::params::DeliveryListQuery,
    services::{
        notification_service::{Notice, notify_user, order_status_notice},
        order_service::{invalidate_buyer_orders, lock_order},
    },
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryQuote {
    pub delivery_fee: i64,
    pub partner_earning: i64,
}

/// Fee is linear in distance; the partner keeps a fixed share, rounded down.
pub fn quote(distance_km: i32, config: &DeliveryConfig) -> DeliveryQuote {
    let delivery_fee = i64::from(distance_km) * config.rate_per_km;
    DeliveryQuote {
        delivery_fee,
        partner_earning: delivery_fee * config.partner_share_percent / 100,
    }
}

/// Binds a packed order to a partner and ships it.
pub async fn assign_delivery(
    state: &AppState,
    user: &AuthUser,
    payload: AssignDeliveryRequest,
) -> AppResult<ApiResponse<Delivery>> {
    ensure_admin(user)?;
    if payload.distance_km < 0 {
        return Err(AppError::Validation("Distance cannot be negative".into()));
    }

    let partner = Users::find_by_id(payload.partner_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Delivery partner"))?;
    if partner.role != UserRole::Delivery || partner.is_blocked {
        return Err(AppError::Validation("User cannot take deliveries".into()));
    }

    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, payload.order_id).await?;
    lifecycle::ensure_assignable(order.status)?;

    let existing = Deliveries::find()
        .filter(DeliveryCol::OrderId.eq(order.id))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(AppError::conflict("Delivery already assigned"));
    }

    let quote = quote(payload.distance_km, &state.config.delivery);
    let delivery = DeliveryActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        partner_id: Set(partner.id),
        distance_km: Set(payload.distance_km),
        delivery_fee: Set(quote.delivery_fee),
        partner_earning: Set(quote.partner_earning),
        status: Set(DeliveryStatus::Assigned),
        settled: Set(false),
        payout_id: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut active: OrderActive = order.into();
    active.delivery_partner_id = Set(Some(partner.id));
    active.status = Set(OrderStatus::Shipped);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        partner_id = %partner.id,
        fee = quote.delivery_fee,
        "delivery assigned"
    );

    invalidate_buyer_orders(state, order.buyer_id).await;
    notify_user(
        state,
        order.buyer_id,
        order_status_notice(
            state,
            order.id,
            format!("Order #{} shipped", order.id),
            "Your order has been handed to a delivery partner.",
            NotificationCategory::Delivery,
            OrderStatus::Shipped.to_string(),
        ),
    )
    .await;
    notify_user(
        state,
        partner.id,
        Notice::new(
            "New delivery assigned",
            format!("Order #{} is ready for pickup.", order.id),
            NotificationCategory::Delivery,
            format!("/delivery/{}", delivery.id),
        ),
    )
    .await;
    audit::record(
        state,
        AuditEvent::new(Some(user.user_id), "delivery_assigned", "deliveries", delivery.id)
            .details(json!({ "order_id": order.id, "partner_id": partner.id })),
    )
    .await;

    Ok(ApiResponse::success("Delivery assigned", Delivery::from(delivery), Some(Meta::empty())))
}

/// Partner progress update. `delivered` also completes the order.
pub async fn update_delivery_status(
    state: &AppState,
    user: &AuthUser,
    delivery_id: Uuid,
    payload: UpdateDeliveryStatusRequest,
) -> AppResult<ApiResponse<Delivery>> {
    ensure_role(user, UserRole::Delivery)?;

    let order_id = Deliveries::find_by_id(delivery_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Delivery"))?
        .order_id;

    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, order_id).await?;
    let delivery = Deliveries::find_by_id(delivery_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Delivery"))?;
    if delivery.partner_id != user.user_id {
        return Err(AppError::PermissionDenied);
    }
    lifecycle::delivery_transition(delivery.status, payload.status)?;

    let order = if payload.status == DeliveryStatus::Delivered {
        if order.status != OrderStatus::Shipped {
            return Err(AppError::conflict(format!(
                "Order is {} and cannot be delivered",
                order.status
            )));
        }
        let mut active: OrderActive = order.into();
        active.status = Set(OrderStatus::Delivered);
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await?
    } else {
        order
    };

    let mut active: deliveries::ActiveModel = delivery.into();
    active.status = Set(payload.status);
    active.updated_at = Set(Utc::now().into());
    let delivery = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        %delivery_id,
        order_id = %order.id,
        status = %delivery.status,
        "delivery status updated"
    );

    let shown = if delivery.status == DeliveryStatus::Delivered {
        order.status.to_string()
    } else {
        delivery.status.to_string()
    };
    invalidate_buyer_orders(state, order.buyer_id).await;
    notify_user(
        state,
        order.buyer_id,
        order_status_notice(
            state,
            order.id,
            format!("Delivery update for order #{}", order.id),
            format!("Order status is now {shown}."),
            NotificationCategory::Delivery,
            shown,
        ),
    )
    .await;
    audit::record(
        state,
        AuditEvent::new(Some(user.user_id), "delivery_status_updated", "deliveries", delivery.id)
            .details(json!({ "status": delivery.status })),
    )
    .await;

    Ok(ApiResponse::success("Delivery updated", Delivery::from(delivery), Some(Meta::empty())))
}

/// The assigned partner collects a returned parcel.
pub async fn confirm_return_pickup(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    ensure_role(user, UserRole::Delivery)?;

    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, order_id).await?;
    if order.delivery_partner_id != Some(user.user_id) {
        return Err(AppError::PermissionDenied);
    }
    let next = lifecycle::confirm_return_pickup(order.return_status)?;

    let mut active: OrderActive = order.into();
    active.return_status = Set(next);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    invalidate_buyer_orders(state, order.buyer_id).await;
    notify_user(
        state,
        order.buyer_id,
        order_status_notice(
            state,
            order.id,
            format!("Return picked up for order #{}", order.id),
            "Your return has been collected. A refund will follow.",
            NotificationCategory::Delivery,
            format!("return_{}", order.return_status),
        ),
    )
    .await;
    audit::record(
        state,
        AuditEvent::new(Some(user.user_id), "return_picked", "orders", order.id),
    )
    .await;

    Ok(ApiResponse::success("Return picked up", Order::from(order), Some(Meta::empty())))
}

pub async fn partner_deliveries(
    state: &AppState,
    user: &AuthUser,
    query: DeliveryListQuery,
) -> AppResult<ApiResponse<DeliveryList>> {
    ensure_role(user, UserRole::Delivery)?;

    let mut condition = Condition::all().add(DeliveryCol::PartnerId.eq(user.user_id));
    if let Some(status) = query.status {
        condition = condition.add(DeliveryCol::Status.eq(status));
    }
    let items = Deliveries::find()
        .filter(condition)
        .order_by_desc(DeliveryCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Delivery::from)
        .collect();

    Ok(ApiResponse::success("Ok", DeliveryList { items }, Some(Meta::empty())))
}

pub async fn partner_earnings(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<PartnerEarnings>> {
    ensure_role(user, UserRole::Delivery)?;

    let delivered = Deliveries::find()
        .filter(DeliveryCol::PartnerId.eq(user.user_id))
        .filter(DeliveryCol::Status.eq(DeliveryStatus::Delivered))
        .select_only()
        .column(DeliveryCol::PartnerEarning)
        .column(DeliveryCol::Settled)
        .into_tuple::<(i64, bool)>()
        .all(&state.orm)
        .await?;

    let summary = PartnerEarnings {
        completed_deliveries: delivered.len() as i64,
        total_earning: delivered.iter().map(|(earning, _)| earning).sum(),
        unsettled_earning: delivered
            .iter()
            .filter(|(_, settled)| !settled)
            .map(|(earning, _)| earning)
            .sum(),
    };
    Ok(ApiResponse::success("Ok", summary, Some(Meta::empty())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rate_quotes_worked_example() {
        let q = quote(5, &DeliveryConfig::default());
        assert_eq!(q.delivery_fee, 50);
        assert_eq!(q.partner_earning, 40);
    }

    #[test]
    fn partner_share_rounds_down() {
        let config = DeliveryConfig {
            rate_per_km: 7,
            partner_share_percent: 80,
        };
        let q = quote(3, &config);
        assert_eq!(q.delivery_fee, 21);
        assert_eq!(q.partner_earning, 16);
    }
}
