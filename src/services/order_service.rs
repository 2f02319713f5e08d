use std::time::Duration;

use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::LockType,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit::{self, AuditEvent},
    cache::{self, SEARCH_PREFIX, STORES_PREFIX, buyer_orders_prefix},
    dto::orders::{
        CancelOrderResponse, OrderList, OrderSummary, OrderWithItems, PlaceOrderRequest,
        RefundStatus, ReturnRequest,
    },
    entity::{
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{self, ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        payments::{self, Column as PaymentCol, Entity as Payments},
        sellers::Entity as Sellers,
    },
    error::{AppError, AppResult},
    ledger::{order_total, reserve_stock, restore_stock},
    lifecycle,
    middleware::auth::{AuthUser, ensure_role},
    models::{
        Address, NotificationCategory, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus,
        ReturnStatus, UserRole,
    },
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{
        notification_service::{Notice, notify_user, order_link, order_status_notice},
        payment_service,
    },
    state::AppState,
    templates,
};

fn validate_address(address: &Address) -> AppResult<()> {
    let required = [
        ("name", &address.name),
        ("phone", &address.phone),
        ("house_no", &address.house_no),
        ("city", &address.city),
        ("state", &address.state),
        ("pincode", &address.pincode),
    ];
    if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
        return Err(AppError::Validation(format!("Address {field} is required")));
    }
    Ok(())
}

/// Loads an order row under `FOR UPDATE` inside `conn`.
pub(crate) async fn lock_order<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<orders::Model> {
    Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))
}

pub(crate) async fn order_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<Vec<OrderItem>> {
    Ok(OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect())
}

pub(crate) async fn invalidate_buyer_orders(state: &AppState, buyer_id: Uuid) {
    cache::invalidate(state.cache.as_ref(), &[&buyer_orders_prefix(buyer_id)]).await;
}

async fn reindex_products(state: &AppState, product_ids: &[Uuid]) {
    for &product_id in product_ids {
        if let Err(err) = state.indexer.upsert_product(product_id).await {
            tracing::warn!(error = %err, %product_id, "product indexing failed");
        }
    }
}

pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_role(user, UserRole::Buyer)?;
    validate_address(&payload.address)?;
    let requested: Vec<(Uuid, i32)> = payload
        .items
        .iter()
        .map(|item| (item.product_id, item.quantity))
        .collect();

    let txn = state.orm.begin().await?;

    let seller = Sellers::find_by_id(payload.seller_id)
        .one(&txn)
        .await?
        .ok_or(AppError::SellerNotEligible)?;
    if !seller.approved {
        return Err(AppError::SellerNotEligible);
    }

    let lines = reserve_stock(&txn, seller.id, &requested).await?;
    let total_amount = order_total(&lines)?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        buyer_id: Set(user.user_id),
        seller_id: Set(seller.id),
        total_amount: Set(total_amount),
        payment_method: Set(payload.payment_method),
        status: Set(OrderStatus::Placed),
        address: Set(payload.address),
        return_status: Set(ReturnStatus::None),
        return_reason: Set(None),
        return_image: Set(None),
        delivery_partner_id: Set(None),
        commission_amount: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            price: Set(line.price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        items.push(OrderItem::from(item));
    }

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        buyer_id = %user.user_id,
        total_amount,
        method = %order.payment_method,
        "order placed"
    );

    cache::invalidate(
        state.cache.as_ref(),
        &[&buyer_orders_prefix(user.user_id), SEARCH_PREFIX, STORES_PREFIX],
    )
    .await;
    let product_ids: Vec<Uuid> = lines.iter().map(|line| line.product_id).collect();
    reindex_products(state, &product_ids).await;
    if let Err(err) = state.indexer.upsert_store(seller.id).await {
        tracing::warn!(error = %err, seller_id = %seller.id, "store indexing failed");
    }

    let frontend = state.config.frontend_url.clone();
    let (order_id, amount) = (order.id, order.total_amount);
    notify_user(
        state,
        order.buyer_id,
        Notice::new(
            format!("Order #{order_id} placed"),
            "Your order has been placed successfully.",
            NotificationCategory::Order,
            order_link(order_id),
        )
        .with_email(move |buyer| templates::order_created(&frontend, &buyer.name, order_id, amount)),
    )
    .await;

    audit::record(
        state,
        AuditEvent::new(Some(user.user_id), "order_placed", "orders", order.id)
            .details(json!({ "total_amount": total_amount, "lines": lines.len() })),
    )
    .await;

    Ok(ApiResponse::success(
        "Order placed",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<CancelOrderResponse>> {
    ensure_role(user, UserRole::Buyer)?;

    let txn = state.orm.begin().await?;

    let order = lock_order(&txn, order_id).await?;
    if order.buyer_id != user.user_id {
        return Err(AppError::PermissionDenied);
    }
    lifecycle::ensure_cancellable(order.status)?;

    let items = order_items(&txn, order.id).await?;
    let reserved: Vec<(Uuid, i32)> = items.iter().map(|i| (i.product_id, i.quantity)).collect();
    restore_stock(&txn, &reserved).await?;

    let mut refund_status = RefundStatus::NotApplicable;
    if order.payment_method == PaymentMethod::Prepaid {
        refund_status = RefundStatus::NotRequired;
        let payment = Payments::find()
            .filter(PaymentCol::OrderId.eq(order.id))
            .lock(LockType::Update)
            .one(&txn)
            .await?;
        match payment {
            Some(p) if p.status == PaymentStatus::Completed => {
                refund_status = RefundStatus::Initiated;
            }
            Some(p) if p.status == PaymentStatus::Initiated => {
                let mut active: payments::ActiveModel = p.into();
                active.status = Set(PaymentStatus::Failed);
                active.updated_at = Set(chrono::Utc::now().into());
                active.update(&txn).await?;
            }
            _ => {}
        }
    }

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled);
    active.updated_at = Set(chrono::Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    // The gateway call happens after commit; a failure leaves the payment
    // completed so an admin can retry the refund.
    if refund_status == RefundStatus::Initiated {
        if let Err(err) = payment_service::initiate_refund(state, order.id).await {
            tracing::warn!(error = %err, order_id = %order.id, "refund after cancellation failed");
            refund_status = RefundStatus::Pending;
        }
    }

    tracing::info!(order_id = %order.id, ?refund_status, "order cancelled");

    cache::invalidate(
        state.cache.as_ref(),
        &[&buyer_orders_prefix(order.buyer_id), SEARCH_PREFIX, STORES_PREFIX],
    )
    .await;
    let product_ids: Vec<Uuid> = reserved.iter().map(|(id, _)| *id).collect();
    reindex_products(state, &product_ids).await;

    notify_user(
        state,
        order.buyer_id,
        order_status_notice(
            state,
            order.id,
            format!("Order #{} cancelled", order.id),
            "Your order has been cancelled.",
            NotificationCategory::Order,
            OrderStatus::Cancelled.to_string(),
        ),
    )
    .await;

    audit::record(
        state,
        AuditEvent::new(Some(user.user_id), "order_cancelled", "orders", order.id)
            .details(json!({ "refund_status": refund_status })),
    )
    .await;

    Ok(ApiResponse::success(
        "Order cancelled",
        CancelOrderResponse {
            order: Order::from(order),
            refund_status,
        },
        Some(Meta::empty()),
    ))
}

pub async fn request_return(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: ReturnRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_role(user, UserRole::Buyer)?;
    let reason = payload.reason.trim();
    if reason.is_empty() {
        return Err(AppError::Validation("Return reason is required".into()));
    }

    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, order_id).await?;
    if order.buyer_id != user.user_id {
        return Err(AppError::PermissionDenied);
    }
    lifecycle::ensure_return_requestable(order.status, order.return_status)?;

    let mut active: OrderActive = order.into();
    active.return_status = Set(ReturnStatus::Requested);
    active.return_reason = Set(Some(reason.to_string()));
    active.return_image = Set(payload.image.filter(|s| !s.trim().is_empty()));
    active.updated_at = Set(chrono::Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    invalidate_buyer_orders(state, order.buyer_id).await;
    notify_user(
        state,
        order.buyer_id,
        order_status_notice(
            state,
            order.id,
            format!("Return requested for order #{}", order.id),
            "Your return request has been received and is awaiting review.",
            NotificationCategory::Order,
            "return_requested".to_string(),
        ),
    )
    .await;
    audit::record(
        state,
        AuditEvent::new(Some(user.user_id), "return_requested", "orders", order.id),
    )
    .await;

    Ok(ApiResponse::success("Return requested", Order::from(order), Some(Meta::empty())))
}

#[derive(Serialize, Deserialize)]
struct CachedOrderPage {
    items: Vec<Order>,
    total: i64,
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_role(user, UserRole::Buyer)?;
    let (page, limit, offset) = query.pagination().normalize();
    let cache_key = format!("{}{}", buyer_orders_prefix(user.user_id), query.cache_key());

    if let Some(hit) = state.cache.get(&cache_key).await {
        match serde_json::from_value::<CachedOrderPage>(hit) {
            Ok(cached) => {
                return Ok(ApiResponse::success(
                    "Ok",
                    OrderList { items: cached.items },
                    Some(Meta::new(page, limit, cached.total)),
                ));
            }
            Err(err) => tracing::warn!(error = %err, %cache_key, "discarding unreadable cache entry"),
        }
    }

    let mut condition = Condition::all().add(OrderCol::BuyerId.eq(user.user_id));
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let items: Vec<Order> = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let page_data = CachedOrderPage { items, total };
    match serde_json::to_value(&page_data) {
        Ok(value) => {
            let ttl: Duration = state.config.cache_ttl;
            state.cache.set(&cache_key, value, ttl).await;
        }
        Err(err) => tracing::warn!(error = %err, "failed to cache order page"),
    }

    Ok(ApiResponse::success(
        "Ok",
        OrderList {
            items: page_data.items,
        },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::Id.eq(id))
                .add(OrderCol::BuyerId.eq(user.user_id)),
        )
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;

    let items = order_items(&state.orm, order.id).await?;

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

const RECENT_ORDERS: u64 = 3;

fn tally_statuses(counts: &[(OrderStatus, i64)]) -> OrderSummary {
    let mut summary = OrderSummary {
        total_orders: 0,
        active_orders: 0,
        delivered_orders: 0,
        cancelled_orders: 0,
        recent_orders: Vec::new(),
    };
    for &(status, count) in counts {
        summary.total_orders += count;
        match status {
            OrderStatus::Placed | OrderStatus::Packed | OrderStatus::Shipped => {
                summary.active_orders += count
            }
            OrderStatus::Delivered => summary.delivered_orders += count,
            OrderStatus::Cancelled => summary.cancelled_orders += count,
        }
    }
    summary
}

/// Per-status counts and the latest orders for the buyer dashboard.
pub async fn order_summary(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderSummary>> {
    ensure_role(user, UserRole::Buyer)?;

    let counts: Vec<(OrderStatus, i64)> = Orders::find()
        .filter(OrderCol::BuyerId.eq(user.user_id))
        .select_only()
        .column(OrderCol::Status)
        .column_as(OrderCol::Id.count(), "count")
        .group_by(OrderCol::Status)
        .into_tuple()
        .all(&state.orm)
        .await?;

    let mut summary = tally_statuses(&counts);
    summary.recent_orders = Orders::find()
        .filter(OrderCol::BuyerId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt)
        .limit(RECENT_ORDERS)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok(ApiResponse::success("Order summary", summary, Some(Meta::empty())))
}
