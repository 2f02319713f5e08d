use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::LockType,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    audit::{self, AuditEvent},
    cache::{self, SEARCH_PREFIX, STORES_PREFIX},
    dto::{
        orders::{OrderList, OrderWithItems},
        settlement::SellerDecisionRequest,
        users::BlockUserRequest,
    },
    entity::{
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        sellers::{ActiveModel as SellerActive, Entity as Sellers},
        users::{ActiveModel as UserActive, Entity as Users},
    },
    error::{AppError, AppResult},
    lifecycle,
    middleware::auth::{AuthUser, ensure_admin},
    models::{KycStatus, NotificationCategory, Order, ReturnStatus, Seller, User},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{
        notification_service::{Notice, notify_user, order_status_notice},
        order_service::{invalidate_buyer_orders, lock_order, order_items},
    },
    state::AppState,
    templates,
};

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok(ApiResponse::success(
        "Orders",
        OrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;
    let items = order_items(&state.orm, order.id).await?;

    Ok(ApiResponse::success(
        "Order found",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Approves or rejects a pending return request.
pub async fn decide_return(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    approved: bool,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, order_id).await?;
    let next = lifecycle::decide_return(order.return_status, approved)?;

    let mut active: OrderActive = order.into();
    active.return_status = Set(next);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(%order_id, return_status = %order.return_status, "return decided");

    let (title, message) = if next == ReturnStatus::Approved {
        (
            format!("Return approved for order #{}", order.id),
            "Your return was approved. A delivery partner will collect the item.",
        )
    } else {
        (
            format!("Return rejected for order #{}", order.id),
            "Your return request was rejected.",
        )
    };
    invalidate_buyer_orders(state, order.buyer_id).await;
    notify_user(
        state,
        order.buyer_id,
        order_status_notice(
            state,
            order.id,
            title,
            message,
            NotificationCategory::Order,
            format!("return_{next}"),
        ),
    )
    .await;
    audit::record(
        state,
        AuditEvent::new(Some(user.user_id), "return_decided", "orders", order.id)
            .details(json!({ "approved": approved })),
    )
    .await;

    Ok(ApiResponse::success("Return updated", Order::from(order), Some(Meta::empty())))
}

/// Seller KYC decision. Approval fixes the commission rate applied to future
/// orders.
pub async fn decide_seller(
    state: &AppState,
    user: &AuthUser,
    seller_id: Uuid,
    payload: SellerDecisionRequest,
) -> AppResult<ApiResponse<Seller>> {
    ensure_admin(user)?;
    let percent = match (payload.approved, payload.commission_percent) {
        (true, Some(percent)) if (0..=100).contains(&percent) => Some(percent),
        (true, Some(_)) => {
            return Err(AppError::Validation(
                "Commission percent must be between 0 and 100".into(),
            ));
        }
        (true, None) => {
            return Err(AppError::Validation(
                "Commission percent is required to approve a seller".into(),
            ));
        }
        (false, _) => None,
    };

    let txn = state.orm.begin().await?;
    let seller = Sellers::find_by_id(seller_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Seller"))?;

    let mut active: SellerActive = seller.into();
    active.approved = Set(payload.approved);
    active.kyc_status = Set(if payload.approved {
        KycStatus::Approved
    } else {
        KycStatus::Rejected
    });
    if let Some(percent) = percent {
        active.commission_percent = Set(percent);
    }
    let seller = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        %seller_id,
        approved = seller.approved,
        commission_percent = seller.commission_percent,
        "seller decision recorded"
    );

    if let Err(err) = state.indexer.upsert_store(seller.id).await {
        tracing::warn!(error = %err, %seller_id, "store indexing failed");
    }
    cache::invalidate(state.cache.as_ref(), &[SEARCH_PREFIX, STORES_PREFIX]).await;

    let frontend = state.config.frontend_url.clone();
    let approved = seller.approved;
    notify_user(
        state,
        seller.user_id,
        Notice::new(
            "Seller verification update",
            if approved {
                "Your seller profile has been approved."
            } else {
                "Your seller profile has been rejected."
            },
            NotificationCategory::System,
            "/seller",
        )
        .with_email(move |owner| templates::seller_decision(&frontend, &owner.name, approved)),
    )
    .await;
    audit::record(
        state,
        AuditEvent::new(Some(user.user_id), "seller_decided", "sellers", seller.id)
            .details(json!({ "approved": approved, "commission_percent": percent })),
    )
    .await;

    Ok(ApiResponse::success("Seller updated", Seller::from(seller), Some(Meta::empty())))
}

/// Blocks or unblocks an account. Blocked users are refused at authentication.
pub async fn block_user(
    state: &AppState,
    user: &AuthUser,
    user_id: Uuid,
    payload: BlockUserRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    if payload.blocked && user_id == user.user_id {
        return Err(AppError::conflict("Admins cannot block their own account"));
    }

    let account = Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    let mut active: UserActive = account.into();
    active.is_blocked = Set(payload.blocked);
    let account = active.update(&state.orm).await?;

    tracing::info!(%user_id, blocked = account.is_blocked, "user block status changed");
    audit::record(
        state,
        AuditEvent::new(
            Some(user.user_id),
            if account.is_blocked { "user_blocked" } else { "user_unblocked" },
            "users",
            account.id,
        ),
    )
    .await;

    let message = if account.is_blocked { "User blocked" } else { "User unblocked" };
    Ok(ApiResponse::success(message, User::from(account), Some(Meta::empty())))
}
