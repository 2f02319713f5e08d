use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        delivery::AssignDeliveryRequest,
        orders::{OrderList, OrderWithItems, RefundResult, ReturnDecisionRequest},
        settlement::SellerDecisionRequest,
        users::BlockUserRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Commission, Delivery, Order, Payment, Payout, Seller, User},
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::{
        admin_service, commission_service, delivery_service, payment_service, payout_service,
        refund_service,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_all_orders))
        .route("/orders/{id}", get(get_order_admin))
        .route("/orders/{id}/return-decision", post(decide_return))
        .route("/orders/{id}/refund", post(process_refund))
        .route("/orders/{id}/payment-refund", post(refund_payment))
        .route("/orders/{id}/commission", post(calculate_commission))
        .route("/deliveries", post(assign_delivery))
        .route("/sellers/{id}/decision", post(decide_seller))
        .route("/users/{id}/block", post(block_user))
        .route("/payouts/sellers/{id}", post(create_seller_payout))
        .route("/payouts/delivery/{id}", post(create_delivery_payout))
}

#[utoipa::path(
    get,
    path = "/admin/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Get all orders (admin only)", body = ApiResponse<OrderList>),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal Server Error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = admin_service::list_all_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Get any order with items (admin only)", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Not Found"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_order_admin(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = admin_service::get_order_admin(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/admin/orders/{id}/return-decision",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = ReturnDecisionRequest,
    responses(
        (status = 200, description = "Return approved or rejected", body = ApiResponse<Order>),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "No pending return request"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn decide_return(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReturnDecisionRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = admin_service::decide_return(&state, &user, id, payload.approved).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/admin/orders/{id}/refund",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Picked-up return refunded", body = ApiResponse<RefundResult>),
        (status = 409, description = "Order is not awaiting a refund"),
        (status = 502, description = "Payment gateway failure"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn process_refund(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<RefundResult>>> {
    let resp = refund_service::process_refund(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/admin/orders/{id}/payment-refund",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Captured payment of a cancelled order refunded", body = ApiResponse<Payment>),
        (status = 409, description = "Nothing to refund"),
        (status = 502, description = "Payment gateway failure"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn refund_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let resp = payment_service::refund_payment(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/admin/orders/{id}/commission",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 201, description = "Commission recorded", body = ApiResponse<Commission>),
        (status = 409, description = "Not delivered, unpaid or already calculated"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn calculate_commission(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<ApiResponse<Commission>>)> {
    let resp = commission_service::calculate_commission(&state, &user, id).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/admin/deliveries",
    request_body = AssignDeliveryRequest,
    responses(
        (status = 201, description = "Delivery assigned and order shipped", body = ApiResponse<Delivery>),
        (status = 400, description = "Invalid partner or distance"),
        (status = 409, description = "Order not packed or already assigned"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn assign_delivery(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AssignDeliveryRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Delivery>>)> {
    let resp = delivery_service::assign_delivery(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/admin/sellers/{id}/decision",
    params(("id" = Uuid, Path, description = "Seller ID")),
    request_body = SellerDecisionRequest,
    responses(
        (status = 200, description = "Seller approved or rejected", body = ApiResponse<Seller>),
        (status = 400, description = "Missing or invalid commission percent"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn decide_seller(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SellerDecisionRequest>,
) -> AppResult<Json<ApiResponse<Seller>>> {
    let resp = admin_service::decide_seller(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/admin/users/{id}/block",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = BlockUserRequest,
    responses(
        (status = 200, description = "User blocked or unblocked", body = ApiResponse<User>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn block_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<BlockUserRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = admin_service::block_user(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/admin/payouts/sellers/{id}",
    params(("id" = Uuid, Path, description = "Seller ID")),
    responses(
        (status = 201, description = "Payout of all unsettled commissions", body = ApiResponse<Payout>),
        (status = 409, description = "No earnings to payout"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_seller_payout(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<ApiResponse<Payout>>)> {
    let resp = payout_service::create_seller_payout(&state, &user, id).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/admin/payouts/delivery/{id}",
    params(("id" = Uuid, Path, description = "Delivery partner user ID")),
    responses(
        (status = 201, description = "Payout of all unsettled deliveries", body = ApiResponse<Payout>),
        (status = 409, description = "No earnings to payout"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_delivery_payout(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<ApiResponse<Payout>>)> {
    let resp = payout_service::create_delivery_payout(&state, &user, id).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}
