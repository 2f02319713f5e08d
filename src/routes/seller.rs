use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::{orders::UpdateOrderStatusRequest, settlement::SellerEarnings},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Order,
    response::ApiResponse,
    services::seller_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders/{id}/status", patch(update_order_status))
        .route("/earnings", get(seller_earnings))
}

#[utoipa::path(
    patch,
    path = "/seller/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order advanced", body = ApiResponse<Order>),
        (status = 400, description = "Target status not allowed for sellers"),
        (status = 403, description = "Not the seller of this order"),
        (status = 409, description = "Illegal transition or unpaid order"),
    ),
    security(("bearer_auth" = [])),
    tag = "Seller"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = seller_service::update_order_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/seller/earnings",
    responses(
        (status = 200, description = "Revenue and commission summary", body = ApiResponse<SellerEarnings>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Seller"
)]
pub async fn seller_earnings(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<SellerEarnings>>> {
    let resp = seller_service::seller_earnings(&state, &user).await?;
    Ok(Json(resp))
}
