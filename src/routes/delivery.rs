use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::delivery::{DeliveryList, PartnerEarnings, UpdateDeliveryStatusRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Delivery, Order},
    response::ApiResponse,
    routes::params::DeliveryListQuery,
    services::delivery_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(partner_deliveries))
        .route("/earnings", get(partner_earnings))
        .route("/{id}/status", patch(update_delivery_status))
        .route("/returns/{order_id}/pickup", post(confirm_return_pickup))
}

#[utoipa::path(
    get,
    path = "/delivery",
    params(DeliveryListQuery),
    responses(
        (status = 200, description = "Deliveries assigned to the current partner", body = ApiResponse<DeliveryList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Delivery"
)]
pub async fn partner_deliveries(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DeliveryListQuery>,
) -> AppResult<Json<ApiResponse<DeliveryList>>> {
    let resp = delivery_service::partner_deliveries(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/delivery/earnings",
    responses(
        (status = 200, description = "Earnings summary", body = ApiResponse<PartnerEarnings>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Delivery"
)]
pub async fn partner_earnings(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<PartnerEarnings>>> {
    let resp = delivery_service::partner_earnings(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/delivery/{id}/status",
    params(("id" = Uuid, Path, description = "Delivery ID")),
    request_body = UpdateDeliveryStatusRequest,
    responses(
        (status = 200, description = "Delivery status updated", body = ApiResponse<Delivery>),
        (status = 403, description = "Not the assigned partner"),
        (status = 409, description = "Illegal transition"),
    ),
    security(("bearer_auth" = [])),
    tag = "Delivery"
)]
pub async fn update_delivery_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDeliveryStatusRequest>,
) -> AppResult<Json<ApiResponse<Delivery>>> {
    let resp = delivery_service::update_delivery_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/delivery/returns/{order_id}/pickup",
    params(("order_id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Return collected", body = ApiResponse<Order>),
        (status = 403, description = "Not the assigned partner"),
        (status = 409, description = "Return is not approved"),
    ),
    security(("bearer_auth" = [])),
    tag = "Delivery"
)]
pub async fn confirm_return_pickup(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = delivery_service::confirm_return_pickup(&state, &user, order_id).await?;
    Ok(Json(resp))
}
