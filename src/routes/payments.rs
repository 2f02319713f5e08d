use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    routing::post,
};
use uuid::Uuid;

use crate::{
    dto::payments::{
        ConfirmPaymentRequest, InitiatePaymentRequest, PaymentConfirmation, PaymentInitiation,
        WebhookAck,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/initiate", post(initiate_payment))
        .route("/{id}/confirm", post(confirm_payment))
        .route("/webhook", post(webhook))
}

#[utoipa::path(
    post,
    path = "/payments/initiate",
    request_body = InitiatePaymentRequest,
    responses(
        (status = 200, description = "Checkout details for a prepaid order", body = ApiResponse<PaymentInitiation>),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Order cannot be paid"),
        (status = 502, description = "Payment gateway failure"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn initiate_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<InitiatePaymentRequest>,
) -> AppResult<Json<ApiResponse<PaymentInitiation>>> {
    let resp = payment_service::initiate_payment(&state, &user, payload.order_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/payments/{id}/confirm",
    params(("id" = Uuid, Path, description = "Payment ID")),
    request_body = ConfirmPaymentRequest,
    responses(
        (status = 200, description = "Payment completed", body = ApiResponse<PaymentConfirmation>),
        (status = 400, description = "Missing checkout fields"),
        (status = 409, description = "Signature or reference mismatch"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn confirm_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmPaymentRequest>,
) -> AppResult<Json<ApiResponse<PaymentConfirmation>>> {
    let resp = payment_service::confirm_payment(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

/// Gateway callback. The canonical form of the body is checked against the signature header.
#[utoipa::path(
    post,
    path = "/payments/webhook",
    request_body(content = String, description = "Gateway event JSON", content_type = "application/json"),
    responses(
        (status = 200, description = "Event processed or ignored", body = ApiResponse<WebhookAck>),
        (status = 409, description = "Invalid signature"),
        (status = 404, description = "Payment not found"),
    ),
    tag = "Payments"
)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<WebhookAck>>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let resp = payment_service::handle_webhook(&state, &body, signature).await?;
    Ok(Json(resp))
}
