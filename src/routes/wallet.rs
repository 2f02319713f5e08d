use axum::{Json, Router, extract::State, routing::{get, post}};

use crate::{
    dto::wallet::{WalletSummary, WithdrawRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::WalletTransaction,
    response::ApiResponse,
    services::wallet_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_wallet))
        .route("/withdraw", post(withdraw))
}

#[utoipa::path(
    get,
    path = "/wallet",
    responses(
        (status = 200, description = "Balance and ledger", body = ApiResponse<WalletSummary>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Wallet"
)]
pub async fn get_wallet(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<WalletSummary>>> {
    let resp = wallet_service::get_wallet(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/wallet/withdraw",
    request_body = WithdrawRequest,
    responses(
        (status = 200, description = "Withdrawal recorded", body = ApiResponse<WalletTransaction>),
        (status = 400, description = "Invalid amount"),
        (status = 409, description = "Insufficient balance"),
    ),
    security(("bearer_auth" = [])),
    tag = "Wallet"
)]
pub async fn withdraw(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<WithdrawRequest>,
) -> AppResult<Json<ApiResponse<WalletTransaction>>> {
    let resp = wallet_service::withdraw_wallet(&state, &user, payload).await?;
    Ok(Json(resp))
}
