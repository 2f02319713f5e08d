use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::WalletTransaction;

#[derive(Debug, Serialize, ToSchema)]
pub struct WalletSummary {
    pub balance: i64,
    pub transactions: Vec<WalletTransaction>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WithdrawRequest {
    pub amount: i64,
}
