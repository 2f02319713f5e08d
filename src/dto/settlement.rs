use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SellerDecisionRequest {
    pub approved: bool,
    /// Required when approving.
    pub commission_percent: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SellerEarnings {
    pub delivered_orders: i64,
    pub gross_revenue: i64,
    pub total_commission: i64,
    pub net_earning: i64,
    pub unsettled_earning: i64,
}
