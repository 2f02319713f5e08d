use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{
    Address, Order, OrderItem, OrderStatus, Payment, PaymentMethod, WalletTransaction,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PlaceOrderRequest {
    pub seller_id: Uuid,
    pub items: Vec<OrderItemRequest>,
    pub address: Address,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

/// Buyer dashboard counts plus the most recent orders.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderSummary {
    pub total_orders: i64,
    /// Placed, packed or shipped.
    pub active_orders: i64,
    pub delivered_orders: i64,
    pub cancelled_orders: i64,
    pub recent_orders: Vec<Order>,
}

/// What happened to the money when an order was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    /// Cash on delivery, nothing was collected.
    NotApplicable,
    /// Prepaid but never captured; the payment was marked failed.
    NotRequired,
    Initiated,
    /// The gateway refund failed and must be retried by an admin.
    Pending,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelOrderResponse {
    pub order: Order,
    pub refund_status: RefundStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReturnRequest {
    pub reason: String,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReturnDecisionRequest {
    pub approved: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RefundResult {
    pub order: Order,
    pub payment: Option<Payment>,
    pub wallet_credit: Option<WalletTransaction>,
}
