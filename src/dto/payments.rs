use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{OrderStatus, PaymentStatus};

#[derive(Debug, Deserialize, ToSchema)]
pub struct InitiatePaymentRequest {
    pub order_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMode {
    Gateway,
    Mock,
    /// Payment was already captured; nothing left to do.
    Completed,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentInitiation {
    pub payment_id: Uuid,
    pub order_id: Uuid,
    pub mode: CheckoutMode,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub external_order_ref: Option<String>,
    /// Public key the checkout widget needs; only set in gateway mode.
    pub key_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ConfirmPaymentRequest {
    pub external_order_ref: Option<String>,
    pub external_payment_ref: Option<String>,
    pub signature: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentConfirmation {
    pub payment_id: Uuid,
    pub status: PaymentStatus,
    pub order_status: OrderStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub event: Option<String>,
    pub handled: bool,
}
