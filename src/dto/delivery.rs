use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Delivery, DeliveryStatus};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignDeliveryRequest {
    pub order_id: Uuid,
    pub partner_id: Uuid,
    pub distance_km: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDeliveryStatusRequest {
    pub status: DeliveryStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryList {
    pub items: Vec<Delivery>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PartnerEarnings {
    pub completed_deliveries: i64,
    pub total_earning: i64,
    pub unsettled_earning: i64,
}
