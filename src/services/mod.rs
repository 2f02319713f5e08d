pub mod admin_service;
pub mod commission_service;
pub mod delivery_service;
pub mod notification_service;
pub mod order_service;
pub mod payment_service;
pub mod payout_service;
pub mod refund_service;
pub mod seller_service;
pub mod wallet_service;
