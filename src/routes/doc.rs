use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        delivery::{AssignDeliveryRequest, DeliveryList, PartnerEarnings, UpdateDeliveryStatusRequest},
        orders::{
            CancelOrderResponse, OrderItemRequest, OrderList, OrderSummary, OrderWithItems,
            PlaceOrderRequest, RefundResult, RefundStatus, ReturnDecisionRequest, ReturnRequest,
            UpdateOrderStatusRequest,
        },
        payments::{
            CheckoutMode, ConfirmPaymentRequest, InitiatePaymentRequest, PaymentConfirmation,
            PaymentInitiation, WebhookAck,
        },
        settlement::{SellerDecisionRequest, SellerEarnings},
        users::BlockUserRequest,
        wallet::{WalletSummary, WithdrawRequest},
    },
    models::{
        Address, Commission, Coordinates, Delivery, DeliveryStatus, KycStatus, Order, OrderItem,
        OrderStatus, Payment, PaymentMethod, PaymentStatus, Payout, PayoutStatus, PayoutType,
        ReturnStatus, Seller, User, UserRole, WalletEntryKind, WalletTransaction,
    },
    response::{ApiResponse, Meta},
    routes::{admin, delivery, health, orders, params, payments, seller, wallet},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness,
        orders::list_orders,
        orders::order_summary,
        orders::place_order,
        orders::get_order,
        orders::cancel_order,
        orders::request_return,
        payments::initiate_payment,
        payments::confirm_payment,
        payments::webhook,
        seller::update_order_status,
        seller::seller_earnings,
        delivery::partner_deliveries,
        delivery::partner_earnings,
        delivery::update_delivery_status,
        delivery::confirm_return_pickup,
        wallet::get_wallet,
        wallet::withdraw,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::decide_return,
        admin::process_refund,
        admin::refund_payment,
        admin::calculate_commission,
        admin::assign_delivery,
        admin::decide_seller,
        admin::block_user,
        admin::create_seller_payout,
        admin::create_delivery_payout
    ),
    components(
        schemas(
            Address,
            Coordinates,
            Order,
            OrderItem,
            OrderStatus,
            ReturnStatus,
            PaymentMethod,
            Payment,
            PaymentStatus,
            Commission,
            Delivery,
            DeliveryStatus,
            Payout,
            PayoutType,
            PayoutStatus,
            Seller,
            KycStatus,
            User,
            UserRole,
            WalletTransaction,
            WalletEntryKind,
            OrderItemRequest,
            PlaceOrderRequest,
            OrderWithItems,
            OrderList,
            OrderSummary,
            CancelOrderResponse,
            RefundStatus,
            ReturnRequest,
            ReturnDecisionRequest,
            RefundResult,
            UpdateOrderStatusRequest,
            InitiatePaymentRequest,
            CheckoutMode,
            PaymentInitiation,
            ConfirmPaymentRequest,
            PaymentConfirmation,
            WebhookAck,
            AssignDeliveryRequest,
            UpdateDeliveryStatusRequest,
            DeliveryList,
            PartnerEarnings,
            SellerDecisionRequest,
            SellerEarnings,
            BlockUserRequest,
            WalletSummary,
            WithdrawRequest,
            health::HealthData,
            params::Pagination,
            params::SortOrder,
            Meta,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<Order>,
            ApiResponse<Payment>,
            ApiResponse<Payout>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Orders", description = "Buyer order lifecycle"),
        (name = "Payments", description = "Checkout, confirmation and gateway webhooks"),
        (name = "Seller", description = "Seller fulfilment and earnings"),
        (name = "Delivery", description = "Delivery partner endpoints"),
        (name = "Wallet", description = "Wallet balance and ledger"),
        (name = "Admin", description = "Returns, refunds, commissions, payouts, approvals and user blocking"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
