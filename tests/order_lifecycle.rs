mod common;

use common::{
    RecordingMailer, address, create_product, create_seller, create_user, database_url,
    product_stock, setup_state, wallet_balance,
};
use marketplace_api::{
    dto::{
        delivery::{AssignDeliveryRequest, UpdateDeliveryStatusRequest},
        orders::{OrderItemRequest, PlaceOrderRequest, RefundStatus, ReturnRequest, UpdateOrderStatusRequest},
        payments::ConfirmPaymentRequest,
    },
    entity::{
        payments::{Column as PaymentCol, Entity as Payments},
        products::{ActiveModel as ProductActive, Entity as Products},
    },
    error::AppError,
    middleware::auth::AuthUser,
    models::{DeliveryStatus, OrderStatus, PaymentMethod, ReturnStatus, UserRole},
    services::{
        admin_service, delivery_service, order_service, payment_service, refund_service,
        seller_service,
    },
    state::AppState,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;

fn order_request(
    seller_id: Uuid,
    items: &[(Uuid, i32)],
    payment_method: PaymentMethod,
) -> PlaceOrderRequest {
    PlaceOrderRequest {
        seller_id,
        items: items
            .iter()
            .map(|&(product_id, quantity)| OrderItemRequest {
                product_id,
                quantity,
            })
            .collect(),
        address: address(),
        payment_method,
    }
}

struct Delivered {
    order_id: Uuid,
    buyer: AuthUser,
    partner: AuthUser,
    total: i64,
}

/// Places an order and drives it through payment and delivery.
async fn delivered_order(state: &AppState, method: PaymentMethod) -> anyhow::Result<Delivered> {
    let seller = create_seller(state, true, 10).await?;
    let product = create_product(state, seller.seller_id, 100, 5).await?;
    let buyer = create_user(state, UserRole::Buyer).await?;
    let admin = create_user(state, UserRole::Admin).await?;
    let partner = create_user(state, UserRole::Delivery).await?;

    let placed = order_service::place_order(
        state,
        &buyer,
        order_request(seller.seller_id, &[(product, 2)], method),
    )
    .await?
    .data
    .expect("order");
    let order_id = placed.order.id;

    match method {
        PaymentMethod::Prepaid => {
            let init = payment_service::initiate_payment(state, &buyer, order_id)
                .await?
                .data
                .expect("initiation");
            payment_service::confirm_payment(
                state,
                &buyer,
                init.payment_id,
                ConfirmPaymentRequest::default(),
            )
            .await?;
        }
        PaymentMethod::Cod => {
            seller_service::update_order_status(
                state,
                &seller.user,
                order_id,
                UpdateOrderStatusRequest {
                    status: OrderStatus::Packed,
                },
            )
            .await?;
        }
    }

    let delivery = delivery_service::assign_delivery(
        state,
        &admin,
        AssignDeliveryRequest {
            order_id,
            partner_id: partner.user_id,
            distance_km: 5,
        },
    )
    .await?
    .data
    .expect("delivery");
    delivery_service::update_delivery_status(
        state,
        &partner,
        delivery.id,
        UpdateDeliveryStatusRequest {
            status: DeliveryStatus::Delivered,
        },
    )
    .await?;

    Ok(Delivered {
        order_id,
        buyer,
        partner,
        total: placed.order.total_amount,
    })
}

#[tokio::test]
async fn placing_an_order_reserves_stock_and_prices_lines() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url).await?;

    let seller = create_seller(&state, true, 10).await?;
    let widget = create_product(&state, seller.seller_id, 100, 5).await?;
    let gadget = create_product(&state, seller.seller_id, 250, 3).await?;
    let buyer = create_user(&state, UserRole::Buyer).await?;

    let placed = order_service::place_order(
        &state,
        &buyer,
        order_request(
            seller.seller_id,
            &[(widget, 2), (gadget, 1)],
            PaymentMethod::Prepaid,
        ),
    )
    .await?
    .data
    .expect("order");

    assert_eq!(placed.order.status, OrderStatus::Placed);
    assert_eq!(placed.order.total_amount, 450);
    let line_sum: i64 = placed
        .items
        .iter()
        .map(|item| item.price * i64::from(item.quantity))
        .sum();
    assert_eq!(line_sum, placed.order.total_amount);
    assert_eq!(product_stock(&state, widget).await?, 3);
    assert_eq!(product_stock(&state, gadget).await?, 2);

    let fetched = order_service::get_order(&state, &buyer, placed.order.id)
        .await?
        .data
        .expect("order");
    assert_eq!(fetched.items.len(), 2);

    let stranger = create_user(&state, UserRole::Buyer).await?;
    let err = order_service::get_order(&state, &stranger, placed.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn later_price_changes_leave_orders_untouched() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url).await?;

    let seller = create_seller(&state, true, 10).await?;
    let product = create_product(&state, seller.seller_id, 100, 5).await?;
    let buyer = create_user(&state, UserRole::Buyer).await?;

    let placed = order_service::place_order(
        &state,
        &buyer,
        order_request(seller.seller_id, &[(product, 2)], PaymentMethod::Cod),
    )
    .await?
    .data
    .expect("order");
    assert_eq!(placed.order.total_amount, 200);

    let mut repriced: ProductActive = Products::find_by_id(product)
        .one(&state.orm)
        .await?
        .expect("product")
        .into();
    repriced.price = Set(175);
    repriced.update(&state.orm).await?;

    let fetched = order_service::get_order(&state, &buyer, placed.order.id)
        .await?
        .data
        .expect("order");
    assert_eq!(fetched.order.total_amount, 200);
    assert_eq!(fetched.items.len(), 1);
    assert_eq!(fetched.items[0].price, 100);

    let next = order_service::place_order(
        &state,
        &buyer,
        order_request(seller.seller_id, &[(product, 1)], PaymentMethod::Cod),
    )
    .await?
    .data
    .expect("order");
    assert_eq!(next.order.total_amount, 175);
    Ok(())
}

#[tokio::test]
async fn oversized_order_is_rejected_before_reserving() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url).await?;

    let seller = create_seller(&state, true, 10).await?;
    let cheap = create_product(&state, seller.seller_id, 100, 10).await?;
    let pricey = create_product(&state, seller.seller_id, i64::MAX / 2, 10).await?;
    let buyer = create_user(&state, UserRole::Buyer).await?;

    let err = order_service::place_order(
        &state,
        &buyer,
        order_request(seller.seller_id, &[(cheap, 1), (pricey, 3)], PaymentMethod::Cod),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(product_stock(&state, cheap).await?, 10);
    assert_eq!(product_stock(&state, pricey).await?, 10);
    Ok(())
}

#[tokio::test]
async fn failed_placement_leaves_stock_untouched() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url).await?;

    let seller = create_seller(&state, true, 10).await?;
    let plenty = create_product(&state, seller.seller_id, 100, 10).await?;
    let scarce = create_product(&state, seller.seller_id, 100, 1).await?;
    let buyer = create_user(&state, UserRole::Buyer).await?;

    let err = order_service::place_order(
        &state,
        &buyer,
        order_request(
            seller.seller_id,
            &[(plenty, 3), (scarce, 2)],
            PaymentMethod::Cod,
        ),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::InsufficientStock {
            requested: 2,
            available: 1,
            ..
        }
    ));
    assert_eq!(product_stock(&state, plenty).await?, 10);
    assert_eq!(product_stock(&state, scarce).await?, 1);

    let other = create_seller(&state, true, 10).await?;
    let foreign = create_product(&state, other.seller_id, 100, 10).await?;
    let err = order_service::place_order(
        &state,
        &buyer,
        order_request(seller.seller_id, &[(plenty, 1), (foreign, 1)], PaymentMethod::Cod),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidProduct(id) if id == foreign));
    assert_eq!(product_stock(&state, plenty).await?, 10);

    let pending = create_seller(&state, false, 10).await?;
    let unlisted = create_product(&state, pending.seller_id, 100, 10).await?;
    let err = order_service::place_order(
        &state,
        &buyer,
        order_request(pending.seller_id, &[(unlisted, 1)], PaymentMethod::Cod),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::SellerNotEligible));
    assert_eq!(product_stock(&state, unlisted).await?, 10);
    Ok(())
}

#[tokio::test]
async fn concurrent_orders_never_oversell() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url).await?;

    let seller = create_seller(&state, true, 10).await?;
    let product = create_product(&state, seller.seller_id, 100, 5).await?;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let buyer = create_user(&state, UserRole::Buyer).await?;
        let state = state.clone();
        let seller_id = seller.seller_id;
        handles.push(tokio::spawn(async move {
            order_service::place_order(
                &state,
                &buyer,
                order_request(seller_id, &[(product, 1)], PaymentMethod::Cod),
            )
            .await
        }));
    }

    let mut placed = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => placed += 1,
            Err(err) => assert!(matches!(err, AppError::InsufficientStock { .. })),
        }
    }
    assert_eq!(placed, 5);
    assert_eq!(product_stock(&state, product).await?, 0);
    Ok(())
}

#[tokio::test]
async fn cancelling_cod_order_restores_stock() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url).await?;

    let seller = create_seller(&state, true, 10).await?;
    let product = create_product(&state, seller.seller_id, 100, 5).await?;
    let buyer = create_user(&state, UserRole::Buyer).await?;

    let placed = order_service::place_order(
        &state,
        &buyer,
        order_request(seller.seller_id, &[(product, 2)], PaymentMethod::Cod),
    )
    .await?
    .data
    .expect("order");
    assert_eq!(product_stock(&state, product).await?, 3);

    let stranger = create_user(&state, UserRole::Buyer).await?;
    let err = order_service::cancel_order(&state, &stranger, placed.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied));

    let cancelled = order_service::cancel_order(&state, &buyer, placed.order.id)
        .await?
        .data
        .expect("cancellation");
    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.refund_status, RefundStatus::NotApplicable);
    assert_eq!(product_stock(&state, product).await?, 5);

    let payments = Payments::find()
        .filter(PaymentCol::OrderId.eq(placed.order.id))
        .count(&state.orm)
        .await?;
    assert_eq!(payments, 0);

    let err = order_service::cancel_order(&state, &buyer, placed.order.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(product_stock(&state, product).await?, 5);
    Ok(())
}

#[tokio::test]
async fn cancelling_unpaid_prepaid_order_fails_the_payment() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url).await?;

    let seller = create_seller(&state, true, 10).await?;
    let product = create_product(&state, seller.seller_id, 100, 5).await?;
    let buyer = create_user(&state, UserRole::Buyer).await?;

    let placed = order_service::place_order(
        &state,
        &buyer,
        order_request(seller.seller_id, &[(product, 1)], PaymentMethod::Prepaid),
    )
    .await?
    .data
    .expect("order");
    payment_service::initiate_payment(&state, &buyer, placed.order.id).await?;

    let cancelled = order_service::cancel_order(&state, &buyer, placed.order.id)
        .await?
        .data
        .expect("cancellation");
    assert_eq!(cancelled.refund_status, RefundStatus::NotRequired);

    let payment = Payments::find()
        .filter(PaymentCol::OrderId.eq(placed.order.id))
        .one(&state.orm)
        .await?
        .expect("payment");
    assert_eq!(payment.status, marketplace_api::models::PaymentStatus::Failed);
    Ok(())
}

#[tokio::test]
async fn mock_prepaid_order_runs_through_delivery_and_commission() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url).await?;

    let seller = create_seller(&state, true, 10).await?;
    let product = create_product(&state, seller.seller_id, 100, 5).await?;
    let buyer = create_user(&state, UserRole::Buyer).await?;
    let admin = create_user(&state, UserRole::Admin).await?;
    let partner = create_user(&state, UserRole::Delivery).await?;

    let placed = order_service::place_order(
        &state,
        &buyer,
        order_request(seller.seller_id, &[(product, 2)], PaymentMethod::Prepaid),
    )
    .await?
    .data
    .expect("order");
    assert_eq!(placed.order.total_amount, 200);
    assert_eq!(product_stock(&state, product).await?, 3);

    // Unpaid prepaid orders cannot be packed by the seller.
    let err = seller_service::update_order_status(
        &state,
        &seller.user,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Packed,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let init = payment_service::initiate_payment(&state, &buyer, placed.order.id)
        .await?
        .data
        .expect("initiation");
    assert_eq!(init.amount, 200);
    assert!(init.external_order_ref.is_none());

    let confirmed = payment_service::confirm_payment(
        &state,
        &buyer,
        init.payment_id,
        ConfirmPaymentRequest::default(),
    )
    .await?
    .data
    .expect("confirmation");
    assert_eq!(confirmed.order_status, OrderStatus::Packed);

    let delivery = delivery_service::assign_delivery(
        &state,
        &admin,
        AssignDeliveryRequest {
            order_id: placed.order.id,
            partner_id: partner.user_id,
            distance_km: 5,
        },
    )
    .await?
    .data
    .expect("delivery");
    assert_eq!(delivery.delivery_fee, 50);
    assert_eq!(delivery.partner_earning, 40);

    let err = delivery_service::assign_delivery(
        &state,
        &admin,
        AssignDeliveryRequest {
            order_id: placed.order.id,
            partner_id: partner.user_id,
            distance_km: 5,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let intruder = create_user(&state, UserRole::Delivery).await?;
    let err = delivery_service::update_delivery_status(
        &state,
        &intruder,
        delivery.id,
        UpdateDeliveryStatusRequest {
            status: DeliveryStatus::Delivered,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied));

    delivery_service::update_delivery_status(
        &state,
        &partner,
        delivery.id,
        UpdateDeliveryStatusRequest {
            status: DeliveryStatus::Picked,
        },
    )
    .await?;
    delivery_service::update_delivery_status(
        &state,
        &partner,
        delivery.id,
        UpdateDeliveryStatusRequest {
            status: DeliveryStatus::Delivered,
        },
    )
    .await?;

    let order = order_service::get_order(&state, &buyer, placed.order.id)
        .await?
        .data
        .expect("order");
    assert_eq!(order.order.status, OrderStatus::Delivered);

    let commission = marketplace_api::services::commission_service::calculate_commission(
        &state,
        &admin,
        placed.order.id,
    )
    .await?
    .data
    .expect("commission");
    assert_eq!(commission.commission_amount, 20);
    assert_eq!(commission.seller_earning, 180);
    assert_eq!(commission.platform_earning, 20);
    Ok(())
}

#[tokio::test]
async fn seller_cannot_skip_rules() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url).await?;

    let seller = create_seller(&state, true, 10).await?;
    let other = create_seller(&state, true, 10).await?;
    let product = create_product(&state, seller.seller_id, 100, 5).await?;
    let buyer = create_user(&state, UserRole::Buyer).await?;

    let placed = order_service::place_order(
        &state,
        &buyer,
        order_request(seller.seller_id, &[(product, 1)], PaymentMethod::Cod),
    )
    .await?
    .data
    .expect("order");
    let order_id = placed.order.id;

    let err = seller_service::update_order_status(
        &state,
        &other.user,
        order_id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Packed,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied));

    let err = seller_service::update_order_status(
        &state,
        &seller.user,
        order_id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Delivered,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let packed = seller_service::update_order_status(
        &state,
        &seller.user,
        order_id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Packed,
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(packed.status, OrderStatus::Packed);

    let err = seller_service::update_order_status(
        &state,
        &seller.user,
        order_id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Packed,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    Ok(())
}

#[tokio::test]
async fn orders_ship_only_through_delivery_assignment() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url).await?;

    let seller = create_seller(&state, true, 10).await?;
    let product = create_product(&state, seller.seller_id, 100, 5).await?;
    let buyer = create_user(&state, UserRole::Buyer).await?;
    let admin = create_user(&state, UserRole::Admin).await?;
    let partner = create_user(&state, UserRole::Delivery).await?;

    let placed = order_service::place_order(
        &state,
        &buyer,
        order_request(seller.seller_id, &[(product, 1)], PaymentMethod::Cod),
    )
    .await?
    .data
    .expect("order");
    let order_id = placed.order.id;
    let ship = || UpdateOrderStatusRequest {
        status: OrderStatus::Shipped,
    };

    let err = seller_service::update_order_status(&state, &seller.user, order_id, ship())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    seller_service::update_order_status(
        &state,
        &seller.user,
        order_id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Packed,
        },
    )
    .await?;
    let err = seller_service::update_order_status(&state, &seller.user, order_id, ship())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let delivery = delivery_service::assign_delivery(
        &state,
        &admin,
        AssignDeliveryRequest {
            order_id,
            partner_id: partner.user_id,
            distance_km: 3,
        },
    )
    .await?
    .data
    .expect("delivery");
    let shipped = order_service::get_order(&state, &buyer, order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(shipped.order.status, OrderStatus::Shipped);

    delivery_service::update_delivery_status(
        &state,
        &partner,
        delivery.id,
        UpdateDeliveryStatusRequest {
            status: DeliveryStatus::Delivered,
        },
    )
    .await?;
    let delivered = order_service::get_order(&state, &buyer, order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(delivered.order.status, OrderStatus::Delivered);
    Ok(())
}

#[tokio::test]
async fn rejected_return_keeps_order_delivered() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let mailer = RecordingMailer::new();
    let state = setup_state(&url).await?.with_mailer(mailer.clone());
    let admin = create_user(&state, UserRole::Admin).await?;

    let delivered = delivered_order(&state, PaymentMethod::Cod).await?;

    let returned = order_service::request_return(
        &state,
        &delivered.buyer,
        delivered.order_id,
        ReturnRequest {
            reason: "Damaged box".into(),
            image: None,
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(returned.return_status, ReturnStatus::Requested);
    let buyer_address = delivered.buyer.user_id.simple().to_string();
    assert!(
        mailer
            .wait_for(|email| {
                email.to.contains(&buyer_address) && email.body.contains("'return_requested'")
            })
            .await
    );

    let err = order_service::request_return(
        &state,
        &delivered.buyer,
        delivered.order_id,
        ReturnRequest {
            reason: "Again".into(),
            image: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let decided = admin_service::decide_return(&state, &admin, delivered.order_id, false)
        .await?
        .data
        .expect("order");
    assert_eq!(decided.return_status, ReturnStatus::Rejected);
    assert_eq!(decided.status, OrderStatus::Delivered);

    let err = refund_service::process_refund(&state, &admin, delivered.order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(wallet_balance(&state, delivered.buyer.user_id).await?, 0);
    Ok(())
}

#[tokio::test]
async fn approved_cod_return_credits_wallet_once() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url).await?;
    let admin = create_user(&state, UserRole::Admin).await?;

    let delivered = delivered_order(&state, PaymentMethod::Cod).await?;
    order_service::request_return(
        &state,
        &delivered.buyer,
        delivered.order_id,
        ReturnRequest {
            reason: "Wrong size".into(),
            image: Some("https://img.example/return.jpg".into()),
        },
    )
    .await?;
    admin_service::decide_return(&state, &admin, delivered.order_id, true).await?;

    // Refund waits for pickup.
    let err = refund_service::process_refund(&state, &admin, delivered.order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let picked = delivery_service::confirm_return_pickup(&state, &delivered.partner, delivered.order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(picked.return_status, ReturnStatus::Picked);

    let refunded = refund_service::process_refund(&state, &admin, delivered.order_id)
        .await?
        .data
        .expect("refund");
    assert_eq!(refunded.order.status, OrderStatus::Cancelled);
    assert!(refunded.payment.is_none());
    let credit = refunded.wallet_credit.expect("wallet credit");
    assert_eq!(credit.amount, delivered.total);
    assert_eq!(credit.txn_type, refund_service::COD_REFUND_TXN);
    assert_eq!(wallet_balance(&state, delivered.buyer.user_id).await?, delivered.total);

    let err = refund_service::process_refund(&state, &admin, delivered.order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(wallet_balance(&state, delivered.buyer.user_id).await?, delivered.total);
    Ok(())
}

#[tokio::test]
async fn buyer_order_list_reflects_mutations() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url).await?;

    let seller = create_seller(&state, true, 10).await?;
    let product = create_product(&state, seller.seller_id, 100, 5).await?;
    let buyer = create_user(&state, UserRole::Buyer).await?;

    let empty = order_service::list_orders(&state, &buyer, Default::default())
        .await?
        .data
        .expect("list");
    assert!(empty.items.is_empty());

    let placed = order_service::place_order(
        &state,
        &buyer,
        order_request(seller.seller_id, &[(product, 1)], PaymentMethod::Cod),
    )
    .await?
    .data
    .expect("order");

    let listed = order_service::list_orders(&state, &buyer, Default::default())
        .await?
        .data
        .expect("list");
    assert_eq!(listed.items.len(), 1);
    assert_eq!(listed.items[0].id, placed.order.id);

    order_service::cancel_order(&state, &buyer, placed.order.id).await?;
    let listed = order_service::list_orders(&state, &buyer, Default::default())
        .await?
        .data
        .expect("list");
    assert_eq!(listed.items[0].status, OrderStatus::Cancelled);
    Ok(())
}
