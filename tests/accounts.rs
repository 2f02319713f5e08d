mod common;

use axum::{
    extract::FromRequestParts,
    http::{Request, header},
};
use common::{address, create_product, create_seller, create_user, database_url, setup_state};
use marketplace_api::{
    dto::{
        orders::{OrderItemRequest, PlaceOrderRequest},
        users::BlockUserRequest,
    },
    error::AppError,
    middleware::auth::{AuthUser, ensure_active, issue_token},
    models::{OrderStatus, PaymentMethod, UserRole},
    services::{admin_service, order_service},
    state::AppState,
};
use uuid::Uuid;

async fn authenticate(state: &AppState, user: &AuthUser) -> Result<AuthUser, AppError> {
    let token = issue_token(
        &state.config.jwt_secret,
        user.user_id,
        user.role,
        chrono::Duration::hours(1),
    )?;
    let (mut parts, _) = Request::builder()
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(())
        .expect("request")
        .into_parts();
    AuthUser::from_request_parts(&mut parts, state).await
}

#[tokio::test]
async fn blocked_users_are_refused_until_unblocked() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url).await?;
    let admin = create_user(&state, UserRole::Admin).await?;
    let buyer = create_user(&state, UserRole::Buyer).await?;

    let authed = authenticate(&state, &buyer).await?;
    assert_eq!(authed.user_id, buyer.user_id);

    let err = admin_service::block_user(
        &state,
        &buyer,
        admin.user_id,
        BlockUserRequest { blocked: true },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied));

    let blocked = admin_service::block_user(
        &state,
        &admin,
        buyer.user_id,
        BlockUserRequest { blocked: true },
    )
    .await?
    .data
    .expect("user");
    assert!(blocked.is_blocked);
    assert_eq!(blocked.role, UserRole::Buyer);

    let err = authenticate(&state, &buyer).await.unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied));
    assert!(matches!(
        ensure_active(&state.orm, &buyer).await,
        Err(AppError::PermissionDenied)
    ));

    let unblocked = admin_service::block_user(
        &state,
        &admin,
        buyer.user_id,
        BlockUserRequest { blocked: false },
    )
    .await?
    .data
    .expect("user");
    assert!(!unblocked.is_blocked);
    assert!(authenticate(&state, &buyer).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn blocking_checks_target_and_self() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url).await?;
    let admin = create_user(&state, UserRole::Admin).await?;

    let err = admin_service::block_user(
        &state,
        &admin,
        Uuid::new_v4(),
        BlockUserRequest { blocked: true },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = admin_service::block_user(
        &state,
        &admin,
        admin.user_id,
        BlockUserRequest { blocked: true },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let stranger = AuthUser::new(Uuid::new_v4(), UserRole::Buyer);
    let err = authenticate(&state, &stranger).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
    Ok(())
}

#[tokio::test]
async fn order_summary_counts_by_status() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url).await?;

    let seller = create_seller(&state, true, 10).await?;
    let product = create_product(&state, seller.seller_id, 100, 10).await?;
    let buyer = create_user(&state, UserRole::Buyer).await?;

    let empty = order_service::order_summary(&state, &buyer)
        .await?
        .data
        .expect("summary");
    assert_eq!(empty.total_orders, 0);
    assert!(empty.recent_orders.is_empty());

    let mut placed = Vec::new();
    for _ in 0..4 {
        let order = order_service::place_order(
            &state,
            &buyer,
            PlaceOrderRequest {
                seller_id: seller.seller_id,
                items: vec![OrderItemRequest {
                    product_id: product,
                    quantity: 1,
                }],
                address: address(),
                payment_method: PaymentMethod::Cod,
            },
        )
        .await?
        .data
        .expect("order");
        placed.push(order.order.id);
    }
    order_service::cancel_order(&state, &buyer, placed[0]).await?;

    let summary = order_service::order_summary(&state, &buyer)
        .await?
        .data
        .expect("summary");
    assert_eq!(summary.total_orders, 4);
    assert_eq!(summary.active_orders, 3);
    assert_eq!(summary.cancelled_orders, 1);
    assert_eq!(summary.delivered_orders, 0);
    assert_eq!(summary.recent_orders.len(), 3);
    assert!(
        summary
            .recent_orders
            .iter()
            .all(|order| order.buyer_id == buyer.user_id)
    );
    assert!(
        summary
            .recent_orders
            .iter()
            .all(|order| order.status == OrderStatus::Placed || order.id == placed[0])
    );

    let err = order_service::order_summary(&state, &seller.user)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied));
    Ok(())
}
