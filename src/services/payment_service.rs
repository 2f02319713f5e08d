use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    QueryFilter, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, LockType},
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    audit::{self, AuditEvent},
    dto::payments::{
        CheckoutMode, ConfirmPaymentRequest, PaymentConfirmation, PaymentInitiation, WebhookAck,
    },
    entity::{
        orders::{self, ActiveModel as OrderActive, Entity as Orders},
        payments::{self, ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments},
    },
    error::{AppError, AppResult},
    integrations::signature::{verify_checkout_signature, verify_webhook_signature},
    lifecycle::{self, Step},
    middleware::auth::{AuthUser, ensure_admin},
    models::{NotificationCategory, OrderStatus, Payment, PaymentMethod, PaymentStatus},
    response::{ApiResponse, Meta},
    services::{
        notification_service::{Notice, notify_user, order_status_notice},
        order_service::{invalidate_buyer_orders, lock_order},
    },
    state::AppState,
    templates,
};

pub const CAPTURED_EVENT: &str = "payment.captured";

async fn lock_payment_for_order<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<Option<payments::Model>> {
    Ok(Payments::find()
        .filter(PaymentCol::OrderId.eq(order_id))
        .lock(LockType::Update)
        .one(conn)
        .await?)
}

async fn lock_payment<C: ConnectionTrait>(conn: &C, payment_id: Uuid) -> AppResult<payments::Model> {
    Payments::find_by_id(payment_id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Payment"))
}

fn initiation(state: &AppState, payment: &payments::Model, mode: CheckoutMode) -> PaymentInitiation {
    PaymentInitiation {
        payment_id: payment.id,
        order_id: payment.order_id,
        mode,
        amount: payment.amount,
        currency: state.config.payment.currency.clone(),
        status: payment.status,
        external_order_ref: payment.external_order_ref.clone(),
        key_id: match mode {
            CheckoutMode::Gateway => state.config.payment.key_id.clone(),
            _ => None,
        },
    }
}

/// Creates or resumes the payment for a prepaid order.
///
/// The payment row is committed as `initiated` before the gateway is called,
/// and a persisted remote order reference is reused on retry.
pub async fn initiate_payment(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<PaymentInitiation>> {
    let txn = state.orm.begin().await?;

    let order = lock_order(&txn, order_id).await?;
    if order.buyer_id != user.user_id {
        return Err(AppError::PermissionDenied);
    }
    if order.payment_method != PaymentMethod::Prepaid {
        return Err(AppError::conflict("Order is not prepaid"));
    }
    if order.status == OrderStatus::Cancelled {
        return Err(AppError::conflict("Cancelled order cannot be paid"));
    }

    let payment = match lock_payment_for_order(&txn, order.id).await? {
        Some(existing) => existing,
        None => {
            PaymentActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                external_order_ref: Set(None),
                external_payment_ref: Set(None),
                external_refund_ref: Set(None),
                amount: Set(order.total_amount),
                status: Set(PaymentStatus::Initiated),
                created_at: NotSet,
                updated_at: NotSet,
            }
            .insert(&txn)
            .await?
        }
    };
    txn.commit().await?;

    match payment.status {
        PaymentStatus::Completed => {
            return Ok(ApiResponse::success(
                "Payment already completed",
                initiation(state, &payment, CheckoutMode::Completed),
                Some(Meta::empty()),
            ));
        }
        PaymentStatus::Initiated => {}
        other => return Err(AppError::conflict(format!("Payment is already {other}"))),
    }

    let Some(gateway) = state.gateway.clone() else {
        tracing::info!(payment_id = %payment.id, order_id = %order.id, "mock payment initiated");
        return Ok(ApiResponse::success(
            "Payment initiated",
            initiation(state, &payment, CheckoutMode::Mock),
            Some(Meta::empty()),
        ));
    };

    if payment.external_order_ref.is_some() {
        return Ok(ApiResponse::success(
            "Payment initiated",
            initiation(state, &payment, CheckoutMode::Gateway),
            Some(Meta::empty()),
        ));
    }

    let receipt = format!("order_{}_{}", order.id, Utc::now().timestamp());
    let remote_ref = gateway
        .create_remote_order(payment.amount, &state.config.payment.currency, &receipt)
        .await
        .inspect_err(|err| {
            tracing::warn!(error = %err, payment_id = %payment.id, "gateway order creation failed");
        })?;

    // Only the first writer records its reference; a concurrent initiator reuses it.
    Payments::update_many()
        .col_expr(PaymentCol::ExternalOrderRef, Expr::value(remote_ref))
        .col_expr(PaymentCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(PaymentCol::Id.eq(payment.id))
        .filter(PaymentCol::ExternalOrderRef.is_null())
        .exec(&state.orm)
        .await?;
    let payment = Payments::find_by_id(payment.id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Payment"))?;

    tracing::info!(
        payment_id = %payment.id,
        external_order_ref = ?payment.external_order_ref,
        "gateway payment initiated"
    );
    audit::record(
        state,
        AuditEvent::new(Some(user.user_id), "payment_initiated", "payments", payment.id)
            .details(json!({ "order_id": order.id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment initiated",
        initiation(state, &payment, CheckoutMode::Gateway),
        Some(Meta::empty()),
    ))
}

/// Marks `payment` completed and advances a placed order to packed.
async fn complete_payment<C: ConnectionTrait>(
    conn: &C,
    payment: payments::Model,
    order: orders::Model,
    external_payment_ref: Option<String>,
) -> AppResult<(payments::Model, orders::Model)> {
    let now = Utc::now();
    let mut active: PaymentActive = payment.into();
    active.status = Set(PaymentStatus::Completed);
    if let Some(reference) = external_payment_ref {
        active.external_payment_ref = Set(Some(reference));
    }
    active.updated_at = Set(now.into());
    let payment = active.update(conn).await?;

    let order = match lifecycle::status_after_payment(order.status) {
        Some(next) => {
            let mut active: OrderActive = order.into();
            active.status = Set(next);
            active.updated_at = Set(now.into());
            active.update(conn).await?
        }
        None => order,
    };
    Ok((payment, order))
}

async fn announce_payment(state: &AppState, order: &orders::Model) {
    invalidate_buyer_orders(state, order.buyer_id).await;
    notify_user(
        state,
        order.buyer_id,
        order_status_notice(
            state,
            order.id,
            format!("Payment successful for order #{}", order.id),
            "Your payment was successful and order is being packed.",
            NotificationCategory::Payment,
            order.status.to_string(),
        ),
    )
    .await;
}

pub async fn confirm_payment(
    state: &AppState,
    user: &AuthUser,
    payment_id: Uuid,
    payload: ConfirmPaymentRequest,
) -> AppResult<ApiResponse<PaymentConfirmation>> {
    let order_id = Payments::find_by_id(payment_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Payment"))?
        .order_id;

    // Order before payment, matching cancellation's lock order.
    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, order_id).await?;
    let payment = lock_payment(&txn, payment_id).await?;
    if order.buyer_id != user.user_id {
        return Err(AppError::PermissionDenied);
    }

    if lifecycle::payment_completion(payment.status)? == Step::AlreadyDone {
        return Ok(ApiResponse::success(
            "Payment already completed",
            PaymentConfirmation {
                payment_id: payment.id,
                status: payment.status,
                order_status: order.status,
            },
            Some(Meta::empty()),
        ));
    }

    let expected_order_ref = match payment.external_order_ref.as_deref() {
        Some(reference) => Some(reference),
        None if state.gateway.is_some() => {
            return Err(AppError::conflict("Gateway order has not been created yet"));
        }
        None => None,
    };

    let mut external_payment_ref = None;
    if let Some(expected_order_ref) = expected_order_ref {
        let (Some(order_ref), Some(payment_ref), Some(signature)) = (
            payload.external_order_ref.as_deref(),
            payload.external_payment_ref.as_deref(),
            payload.signature.as_deref(),
        ) else {
            return Err(AppError::Validation(
                "Gateway order ref, payment ref and signature are required".into(),
            ));
        };
        if order_ref != expected_order_ref {
            return Err(AppError::conflict("Gateway order mismatch"));
        }
        let secret = state
            .config
            .payment
            .key_secret
            .as_deref()
            .ok_or_else(|| AppError::Gateway("Gateway secret is not configured".into()))?;
        if !verify_checkout_signature(order_ref, payment_ref, signature, secret) {
            tracing::warn!(payment_id = %payment.id, "checkout signature mismatch");
            return Err(AppError::conflict("Invalid payment signature"));
        }
        external_payment_ref = Some(payment_ref.to_string());
    }

    let (payment, order) = complete_payment(&txn, payment, order, external_payment_ref).await?;
    txn.commit().await?;

    tracing::info!(payment_id = %payment.id, order_id = %order.id, "payment confirmed");
    announce_payment(state, &order).await;
    audit::record(
        state,
        AuditEvent::new(Some(user.user_id), "payment_confirmed", "payments", payment.id),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment confirmed",
        PaymentConfirmation {
            payment_id: payment.id,
            status: payment.status,
            order_status: order.status,
        },
        Some(Meta::empty()),
    ))
}

fn entity_ref<'a>(payload: &'a Value, field: &str) -> Option<&'a str> {
    payload
        .pointer(&format!("/payload/payment/entity/{field}"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Gateway webhook. Only captured-payment events change state.
pub async fn handle_webhook(
    state: &AppState,
    body: &[u8],
    signature: Option<&str>,
) -> AppResult<ApiResponse<WebhookAck>> {
    let payload: Value = serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid webhook body: {e}")))?;

    if let Some(secret) = state.config.payment.webhook_secret.as_deref() {
        let valid = signature.is_some_and(|sig| verify_webhook_signature(&payload, sig, secret));
        if !valid {
            tracing::warn!("webhook signature mismatch");
            return Err(AppError::conflict("Invalid webhook signature"));
        }
    }

    let event = payload.get("event").and_then(Value::as_str).map(str::to_string);
    let ack = |handled| WebhookAck {
        event: event.clone(),
        handled,
    };
    if event.as_deref() != Some(CAPTURED_EVENT) {
        tracing::debug!(event = ?event, "ignoring webhook event");
        return Ok(ApiResponse::success("Ignored", ack(false), Some(Meta::empty())));
    }

    let payment_ref = entity_ref(&payload, "id");
    let order_ref = entity_ref(&payload, "order_id");
    if payment_ref.is_none() && order_ref.is_none() {
        return Ok(ApiResponse::success("Ignored", ack(false), Some(Meta::empty())));
    }

    let mut matcher = Condition::any();
    if let Some(reference) = payment_ref {
        matcher = matcher.add(PaymentCol::ExternalPaymentRef.eq(reference));
    }
    if let Some(reference) = order_ref {
        matcher = matcher.add(PaymentCol::ExternalOrderRef.eq(reference));
    }

    let found = Payments::find()
        .filter(matcher)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Payment"))?;

    let txn = state.orm.begin().await?;
    let order = lock_order(&txn, found.order_id).await?;
    let payment = lock_payment(&txn, found.id).await?;
    if lifecycle::payment_completion(payment.status)? == Step::AlreadyDone {
        return Ok(ApiResponse::success("Already processed", ack(true), Some(Meta::empty())));
    }

    let (payment, order) =
        complete_payment(&txn, payment, order, payment_ref.map(str::to_string)).await?;
    txn.commit().await?;

    tracing::info!(payment_id = %payment.id, order_id = %order.id, "payment captured via webhook");
    announce_payment(state, &order).await;
    audit::record(state, AuditEvent::new(None, "payment_captured", "payments", payment.id)).await;

    Ok(ApiResponse::success("Processed", ack(true), Some(Meta::empty())))
}

/// Issues the gateway refund for a captured payment, if it went through the gateway.
pub(crate) async fn gateway_refund(state: &AppState, payment: &payments::Model) -> AppResult<Option<String>> {
    match (&state.gateway, payment.external_payment_ref.as_deref()) {
        (Some(gateway), Some(payment_ref)) => {
            let refund_ref = gateway.refund(payment_ref, payment.amount).await?;
            tracing::info!(payment_id = %payment.id, %refund_ref, "gateway refund issued");
            Ok(Some(refund_ref))
        }
        _ => Ok(None),
    }
}

pub(crate) async fn mark_refunded<C: ConnectionTrait>(
    conn: &C,
    payment_id: Uuid,
    refund_ref: Option<String>,
) -> AppResult<payments::Model> {
    let payment = lock_payment(conn, payment_id).await?;
    lifecycle::ensure_refundable_payment(payment.status)?;

    let mut active: PaymentActive = payment.into();
    active.status = Set(PaymentStatus::Refunded);
    active.external_refund_ref = Set(refund_ref);
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(conn).await?)
}

/// A completed payment for `order_id`, ready to be refunded.
pub(crate) async fn refundable_payment(
    state: &AppState,
    order_id: Uuid,
) -> AppResult<payments::Model> {
    let payment = Payments::find()
        .filter(PaymentCol::OrderId.eq(order_id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::conflict("No payment to refund"))?;
    lifecycle::ensure_refundable_payment(payment.status)?;
    Ok(payment)
}

/// Refunds the captured payment of `order_id` in full.
///
/// The gateway is called before any transaction opens; the payment row is then
/// re-checked under lock and marked refunded.
pub async fn initiate_refund(state: &AppState, order_id: Uuid) -> AppResult<payments::Model> {
    let payment = refundable_payment(state, order_id).await?;
    let refund_ref = gateway_refund(state, &payment).await?;

    let txn = state.orm.begin().await?;
    let payment = mark_refunded(&txn, payment.id, refund_ref).await?;
    txn.commit().await?;
    Ok(payment)
}

/// Admin retry for refunds left pending by a cancellation.
pub async fn refund_payment(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<Payment>> {
    ensure_admin(user)?;
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;
    if order.status != OrderStatus::Cancelled {
        return Err(AppError::conflict("Only cancelled orders can be refunded here"));
    }
    let payment = initiate_refund(state, order_id).await?;

    invalidate_buyer_orders(state, order.buyer_id).await;
    let frontend = state.config.frontend_url.clone();
    notify_user(
        state,
        order.buyer_id,
        Notice::new(
            format!("Refund initiated for order #{}", order.id),
            "Your refund is being processed.",
            NotificationCategory::Payment,
            "/buyer/orders",
        )
        .with_email(move |buyer| templates::refund_processed(&frontend, &buyer.name, order_id)),
    )
    .await;
    audit::record(
        state,
        AuditEvent::new(Some(user.user_id), "payment_refunded", "payments", payment.id)
            .details(json!({ "order_id": order_id })),
    )
    .await;

    Ok(ApiResponse::success("Refund initiated", Payment::from(payment), Some(Meta::empty())))
}
