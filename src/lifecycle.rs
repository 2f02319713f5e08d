//! Order, return, payment and delivery state machines.
//!
//! Pure functions only: services load rows under lock, ask these rules whether
//! a transition is legal and then persist the result.

use crate::{
    error::{AppError, AppResult},
    models::{DeliveryStatus, OrderStatus, PaymentStatus, ReturnStatus},
};

/// Outcome of a transition that is allowed to be repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Advance,
    AlreadyDone,
}

fn order_rank(status: OrderStatus) -> u8 {
    match status {
        OrderStatus::Placed => 0,
        OrderStatus::Packed => 1,
        OrderStatus::Shipped => 2,
        OrderStatus::Delivered => 3,
        OrderStatus::Cancelled => 4,
    }
}

pub fn is_terminal(status: OrderStatus) -> bool {
    matches!(status, OrderStatus::Cancelled | OrderStatus::Delivered)
}

/// Buyers may cancel only before the parcel leaves the seller.
pub fn ensure_cancellable(status: OrderStatus) -> AppResult<()> {
    match status {
        OrderStatus::Placed | OrderStatus::Packed => Ok(()),
        other => Err(AppError::conflict(format!(
            "Order cannot be cancelled while {other}"
        ))),
    }
}

/// Seller authority: a live order moves forward into packed.
///
/// Shipped is reached only through delivery assignment, which also creates the
/// delivery row that later drives the order to delivered.
pub fn seller_transition(current: OrderStatus, target: OrderStatus) -> AppResult<()> {
    match target {
        OrderStatus::Packed => {}
        OrderStatus::Shipped => {
            return Err(AppError::Validation(
                "Orders are shipped by assigning a delivery partner".into(),
            ));
        }
        other => {
            return Err(AppError::Validation(format!(
                "Sellers may only set status to packed, not {other}"
            )));
        }
    }
    if is_terminal(current) {
        return Err(AppError::conflict(format!("Order is already {current}")));
    }
    if order_rank(target) <= order_rank(current) {
        return Err(AppError::conflict(format!(
            "Cannot move order from {current} to {target}"
        )));
    }
    Ok(())
}

/// Order status to apply once payment completes, if any.
pub fn status_after_payment(current: OrderStatus) -> Option<OrderStatus> {
    (current == OrderStatus::Placed).then_some(OrderStatus::Packed)
}

pub fn ensure_assignable(status: OrderStatus) -> AppResult<()> {
    if status != OrderStatus::Packed {
        return Err(AppError::conflict(format!(
            "Only packed orders can be assigned for delivery, order is {status}"
        )));
    }
    Ok(())
}

fn delivery_rank(status: DeliveryStatus) -> u8 {
    match status {
        DeliveryStatus::Assigned => 0,
        DeliveryStatus::Picked => 1,
        DeliveryStatus::Delivered => 2,
    }
}

pub fn delivery_transition(current: DeliveryStatus, next: DeliveryStatus) -> AppResult<()> {
    if delivery_rank(next) <= delivery_rank(current) {
        return Err(AppError::conflict(format!(
            "Cannot move delivery from {current} to {next}"
        )));
    }
    Ok(())
}

pub fn ensure_return_requestable(status: OrderStatus, return_status: ReturnStatus) -> AppResult<()> {
    if status != OrderStatus::Delivered {
        return Err(AppError::conflict("Only delivered orders can be returned"));
    }
    if return_status != ReturnStatus::None {
        return Err(AppError::conflict(format!(
            "Return already {return_status}"
        )));
    }
    Ok(())
}

pub fn decide_return(return_status: ReturnStatus, approved: bool) -> AppResult<ReturnStatus> {
    if return_status != ReturnStatus::Requested {
        return Err(AppError::conflict(format!(
            "No pending return request, return is {return_status}"
        )));
    }
    Ok(if approved {
        ReturnStatus::Approved
    } else {
        ReturnStatus::Rejected
    })
}

pub fn confirm_return_pickup(return_status: ReturnStatus) -> AppResult<ReturnStatus> {
    match return_status {
        ReturnStatus::Approved => Ok(ReturnStatus::Picked),
        other => Err(AppError::conflict(format!(
            "Return must be approved before pickup, return is {other}"
        ))),
    }
}

/// A returned order may be refunded once, after pickup.
pub fn ensure_refundable(status: OrderStatus, return_status: ReturnStatus) -> AppResult<()> {
    if status == OrderStatus::Cancelled {
        return Err(AppError::conflict("Order already refunded or cancelled"));
    }
    if return_status != ReturnStatus::Picked {
        return Err(AppError::conflict(format!(
            "Return must be picked up before refund, return is {return_status}"
        )));
    }
    Ok(())
}

pub fn payment_completion(status: PaymentStatus) -> AppResult<Step> {
    match status {
        PaymentStatus::Initiated => Ok(Step::Advance),
        PaymentStatus::Completed => Ok(Step::AlreadyDone),
        other => Err(AppError::conflict(format!("Payment is already {other}"))),
    }
}

pub fn ensure_refundable_payment(status: PaymentStatus) -> AppResult<()> {
    if status != PaymentStatus::Completed {
        return Err(AppError::conflict(format!(
            "Only completed payments can be refunded, payment is {status}"
        )));
    }
    Ok(())
}
