//! Plain-text email bodies. Links point at the buyer/seller web app.

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    pub subject: String,
    pub body: String,
}

fn app_url(frontend_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        frontend_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn tracking_url(frontend_url: &str, order_id: Uuid) -> String {
    app_url(frontend_url, &format!("buyer/order/{order_id}/tracking"))
}

pub fn order_created(frontend_url: &str, name: &str, order_id: Uuid, amount: i64) -> EmailContent {
    EmailContent {
        subject: format!("Order #{order_id} placed successfully"),
        body: format!(
            "Hi {name},\n\nYour order #{order_id} has been placed.\nTotal amount: {amount}\nTrack order: {}\n\nThank you for shopping with us.",
            tracking_url(frontend_url, order_id)
        ),
    }
}

pub fn order_status(frontend_url: &str, name: &str, order_id: Uuid, status: &str) -> EmailContent {
    EmailContent {
        subject: format!("Order #{order_id} status updated"),
        body: format!(
            "Hi {name},\n\nYour order #{order_id} is now '{status}'.\nTrack order: {}",
            tracking_url(frontend_url, order_id)
        ),
    }
}

pub fn refund_processed(frontend_url: &str, name: &str, order_id: Uuid) -> EmailContent {
    EmailContent {
        subject: format!("Refund processed for order #{order_id}"),
        body: format!(
            "Hi {name},\n\nRefund for order #{order_id} has been processed.\nCheck wallet/orders: {}",
            app_url(frontend_url, "buyer/orders")
        ),
    }
}

pub fn seller_decision(frontend_url: &str, name: &str, approved: bool) -> EmailContent {
    let outcome = if approved { "approved" } else { "rejected" };
    EmailContent {
        subject: "Seller verification update".to_string(),
        body: format!(
            "Hi {name},\n\nYour seller profile has been {outcome}.\nDashboard: {}",
            app_url(frontend_url, "seller")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_join_without_double_slashes() {
        let id = Uuid::nil();
        let email = order_status("https://shop.test/", "Asha", id, "packed");
        assert!(email.body.contains(&format!("https://shop.test/buyer/order/{id}/tracking")));
        assert!(email.body.contains("'packed'"));
        assert_eq!(email.subject, format!("Order #{id} status updated"));
    }
}
