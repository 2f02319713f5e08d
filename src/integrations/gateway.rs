use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::{config::PaymentConfig, error::AppError};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request timed out")]
    Timeout,
    #[error("gateway request failed: {0}")]
    Transport(String),
    #[error("gateway rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("gateway returned an unexpected response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::Gateway(err.to_string())
    }
}

/// External payment processor. Amounts are in minor currency units.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a remote order the buyer pays against; returns its reference.
    async fn create_remote_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt_ref: &str,
    ) -> Result<String, GatewayError>;

    /// Refunds a captured payment; returns the refund reference.
    async fn refund(&self, payment_ref: &str, amount_minor: i64) -> Result<String, GatewayError>;
}

#[derive(Debug, Deserialize)]
struct EntityRef {
    id: String,
}

/// Razorpay REST client. Every call is bounded by the configured timeout.
pub struct RazorpayGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayGateway {
    pub fn new(
        base_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        })
    }

    /// Builds a client when both API credentials are configured.
    pub fn from_config(config: &PaymentConfig) -> Result<Option<Self>, GatewayError> {
        match (&config.key_id, &config.key_secret) {
            (Some(id), Some(secret)) => {
                Self::new(config.base_url.clone(), id, secret, config.timeout).map(Some)
            }
            _ => Ok(None),
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<EntityRef, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "calling payment gateway");
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::warn!(status = %status, "payment gateway rejected request");
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(|e| GatewayError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_remote_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt_ref: &str,
    ) -> Result<String, GatewayError> {
        let body = json!({
            "amount": amount_minor,
            "currency": currency,
            "receipt": receipt_ref,
        });
        Ok(self.post("/v1/orders", body).await?.id)
    }

    async fn refund(&self, payment_ref: &str, amount_minor: i64) -> Result<String, GatewayError> {
        let body = json!({ "amount": amount_minor });
        let path = format!("/v1/payments/{payment_ref}/refund");
        Ok(self.post(&path, body).await?.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_is_disabled_without_both_credentials() {
        let mut config = PaymentConfig {
            key_id: Some("rzp_test".into()),
            ..PaymentConfig::default()
        };
        assert!(RazorpayGateway::from_config(&config).unwrap().is_none());

        config.key_secret = Some("secret".into());
        assert!(RazorpayGateway::from_config(&config).unwrap().is_some());
    }

    #[test]
    fn gateway_errors_map_to_retryable_app_errors() {
        let err: AppError = GatewayError::Timeout.into();
        assert!(err.retryable());
        assert_eq!(err.code(), "gateway_error");
    }
}
