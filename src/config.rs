use std::{env, str::FromStr, time::Duration};

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub frontend_url: String,
    pub payment: PaymentConfig,
    pub delivery: DeliveryConfig,
    pub cache_ttl: Duration,
}

/// The live gateway is used only when both key fields are set.
#[derive(Clone, Default)]
pub struct PaymentConfig {
    pub key_id: Option<String>,
    pub key_secret: Option<String>,
    pub webhook_secret: Option<String>,
    pub base_url: String,
    pub currency: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for PaymentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &self.key_secret.as_ref().map(|_| "[REDACTED]"))
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("currency", &self.currency)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeliveryConfig {
    pub rate_per_km: i64,
    pub partner_share_percent: i64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            rate_per_km: 10,
            partner_share_percent: 80,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", 3000u16)?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());

        let payment = PaymentConfig {
            key_id: non_empty("RAZORPAY_KEY_ID"),
            key_secret: non_empty("RAZORPAY_KEY_SECRET"),
            webhook_secret: non_empty("RAZORPAY_WEBHOOK_SECRET"),
            base_url: env::var("RAZORPAY_BASE_URL")
                .unwrap_or_else(|_| "https://api.razorpay.com".to_string()),
            currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "INR".to_string()),
            timeout: Duration::from_secs(parse_or("GATEWAY_TIMEOUT_SECS", 10u64)?),
        };

        let delivery = DeliveryConfig {
            rate_per_km: parse_or("DELIVERY_RATE_PER_KM", 10i64)?,
            partner_share_percent: parse_or("PARTNER_SHARE_PERCENT", 80i64)?,
        };
        if !(0..=100).contains(&delivery.partner_share_percent) {
            anyhow::bail!("PARTNER_SHARE_PERCENT must be between 0 and 100");
        }

        let cache_ttl = Duration::from_secs(parse_or("CACHE_TTL_SECS", 60u64)?);

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            frontend_url,
            payment,
            delivery,
            cache_ttl,
        })
    }

    /// Configuration for tests and tools that bring their own database URL.
    pub fn for_database(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            jwt_secret: "test-secret".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            payment: PaymentConfig {
                base_url: "https://api.razorpay.com".to_string(),
                currency: "INR".to_string(),
                timeout: Duration::from_secs(10),
                ..PaymentConfig::default()
            },
            delivery: DeliveryConfig::default(),
            cache_ttl: Duration::from_secs(60),
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        Err(_) => Ok(default),
    }
}
