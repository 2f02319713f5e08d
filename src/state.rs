use std::sync::Arc;

use crate::{
    cache::{Cache, InMemoryCache},
    config::AppConfig,
    db::{DbPool, OrmConn, orm_from_pool},
    integrations::{
        DbNotifier, LogIndexer, LogMailer, Mailer, Notifier, PaymentGateway, RazorpayGateway,
        SearchIndexer,
    },
};

/// Shared handles passed to every service call.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub cache: Arc<dyn Cache>,
    /// `None` selects the mock payment flow.
    pub gateway: Option<Arc<dyn PaymentGateway>>,
    pub notifier: Arc<dyn Notifier>,
    pub mailer: Arc<dyn Mailer>,
    pub indexer: Arc<dyn SearchIndexer>,
}

impl AppState {
    pub fn new(pool: DbPool, config: AppConfig) -> anyhow::Result<Self> {
        let orm = orm_from_pool(pool.clone());
        let gateway = RazorpayGateway::from_config(&config.payment)?
            .map(|gateway| Arc::new(gateway) as Arc<dyn PaymentGateway>);
        if gateway.is_none() {
            tracing::warn!("payment gateway credentials missing, using mock payment flow");
        }

        Ok(Self {
            pool,
            notifier: Arc::new(DbNotifier::new(orm.clone())),
            orm,
            config: Arc::new(config),
            cache: Arc::new(InMemoryCache::new()),
            gateway,
            mailer: Arc::new(LogMailer::new("no-reply@marketplace.local")),
            indexer: Arc::new(LogIndexer),
        })
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn without_gateway(mut self) -> Self {
        self.gateway = None;
        self
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }
}
