use async_trait::async_trait;
use uuid::Uuid;

/// Search index maintenance. Callers log failures and carry on.
#[async_trait]
pub trait SearchIndexer: Send + Sync {
    async fn upsert_product(&self, product_id: Uuid) -> anyhow::Result<()>;
    async fn upsert_store(&self, seller_id: Uuid) -> anyhow::Result<()>;
}

/// Indexer used when no search backend is configured.
pub struct LogIndexer;

#[async_trait]
impl SearchIndexer for LogIndexer {
    async fn upsert_product(&self, product_id: Uuid) -> anyhow::Result<()> {
        tracing::debug!(%product_id, "product reindex requested");
        Ok(())
    }

    async fn upsert_store(&self, seller_id: Uuid) -> anyhow::Result<()> {
        tracing::debug!(%seller_id, "store reindex requested");
        Ok(())
    }
}
