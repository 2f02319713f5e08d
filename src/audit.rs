use serde_json::{Value, json};
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult, state::AppState};

/// One state-changing action, written to `audit_logs`.
#[derive(Debug)]
pub struct AuditEvent<'a> {
    pub actor: Option<Uuid>,
    pub action: &'a str,
    pub resource: &'a str,
    pub resource_id: Uuid,
    pub details: Value,
}

impl<'a> AuditEvent<'a> {
    pub fn new(actor: Option<Uuid>, action: &'a str, resource: &'a str, resource_id: Uuid) -> Self {
        Self {
            actor,
            action,
            resource,
            resource_id,
            details: Value::Null,
        }
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    fn metadata(&self) -> Value {
        json!({ "id": self.resource_id, "details": self.details })
    }
}

pub async fn log_audit(pool: &DbPool, event: &AuditEvent<'_>) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(event.actor)
    .bind(event.action)
    .bind(event.resource)
    .bind(event.metadata())
    .execute(pool)
    .await?;

    Ok(())
}

/// Best effort: a failed audit write is logged and swallowed.
pub async fn record(state: &AppState, event: AuditEvent<'_>) {
    if let Err(err) = log_audit(&state.pool, &event).await {
        tracing::warn!(error = %err, action = event.action, "audit log failed");
    }
}
