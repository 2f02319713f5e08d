use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, DatabaseConnection, Set};
use uuid::Uuid;

use crate::{entity::notifications::ActiveModel as NotificationActive, models::NotificationCategory};

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub category: NotificationCategory,
    pub link: Option<String>,
}

/// In-app notification sink. Delivery is fire-and-forget from the caller's view.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: NewNotification) -> anyhow::Result<()>;
}

/// Persists notifications to the `notifications` table.
pub struct DbNotifier {
    orm: DatabaseConnection,
}

impl DbNotifier {
    pub fn new(orm: DatabaseConnection) -> Self {
        Self { orm }
    }
}

#[async_trait]
impl Notifier for DbNotifier {
    async fn notify(&self, notification: NewNotification) -> anyhow::Result<()> {
        NotificationActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(notification.user_id),
            title: Set(notification.title),
            message: Set(notification.message),
            category: Set(notification.category),
            link: Set(notification.link),
            is_read: Set(false),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await?;
        Ok(())
    }
}
