use sea_orm::EntityTrait;
use uuid::Uuid;

use crate::{
    entity::users::{Entity as Users, Model as UserModel},
    integrations::{NewNotification, OutgoingEmail, mailer::send_email_async},
    models::NotificationCategory,
    state::AppState,
    templates::{self, EmailContent},
};

/// An in-app notification plus an optional email built for the recipient.
pub struct Notice {
    pub title: String,
    pub message: String,
    pub category: NotificationCategory,
    pub link: String,
    pub email: Option<Box<dyn FnOnce(&UserModel) -> EmailContent + Send>>,
}

impl Notice {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        category: NotificationCategory,
        link: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            category,
            link: link.into(),
            email: None,
        }
    }

    pub fn with_email<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&UserModel) -> EmailContent + Send + 'static,
    {
        self.email = Some(Box::new(build));
        self
    }
}

pub fn order_link(order_id: Uuid) -> String {
    format!("/buyer/order/{order_id}/tracking")
}

/// Best effort: failures are logged and never reach the caller.
pub async fn notify_user(state: &AppState, user_id: Uuid, notice: Notice) {
    let user = match Users::find_by_id(user_id).one(&state.orm).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::warn!(%user_id, "notification recipient not found");
            return;
        }
        Err(err) => {
            tracing::warn!(error = %err, %user_id, "failed to load notification recipient");
            return;
        }
    };

    let notification = NewNotification {
        user_id,
        title: notice.title,
        message: notice.message,
        category: notice.category,
        link: Some(notice.link),
    };
    if let Err(err) = state.notifier.notify(notification).await {
        tracing::warn!(error = %err, %user_id, "notification failed");
    }

    if let Some(build) = notice.email {
        let content = build(&user);
        send_email_async(
            state.mailer.clone(),
            OutgoingEmail {
                to: user.email.clone(),
                subject: content.subject,
                body: content.body,
            },
        );
    }
}

/// Notification plus the standard "order is now {status}" email.
pub fn order_status_notice(
    state: &AppState,
    order_id: Uuid,
    title: impl Into<String>,
    message: impl Into<String>,
    category: NotificationCategory,
    status_label: String,
) -> Notice {
    let frontend = state.config.frontend_url.clone();
    Notice::new(title, message, category, order_link(order_id)).with_email(move |user| {
        templates::order_status(&frontend, &user.name, order_id, &status_label)
    })
}
