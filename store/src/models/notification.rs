// store/src/models/notification.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
  pub id: Uuid,
  pub user_id: Uuid,
  pub order_id: Uuid,
  pub title: String,
  pub message: String,
  pub is_read: bool,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
  pub user_id: Uuid,
  pub order_id: Uuid,
  pub title: String,
  pub message: String,
}

impl NewNotification {
  pub fn into_notification(self) -> Notification {
    Notification {
      id: Uuid::new_v4(),
      user_id: self.user_id,
      order_id: self.order_id,
      title: self.title,
      message: self.message,
      is_read: false,
      created_at: Utc::now(),
    }
  }
}
