use crate::db::models::NotificationRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::not_blank;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDto {
    pub notification_id: i32,
    pub message: String,
    pub date_sent: DateTime<Utc>,
    pub is_read: bool,
    pub user_id: String,
}

impl From<NotificationRecord> for NotificationDto {
    fn from(record: NotificationRecord) -> Self {
        Self {
            notification_id: record.notification_id,
            message: record.message,
            date_sent: record.date_sent,
            is_read: record.is_read,
            user_id: record.user_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    #[validate(length(max = 2000), custom(function = "not_blank"))]
    pub message: String,

    #[validate(custom(function = "not_blank"))]
    pub user_id: String,
}

/// Replaces the text and re-stamps the send time. `isRead` is left alone when absent.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNotificationRequest {
    #[validate(length(max = 2000), custom(function = "not_blank"))]
    pub message: String,

    pub is_read: Option<bool>,
}
