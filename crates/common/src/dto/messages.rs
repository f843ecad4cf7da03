use crate::db::models::MessageRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::not_blank;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub message_id: i32,
    pub content: String,
    pub date_sent: DateTime<Utc>,
    pub sender_id: String,
    pub case_id: i32,
}

impl From<MessageRecord> for MessageDto {
    fn from(record: MessageRecord) -> Self {
        Self {
            message_id: record.message_id,
            content: record.content,
            date_sent: record.date_sent,
            sender_id: record.sender_id,
            case_id: record.case_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    #[validate(length(max = 10000), custom(function = "not_blank"))]
    pub content: String,

    #[validate(custom(function = "not_blank"))]
    pub sender_id: String,

    #[validate(range(min = 1))]
    pub case_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMessageRequest {
    #[validate(length(max = 10000), custom(function = "not_blank"))]
    pub content: String,
}
