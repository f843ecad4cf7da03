use crate::db::models::CaseRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::not_blank;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseDto {
    pub case_id: i32,
    pub title: String,
    pub description: String,
    pub created_by_id: Option<String>,
    pub assigned_to_id: Option<String>,
    pub date_created: DateTime<Utc>,
    pub date_closed: Option<DateTime<Utc>>,
}

impl From<CaseRecord> for CaseDto {
    fn from(record: CaseRecord) -> Self {
        Self {
            case_id: record.case_id,
            title: record.title,
            description: record.description,
            created_by_id: record.created_by_id,
            assigned_to_id: record.assigned_to_id,
            date_created: record.date_created,
            date_closed: record.date_closed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCaseRequest {
    #[validate(length(max = 200), custom(function = "not_blank"))]
    pub title: String,

    #[validate(length(max = 4000))]
    #[serde(default)]
    pub description: String,

    pub created_by_id: Option<String>,

    pub assigned_to_id: Option<String>,
}

/// Full replacement of the mutable case fields.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCaseRequest {
    #[validate(length(max = 200), custom(function = "not_blank"))]
    pub title: String,

    #[validate(length(max = 4000))]
    #[serde(default)]
    pub description: String,

    pub assigned_to_id: Option<String>,

    pub date_closed: Option<DateTime<Utc>>,
}
