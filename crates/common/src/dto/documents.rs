use crate::db::models::DocumentRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::not_blank;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDto {
    pub document_id: i32,
    pub file_name: String,
    pub file_path: String,
    pub upload_date: DateTime<Utc>,
    pub case_id: i32,
}

impl From<DocumentRecord> for DocumentDto {
    fn from(record: DocumentRecord) -> Self {
        Self {
            document_id: record.document_id,
            file_name: record.file_name,
            file_path: record.file_path,
            upload_date: record.upload_date,
            case_id: record.case_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    #[validate(length(max = 255), custom(function = "not_blank"))]
    pub file_name: String,

    #[validate(length(max = 1024), custom(function = "not_blank"))]
    pub file_path: String,

    #[validate(range(min = 1))]
    pub case_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentRequest {
    #[validate(length(max = 255), custom(function = "not_blank"))]
    pub file_name: String,

    #[validate(length(max = 1024), custom(function = "not_blank"))]
    pub file_path: String,
}
