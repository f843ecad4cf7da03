//! Transport objects exchanged over the API
//!
//! Every type serializes in camelCase. Request types carry `validator` rules
//! checked by the gateway before a repository is called.

mod account;
mod cases;
mod documents;
mod messages;
mod notifications;

pub use account::{AuthResponse, LoginRequest, RegisterRequest, UserProfile};
pub use cases::{CaseDto, CreateCaseRequest, UpdateCaseRequest};
pub use documents::{CreateDocumentRequest, DocumentDto, UpdateDocumentRequest};
pub use messages::{CreateMessageRequest, MessageDto, UpdateMessageRequest};
pub use notifications::{CreateNotificationRequest, NotificationDto, UpdateNotificationRequest};

use validator::ValidationError;

/// Rejects strings that are empty once surrounding whitespace is removed.
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("must not be blank".into());
        return Err(error);
    }
    Ok(())
}
