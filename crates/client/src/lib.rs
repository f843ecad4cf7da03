//! Casebook Client Library
//!
//! What a frontend needs to talk to the gateway:
//! - `session`: the signed-in user and token, persisted across restarts
//! - `api`: typed calls for every endpoint, with the bearer token attached

pub mod api;
pub mod error;
pub mod session;

pub use api::ApiClient;
pub use error::{ClientError, Result};
pub use session::{FileStorage, MemoryStorage, Session, SessionStorage, SessionStore};
