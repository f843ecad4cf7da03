//! Casebook Common Library
//!
//! Shared code for the Casebook services including:
//! - Database models, schema bootstrap and repositories
//! - Transport DTOs
//! - Query result caching
//! - Identity, password and token handling
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod account;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod dto;
pub mod errors;
pub mod identity;
pub mod metrics;

// Re-export commonly used types
pub use account::AccountService;
pub use cache::Cache;
pub use config::AppConfig;
pub use db::DbPool;
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prefix shared by every API route
pub const API_PREFIX: &str = "/api/v1";
