//! Authentication and authorization utilities
//!
//! Provides:
//! - Password hashing and policy
//! - JWT token generation and validation behind `TokenService`
//! - The `AuthUser` extractor for bearer-authenticated routes

pub mod password;

pub use password::{blocking, hash_password, verify_absent_account, verify_password, PasswordPolicy};

use crate::config::AuthConfig;
use crate::errors::{AppError, Result};
use crate::identity::{Role, User};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shortest accepted HMAC signing key, in bytes
pub const MIN_SIGNING_KEY_LEN: usize = 32;

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    pub email: String,

    /// First name of the user
    pub given_name: String,

    /// Role names
    #[serde(rename = "role", default)]
    pub roles: Vec<String>,

    pub iss: String,

    pub aud: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Issues and checks bearer tokens.
pub trait TokenService: Send + Sync {
    fn create_token(&self, user: &User) -> Result<String>;

    fn validate_token(&self, token: &str) -> Result<JwtClaims>;
}

/// HS256 JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, issuer: &str, audience: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            expiration_secs: expiration_secs as i64,
        }
    }

    /// Build from configuration. A missing or short signing key is a configuration error.
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let secret = config
            .signing_key
            .as_deref()
            .ok_or_else(|| AppError::Configuration {
                message: "auth.signing_key is not set".to_string(),
            })?;

        if secret.len() < MIN_SIGNING_KEY_LEN {
            return Err(AppError::Configuration {
                message: format!(
                    "auth.signing_key must be at least {} bytes",
                    MIN_SIGNING_KEY_LEN
                ),
            });
        }

        Ok(Self::new(
            secret,
            &config.issuer,
            &config.audience,
            config.jwt_expiration_secs,
        ))
    }

    fn encode_claims(&self, claims: &JwtClaims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(|e| {
            AppError::Internal {
                message: format!("Failed to generate token: {}", e),
            }
        })
    }
}

impl TokenService for JwtManager {
    /// Generate a new JWT token
    fn create_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expiration_secs);

        let claims = JwtClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            given_name: user.first_name.clone(),
            roles: user.roles.iter().map(|r| r.as_str().to_string()).collect(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        self.encode_claims(&claims)
    }

    /// Validate and decode a JWT token
    fn validate_token(&self, token: &str) -> Result<JwtClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        decode::<JwtClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::ExpiredToken,
                _ => AppError::InvalidToken,
            })
    }
}

/// Extract the token from an `Authorization: Bearer ...` header value
pub fn extract_bearer(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The authenticated caller, taken from a validated bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
    pub roles: Vec<Role>,
}

impl AuthUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Require a specific role, returning error if not present
    pub fn require_role(&self, role: Role) -> Result<()> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(AppError::Forbidden {
                message: format!("Requires the {} role", role),
            })
        }
    }
}

impl From<JwtClaims> for AuthUser {
    fn from(claims: JwtClaims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            roles: claims
                .roles
                .iter()
                .filter_map(|name| name.parse::<Role>().ok())
                .collect(),
        }
    }
}

/// Axum extractor for AuthUser
impl<S> FromRequestParts<S> for AuthUser
where
    Arc<dyn TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing Authorization header".to_string(),
            })?;

        let token = extract_bearer(auth_header).ok_or_else(|| AppError::Unauthorized {
            message: "Expected a Bearer token".to_string(),
        })?;

        let tokens = Arc::<dyn TokenService>::from_ref(state);
        let claims = tokens.validate_token(token)?;

        Ok(AuthUser::from(claims))
    }
}
